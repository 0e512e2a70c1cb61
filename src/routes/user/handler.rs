use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    database::{FollowEntity, FollowRepository, PostEntity, UserEntity, UserRepository},
    error::AppError,
    middleware::AuthUser,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::UpdateProfileRequest;

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserEntity>>, AppError> {
    req.validate()?;

    let user = UserRepository::update_profile(
        &state.pool,
        user_id,
        req.name.as_deref(),
        req.bio.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("用户不存在".into()))?;

    Ok(success_to_api_response(user))
}

pub async fn follow_user(
    State(state): State<AppState>,
    Extension(AuthUser(follower_id)): Extension<AuthUser>,
    Path(following_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<FollowEntity>>), AppError> {
    if follower_id == following_id {
        return Err(AppError::Validation("不能关注自己".into()));
    }

    if UserRepository::find_by_id(&state.pool, following_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("用户不存在".into()));
    }

    if FollowRepository::find(&state.pool, follower_id, following_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("已经关注了该用户".into()));
    }

    let follow = FollowRepository::create(&state.pool, follower_id, following_id)
        .await
        .map_err(|e| match e {
            // 并发关注同一用户时由唯一约束兜底
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("已经关注了该用户".into())
            }
            other => AppError::Database(other),
        })?;

    Ok((StatusCode::CREATED, success_to_api_response(follow)))
}

pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PostEntity>>>, AppError> {
    let posts = state.posts.find_by_author(author_id).await?;
    Ok(success_to_api_response(posts))
}
