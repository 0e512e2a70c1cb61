use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    database::{PostEntity, PostPage},
    error::AppError,
    middleware::AuthUser,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{CreatePostRequest, PostsQuery};

pub async fn create_post(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostEntity>>), AppError> {
    req.validate()?;

    // 不失效帖子流缓存，首页最多滞后一个 TTL
    let post = state.posts.create(user_id, &req.content).await?;
    tracing::debug!(post_id = %post.id, author_id = %user_id, "Created post");

    Ok((StatusCode::CREATED, success_to_api_response(post)))
}

pub async fn get_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<ApiResponse<PostPage>>, AppError> {
    let cursor = query.cursor()?;
    let page = state.feed.get_posts(query.page_size(), cursor).await?;
    Ok(success_to_api_response(page))
}
