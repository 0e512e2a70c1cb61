use axum::{
    extract::{Json, State},
    http::StatusCode,
};

use crate::{
    AppState,
    database::UserRepository,
    error::AppError,
    utils::{ApiResponse, generate_token, hash_password, success_to_api_response, verify_password},
};

use super::model::{LoginRequest, LoginResponse, SignupRequest, SignupResponse};

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SignupResponse>>), AppError> {
    req.validate()?;

    if UserRepository::find_by_email(&state.pool, &req.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("邮箱已被使用".into()));
    }
    if UserRepository::find_by_username(&state.pool, &req.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("用户名已被使用".into()));
    }

    // bcrypt 是 CPU 密集操作，放到阻塞线程池
    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let user = UserRepository::create(
        &state.pool,
        &req.email,
        &req.username,
        &password_hash,
        req.name.as_deref(),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("邮箱或用户名已被使用".into())
        }
        other => AppError::Database(other),
    })?;

    let token = generate_token(user.id, &state.config)?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response(SignupResponse { user, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    req.validate()?;

    let invalid = || AppError::Unauthorized("邮箱或密码错误".into());

    let user = UserRepository::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(invalid)?;

    let password = req.password;
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    if !valid {
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "User logged in");
    let token = generate_token(user.id, &state.config)?;
    Ok(success_to_api_response(LoginResponse { token }))
}
