use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    rate_limit::QuotaBucket,
    routes,
};

/// 组装全部路由
///
/// 需要认证的路由上认证中间件在限流之前执行，限流才能按用户计数。
pub fn create_router(state: AppState, limiter: RateLimiter) -> Router {
    let buckets = state.config.buckets.clone();
    let limit = |bucket: &QuotaBucket| limiter.for_bucket(bucket);
    let auth = from_fn_with_state(state.clone(), auth_middleware);

    // 认证路由
    let auth_routes = Router::new()
        .route(
            "/signup",
            post(routes::auth::signup)
                .layer(from_fn_with_state(limit(&buckets.signup), rate_limit)),
        )
        .route(
            "/login",
            post(routes::auth::login)
                .layer(from_fn_with_state(limit(&buckets.login), rate_limit)),
        );

    // 帖子路由：读公开，写需要认证
    let read_posts = get(routes::post::get_posts)
        .layer(from_fn_with_state(limit(&buckets.general), rate_limit));
    let write_posts = post(routes::post::create_post)
        .layer(from_fn_with_state(limit(&buckets.post), rate_limit))
        .layer(auth.clone());

    // 用户路由，全部需要认证
    let user_routes = Router::new()
        .route("/profile", put(routes::user::update_profile))
        .route("/follow/{id}", post(routes::user::follow_user))
        .route("/{id}/posts", get(routes::user::get_user_posts))
        .route_layer(from_fn_with_state(limit(&buckets.general), rate_limit))
        .route_layer(auth);

    let health_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/readiness", get(routes::health::readiness))
        .route("/health/liveness", get(routes::health::liveness));

    let router = Router::new()
        .merge(health_routes)
        .merge(auth_routes)
        .route("/posts", read_posts.merge(write_posts))
        .nest("/user", user_routes)
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
