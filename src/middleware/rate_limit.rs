use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat};

use super::Identity;
use crate::{
    clock::Clock,
    rate_limit::{QuotaBucket, RateLimitResult, RateLimitService},
    utils::{error_codes, error_to_api_response},
};

/// 绑定到单个限流桶的中间件状态
#[derive(Clone)]
pub struct RateLimiter {
    service: Arc<dyn RateLimitService>,
    bucket: QuotaBucket,
    clock: Arc<dyn Clock>,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(
        service: Arc<dyn RateLimitService>,
        bucket: QuotaBucket,
        clock: Arc<dyn Clock>,
        trust_proxy_headers: bool,
    ) -> Self {
        Self {
            service,
            bucket,
            clock,
            trust_proxy_headers,
        }
    }

    /// 同一套限流服务换一个桶
    pub fn for_bucket(&self, bucket: &QuotaBucket) -> Self {
        Self {
            bucket: bucket.clone(),
            ..self.clone()
        }
    }

    pub async fn check_rate_limit(&self, req: Request<Body>, next: Next) -> Response {
        let key = Identity::resolve(&req, self.trust_proxy_headers).key(self.bucket.name);

        let result = match self
            .service
            .check_limit(&key, self.bucket.window_ms, self.bucket.max_requests)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                // 存储不可用时放行，可用性优先于配额
                tracing::error!(bucket = self.bucket.name, %key, error = %e, "Rate limit check failed, allowing request");
                return next.run(req).await;
            }
        };

        if !result.allowed {
            tracing::warn!(bucket = self.bucket.name, %key, "Rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    "请求过于频繁，请稍后重试".to_string(),
                ),
            )
                .into_response();
            self.apply_headers(response.headers_mut(), &result);
            let retry_after = retry_after_secs(result.reset_time, self.clock.now_ms());
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            return response;
        }

        let mut response = next.run(req).await;
        self.apply_headers(response.headers_mut(), &result);
        response
    }

    fn apply_headers(&self, headers: &mut HeaderMap, result: &RateLimitResult) {
        headers.insert(
            "x-ratelimit-limit",
            HeaderValue::from(self.bucket.max_requests),
        );
        headers.insert("x-ratelimit-remaining", HeaderValue::from(result.remaining));
        if let Some(reset) = DateTime::from_timestamp_millis(result.reset_time)
            .and_then(|t| HeaderValue::from_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true)).ok())
        {
            headers.insert("x-ratelimit-reset", reset);
        }
    }
}

/// 距离配额恢复的秒数，至少 1 秒
fn retry_after_secs(reset_time: i64, now_ms: i64) -> u64 {
    let wait_ms = reset_time.saturating_sub(now_ms).max(0) as u64;
    wait_ms.div_ceil(1000).max(1)
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
