use std::sync::Arc;

use async_trait::async_trait;

use super::{RateLimitResult, RateLimitService, window_ttl_secs};
use crate::cache::{KvStore, StoreError, keys};
use crate::clock::Clock;

/// 固定窗口计数器
///
/// 每个 (桶, 身份, 窗口序号) 一个计数器，INCR 一次往返即可完成判定。
/// 窗口边界处最多允许两倍的突发。
pub struct FixedWindowRateLimiter {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl RateLimitService for FixedWindowRateLimiter {
    async fn check_limit(
        &self,
        key: &str,
        window_ms: u64,
        max_requests: u64,
    ) -> Result<RateLimitResult, StoreError> {
        let window = i64::try_from(window_ms.max(1)).unwrap_or(i64::MAX);
        let window_index = self.clock.now_ms().div_euclid(window);
        let counter_key = keys::rate_limit_key(key, window_index);

        let current = self
            .store
            .incr_with_expiry(&counter_key, window_ttl_secs(window_ms))
            .await?;

        // 超限后计数继续增长，不再额外往返去封顶
        let current = u64::try_from(current).unwrap_or(0);
        Ok(RateLimitResult {
            allowed: current <= max_requests,
            remaining: max_requests.saturating_sub(current),
            reset_time: (window_index + 1).saturating_mul(window),
        })
    }
}
