use std::sync::Arc;

use async_trait::async_trait;

use super::{RateLimitResult, RateLimitService, window_ttl_secs};
use crate::cache::{KvStore, StoreError, keys};
use crate::clock::Clock;

/// 滑动窗口日志
///
/// 每个 (桶, 身份) 一个有序集合，成员按请求时间打分。消除了固定窗口的边界突发，
/// 代价是集合大小与近期流量成正比，且拒绝时多一次往返。
pub struct SlidingWindowRateLimiter {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl RateLimitService for SlidingWindowRateLimiter {
    async fn check_limit(
        &self,
        key: &str,
        window_ms: u64,
        max_requests: u64,
    ) -> Result<RateLimitResult, StoreError> {
        let now = self.clock.now_ms();
        let window = i64::try_from(window_ms).unwrap_or(i64::MAX);
        let set_key = keys::sliding_rate_limit_key(key);
        // 同一毫秒内的请求靠随机后缀区分
        let member = format!("{}-{}", now, rand::random::<u64>());

        let current_count = self
            .store
            .record_in_window(
                &set_key,
                now.saturating_sub(window),
                now,
                &member,
                window_ttl_secs(window_ms),
            )
            .await?;

        let allowed = current_count < max_requests;
        if !allowed {
            // 撤回刚加入的那个成员，失败只会让窗口偏严，不影响本次判定
            if let Err(e) = self.store.zrem(&set_key, &member).await {
                tracing::warn!(key = %set_key, error = %e, "Failed to roll back rejected request marker");
            }
        }

        Ok(RateLimitResult {
            allowed,
            remaining: max_requests.saturating_sub(current_count + 1),
            reset_time: now.saturating_add(window),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::clock::ManualClock;

    fn limiter() -> (Arc<ManualClock>, Arc<MemoryStore>, SlidingWindowRateLimiter) {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let limiter = SlidingWindowRateLimiter::new(store.clone(), clock.clone());
        (clock, store, limiter)
    }

    #[tokio::test]
    async fn window_slides_past_old_requests() {
        let (clock, _, limiter) = limiter();
        let key = "post:user:42";

        for (t, remaining) in [(0, 2), (100, 1), (200, 0)] {
            clock.set(t);
            let result = limiter.check_limit(key, 1000, 3).await.unwrap();
            assert!(result.allowed, "request at t={} should be allowed", t);
            assert_eq!(result.remaining, remaining);
            assert_eq!(result.reset_time, t + 1000);
        }

        clock.set(300);
        assert!(!limiter.check_limit(key, 1000, 3).await.unwrap().allowed);

        clock.set(1100);
        assert!(limiter.check_limit(key, 1000, 3).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn rejected_requests_leave_no_markers() {
        let (clock, store, limiter) = limiter();
        let key = "login:ip:10.0.0.9";

        for t in 0..2 {
            clock.set(t);
            assert!(limiter.check_limit(key, 10_000, 2).await.unwrap().allowed);
        }
        // 同一毫秒内的多次拒绝也必须各自撤回自己的成员
        clock.set(5);
        for _ in 0..10 {
            assert!(!limiter.check_limit(key, 10_000, 2).await.unwrap().allowed);
        }

        let set_key = keys::sliding_rate_limit_key(key);
        assert_eq!(store.zcard(&set_key).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_admit_exactly_the_limit() {
        let (clock, store, limiter) = limiter();
        clock.set(50);
        let limiter = Arc::new(limiter);

        let tasks: Vec<_> = (0..30)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.check_limit("general:token:abc", 60_000, 7).await.unwrap()
                })
            })
            .collect();

        let mut allowed = 0;
        for task in tasks {
            if task.await.unwrap().allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 7);

        let set_key = keys::sliding_rate_limit_key("general:token:abc");
        assert_eq!(store.zcard(&set_key).await.unwrap(), 7);
    }
}
