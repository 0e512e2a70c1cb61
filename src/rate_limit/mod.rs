//! 分布式限流
//!
//! 所有进程共享同一个键值存储，进程内不保存任何限流状态。
//! 两种策略实现同一个 [`RateLimitService`]，启动时按配置选择其一，
//! 调用方不感知具体实现。

mod bucket;
mod fixed_window;
mod sliding_window;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{KvStore, StoreError};
use crate::clock::Clock;

pub use bucket::{QuotaBucket, QuotaBuckets};
pub use fixed_window::FixedWindowRateLimiter;
pub use sliding_window::SlidingWindowRateLimiter;

/// 单次限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u64,
    /// 配额恢复时间，Unix 毫秒
    pub reset_time: i64,
}

#[async_trait]
pub trait RateLimitService: Send + Sync {
    /// 对 `key` 记一次请求并判定是否放行
    ///
    /// 返回 `Err` 表示存储不可用，调用方应按放行处理（fail-open）。
    async fn check_limit(
        &self,
        key: &str,
        window_ms: u64,
        max_requests: u64,
    ) -> Result<RateLimitResult, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitStrategy {
    #[default]
    Fixed,
    Sliding,
}

impl RateLimitStrategy {
    pub fn build(self, store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Arc<dyn RateLimitService> {
        match self {
            RateLimitStrategy::Fixed => Arc::new(FixedWindowRateLimiter::new(store, clock)),
            RateLimitStrategy::Sliding => Arc::new(SlidingWindowRateLimiter::new(store, clock)),
        }
    }
}

impl FromStr for RateLimitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "fixed_window" => Ok(RateLimitStrategy::Fixed),
            "sliding" | "sliding_window" => Ok(RateLimitStrategy::Sliding),
            other => Err(format!("unknown rate limit strategy: {}", other)),
        }
    }
}

/// 窗口长度向上取整到秒，作为存储键的过期时间
fn window_ttl_secs(window_ms: u64) -> u64 {
    window_ms.div_ceil(1000).max(1)
}
