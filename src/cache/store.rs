use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store operation timed out")]
    Timeout,
    #[error("store connection closed")]
    Closed,
    #[error("wrong value type at key {0}")]
    WrongType(String),
}

/// 共享键值存储
///
/// 限流和缓存都只通过这里协调，所有读改写序列都下推到存储自身的原子操作，
/// 调用方不需要加锁。
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 原子自增并返回自增后的值，键不存在时从 0 开始
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// 键还没有过期时间时才设置（秒），已有过期时间或键不存在时不做任何事
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// 自增并确保计数器带有过期时间
    ///
    /// 每次调用都会补设过期时间，某次设置失败也不会留下永不过期的计数器。
    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError> {
        let current = self.incr(key).await?;
        self.expire(key, ttl_secs).await?;
        Ok(current)
    }

    /// 有序集合上的原子批处理：
    /// 删除 score <= cutoff 的成员，读取基数，加入 `member`，刷新过期时间。
    ///
    /// 返回加入新成员之前的基数。
    async fn record_in_window(
        &self,
        key: &str,
        cutoff: i64,
        score: i64,
        member: &str,
        ttl_secs: u64,
    ) -> Result<u64, StoreError>;

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError>;

    async fn zcard(&self, key: &str) -> Result<u64, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// 存活探测
    async fn ping(&self) -> Result<(), StoreError>;
}
