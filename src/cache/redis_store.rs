use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult, aio::ConnectionManager};
use tokio::sync::RwLock;

use crate::cache::store::{KvStore, StoreError};

/// Redis 客户端
///
/// 启动时建立一次连接，之后所有请求共用同一个自动重连的连接管理器。
/// 每条命令都受 `command_timeout` 约束，超时按存储不可用处理。
pub struct RedisStore {
    conn: RwLock<Option<ConnectionManager>>,
    command_timeout: Duration,
}

impl RedisStore {
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let manager = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout)??;

        tracing::info!(
            connect_timeout_ms = connect_timeout.as_millis() as u64,
            command_timeout_ms = command_timeout.as_millis() as u64,
            "Connected to Redis"
        );

        Ok(Self {
            conn: RwLock::new(Some(manager)),
            command_timeout,
        })
    }

    /// 释放连接，之后的调用都返回 `StoreError::Closed`
    pub async fn shutdown(&self) {
        if self.conn.write().await.take().is_some() {
            tracing::info!("Redis connection released");
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.conn.read().await.clone().ok_or(StoreError::Closed)
    }

    async fn run<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        self.run(conn.incr::<_, _, i64>(key, 1)).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(ttl_secs).arg("NX");
        let _: i64 = self.run(cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;

        // EXPIRE NX 需要 Redis 7.0 及以上
        let mut pipe = redis::pipe();
        pipe.atomic()
            .incr(key, 1)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .arg("NX")
            .ignore();

        let (current,): (i64,) = self.run(pipe.query_async(&mut conn)).await?;
        Ok(current)
    }

    async fn record_in_window(
        &self,
        key: &str,
        cutoff: i64,
        score: i64,
        member: &str,
        ttl_secs: u64,
    ) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);

        // MULTI/EXEC 保证四步在服务端连续执行
        let mut pipe = redis::pipe();
        pipe.atomic()
            .zrembyscore(key, "-inf", cutoff)
            .ignore()
            .zcard(key)
            .zadd(key, member, score)
            .ignore()
            .expire(key, ttl)
            .ignore();

        let (count,): (u64,) = self.run(pipe.query_async(&mut conn)).await?;
        Ok(count)
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        self.run(conn.zrem::<_, _, ()>(key, member)).await
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        self.run(conn.zcard::<_, u64>(key)).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        self.run(conn.get::<_, Option<String>>(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        self.run(conn.set_ex::<_, _, ()>(key, value, ttl_secs)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let cmd = redis::cmd("PING");
        let _: String = self.run(cmd.query_async(&mut conn)).await?;
        Ok(())
    }
}
