// 缓存模块
// 共享键值存储的抽象、两种实现，以及帖子流的读缓存

pub mod feed;
pub mod keys;
mod memory_store;
mod redis_store;
mod store;

// 重新导出常用类型，方便其他模块使用
pub use feed::{FeedCacheTtl, PostFeed};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{KvStore, StoreError};
