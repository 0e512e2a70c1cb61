use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{KvStore, keys};
use crate::database::{PostPage, PostRepository};

/// 帖子流缓存的过期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCacheTtl {
    /// 首页，新帖都落在这里，变化最快
    pub first_page_secs: u64,
    /// 带游标的后续页
    pub next_page_secs: u64,
}

impl Default for FeedCacheTtl {
    fn default() -> Self {
        Self {
            first_page_secs: 60,
            next_page_secs: 120,
        }
    }
}

/// 帖子流读路径（cache-aside）
///
/// 先查缓存，未命中再回源并写回。写帖子时不做失效，读方最多看到 TTL 秒前的数据。
/// 缓存只是加速手段：缓存读写失败或内容无法解析时一律回源。
pub struct PostFeed {
    posts: Arc<dyn PostRepository>,
    store: Arc<dyn KvStore>,
    ttl: FeedCacheTtl,
}

impl PostFeed {
    pub fn new(posts: Arc<dyn PostRepository>, store: Arc<dyn KvStore>, ttl: FeedCacheTtl) -> Self {
        Self { posts, store, ttl }
    }

    pub async fn get_posts(&self, limit: i64, cursor: Option<Uuid>) -> Result<PostPage, sqlx::Error> {
        let cursor_str = cursor.map(|c| c.to_string());
        let cache_key = keys::posts_page_key(limit, cursor_str.as_deref());

        if let Some(page) = self.cached_page(&cache_key).await {
            return Ok(page);
        }

        let page = self.posts.find_with_pagination(limit, cursor).await?;

        let ttl = if cursor.is_some() {
            self.ttl.next_page_secs
        } else {
            self.ttl.first_page_secs
        };
        self.store_page(&cache_key, &page, ttl).await;

        Ok(page)
    }

    async fn cached_page(&self, cache_key: &str) -> Option<PostPage> {
        let json = match self.store.get(cache_key).await {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = cache_key, error = %e, "Feed cache read failed, falling back to database");
                return None;
            }
        };

        match serde_json::from_str::<PostPage>(&json) {
            Ok(page) => {
                tracing::debug!("Get posts from cache: {}", cache_key);
                Some(page)
            }
            Err(e) => {
                tracing::warn!(key = cache_key, error = %e, "Discarding undecodable feed cache entry");
                None
            }
        }
    }

    async fn store_page(&self, cache_key: &str, page: &PostPage, ttl_secs: u64) {
        let json = match serde_json::to_string(page) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = cache_key, error = %e, "Failed to serialize feed page");
                return;
            }
        };
        if let Err(e) = self.store.set_ex(cache_key, &json, ttl_secs).await {
            tracing::warn!(key = cache_key, error = %e, "Feed cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::{MemoryStore, StoreError};
    use crate::clock::ManualClock;
    use crate::database::PostEntity;

    /// 内存版帖子表，记录分页查询次数
    #[derive(Default)]
    struct CountingPosts {
        rows: Mutex<Vec<PostEntity>>,
        page_queries: AtomicUsize,
    }

    impl CountingPosts {
        fn seeded(n: u128) -> Self {
            let rows = (1..=n)
                .rev()
                .map(|i| PostEntity {
                    id: Uuid::from_u128(i),
                    content: format!("post {}", i),
                    author_id: Uuid::from_u128(1000),
                    created_at: chrono::DateTime::from_timestamp(i as i64, 0).unwrap(),
                })
                .collect();
            Self {
                rows: Mutex::new(rows),
                page_queries: AtomicUsize::new(0),
            }
        }

        fn queries(&self) -> usize {
            self.page_queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PostRepository for CountingPosts {
        async fn create(&self, author_id: Uuid, content: &str) -> Result<PostEntity, sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let post = PostEntity {
                id: Uuid::new_v4(),
                content: content.to_string(),
                author_id,
                created_at: chrono::Utc::now(),
            };
            rows.insert(0, post.clone());
            Ok(post)
        }

        async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<PostEntity>, sqlx::Error> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().filter(|p| p.author_id == author_id).cloned().collect())
        }

        async fn find_with_pagination(
            &self,
            limit: i64,
            cursor: Option<Uuid>,
        ) -> Result<PostPage, sqlx::Error> {
            self.page_queries.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let rows = self.rows.lock().unwrap();
            let start = match cursor {
                Some(c) => rows.iter().position(|p| p.id == c).unwrap_or(rows.len()),
                None => 0,
            };
            let window = rows.iter().skip(start).take(limit as usize + 1).cloned().collect();
            Ok(PostPage::from_rows(window, limit as usize))
        }
    }

    /// 永远不可用的存储
    struct DownStore;

    #[async_trait]
    impl KvStore for DownStore {
        async fn incr(&self, _: &str) -> Result<i64, StoreError> {
            Err(StoreError::Timeout)
        }
        async fn expire(&self, _: &str, _: u64) -> Result<(), StoreError> {
            Err(StoreError::Timeout)
        }
        async fn record_in_window(&self, _: &str, _: i64, _: i64, _: &str, _: u64) -> Result<u64, StoreError> {
            Err(StoreError::Timeout)
        }
        async fn zrem(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Timeout)
        }
        async fn zcard(&self, _: &str) -> Result<u64, StoreError> {
            Err(StoreError::Timeout)
        }
        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Timeout)
        }
        async fn set_ex(&self, _: &str, _: &str, _: u64) -> Result<(), StoreError> {
            Err(StoreError::Timeout)
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Timeout)
        }
    }

    fn feed(posts: Arc<CountingPosts>) -> (Arc<ManualClock>, Arc<MemoryStore>, PostFeed) {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let feed = PostFeed::new(posts, store.clone(), FeedCacheTtl::default());
        (clock, store, feed)
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let posts = Arc::new(CountingPosts::seeded(30));
        let (_, _, feed) = feed(posts.clone());

        let first = feed.get_posts(20, None).await.unwrap();
        let second = feed.get_posts(20, None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.posts.len(), 20);
        assert_eq!(first.next_cursor, Some(Uuid::from_u128(10)));
        assert_eq!(posts.queries(), 1);
    }

    #[tokio::test]
    async fn new_posts_do_not_invalidate_cached_first_page() {
        let posts = Arc::new(CountingPosts::seeded(5));
        let (clock, _, feed) = feed(posts.clone());

        let before = feed.get_posts(20, None).await.unwrap();
        posts.create(Uuid::from_u128(7), "fresh").await.unwrap();

        assert_eq!(feed.get_posts(20, None).await.unwrap(), before);

        clock.advance(60_000);
        let after = feed.get_posts(20, None).await.unwrap();
        assert_eq!(after.posts.len(), 6);
        assert_eq!(after.posts[0].content, "fresh");
    }

    #[tokio::test]
    async fn paginated_pages_live_longer_than_first_page() {
        let posts = Arc::new(CountingPosts::seeded(30));
        let (clock, _, feed) = feed(posts.clone());
        let cursor = Some(Uuid::from_u128(10));

        feed.get_posts(5, None).await.unwrap();
        feed.get_posts(5, cursor).await.unwrap();
        assert_eq!(posts.queries(), 2);

        clock.advance(61_000);
        feed.get_posts(5, None).await.unwrap();
        feed.get_posts(5, cursor).await.unwrap();
        assert_eq!(posts.queries(), 3);

        clock.advance(60_000);
        feed.get_posts(5, cursor).await.unwrap();
        assert_eq!(posts.queries(), 4);
    }

    #[tokio::test]
    async fn cursor_and_first_page_are_cached_separately() {
        let posts = Arc::new(CountingPosts::seeded(30));
        let (_, _, feed) = feed(posts.clone());

        let first = feed.get_posts(20, None).await.unwrap();
        let next = feed.get_posts(20, first.next_cursor).await.unwrap();

        assert_ne!(first, next);
        assert_eq!(next.posts[0].id, Uuid::from_u128(10));
        assert_eq!(next.posts.len(), 10);
        assert_eq!(next.next_cursor, None);
        assert_eq!(posts.queries(), 2);
    }

    #[tokio::test]
    async fn undecodable_entry_is_treated_as_miss_and_replaced() {
        let posts = Arc::new(CountingPosts::seeded(3));
        let (_, store, feed) = feed(posts.clone());
        let key = keys::posts_page_key(20, None);
        store.set_ex(&key, "{not json", 60).await.unwrap();

        let page = feed.get_posts(20, None).await.unwrap();
        assert_eq!(page.posts.len(), 3);
        assert_eq!(posts.queries(), 1);

        let cached = store.get(&key).await.unwrap().unwrap();
        assert_eq!(serde_json::from_str::<PostPage>(&cached).unwrap(), page);
    }

    #[tokio::test]
    async fn unavailable_store_falls_through_to_database() {
        let posts = Arc::new(CountingPosts::seeded(3));
        let feed = PostFeed::new(posts.clone(), Arc::new(DownStore), FeedCacheTtl::default());

        assert_eq!(feed.get_posts(20, None).await.unwrap().posts.len(), 3);
        assert_eq!(feed.get_posts(20, None).await.unwrap().posts.len(), 3);
        assert_eq!(posts.queries(), 2);
    }

    #[tokio::test]
    async fn concurrent_cold_reads_agree() {
        let posts = Arc::new(CountingPosts::seeded(40));
        let (_, _, feed) = feed(posts.clone());
        let feed = Arc::new(feed);

        let reads = (0..8).map(|_| {
            let feed = feed.clone();
            async move { feed.get_posts(20, None).await.unwrap() }
        });
        let pages = futures_util::future::join_all(reads).await;

        assert!(pages.windows(2).all(|w| w[0] == w[1]));
        assert!((1..=8).contains(&posts.queries()));
    }
}
