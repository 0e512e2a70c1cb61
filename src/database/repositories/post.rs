use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{PostEntity, PostPage};

/// 帖子读写接口，帖子流缓存通过它回源
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, author_id: Uuid, content: &str) -> Result<PostEntity, sqlx::Error>;

    /// 作者的全部帖子，按创建时间倒序
    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<PostEntity>, sqlx::Error>;

    /// 按创建时间倒序取最多 `limit` 条，从 `cursor` 指向的帖子开始（含）
    async fn find_with_pagination(
        &self,
        limit: i64,
        cursor: Option<Uuid>,
    ) -> Result<PostPage, sqlx::Error>;
}

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, author_id: Uuid, content: &str) -> Result<PostEntity, sqlx::Error> {
        sqlx::query_as::<_, PostEntity>(
            r#"
            INSERT INTO posts (id, content, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, author_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<PostEntity>, sqlx::Error> {
        sqlx::query_as::<_, PostEntity>(
            r#"
            SELECT id, content, author_id, created_at
            FROM posts
            WHERE author_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_with_pagination(
        &self,
        limit: i64,
        cursor: Option<Uuid>,
    ) -> Result<PostPage, sqlx::Error> {
        let limit = limit.max(1);

        // 多取一条用来判断是否还有下一页
        let rows = sqlx::query_as::<_, PostEntity>(
            r#"
            SELECT id, content, author_id, created_at
            FROM posts
            WHERE $2::uuid IS NULL
               OR (created_at, id) <= (SELECT created_at, id FROM posts WHERE id = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit + 1)
        .bind(cursor)
        .fetch_all(&self.pool)
        .await?;

        Ok(PostPage::from_rows(rows, limit as usize))
    }
}
