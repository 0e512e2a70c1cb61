use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::FollowEntity;

/// 关注关系存储库实现
pub struct FollowRepository;

impl FollowRepository {
    pub async fn find(
        pool: &PgPool,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEntity>, sqlx::Error> {
        sqlx::query_as::<_, FollowEntity>(
            r#"
            SELECT id, follower_id, following_id, created_at
            FROM follows
            WHERE follower_id = $1 AND following_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<FollowEntity, sqlx::Error> {
        sqlx::query_as::<_, FollowEntity>(
            r#"
            INSERT INTO follows (id, follower_id, following_id)
            VALUES ($1, $2, $3)
            RETURNING id, follower_id, following_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(pool)
        .await
    }
}
