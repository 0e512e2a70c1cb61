use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 关注关系数据库实体
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FollowEntity {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
