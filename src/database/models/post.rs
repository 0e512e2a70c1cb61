use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 帖子数据库实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostEntity {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 一页帖子，`next_cursor` 为本页之后第一条帖子的 ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PostEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
}

impl PostPage {
    /// 由多取一条的查询结果组装分页
    pub fn from_rows(mut rows: Vec<PostEntity>, limit: usize) -> Self {
        let next_cursor = if rows.len() > limit {
            rows.truncate(limit + 1);
            rows.pop().map(|excluded| excluded.id)
        } else {
            None
        };
        Self {
            posts: rows,
            next_cursor,
        }
    }
}
