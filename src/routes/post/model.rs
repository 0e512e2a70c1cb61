use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// 默认每页数量
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// 每页数量上限
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let len = self.content.chars().count();
        if !(1..=280).contains(&len) {
            return Err(AppError::Validation("内容长度需在1到280个字符之间".into()));
        }
        Ok(())
    }
}

// 分页查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PostsQuery {
    /// 按字符串接收，非数字时退回默认值
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

impl PostsQuery {
    pub fn page_size(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn cursor(&self) -> Result<Option<Uuid>, AppError> {
        self.cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| Uuid::parse_str(c).map_err(|_| AppError::Validation("无效的分页游标".into())))
            .transpose()
    }
}
