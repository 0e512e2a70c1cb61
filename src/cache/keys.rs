/// 固定窗口限流键前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 滑动窗口限流键前缀
const SLIDING_RATE_LIMIT_PREFIX: &str = "sliding_rate_limit:";

/// 帖子列表缓存键前缀
const POSTS_PREFIX: &str = "posts:";

/// 生成固定窗口计数器键
pub fn rate_limit_key(key: &str, window_index: i64) -> String {
    format!("{}{}:{}", RATE_LIMIT_PREFIX, key, window_index)
}

/// 生成滑动窗口有序集合键
pub fn sliding_rate_limit_key(key: &str) -> String {
    format!("{}{}", SLIDING_RATE_LIMIT_PREFIX, key)
}

/// 生成帖子分页缓存键，有无游标必须得到不同的键
pub fn posts_page_key(limit: i64, cursor: Option<&str>) -> String {
    match cursor {
        Some(cursor) => format!("{}limit={}:cursor={}", POSTS_PREFIX, limit, cursor),
        None => format!("{}limit={}", POSTS_PREFIX, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_and_cursor_pages_never_share_a_key() {
        let first = posts_page_key(20, None);
        let paged = posts_page_key(20, Some("a1b2"));
        assert_eq!(first, "posts:limit=20");
        assert_eq!(paged, "posts:limit=20:cursor=a1b2");
        assert_ne!(first, paged);
        assert_ne!(posts_page_key(20, None), posts_page_key(21, None));
    }

    #[test]
    fn rate_limit_keys_carry_window_index() {
        assert_eq!(
            rate_limit_key("login:ip:10.0.0.1", 42),
            "rate_limit:login:ip:10.0.0.1:42"
        );
        assert_eq!(
            sliding_rate_limit_key("login:user:7"),
            "sliding_rate_limit:login:user:7"
        );
    }
}
