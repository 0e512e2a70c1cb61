use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::FeedCacheTtl;
use crate::rate_limit::{QuotaBucket, QuotaBuckets, RateLimitStrategy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("invalid rate limit bucket: {0}")]
    Bucket(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub redis_connect_timeout_ms: u64,
    pub redis_command_timeout_ms: u64,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub rate_limit_strategy: RateLimitStrategy,
    /// 是否信任反向代理写入的 X-Real-IP / X-Forwarded-For
    pub trust_proxy_headers: bool,
    pub buckets: QuotaBuckets,
    pub feed_cache_ttl: FeedCacheTtl,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let jwt_expiration_secs = jwt_expiration_secs(optional("JWT_EXPIRATION").as_deref())?;

        let defaults = QuotaBuckets::default();
        let feed_defaults = FeedCacheTtl::default();

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: required("REDIS_URL")?,
            redis_connect_timeout_ms: parse_or("REDIS_CONNECT_TIMEOUT_MS", 10_000)?,
            redis_command_timeout_ms: parse_or("REDIS_COMMAND_TIMEOUT_MS", 5_000)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_secs,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or("SERVER_PORT", 3333)?,
            rate_limit_strategy: parse_or("RATE_LIMIT_STRATEGY", RateLimitStrategy::Fixed)?,
            trust_proxy_headers: parse_or("TRUST_PROXY_HEADERS", false)?,
            buckets: QuotaBuckets {
                signup: bucket_from_env("SIGNUP", &defaults.signup)?,
                login: bucket_from_env("LOGIN", &defaults.login)?,
                post: bucket_from_env("POST", &defaults.post)?,
                general: bucket_from_env("GENERAL", &defaults.general)?,
            },
            feed_cache_ttl: FeedCacheTtl {
                first_page_secs: parse_or("FEED_CACHE_TTL_SECS", feed_defaults.first_page_secs)?,
                next_page_secs: parse_or(
                    "FEED_PAGE_CACHE_TTL_SECS",
                    feed_defaults.next_page_secs,
                )?,
            },
        })
    }

    pub fn redis_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_connect_timeout_ms)
    }

    pub fn redis_command_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_command_timeout_ms)
    }
}

/// JWT_EXPIRATION 以小时计，`h` 后缀可省略，默认 24 小时
fn jwt_expiration_secs(raw: Option<&str>) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(24 * 3600);
    };
    let hours = parse::<u64>("JWT_EXPIRATION", raw.trim().trim_end_matches('h'))?;
    hours.checked_mul(3600).ok_or_else(|| ConfigError::Invalid {
        name: "JWT_EXPIRATION",
        value: raw.to_string(),
    })
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => parse(name, &raw),
        None => Ok(default),
    }
}

/// 读取 RATE_LIMIT_{NAME}_WINDOW_MS / RATE_LIMIT_{NAME}_MAX
fn bucket_from_env(name: &str, default: &QuotaBucket) -> Result<QuotaBucket, ConfigError> {
    let window_var = format!("RATE_LIMIT_{}_WINDOW_MS", name);
    let max_var = format!("RATE_LIMIT_{}_MAX", name);

    let window_ms = read_u64(&window_var)?.unwrap_or(default.window_ms);
    let max_requests = read_u64(&max_var)?.unwrap_or(default.max_requests);

    QuotaBucket::new(default.name, window_ms, max_requests).map_err(ConfigError::Bucket)
}

fn read_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(name).ok().filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Bucket(format!("{}={}", name, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_expiration_is_read_in_hours() {
        assert_eq!(jwt_expiration_secs(None).unwrap(), 86_400);
        assert_eq!(jwt_expiration_secs(Some("2h")).unwrap(), 7_200);
        assert_eq!(jwt_expiration_secs(Some("48")).unwrap(), 172_800);
        assert!(matches!(
            jwt_expiration_secs(Some("soon")),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn oversized_jwt_expiration_is_rejected() {
        let huge = format!("{}h", u64::MAX / 1000);
        assert!(matches!(
            jwt_expiration_secs(Some(&huge)),
            Err(ConfigError::Invalid { name: "JWT_EXPIRATION", .. })
        ));
    }
}
