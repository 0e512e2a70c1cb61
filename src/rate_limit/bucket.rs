/// 限流桶：一个命名的窗口长度和请求上限，对每个身份独立生效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaBucket {
    pub name: &'static str,
    pub window_ms: u64,
    pub max_requests: u64,
}

impl QuotaBucket {
    pub fn new(name: &'static str, window_ms: u64, max_requests: u64) -> Result<Self, String> {
        if window_ms == 0 {
            return Err(format!("bucket {}: window must be greater than zero", name));
        }
        if max_requests == 0 {
            return Err(format!("bucket {}: max requests must be greater than zero", name));
        }
        Ok(Self {
            name,
            window_ms,
            max_requests,
        })
    }
}

/// 启动时确定的全部限流桶
#[derive(Debug, Clone)]
pub struct QuotaBuckets {
    pub signup: QuotaBucket,
    pub login: QuotaBucket,
    pub post: QuotaBucket,
    pub general: QuotaBucket,
}

impl Default for QuotaBuckets {
    fn default() -> Self {
        Self {
            signup: QuotaBucket {
                name: "signup",
                window_ms: 60_000,
                max_requests: 1000,
            },
            login: QuotaBucket {
                name: "login",
                window_ms: 60_000,
                max_requests: 3000,
            },
            post: QuotaBucket {
                name: "post",
                window_ms: 30_000,
                max_requests: 6000,
            },
            general: QuotaBucket {
                name: "general",
                window_ms: 30_000,
                max_requests: 3000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_window_or_limit() {
        assert!(QuotaBucket::new("signup", 0, 10).is_err());
        assert!(QuotaBucket::new("signup", 1000, 0).is_err());
        assert_eq!(
            QuotaBucket::new("signup", 1000, 10).unwrap().max_requests,
            10
        );
    }
}
