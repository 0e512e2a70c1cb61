use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::Request};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use super::AuthUser;

/// 限流所针对的身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(String),
    Token(String),
    Address(String),
}

impl Identity {
    /// 按 已认证用户 > Bearer 令牌 > 来源地址 的优先级解析，都拿不到时为 "anonymous"
    pub fn resolve<B>(req: &Request<B>, trust_proxy_headers: bool) -> Self {
        if let Some(AuthUser(user_id)) = req.extensions().get::<AuthUser>() {
            return Identity::User(user_id.to_string());
        }

        if let Some(bearer) = req.headers().typed_get::<Authorization<Bearer>>() {
            if !bearer.token().is_empty() {
                return Identity::Token(bearer.token().to_string());
            }
        }

        Identity::Address(
            source_address(req, trust_proxy_headers).unwrap_or_else(|| "anonymous".to_string()),
        )
    }

    /// 带桶名前缀的限流键，不同桶之间互不影响
    pub fn key(&self, bucket: &str) -> String {
        match self {
            Identity::User(id) => format!("{}:user:{}", bucket, id),
            Identity::Token(token) => format!("{}:token:{}", bucket, token),
            Identity::Address(addr) => format!("{}:ip:{}", bucket, addr),
        }
    }
}

fn source_address<B>(req: &Request<B>, trust_proxy_headers: bool) -> Option<String> {
    // 代理头可以被客户端伪造，只有部署在可信代理之后才读取
    let forwarded = trust_proxy_headers
        .then(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .or_else(|| {
                    req.headers()
                        .get("x-forwarded-for")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
                })
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
        })
        .flatten();

    forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use uuid::Uuid;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/posts")
    }

    fn with_peer(mut req: Request<Body>, addr: &str) -> Request<Body> {
        req.extensions_mut()
            .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn authenticated_user_wins_over_token_and_address() {
        let user_id = Uuid::new_v4();
        let mut req = with_peer(
            request()
                .header("authorization", "Bearer abc.def.ghi")
                .body(Body::empty())
                .unwrap(),
            "10.1.2.3:5555",
        );
        req.extensions_mut().insert(AuthUser(user_id));

        let identity = Identity::resolve(&req, false);
        assert_eq!(identity, Identity::User(user_id.to_string()));
        assert_eq!(identity.key("post"), format!("post:user:{}", user_id));
    }

    #[test]
    fn token_wins_over_address() {
        let req = with_peer(
            request()
                .header("authorization", "Bearer abc.def.ghi")
                .body(Body::empty())
                .unwrap(),
            "10.1.2.3:5555",
        );
        assert_eq!(
            Identity::resolve(&req, false).key("general"),
            "general:token:abc.def.ghi"
        );
    }

    #[test]
    fn falls_back_to_peer_address_then_anonymous() {
        let req = with_peer(request().body(Body::empty()).unwrap(), "10.1.2.3:5555");
        assert_eq!(Identity::resolve(&req, false).key("login"), "login:ip:10.1.2.3");

        let req = request().body(Body::empty()).unwrap();
        assert_eq!(
            Identity::resolve(&req, false).key("login"),
            "login:ip:anonymous"
        );
    }

    #[test]
    fn proxy_headers_only_count_when_trusted() {
        let build = || {
            with_peer(
                request()
                    .header("x-forwarded-for", " 203.0.113.7, 10.0.0.1")
                    .body(Body::empty())
                    .unwrap(),
                "10.0.0.1:443",
            )
        };

        assert_eq!(
            Identity::resolve(&build(), true),
            Identity::Address("203.0.113.7".into())
        );
        assert_eq!(
            Identity::resolve(&build(), false),
            Identity::Address("10.0.0.1".into())
        );
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let req = request()
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            Identity::resolve(&req, false),
            Identity::Address("anonymous".into())
        );
    }
}
