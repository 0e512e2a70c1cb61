mod auth;
mod error_handler;
mod identity;
mod rate_limit;

pub use auth::{AuthUser, auth_middleware};
pub use error_handler::log_errors;
pub use identity::Identity;
pub use rate_limit::{RateLimiter, rate_limit};
