use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use cache::{KvStore, PostFeed};
use config::Config;
use database::PostRepository;

pub mod cache;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub store: Arc<dyn KvStore>,
    pub posts: Arc<dyn PostRepository>,
    pub feed: Arc<PostFeed>,
    pub started_at: Instant,
}
