use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use social_backend::{
    AppState,
    cache::{KvStore, PostFeed, RedisStore},
    clock::{Clock, SystemClock},
    config::Config,
    database::{PgPostRepository, PostRepository},
    middleware::RateLimiter,
    router::create_router,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Arc::new(Config::from_env().expect("Failed to load configuration"));

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'social_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    // 设置 Redis 客户端，整个进程共用一个
    let redis = Arc::new(
        RedisStore::connect(
            &config.redis_url,
            config.redis_connect_timeout(),
            config.redis_command_timeout(),
        )
        .await
        .expect("Failed to connect to Redis"),
    );
    let store: Arc<dyn KvStore> = redis.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 设置限流器
    let limiter_service = config.rate_limit_strategy.build(store.clone(), clock.clone());
    tracing::info!(strategy = ?config.rate_limit_strategy, "Rate limiter ready");
    let rate_limiter = RateLimiter::new(
        limiter_service,
        config.buckets.general.clone(),
        clock,
        config.trust_proxy_headers,
    );

    // 设置应用状态
    let posts: Arc<dyn PostRepository> = Arc::new(PgPostRepository::new(pool.clone()));
    let feed = Arc::new(PostFeed::new(
        posts.clone(),
        store.clone(),
        config.feed_cache_ttl,
    ));
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        store,
        posts,
        feed,
        started_at: Instant::now(),
    };

    let app = create_router(state, rate_limiter);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    // 显式释放共享连接
    redis.shutdown().await;
    pool.close().await;
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
