use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub database: &'static str,
    pub cache: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub services: ServiceHealth,
}

fn probe_label(ok: bool) -> &'static str {
    if ok { "healthy" } else { "unhealthy" }
}

async fn database_ok(state: &AppState) -> Result<(), String> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn cache_ok(state: &AppState) -> Result<(), String> {
    state.store.ping().await.map_err(|e| e.to_string())
}

// 数据库或缓存任一不可用时返回 503 degraded
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let (database, cache) = tokio::join!(database_ok(&state), cache_ok(&state));
    if let Err(e) = &database {
        tracing::warn!(error = %e, "Database health probe failed");
    }
    if let Err(e) = &cache {
        tracing::warn!(error = %e, "Cache health probe failed");
    }

    let healthy = database.is_ok() && cache.is_ok();
    let report = HealthReport {
        status: if healthy { "ok" } else { "degraded" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        services: ServiceHealth {
            database: probe_label(database.is_ok()),
            cache: probe_label(cache.is_ok()),
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let result = match database_ok(&state).await {
        Ok(()) => cache_ok(&state).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "error": e })),
        ),
    }
}

pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}
