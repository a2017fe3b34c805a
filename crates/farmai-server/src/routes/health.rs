use axum::extract::State;
use axum::Json;
use farmai_core::CacheStats;
use serde::Serialize;
use time::OffsetDateTime;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_seconds: f64,
    pub version: &'static str,
    pub cache: CacheStats,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let cache = state.aggregator.cache();
    Json(HealthReport {
        status: "healthy",
        timestamp: cache.clock().now(),
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        version: env!("CARGO_PKG_VERSION"),
        cache: cache.stats(),
    })
}
