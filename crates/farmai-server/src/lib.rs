//! HTTP surface of the FarmAI data gateway.
//!
//! ```text
//! client ──> CORS ─> trace ─> body limit ─┬─ /health
//!                                          └─ /api ─> per-IP limiter ─> handlers ─> Aggregator
//! ```
//!
//! Every `/api` response uses the [`ApiResponse`] envelope. Unknown routes
//! answer 404 with the same envelope.

pub mod cli;
pub mod config;
pub mod envelope;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use farmai_core::CacheStore;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

pub use config::{ConfigError, ServerConfig};
pub use envelope::ApiResponse;
pub use error::{ApiError, ServerError};
pub use rate_limit::ClientRateLimiter;
pub use state::AppState;

/// Largest accepted request body; base64 images dominate.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = routes::api_router().layer(from_fn_with_state(
        state.rate_limiter.clone(),
        rate_limit::limit_by_client_ip,
    ));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", api)
        .fallback(routes::not_found)
        .method_not_allowed_fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.frontend_url))
        .with_state(state)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(error) => {
            warn!(frontend_url, error = %error, "invalid FRONTEND_URL; cross-origin requests disabled");
            layer
        }
    }
}

/// Periodically drop expired cache entries and idle rate-limit buckets.
pub fn spawn_cache_sweeper(
    cache: CacheStore,
    limiter: ClientRateLimiter,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            limiter.retain_recent();
            if purged > 0 {
                debug!(purged, remaining = cache.len(), "cache sweep");
            }
        }
    })
}

/// Bind, serve until SIGINT/SIGTERM, then drain in-flight requests.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let state = AppState::from_config(&config, None);
    let sweeper = spawn_cache_sweeper(
        state.aggregator.cache().clone(),
        state.rate_limiter.clone(),
        config.cache_sweep_interval,
    );

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    info!(%address, frontend_url = %config.frontend_url, "farmai listening");

    let app = build_router(state);
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.abort();
    info!("farmai stopped");
    served.map_err(ServerError::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
