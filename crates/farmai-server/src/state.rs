use std::sync::Arc;
use std::time::Instant;

use farmai_core::{Aggregator, CacheStore, HttpClient, SourceRouterBuilder};

use crate::config::ServerConfig;
use crate::rate_limit::ClientRateLimiter;

/// Shared handler state. Cloning is cheap; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub rate_limiter: ClientRateLimiter,
    pub frontend_url: String,
    pub started_at: Instant,
}

impl AppState {
    /// Wire adapters for every configured provider over `http_client`.
    pub fn from_config(config: &ServerConfig, http_client: Option<Arc<dyn HttpClient>>) -> Self {
        let mut builder = SourceRouterBuilder::new()
            .with_openweather_key(config.openweather_api_key.clone())
            .with_weatherstack_key(config.weatherstack_api_key.clone())
            .with_google_ai_key(config.google_ai_api_key.clone())
            .with_sensoterra_key(config.sensoterra_api_key.clone());
        if let Some(http_client) = http_client {
            builder = builder.with_http_client(http_client);
        }

        let cache = CacheStore::new(config.cache_default_ttl);
        Self::new(Aggregator::new(cache, builder.build()), config)
    }

    pub fn new(aggregator: Aggregator, config: &ServerConfig) -> Self {
        Self {
            aggregator,
            rate_limiter: ClientRateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            frontend_url: config.frontend_url.clone(),
            started_at: Instant::now(),
        }
    }
}
