//! Per-client request budget for the `/api` routes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tracing::warn;

use crate::error::ApiError;

type KeyedRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Allows `max_requests` per `window` for each client IP.
///
/// The whole budget is available as a burst and refills evenly over the
/// window.
#[derive(Clone)]
pub struct ClientRateLimiter {
    limiter: Arc<KeyedRateLimiter>,
}

impl ClientRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota_from_window(window, max_requests))),
        }
    }

    pub fn check(&self, client: IpAddr) -> bool {
        self.limiter.check_key(&client).is_ok()
    }

    /// Drop idle client buckets.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}

fn quota_from_window(window: Duration, max_requests: u32) -> Quota {
    let burst = NonZeroU32::new(max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Middleware rejecting clients that exhausted their budget with a 429.
///
/// Requests without connection info (in-process tests) share one bucket.
pub async fn limit_by_client_ip(
    State(limiter): State<ClientRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip());

    if !limiter.check(client) {
        warn!(client = %client, path = request.uri().path(), "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }

    next.run(request).await
}
