mod google_ai;
mod openweathermap;
mod sensoterra;
mod weatherstack;

pub use google_ai::GoogleAiAdapter;
pub use openweathermap::OpenWeatherMapAdapter;
pub use sensoterra::SensoterraAdapter;
pub use weatherstack::WeatherstackAdapter;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::ProviderId;

/// Execute `request`, require a 2xx status and decode the JSON body.
async fn fetch_json<T: DeserializeOwned>(
    http_client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<T, SourceError> {
    debug!(provider = provider.as_str(), timeout_ms = request.timeout_ms, "calling provider");

    let response = http_client
        .execute(request)
        .await
        .map_err(|error| SourceError::from_http(provider, &error))?;

    if !response.is_success() {
        return Err(SourceError::unexpected_status(provider, response.status));
    }

    serde_json::from_str(&response.body).map_err(|error| {
        SourceError::parse(provider, format!("failed to decode response: {error}"))
    })
}
