use std::sync::Arc;

use serde::Deserialize;

use super::fetch_json;
use crate::data_source::{
    CapabilitySet, DataSource, SourceError, SourceFuture, UseCase, WeatherSource,
};
use crate::domain::{Coordinates, WeatherObservation};
use crate::http_client::{HttpClient, HttpRequest};
use crate::ProviderId;

const CURRENT_URL: &str = "http://api.weatherstack.com/current";
const TIMEOUT_MS: u64 = 5_000;
const KMH_PER_MS: f64 = 3.6;

/// Secondary weather provider. Serves current conditions only.
#[derive(Clone)]
pub struct WeatherstackAdapter {
    http_client: Arc<dyn HttpClient>,
    access_key: String,
}

impl WeatherstackAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, access_key: impl Into<String>) -> Self {
        Self {
            http_client,
            access_key: access_key.into(),
        }
    }

    async fn fetch_current(&self, at: Coordinates) -> Result<WeatherObservation, SourceError> {
        let request = HttpRequest::get(CURRENT_URL)
            .with_query("access_key", &self.access_key)
            .with_query("query", format!("{},{}", at.latitude(), at.longitude()))
            .with_query("units", "m")
            .with_timeout_ms(TIMEOUT_MS);
        let raw: WeatherstackResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::Weatherstack, request).await?;

        // Weatherstack reports failures with a 200 and `success: false`.
        if raw.success == Some(false) {
            let info = raw
                .error
                .map(|error| error.info)
                .unwrap_or_else(|| String::from("request was rejected"));
            return Err(SourceError::unavailable(ProviderId::Weatherstack, info));
        }

        let current = raw.current.ok_or_else(|| {
            SourceError::parse(ProviderId::Weatherstack, "response has no current block")
        })?;

        Ok(WeatherObservation {
            temperature: current.temperature,
            humidity: current.humidity,
            conditions: current
                .weather_descriptions
                .into_iter()
                .next()
                .unwrap_or_default(),
            wind_speed: current.wind_speed / KMH_PER_MS,
            rainfall: current.precip,
            location: raw.location.map(|location| location.name).unwrap_or_default(),
        })
    }
}

impl DataSource for WeatherstackAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Weatherstack
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty().with(UseCase::CurrentWeather)
    }
}

impl WeatherSource for WeatherstackAdapter {
    fn current<'a>(&'a self, at: Coordinates) -> SourceFuture<'a, WeatherObservation> {
        Box::pin(async move { self.fetch_current(at).await })
    }
}

#[derive(Debug, Deserialize)]
struct WeatherstackError {
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct WeatherstackCurrent {
    temperature: f64,
    humidity: f64,
    #[serde(default)]
    weather_descriptions: Vec<String>,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    precip: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherstackLocation {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WeatherstackResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<WeatherstackError>,
    #[serde(default)]
    current: Option<WeatherstackCurrent>,
    #[serde(default)]
    location: Option<WeatherstackLocation>,
}
