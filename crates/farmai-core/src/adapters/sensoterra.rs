use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::fetch_json;
use crate::data_source::{CapabilitySet, DataSource, SoilSource, SourceError, SourceFuture, UseCase};
use crate::domain::{SensorId, SensorLocation, SoilReading};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::ProviderId;

const BASE_URL: &str = "https://api.sensoterra.com/v1";
const TIMEOUT_MS: u64 = 10_000;

/// Soil moisture sensors, authenticated with a bearer token.
#[derive(Clone)]
pub struct SensoterraAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
}

impl SensoterraAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            auth: HttpAuth::BearerToken(api_key.into()),
        }
    }

    fn request(&self, url: String) -> HttpRequest {
        HttpRequest::get(url)
            .with_auth(&self.auth)
            .with_header("accept", "application/json")
            .with_timeout_ms(TIMEOUT_MS)
    }

    async fn fetch_reading(&self, sensor: SensorId) -> Result<SoilReading, SourceError> {
        let request = self.request(format!("{BASE_URL}/sensors/{sensor}/readings"));
        let raw: RawReading =
            fetch_json(self.http_client.as_ref(), ProviderId::Sensoterra, request).await?;

        Ok(SoilReading {
            moisture: raw.moisture,
            temperature: raw.temperature,
            salinity: raw.salinity,
            timestamp: raw.timestamp,
            battery: raw.battery_level,
        })
    }

    async fn fetch_sensors(&self) -> Result<Vec<SensorLocation>, SourceError> {
        let request = self.request(format!("{BASE_URL}/sensors"));
        let raw: RawSensorList =
            fetch_json(self.http_client.as_ref(), ProviderId::Sensoterra, request).await?;

        raw.sensors
            .into_iter()
            .map(|sensor| {
                let id = match sensor.id {
                    Value::String(id) => id,
                    Value::Number(id) => id.to_string(),
                    other => {
                        return Err(SourceError::parse(
                            ProviderId::Sensoterra,
                            format!("sensor id has unexpected type: {other}"),
                        ))
                    }
                };
                Ok(SensorLocation {
                    id,
                    name: sensor.name,
                    latitude: sensor.latitude,
                    longitude: sensor.longitude,
                })
            })
            .collect()
    }
}

impl DataSource for SensoterraAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Sensoterra
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
            .with(UseCase::SoilReading)
            .with(UseCase::SensorLocations)
    }
}

impl SoilSource for SensoterraAdapter {
    fn reading<'a>(&'a self, sensor: SensorId) -> SourceFuture<'a, SoilReading> {
        Box::pin(async move { self.fetch_reading(sensor).await })
    }

    fn sensors<'a>(&'a self) -> SourceFuture<'a, Vec<SensorLocation>> {
        Box::pin(async move { self.fetch_sensors().await })
    }
}

#[derive(Debug, Deserialize)]
struct RawReading {
    moisture: f64,
    temperature: f64,
    #[serde(default)]
    salinity: Option<f64>,
    timestamp: String,
    #[serde(default)]
    battery_level: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSensor {
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSensorList {
    #[serde(default)]
    sensors: Vec<RawSensor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{FixtureHttpClient, HttpError, HttpResponse};

    fn adapter(client: FixtureHttpClient) -> (SensoterraAdapter, Arc<FixtureHttpClient>) {
        let client = Arc::new(client);
        (SensoterraAdapter::new(client.clone(), "st-token"), client)
    }

    #[tokio::test]
    async fn reading_maps_battery_level_and_sends_bearer_token() {
        let body = r#"{"moisture": 31.5, "temperature": 17.25, "salinity": 0.8, "timestamp": "2024-06-01T08:00:00Z", "battery_level": 92}"#;
        let (adapter, client) = adapter(FixtureHttpClient::new().respond(
            format!("{BASE_URL}/sensors/probe-7/readings"),
            HttpResponse::ok_json(body),
        ));
        let sensor = SensorId::parse("probe-7").expect("valid id");

        let reading = adapter.reading(sensor).await.expect("reading");

        assert_eq!(reading.moisture, 31.5);
        assert_eq!(reading.battery, Some(92.0));
        assert_eq!(reading.timestamp, "2024-06-01T08:00:00Z");

        let request = &client.recorded_requests()[0];
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer st-token")
        );
        assert_eq!(request.timeout_ms, 10_000);
    }

    #[tokio::test]
    async fn sensor_list_accepts_numeric_ids() {
        let body = r#"{"sensors": [{"id": 17, "name": "North"}, {"id": "probe-9", "latitude": 52.1, "longitude": 4.3}]}"#;
        let (adapter, _) = adapter(
            FixtureHttpClient::new().respond(format!("{BASE_URL}/sensors"), HttpResponse::ok_json(body)),
        );

        let sensors = adapter.sensors().await.expect("sensors");

        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].id, "17");
        assert_eq!(sensors[1].latitude, Some(52.1));
    }

    #[tokio::test]
    async fn transport_failure_is_unavailable() {
        let (adapter, _) = adapter(
            FixtureHttpClient::new().fail(BASE_URL, HttpError::new("connection refused")),
        );
        let sensor = SensorId::parse("probe-7").expect("valid id");

        let error = adapter.reading(sensor).await.expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert_eq!(error.provider(), ProviderId::Sensoterra);
    }
}
