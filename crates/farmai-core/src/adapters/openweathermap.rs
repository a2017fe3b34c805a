use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;

use super::fetch_json;
use crate::data_source::{
    CapabilitySet, DataSource, SourceError, SourceFuture, UseCase, WeatherSource,
};
use crate::domain::{
    summarize_daily, Coordinates, ForecastPoint, ForecastRequest, WeatherAlert, WeatherForecast,
    WeatherObservation,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::ProviderId;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const ONE_CALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";
const CURRENT_TIMEOUT_MS: u64 = 5_000;
const FORECAST_TIMEOUT_MS: u64 = 10_000;
const POINTS_PER_DAY: u32 = 8;

/// Primary weather provider: current conditions, 3-hour forecast and alerts.
#[derive(Clone)]
pub struct OpenWeatherMapAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
}

impl OpenWeatherMapAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
        }
    }

    fn request(&self, url: &str, at: Coordinates) -> HttpRequest {
        HttpRequest::get(url)
            .with_query("lat", at.latitude())
            .with_query("lon", at.longitude())
            .with_query("appid", &self.api_key)
            .with_query("units", "metric")
    }

    async fn fetch_current(&self, at: Coordinates) -> Result<WeatherObservation, SourceError> {
        let request = self
            .request(&format!("{BASE_URL}/weather"), at)
            .with_timeout_ms(CURRENT_TIMEOUT_MS);
        let raw: OwmCurrentResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::OpenWeatherMap, request).await?;

        let conditions = raw
            .weather
            .first()
            .map(|w| w.description.clone())
            .ok_or_else(|| {
                SourceError::parse(ProviderId::OpenWeatherMap, "response has no weather entries")
            })?;

        Ok(WeatherObservation {
            temperature: raw.main.temp,
            humidity: raw.main.humidity,
            conditions,
            wind_speed: raw.wind.map_or(0.0, |wind| wind.speed),
            rainfall: precipitation(raw.rain.as_ref(), "1h"),
            location: raw.name,
        })
    }

    async fn fetch_forecast(&self, req: ForecastRequest) -> Result<WeatherForecast, SourceError> {
        let request = self
            .request(&format!("{BASE_URL}/forecast"), req.at)
            .with_query("cnt", u32::from(req.days) * POINTS_PER_DAY)
            .with_timeout_ms(FORECAST_TIMEOUT_MS);
        let raw: OwmForecastResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::OpenWeatherMap, request).await?;

        let points = raw
            .list
            .into_iter()
            .map(OwmForecastItem::into_point)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WeatherForecast {
            location: raw.city.name,
            daily: summarize_daily(&points, req.days),
            current: points.into_iter().next(),
        })
    }

    async fn fetch_alerts(&self, at: Coordinates) -> Result<Vec<WeatherAlert>, SourceError> {
        let request = self
            .request(ONE_CALL_URL, at)
            .with_query("exclude", "current,minutely,hourly,daily")
            .with_timeout_ms(FORECAST_TIMEOUT_MS);
        let raw: OwmOneCallResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::OpenWeatherMap, request).await?;

        raw.alerts
            .into_iter()
            .map(|alert| -> Result<WeatherAlert, SourceError> {
                Ok(WeatherAlert {
                    sender: alert.sender_name,
                    event: alert.event,
                    start: unix_time(alert.start)?,
                    end: unix_time(alert.end)?,
                    description: alert.description,
                    tags: alert.tags,
                })
            })
            .collect()
    }
}

impl DataSource for OpenWeatherMapAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeatherMap
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
            .with(UseCase::CurrentWeather)
            .with(UseCase::WeatherForecast)
            .with(UseCase::WeatherAlerts)
    }
}

impl WeatherSource for OpenWeatherMapAdapter {
    fn current<'a>(&'a self, at: Coordinates) -> SourceFuture<'a, WeatherObservation> {
        Box::pin(async move { self.fetch_current(at).await })
    }

    fn forecast<'a>(&'a self, req: ForecastRequest) -> SourceFuture<'a, WeatherForecast> {
        Box::pin(async move { self.fetch_forecast(req).await })
    }

    fn alerts<'a>(&'a self, at: Coordinates) -> SourceFuture<'a, Vec<WeatherAlert>> {
        Box::pin(async move { self.fetch_alerts(at).await })
    }
}

fn precipitation(volumes: Option<&HashMap<String, f64>>, window: &str) -> f64 {
    volumes
        .and_then(|volumes| volumes.get(window).copied())
        .unwrap_or(0.0)
}

fn unix_time(seconds: i64) -> Result<OffsetDateTime, SourceError> {
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| {
        SourceError::parse(
            ProviderId::OpenWeatherMap,
            format!("timestamp {seconds} is out of range"),
        )
    })
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    #[serde(default)]
    weather: Vec<OwmCondition>,
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    rain: Option<HashMap<String, f64>>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    rain: Option<HashMap<String, f64>>,
}

impl OwmForecastItem {
    fn into_point(self) -> Result<ForecastPoint, SourceError> {
        Ok(ForecastPoint {
            time: unix_time(self.dt)?,
            temperature: self.main.temp,
            humidity: self.main.humidity,
            conditions: self
                .weather
                .into_iter()
                .next()
                .map(|w| w.description)
                .unwrap_or_default(),
            wind_speed: self.wind.map_or(0.0, |wind| wind.speed),
            rainfall: precipitation(self.rain.as_ref(), "3h"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    #[serde(default)]
    list: Vec<OwmForecastItem>,
    city: OwmCity,
}

#[derive(Debug, Deserialize)]
struct OwmAlert {
    #[serde(default)]
    sender_name: String,
    event: String,
    start: i64,
    end: i64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OwmOneCallResponse {
    #[serde(default)]
    alerts: Vec<OwmAlert>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{FixtureHttpClient, HttpError, HttpResponse};

    const LONDON_CURRENT: &str = r#"{
        "weather": [{"main": "Clouds", "description": "broken clouds"}],
        "main": {"temp": 14.2, "humidity": 72},
        "wind": {"speed": 3.6},
        "rain": {"1h": 0.4},
        "name": "London"
    }"#;

    fn london() -> Coordinates {
        Coordinates::new(51.5, -0.09).expect("valid coordinates")
    }

    fn adapter(client: FixtureHttpClient) -> (OpenWeatherMapAdapter, Arc<FixtureHttpClient>) {
        let client = Arc::new(client);
        (OpenWeatherMapAdapter::new(client.clone(), "owm-key"), client)
    }

    #[tokio::test]
    async fn current_weather_is_normalized_to_metric_observation() {
        let (adapter, client) = adapter(
            FixtureHttpClient::new()
                .respond(format!("{BASE_URL}/weather"), HttpResponse::ok_json(LONDON_CURRENT)),
        );

        let observation = adapter.current(london()).await.expect("current weather");

        assert_eq!(observation.temperature, 14.2);
        assert_eq!(observation.humidity, 72.0);
        assert_eq!(observation.conditions, "broken clouds");
        assert_eq!(observation.wind_speed, 3.6);
        assert_eq!(observation.rainfall, 0.4);
        assert_eq!(observation.location, "London");

        let request = &client.recorded_requests()[0];
        assert!(request.url.contains("lat=51.5&lon=-0.09&appid=owm-key&units=metric"));
        assert_eq!(request.timeout_ms, 5_000);
    }

    #[tokio::test]
    async fn missing_rain_block_means_zero_rainfall() {
        let body = r#"{"weather":[{"description":"clear sky"}],"main":{"temp":20,"humidity":40},"name":"Rome"}"#;
        let (adapter, _) = adapter(
            FixtureHttpClient::new().respond(format!("{BASE_URL}/weather"), HttpResponse::ok_json(body)),
        );

        let observation = adapter.current(london()).await.expect("current weather");

        assert_eq!(observation.rainfall, 0.0);
        assert_eq!(observation.wind_speed, 0.0);
    }

    #[tokio::test]
    async fn empty_weather_array_is_a_parse_failure() {
        let body = r#"{"weather":[],"main":{"temp":20,"humidity":40},"name":"Rome"}"#;
        let (adapter, _) = adapter(
            FixtureHttpClient::new().respond(format!("{BASE_URL}/weather"), HttpResponse::ok_json(body)),
        );

        let error = adapter.current(london()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Parse);
    }

    #[tokio::test]
    async fn non_success_status_carries_provider_id() {
        let (adapter, _) = adapter(FixtureHttpClient::new().respond(
            format!("{BASE_URL}/weather"),
            HttpResponse::with_status(401, r#"{"cod":401}"#),
        ));

        let error = adapter.current(london()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::UnexpectedStatus);
        assert_eq!(error.provider(), ProviderId::OpenWeatherMap);
    }

    #[tokio::test]
    async fn timeout_is_reported_as_timeout() {
        let (adapter, _) = adapter(FixtureHttpClient::new().fail(
            format!("{BASE_URL}/weather"),
            HttpError::timeout("request timeout after 5000ms"),
        ));

        let error = adapter.current(london()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Timeout);
    }

    #[tokio::test]
    async fn forecast_requests_eight_points_per_day_and_summarizes() {
        let body = r#"{
            "city": {"name": "London"},
            "list": [
                {"dt": 1717200000, "main": {"temp": 11.0, "humidity": 80}, "weather": [{"description": "light rain"}], "rain": {"3h": 0.6}},
                {"dt": 1717210800, "main": {"temp": 15.0, "humidity": 70}, "weather": [{"description": "light rain"}], "rain": {"3h": 0.2}},
                {"dt": 1717286400, "main": {"temp": 17.0, "humidity": 60}, "weather": [{"description": "clear sky"}]}
            ]
        }"#;
        let (adapter, client) = adapter(
            FixtureHttpClient::new().respond(format!("{BASE_URL}/forecast"), HttpResponse::ok_json(body)),
        );
        let req = ForecastRequest::new(london(), 2).expect("valid request");

        let forecast = adapter.forecast(req).await.expect("forecast");

        assert_eq!(forecast.location, "London");
        assert_eq!(forecast.current.as_ref().map(|p| p.temperature), Some(11.0));
        assert_eq!(forecast.daily.len(), 2);
        assert_eq!(forecast.daily[0].rainfall, 0.8);
        assert_eq!(forecast.daily[0].humidity, 75.0);

        let request = &client.recorded_requests()[0];
        assert!(request.url.contains("cnt=16"));
        assert_eq!(request.timeout_ms, 10_000);
    }

    #[tokio::test]
    async fn alerts_are_read_from_one_call() {
        let body = r#"{
            "lat": 51.5, "lon": -0.09,
            "alerts": [{
                "sender_name": "Met Office",
                "event": "Yellow wind warning",
                "start": 1717200000,
                "end": 1717243200,
                "description": "Strong winds expected",
                "tags": ["Wind"]
            }]
        }"#;
        let (adapter, client) = adapter(
            FixtureHttpClient::new().respond(ONE_CALL_URL, HttpResponse::ok_json(body)),
        );

        let alerts = adapter.alerts(london()).await.expect("alerts");

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sender, "Met Office");
        assert_eq!(alerts[0].tags, vec![String::from("Wind")]);
        assert_eq!(alerts[0].start.unix_timestamp(), 1_717_200_000);
        assert!(client.recorded_requests()[0]
            .url
            .contains("exclude=current%2Cminutely%2Chourly%2Cdaily"));
    }

    #[tokio::test]
    async fn no_alerts_yields_empty_list() {
        let (adapter, _) = adapter(
            FixtureHttpClient::new().respond(ONE_CALL_URL, HttpResponse::ok_json(r#"{"lat":1,"lon":1}"#)),
        );

        assert!(adapter.alerts(london()).await.expect("alerts").is_empty());
    }
}
