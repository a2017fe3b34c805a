use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::adapters::{
    GoogleAiAdapter, OpenWeatherMapAdapter, SensoterraAdapter, WeatherstackAdapter,
};
use crate::data_source::{
    CropAdvisor, DataSource, SoilSource, SourceError, SourceFuture, UseCase, WeatherSource,
};
use crate::domain::{
    Coordinates, DiseaseDetection, DiseaseRequest, ForecastRequest, SensorId, SensorLocation,
    SoilReading, WeatherAlert, WeatherForecast, WeatherObservation, YieldPrediction, YieldRequest,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::ProviderId;

/// Successful routed call.
#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    pub selected_source: ProviderId,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    /// Failures of providers tried before `selected_source`.
    pub errors: Vec<SourceError>,
    pub latency_ms: u64,
}

/// Why a routed call produced no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No registered provider serves the use case.
    NoProvider,
    /// The only provider failed and no fallback is configured.
    PrimaryOnly,
    /// Primary and every fallback failed.
    FallbackExhausted,
}

/// Failed routed call after exhausting candidates.
#[derive(Debug, Clone)]
pub struct RouteFailure {
    pub use_case: UseCase,
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<SourceError>,
    pub latency_ms: u64,
}

impl RouteFailure {
    pub fn kind(&self) -> FailureKind {
        match self.source_chain.len() {
            0 => FailureKind::NoProvider,
            1 => FailureKind::PrimaryOnly,
            _ => FailureKind::FallbackExhausted,
        }
    }

    /// Error of the last provider tried.
    pub fn last_error(&self) -> Option<&SourceError> {
        self.errors.last()
    }
}

impl Display for RouteFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            FailureKind::NoProvider => {
                write!(f, "no provider configured for '{}'", self.use_case)
            }
            FailureKind::PrimaryOnly => write!(
                f,
                "primary provider failed for '{}' and no fallback is configured",
                self.use_case
            ),
            FailureKind::FallbackExhausted => write!(
                f,
                "all {} providers failed for '{}'",
                self.source_chain.len(),
                self.use_case
            ),
        }
    }
}

impl std::error::Error for RouteFailure {}

pub type RouteResult<T> = Result<RouteSuccess<T>, RouteFailure>;

/// Ordered provider registry and fallback engine.
///
/// Sources are tried in registration order, so the first registered source
/// serving a use case is its primary.
#[derive(Clone, Default)]
pub struct SourceRouter {
    weather: Vec<Arc<dyn WeatherSource>>,
    soil: Vec<Arc<dyn SoilSource>>,
    advisors: Vec<Arc<dyn CropAdvisor>>,
}

impl SourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weather(mut self, source: Arc<dyn WeatherSource>) -> Self {
        self.weather.push(source);
        self
    }

    pub fn with_soil(mut self, source: Arc<dyn SoilSource>) -> Self {
        self.soil.push(source);
        self
    }

    pub fn with_advisor(mut self, source: Arc<dyn CropAdvisor>) -> Self {
        self.advisors.push(source);
        self
    }

    /// Providers in the order they would be tried for `use_case`.
    pub fn source_chain(&self, use_case: UseCase) -> Vec<ProviderId> {
        let weather = self.weather.iter().map(|s| (s.id(), s.capabilities()));
        let soil = self.soil.iter().map(|s| (s.id(), s.capabilities()));
        let advisors = self.advisors.iter().map(|s| (s.id(), s.capabilities()));

        weather
            .chain(soil)
            .chain(advisors)
            .filter(|(_, capabilities)| capabilities.supports(use_case))
            .map(|(id, _)| id)
            .collect()
    }

    pub async fn current_weather(&self, at: Coordinates) -> RouteResult<WeatherObservation> {
        route(UseCase::CurrentWeather, &self.weather, move |source| {
            source.current(at)
        })
        .await
    }

    pub async fn weather_forecast(&self, req: ForecastRequest) -> RouteResult<WeatherForecast> {
        route(UseCase::WeatherForecast, &self.weather, move |source| {
            source.forecast(req)
        })
        .await
    }

    pub async fn weather_alerts(&self, at: Coordinates) -> RouteResult<Vec<WeatherAlert>> {
        route(UseCase::WeatherAlerts, &self.weather, move |source| {
            source.alerts(at)
        })
        .await
    }

    pub async fn soil_reading(&self, sensor: SensorId) -> RouteResult<SoilReading> {
        route(UseCase::SoilReading, &self.soil, move |source| {
            source.reading(sensor.clone())
        })
        .await
    }

    pub async fn sensor_locations(&self) -> RouteResult<Vec<SensorLocation>> {
        route(UseCase::SensorLocations, &self.soil, |source| source.sensors()).await
    }

    pub async fn yield_prediction(&self, req: YieldRequest) -> RouteResult<YieldPrediction> {
        route(UseCase::YieldPrediction, &self.advisors, move |source| {
            source.predict_yield(req.clone())
        })
        .await
    }

    pub async fn disease_detection(&self, req: DiseaseRequest) -> RouteResult<DiseaseDetection> {
        route(UseCase::DiseaseDetection, &self.advisors, move |source| {
            source.detect_disease(req.clone())
        })
        .await
    }
}

async fn route<S, T, F>(use_case: UseCase, sources: &[Arc<S>], mut invoke: F) -> RouteResult<T>
where
    S: DataSource + ?Sized,
    F: for<'a> FnMut(&'a S) -> SourceFuture<'a, T>,
{
    let started = Instant::now();
    let mut source_chain = Vec::new();
    let mut errors = Vec::new();

    for source in sources
        .iter()
        .filter(|source| source.capabilities().supports(use_case))
    {
        let provider = source.id();
        source_chain.push(provider);

        match invoke(source.as_ref()).await {
            Ok(data) => {
                let mut warnings = Vec::new();
                if !errors.is_empty() {
                    info!(
                        provider = provider.as_str(),
                        use_case = use_case.as_str(),
                        failed_attempts = errors.len(),
                        "fallback provider succeeded"
                    );
                    warnings.push(format!(
                        "source fallback succeeded with '{}' after {} failed attempt(s)",
                        provider.as_str(),
                        errors.len()
                    ));
                }

                return Ok(RouteSuccess {
                    data,
                    selected_source: provider,
                    source_chain,
                    warnings,
                    errors,
                    latency_ms: elapsed_ms(started),
                });
            }
            Err(error) => {
                warn!(
                    provider = provider.as_str(),
                    use_case = use_case.as_str(),
                    code = error.code(),
                    error = %error,
                    "provider call failed"
                );
                errors.push(error);
            }
        }
    }

    Err(RouteFailure {
        use_case,
        source_chain,
        errors,
        latency_ms: elapsed_ms(started),
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Builds a [`SourceRouter`] from provider API keys.
///
/// Providers are registered in fixed priority order. A provider whose key is
/// missing or blank is skipped, leaving its use cases without that fallback.
///
/// | Provider | Role |
/// |----------|------|
/// | OpenWeatherMap | primary weather |
/// | Weatherstack | secondary weather (current conditions) |
/// | Google AI | yield prediction, disease detection |
/// | Sensoterra | soil readings, sensor list |
#[derive(Default)]
pub struct SourceRouterBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    openweather_api_key: Option<String>,
    weatherstack_api_key: Option<String>,
    google_ai_api_key: Option<String>,
    sensoterra_api_key: Option<String>,
}

impl SourceRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific transport instead of a fresh [`ReqwestHttpClient`].
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_openweather_key(mut self, key: Option<String>) -> Self {
        self.openweather_api_key = key;
        self
    }

    pub fn with_weatherstack_key(mut self, key: Option<String>) -> Self {
        self.weatherstack_api_key = key;
        self
    }

    pub fn with_google_ai_key(mut self, key: Option<String>) -> Self {
        self.google_ai_api_key = key;
        self
    }

    pub fn with_sensoterra_key(mut self, key: Option<String>) -> Self {
        self.sensoterra_api_key = key;
        self
    }

    pub fn build(self) -> SourceRouter {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let mut router = SourceRouter::new();

        if let Some(key) = usable_key(ProviderId::OpenWeatherMap, self.openweather_api_key) {
            router = router.with_weather(Arc::new(OpenWeatherMapAdapter::new(
                http_client.clone(),
                key,
            )));
        }
        if let Some(key) = usable_key(ProviderId::Weatherstack, self.weatherstack_api_key) {
            router = router.with_weather(Arc::new(WeatherstackAdapter::new(
                http_client.clone(),
                key,
            )));
        }
        if let Some(key) = usable_key(ProviderId::GoogleAi, self.google_ai_api_key) {
            router = router.with_advisor(Arc::new(GoogleAiAdapter::new(http_client.clone(), key)));
        }
        if let Some(key) = usable_key(ProviderId::Sensoterra, self.sensoterra_api_key) {
            router = router.with_soil(Arc::new(SensoterraAdapter::new(http_client, key)));
        }

        router
    }
}

fn usable_key(provider: ProviderId, key: Option<String>) -> Option<String> {
    let key = key
        .map(|key| key.trim().to_owned())
        .filter(|key| !key.is_empty());
    if key.is_none() {
        warn!(
            provider = provider.as_str(),
            "API key not configured; provider disabled"
        );
    }
    key
}
