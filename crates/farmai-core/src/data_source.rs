//! Provider adapter contracts and the error type adapters report.
//!
//! Each external data family has its own trait (`WeatherSource`,
//! `SoilSource`, `CropAdvisor`), all sharing the [`DataSource`] identity and
//! capability surface the router uses to plan provider chains.
//!
//! | Use case | Trait method | Cache prefix | TTL |
//! |----------|--------------|--------------|-----|
//! | Current weather | [`WeatherSource::current`] | `weather:current` | 600 s |
//! | Forecast | [`WeatherSource::forecast`] | `weather:forecast` | 3600 s |
//! | Alerts | [`WeatherSource::alerts`] | `weather:alerts` | 900 s |
//! | Soil reading | [`SoilSource::reading`] | `soil:reading` | 300 s |
//! | Sensor list | [`SoilSource::sensors`] | `soil:sensors` | 3600 s |
//! | Yield prediction | [`CropAdvisor::predict_yield`] | `prediction:yield` | 86400 s |
//! | Disease detection | [`CropAdvisor::detect_disease`] | `prediction:disease` | not cached |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{
    Coordinates, DiseaseDetection, DiseaseRequest, ForecastRequest, SensorId, SensorLocation,
    SoilReading, WeatherAlert, WeatherForecast, WeatherObservation, YieldPrediction, YieldRequest,
};
use crate::http_client::HttpError;
use crate::ProviderId;

/// A single kind of upstream lookup, used for routing, cache namespacing and TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    CurrentWeather,
    WeatherForecast,
    WeatherAlerts,
    SoilReading,
    SensorLocations,
    YieldPrediction,
    DiseaseDetection,
}

impl UseCase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CurrentWeather => "current_weather",
            Self::WeatherForecast => "weather_forecast",
            Self::WeatherAlerts => "weather_alerts",
            Self::SoilReading => "soil_reading",
            Self::SensorLocations => "sensor_locations",
            Self::YieldPrediction => "yield_prediction",
            Self::DiseaseDetection => "disease_detection",
        }
    }

    pub const fn cache_prefix(self) -> &'static str {
        match self {
            Self::CurrentWeather => "weather:current",
            Self::WeatherForecast => "weather:forecast",
            Self::WeatherAlerts => "weather:alerts",
            Self::SoilReading => "soil:reading",
            Self::SensorLocations => "soil:sensors",
            Self::YieldPrediction => "prediction:yield",
            Self::DiseaseDetection => "prediction:disease",
        }
    }

    /// TTL for results of this use case; `None` means results are never cached.
    pub const fn cache_ttl(self) -> Option<Duration> {
        match self {
            Self::CurrentWeather => Some(Duration::from_secs(600)),
            Self::WeatherForecast => Some(Duration::from_secs(3_600)),
            Self::WeatherAlerts => Some(Duration::from_secs(900)),
            Self::SoilReading => Some(Duration::from_secs(300)),
            Self::SensorLocations => Some(Duration::from_secs(3_600)),
            Self::YieldPrediction => Some(Duration::from_secs(86_400)),
            Self::DiseaseDetection => None,
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl Display for UseCase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of use cases a source can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, use_case: UseCase) -> Self {
        Self(self.0 | use_case.bit())
    }

    pub const fn supports(self, use_case: UseCase) -> bool {
        self.0 & use_case.bit() != 0
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport failure or provider-reported failure.
    Unavailable,
    Timeout,
    UnexpectedStatus,
    /// The provider answered but its payload could not be normalized.
    Parse,
    Unsupported,
}

/// Structured provider error carrying the provider that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    provider: ProviderId,
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn new(provider: ProviderId, kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(provider, SourceErrorKind::Unavailable, message)
    }

    pub fn unexpected_status(provider: ProviderId, status: u16) -> Self {
        Self::new(
            provider,
            SourceErrorKind::UnexpectedStatus,
            format!("returned status {status}"),
        )
    }

    pub fn parse(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(provider, SourceErrorKind::Parse, message)
    }

    pub fn unsupported(provider: ProviderId, use_case: UseCase) -> Self {
        Self::new(
            provider,
            SourceErrorKind::Unsupported,
            format!("use case '{use_case}' is not supported by this source"),
        )
    }

    /// Translate a transport failure into a provider error.
    pub fn from_http(provider: ProviderId, error: &HttpError) -> Self {
        let kind = if error.timed_out() {
            SourceErrorKind::Timeout
        } else {
            SourceErrorKind::Unavailable
        };
        Self::new(provider, kind, error.message())
    }

    pub const fn provider(&self) -> ProviderId {
        self.provider
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::UnexpectedStatus => "source.unexpected_status",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Unsupported => "source.unsupported",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} error: {} ({})",
            self.provider.display_name(),
            self.message,
            self.code()
        )
    }
}

impl std::error::Error for SourceError {}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

fn unsupported<'a, T: Send + 'a>(provider: ProviderId, use_case: UseCase) -> SourceFuture<'a, T> {
    Box::pin(std::future::ready(Err(SourceError::unsupported(
        provider, use_case,
    ))))
}

/// Identity shared by every provider adapter.
///
/// Implementations must be `Send + Sync`; the router shares them across tasks.
pub trait DataSource: Send + Sync {
    /// Returns the unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Returns the set of supported use cases.
    fn capabilities(&self) -> CapabilitySet;
}

/// Weather provider contract.
pub trait WeatherSource: DataSource {
    /// Current conditions at `at`, normalized to metric units.
    fn current<'a>(&'a self, at: Coordinates) -> SourceFuture<'a, WeatherObservation>;

    fn forecast<'a>(&'a self, req: ForecastRequest) -> SourceFuture<'a, WeatherForecast> {
        let _ = req;
        unsupported(self.id(), UseCase::WeatherForecast)
    }

    fn alerts<'a>(&'a self, at: Coordinates) -> SourceFuture<'a, Vec<WeatherAlert>> {
        let _ = at;
        unsupported(self.id(), UseCase::WeatherAlerts)
    }
}

/// Soil sensor provider contract.
pub trait SoilSource: DataSource {
    fn reading<'a>(&'a self, sensor: SensorId) -> SourceFuture<'a, SoilReading>;

    fn sensors<'a>(&'a self) -> SourceFuture<'a, Vec<SensorLocation>> {
        unsupported(self.id(), UseCase::SensorLocations)
    }
}

/// Generative crop-model provider contract.
pub trait CropAdvisor: DataSource {
    fn predict_yield<'a>(&'a self, req: YieldRequest) -> SourceFuture<'a, YieldPrediction>;

    fn detect_disease<'a>(&'a self, req: DiseaseRequest) -> SourceFuture<'a, DiseaseDetection> {
        let _ = req;
        unsupported(self.id(), UseCase::DiseaseDetection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_tracks_each_use_case() {
        let caps = CapabilitySet::empty()
            .with(UseCase::CurrentWeather)
            .with(UseCase::WeatherAlerts);

        assert!(caps.supports(UseCase::CurrentWeather));
        assert!(caps.supports(UseCase::WeatherAlerts));
        assert!(!caps.supports(UseCase::WeatherForecast));
        assert!(!caps.supports(UseCase::DiseaseDetection));
    }

    #[test]
    fn cache_prefixes_are_unique() {
        let all = [
            UseCase::CurrentWeather,
            UseCase::WeatherForecast,
            UseCase::WeatherAlerts,
            UseCase::SoilReading,
            UseCase::SensorLocations,
            UseCase::YieldPrediction,
            UseCase::DiseaseDetection,
        ];
        let prefixes: std::collections::HashSet<_> =
            all.iter().map(|use_case| use_case.cache_prefix()).collect();
        assert_eq!(prefixes.len(), all.len());
    }

    #[test]
    fn timeouts_translate_to_timeout_kind() {
        let error = SourceError::from_http(
            ProviderId::OpenWeatherMap,
            &HttpError::timeout("request timeout after 5000ms"),
        );

        assert_eq!(error.kind(), SourceErrorKind::Timeout);
        assert_eq!(error.provider(), ProviderId::OpenWeatherMap);
        assert!(error.to_string().starts_with("OpenWeatherMap error"));
    }
}
