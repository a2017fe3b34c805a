//! # Domain Models
//!
//! Normalized entities the gateway returns, plus the validated request types
//! the HTTP layer builds before any provider is contacted.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Coordinates`] | Validated latitude/longitude pair |
//! | [`WeatherObservation`] | Current conditions, metric units |
//! | [`WeatherForecast`] | Next point plus per-day summaries |
//! | [`WeatherAlert`] | Government weather alert |
//! | [`SoilReading`] | Latest soil sensor reading |
//! | [`SensorLocation`] | Registered soil sensor |
//! | [`YieldPrediction`] | Parsed generative-model yield forecast |
//! | [`DiseaseDetection`] | Parsed generative-model leaf diagnosis |
//!
//! Every snapshot serializes with camelCase field names, which is the shape
//! both the HTTP API and the cache use.

mod coordinates;
mod prediction;
mod soil;
mod weather;

pub use coordinates::Coordinates;
pub use prediction::{
    DiseaseDetection, DiseaseRequest, FieldData, SoilProfile, WeatherSummary, YieldPrediction,
    YieldRequest,
};
pub use soil::{SensorId, SensorLocation, SoilReading};
pub use weather::{
    summarize_daily, DailyForecast, ForecastPoint, ForecastRequest, WeatherAlert,
    WeatherForecast, WeatherObservation, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS,
};

use crate::ValidationError;

pub(crate) fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

pub(crate) fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

pub(crate) fn validate_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(())
}
