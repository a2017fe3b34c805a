use axum::extract::{Path, State};
use farmai_core::{
    Coordinates, ForecastRequest, UseCase, WeatherAlert, WeatherForecast, WeatherObservation,
};
use serde::Deserialize;

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastPath {
    lat: String,
    lon: String,
    #[serde(default)]
    days: Option<String>,
}

/// GET /api/weather/current/:lat/:lon
pub async fn current(
    State(state): State<AppState>,
    Path((lat, lon)): Path<(String, String)>,
) -> Result<ApiResponse<WeatherObservation>, ApiError> {
    let at = Coordinates::parse(&lat, &lon)?;
    let resolved = state
        .aggregator
        .current_weather(at)
        .await
        .map_err(|error| ApiError::upstream(UseCase::CurrentWeather, &error))?;

    Ok(ApiResponse::with_cache_flag(resolved.data, resolved.cached))
}

/// GET /api/weather/forecast/:lat/:lon/:days?
pub async fn forecast(
    State(state): State<AppState>,
    Path(path): Path<ForecastPath>,
) -> Result<ApiResponse<WeatherForecast>, ApiError> {
    let at = Coordinates::parse(&path.lat, &path.lon)?;
    let req = ForecastRequest::parse(at, path.days.as_deref())?;
    let resolved = state
        .aggregator
        .weather_forecast(req)
        .await
        .map_err(|error| ApiError::upstream(UseCase::WeatherForecast, &error))?;

    Ok(ApiResponse::with_cache_flag(resolved.data, resolved.cached))
}

/// GET /api/weather/alerts/:lat/:lon
pub async fn alerts(
    State(state): State<AppState>,
    Path((lat, lon)): Path<(String, String)>,
) -> Result<ApiResponse<Vec<WeatherAlert>>, ApiError> {
    let at = Coordinates::parse(&lat, &lon)?;
    let resolved = state
        .aggregator
        .weather_alerts(at)
        .await
        .map_err(|error| ApiError::upstream(UseCase::WeatherAlerts, &error))?;

    Ok(ApiResponse::with_cache_flag(resolved.data, resolved.cached))
}
