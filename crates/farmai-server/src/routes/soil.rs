use axum::extract::{Path, State};
use farmai_core::{SensorId, SensorLocation, SoilReading, UseCase};

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/soil/sensors
pub async fn sensors(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<SensorLocation>>, ApiError> {
    let resolved = state
        .aggregator
        .sensor_locations()
        .await
        .map_err(|error| ApiError::upstream(UseCase::SensorLocations, &error))?;

    Ok(ApiResponse::with_cache_flag(resolved.data, resolved.cached))
}

/// GET /api/soil/sensors/:sensorId
pub async fn reading(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
) -> Result<ApiResponse<SoilReading>, ApiError> {
    let sensor = SensorId::parse(&sensor_id)?;
    let resolved = state
        .aggregator
        .soil_reading(sensor)
        .await
        .map_err(|error| ApiError::upstream(UseCase::SoilReading, &error))?;

    Ok(ApiResponse::with_cache_flag(resolved.data, resolved.cached))
}
