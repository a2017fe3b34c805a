use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use farmai_core::{DiseaseDetection, DiseaseRequest, UseCase, YieldPrediction, YieldRequest};
use serde_json::Value;

use super::json_body;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/predictions/yield
///
/// Body: `{fieldData, weatherData, soilData}`. Predictions are cached per
/// field for the current day.
pub async fn predict_yield(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<YieldPrediction>, ApiError> {
    let body = json_body(body)?;
    let section = |name: &str| body.get(name).cloned();
    let req = YieldRequest::from_parts(
        section("fieldData"),
        section("weatherData"),
        section("soilData"),
    )?;

    let resolved = state
        .aggregator
        .yield_prediction(req)
        .await
        .map_err(|error| ApiError::upstream(UseCase::YieldPrediction, &error))?;

    Ok(ApiResponse::with_cache_flag(resolved.data, resolved.cached))
}

/// POST /api/predictions/disease-detection
///
/// Body: `{imageBase64}`, optionally a `data:<mime>;base64,` URL.
pub async fn detect_disease(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<DiseaseDetection>, ApiError> {
    let body = json_body(body)?;
    let req = DiseaseRequest::from_base64(body.get("imageBase64").and_then(Value::as_str))?;

    let resolved = state
        .aggregator
        .disease_detection(req)
        .await
        .map_err(|error| ApiError::upstream(UseCase::DiseaseDetection, &error))?;

    Ok(ApiResponse::ok(resolved.data))
}
