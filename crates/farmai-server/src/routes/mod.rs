//! HTTP handlers, grouped by resource.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/api/weather/current/:lat/:lon` | [`weather::current`] |
//! | GET | `/api/weather/forecast/:lat/:lon/:days?` | [`weather::forecast`] |
//! | GET | `/api/weather/alerts/:lat/:lon` | [`weather::alerts`] |
//! | GET | `/api/soil/sensors` | [`soil::sensors`] |
//! | GET | `/api/soil/sensors/:sensorId` | [`soil::reading`] |
//! | POST | `/api/predictions/yield` | [`predictions::predict_yield`] |
//! | POST | `/api/predictions/disease-detection` | [`predictions::detect_disease`] |
//! | GET | `/health` | [`health::health`] |

pub mod health;
pub mod predictions;
pub mod soil;
pub mod weather;

use axum::extract::rejection::JsonRejection;
use axum::extract::OriginalUri;
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Routes mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/weather/current/:lat/:lon", get(weather::current))
        .route("/weather/forecast/:lat/:lon", get(weather::forecast))
        .route("/weather/forecast/:lat/:lon/:days", get(weather::forecast))
        .route("/weather/alerts/:lat/:lon", get(weather::alerts))
        .route("/soil/sensors", get(soil::sensors))
        .route("/soil/sensors/:sensor_id", get(soil::reading))
        .route("/predictions/yield", post(predictions::predict_yield))
        .route(
            "/predictions/disease-detection",
            post(predictions::detect_disease),
        )
        .method_not_allowed_fallback(not_found)
}

/// Unknown paths and known paths hit with the wrong method both answer 404.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), ToString::to_string);
    ApiError::NotFound {
        method: method.to_string(),
        path,
    }
}

/// A request without a JSON content type is read as an empty body, so it
/// fails field validation instead of content negotiation.
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(Value::Null),
        Err(rejection) => Err(rejection.into()),
    }
}
