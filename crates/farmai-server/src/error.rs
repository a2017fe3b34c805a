use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use farmai_core::{FailureKind, FetchError, SourceErrorKind, UseCase, ValidationError};
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::envelope::ApiResponse;

/// Errors surfaced to HTTP clients. Messages never carry provider text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: &'static str,
    },

    #[error("Cannot {method} {path}")]
    NotFound { method: String, path: String },

    #[error("Too many requests from this IP, please try again later.")]
    RateLimited,
}

impl ApiError {
    /// Translate a failed lookup into a generic client error, logging the detail.
    pub fn upstream(use_case: UseCase, failure: &FetchError) -> Self {
        error!(use_case = use_case.as_str(), error = %failure, "upstream lookup failed");
        if let FetchError::Route(route) = failure {
            for source_error in &route.errors {
                error!(
                    use_case = use_case.as_str(),
                    provider = source_error.provider().as_str(),
                    code = source_error.code(),
                    detail = source_error.message(),
                    "provider failure"
                );
            }
        }

        let status = match failure {
            FetchError::Route(route) => match route.kind() {
                FailureKind::NoProvider | FailureKind::FallbackExhausted => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                FailureKind::PrimaryOnly => StatusCode::INTERNAL_SERVER_ERROR,
            },
            FetchError::Encode(_) | FetchError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self::Upstream {
            status,
            message: client_message(use_case, failure),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } | Self::Upstream { status, .. } => *status,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

fn client_message(use_case: UseCase, failure: &FetchError) -> &'static str {
    let unparseable = matches!(
        failure,
        FetchError::Route(route)
            if route.last_error().map(|e| e.kind()) == Some(SourceErrorKind::Parse)
    );

    match use_case {
        UseCase::CurrentWeather | UseCase::WeatherForecast | UseCase::WeatherAlerts => {
            "Weather service temporarily unavailable"
        }
        UseCase::SoilReading | UseCase::SensorLocations => "Soil data temporarily unavailable",
        UseCase::YieldPrediction if unparseable => "Failed to process prediction results",
        UseCase::YieldPrediction => "Yield prediction service temporarily unavailable",
        UseCase::DiseaseDetection if unparseable => "Failed to process detection results",
        UseCase::DiseaseDetection => "Disease detection service temporarily unavailable",
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiResponse::failure(self.to_string()))).into_response()
    }
}

/// Startup failures of the `farmai` binary.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
