use thiserror::Error;

/// Input validation errors raised before any provider is contacted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid coordinates: {reason}")]
    InvalidCoordinates { reason: String },

    #[error("forecast days must be between {min} and {max}, got {value}")]
    ForecastDaysOutOfRange { value: i64, min: u8, max: u8 },
    #[error("forecast days must be an integer, got '{raw}'")]
    InvalidForecastDays { raw: String },

    #[error("sensor id cannot be empty")]
    EmptySensorId,
    #[error("sensor id length {len} exceeds max {max}")]
    SensorIdTooLong { len: usize, max: usize },
    #[error("sensor id contains invalid character '{ch}' at index {index}")]
    SensorIdInvalidChar { ch: char, index: usize },

    #[error("Missing required data: fieldData, weatherData, soilData")]
    MissingPredictionData,
    #[error("invalid {section}: {reason}")]
    MalformedPredictionData {
        section: &'static str,
        reason: String,
    },
    #[error("fieldData.fieldId cannot be empty")]
    EmptyFieldId,

    #[error("Image data is required")]
    MissingImage,
    #[error("image data must be base64 encoded")]
    InvalidImageEncoding,
    #[error("unsupported image type '{mime_type}'")]
    UnsupportedImageType { mime_type: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' must be within {min}..={max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("field '{field}' must be a YYYY-MM-DD date: '{value}'")]
    InvalidDate { field: &'static str, value: String },
}
