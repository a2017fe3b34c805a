use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use super::{validate_non_negative, validate_range};
use crate::ValidationError;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";
const SUPPORTED_IMAGE_MIMES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Field description submitted with a yield prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    #[serde(deserialize_with = "string_or_number")]
    pub field_id: String,
    pub crop_type: String,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub planting_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Weather context submitted with a yield prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSummary {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub rainfall: Option<f64>,
    #[serde(default)]
    pub forecast: Option<Value>,
}

/// Soil laboratory values submitted with a yield prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilProfile {
    #[serde(default, rename = "pH")]
    pub ph: Option<f64>,
    #[serde(default)]
    pub nitrogen: Option<f64>,
    #[serde(default)]
    pub phosphorus: Option<f64>,
    #[serde(default)]
    pub potassium: Option<f64>,
    #[serde(default)]
    pub organic_matter: Option<f64>,
    #[serde(default)]
    pub moisture: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YieldRequest {
    pub field: FieldData,
    pub weather: WeatherSummary,
    pub soil: SoilProfile,
}

impl YieldRequest {
    /// Build a request from the three raw body sections.
    ///
    /// A section that is absent, `null`, `false`, `0` or `""` counts as missing.
    pub fn from_parts(
        field: Option<Value>,
        weather: Option<Value>,
        soil: Option<Value>,
    ) -> Result<Self, ValidationError> {
        let (Some(field), Some(weather), Some(soil)) = (
            field.filter(is_present),
            weather.filter(is_present),
            soil.filter(is_present),
        ) else {
            return Err(ValidationError::MissingPredictionData);
        };

        let field: FieldData = section("fieldData", field)?;
        if field.field_id.trim().is_empty() {
            return Err(ValidationError::EmptyFieldId);
        }

        Ok(Self {
            field,
            weather: section("weatherData", weather)?,
            soil: section("soilData", soil)?,
        })
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn section<T: DeserializeOwned>(name: &'static str, value: Value) -> Result<T, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::MalformedPredictionData {
        section: name,
        reason: e.to_string(),
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Yield forecast returned by the generative model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldPrediction {
    /// Tons.
    pub predicted_yield: f64,
    /// 0-100.
    pub confidence: f64,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub optimal_harvest_date: String,
}

impl YieldPrediction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_negative("predictedYield", self.predicted_yield)?;
        validate_range("confidence", self.confidence, 0.0, 100.0)?;
        validate_iso_date("optimalHarvestDate", &self.optimal_harvest_date)
    }
}

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn validate_iso_date(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidDate {
        field,
        value: value.to_owned(),
    };
    time::Date::parse(value, ISO_DATE).map_err(|_| invalid())?;
    Ok(())
}

/// Validated leaf image for disease detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseRequest {
    /// Standard base64 without any data-URL prefix.
    pub image_base64: String,
    pub mime_type: String,
}

impl DiseaseRequest {
    /// Accepts bare base64 or a `data:<mime>;base64,` URL.
    pub fn from_base64(input: Option<&str>) -> Result<Self, ValidationError> {
        let raw = input
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or(ValidationError::MissingImage)?;

        let (mime_type, payload) = match raw.strip_prefix("data:") {
            Some(rest) => {
                let (mime, data) = rest
                    .split_once(";base64,")
                    .ok_or(ValidationError::InvalidImageEncoding)?;
                (mime.to_ascii_lowercase(), data)
            }
            None => (DEFAULT_IMAGE_MIME.to_owned(), raw),
        };

        if !SUPPORTED_IMAGE_MIMES.contains(&mime_type.as_str()) {
            return Err(ValidationError::UnsupportedImageType { mime_type });
        }

        let payload: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
        let decoded = STANDARD
            .decode(payload.as_bytes())
            .map_err(|_| ValidationError::InvalidImageEncoding)?;
        if decoded.is_empty() {
            return Err(ValidationError::MissingImage);
        }

        Ok(Self {
            image_base64: payload,
            mime_type,
        })
    }
}

/// Plant disease diagnosis returned by the generative model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseDetection {
    pub disease: String,
    /// 0-100.
    pub confidence: f64,
    pub severity: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub treatments: Vec<String>,
    #[serde(default)]
    pub preventive_measures: Vec<String>,
}

impl DiseaseDetection {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_range("confidence", self.confidence, 0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field() -> Value {
        json!({"fieldId": "north-40", "cropType": "maize", "area": 40.0})
    }

    #[test]
    fn missing_section_is_reported_with_all_names() {
        let err = YieldRequest::from_parts(Some(field()), Some(json!({})), None)
            .expect_err("soil is missing");
        assert_eq!(
            err.to_string(),
            "Missing required data: fieldData, weatherData, soilData"
        );
    }

    #[test]
    fn null_and_falsy_sections_count_as_missing() {
        let err = YieldRequest::from_parts(Some(field()), Some(Value::Null), Some(json!("")))
            .expect_err("null weather is missing");
        assert_eq!(err, ValidationError::MissingPredictionData);
    }

    #[test]
    fn numeric_field_id_is_accepted() {
        let request = YieldRequest::from_parts(
            Some(json!({"fieldId": 42, "cropType": "wheat"})),
            Some(json!({"temperature": 21.5})),
            Some(json!({"pH": 6.5, "organicMatter": 3.1})),
        )
        .expect("valid request");

        assert_eq!(request.field.field_id, "42");
        assert_eq!(request.soil.ph, Some(6.5));
        assert_eq!(request.soil.organic_matter, Some(3.1));
    }

    #[test]
    fn malformed_section_names_the_section() {
        let err = YieldRequest::from_parts(
            Some(json!({"cropType": "wheat"})),
            Some(json!({})),
            Some(json!({})),
        )
        .expect_err("fieldId is required");
        assert!(matches!(
            err,
            ValidationError::MalformedPredictionData {
                section: "fieldData",
                ..
            }
        ));
    }

    #[test]
    fn prediction_validation_rejects_out_of_range_confidence() {
        let prediction = YieldPrediction {
            predicted_yield: 120.0,
            confidence: 140.0,
            risk_factors: vec![],
            recommendations: vec![],
            optimal_harvest_date: "2024-09-15".into(),
        };
        assert!(matches!(
            prediction.validate(),
            Err(ValidationError::OutOfRange {
                field: "confidence",
                ..
            })
        ));
    }

    #[test]
    fn prediction_validation_rejects_bad_date() {
        let prediction = YieldPrediction {
            predicted_yield: 120.0,
            confidence: 80.0,
            risk_factors: vec![],
            recommendations: vec![],
            optimal_harvest_date: "mid September".into(),
        };
        assert!(matches!(
            prediction.validate(),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn harvest_date_must_be_a_real_calendar_day() {
        let mut prediction = YieldPrediction {
            predicted_yield: 120.0,
            confidence: 80.0,
            risk_factors: vec![],
            recommendations: vec![],
            optimal_harvest_date: "2024-09-15".into(),
        };
        assert_eq!(prediction.validate(), Ok(()));

        prediction.optimal_harvest_date = "2024-02-30".into();
        assert!(matches!(
            prediction.validate(),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn disease_request_accepts_data_url() {
        let request = DiseaseRequest::from_base64(Some("data:image/png;base64,aGVsbG8="))
            .expect("valid data url");
        assert_eq!(request.mime_type, "image/png");
        assert_eq!(request.image_base64, "aGVsbG8=");
    }

    #[test]
    fn disease_request_rejects_missing_and_invalid_images() {
        assert_eq!(
            DiseaseRequest::from_base64(None),
            Err(ValidationError::MissingImage)
        );
        assert_eq!(
            DiseaseRequest::from_base64(Some("not base64!")),
            Err(ValidationError::InvalidImageEncoding)
        );
        assert!(matches!(
            DiseaseRequest::from_base64(Some("data:application/pdf;base64,aGVsbG8=")),
            Err(ValidationError::UnsupportedImageType { .. })
        ));
    }
}
