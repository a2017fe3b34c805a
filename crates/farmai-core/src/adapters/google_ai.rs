use std::fmt::Display;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::fetch_json;
use crate::data_source::{
    CapabilitySet, CropAdvisor, DataSource, SourceError, SourceFuture, UseCase,
};
use crate::domain::{DiseaseDetection, DiseaseRequest, YieldPrediction, YieldRequest};
use crate::extract::parse_embedded;
use crate::http_client::{HttpClient, HttpRequest};
use crate::ProviderId;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TEXT_MODEL: &str = "gemini-pro";
const VISION_MODEL: &str = "gemini-1.5-flash";
const TIMEOUT_MS: u64 = 30_000;
const TEMPERATURE: f64 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 1_024;

/// Generative crop advisor backed by the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GoogleAiAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
}

impl GoogleAiAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
        }
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        model: &str,
        parts: Value,
    ) -> Result<T, SourceError> {
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS
            }
        });
        let request = HttpRequest::post(format!("{BASE_URL}/models/{model}:generateContent"))
            .with_query("key", &self.api_key)
            .with_json_body(&body)
            .with_timeout_ms(TIMEOUT_MS);

        let raw: GenerateContentResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::GoogleAi, request).await?;
        let text = raw.first_text().ok_or_else(|| {
            SourceError::parse(ProviderId::GoogleAi, "response has no candidate text")
        })?;

        parse_embedded(text).map_err(|error| SourceError::parse(ProviderId::GoogleAi, error.to_string()))
    }

    async fn fetch_yield(&self, req: YieldRequest) -> Result<YieldPrediction, SourceError> {
        let parts = json!([{ "text": yield_prompt(&req) }]);
        let prediction: YieldPrediction = self.generate(TEXT_MODEL, parts).await?;
        prediction
            .validate()
            .map_err(|error| SourceError::parse(ProviderId::GoogleAi, error.to_string()))?;
        Ok(prediction)
    }

    async fn fetch_disease(&self, req: DiseaseRequest) -> Result<DiseaseDetection, SourceError> {
        let parts = json!([
            { "text": DISEASE_PROMPT },
            { "inline_data": { "mime_type": req.mime_type, "data": req.image_base64 } }
        ]);
        let detection: DiseaseDetection = self.generate(VISION_MODEL, parts).await?;
        detection
            .validate()
            .map_err(|error| SourceError::parse(ProviderId::GoogleAi, error.to_string()))?;
        Ok(detection)
    }
}

impl DataSource for GoogleAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::GoogleAi
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
            .with(UseCase::YieldPrediction)
            .with(UseCase::DiseaseDetection)
    }
}

impl CropAdvisor for GoogleAiAdapter {
    fn predict_yield<'a>(&'a self, req: YieldRequest) -> SourceFuture<'a, YieldPrediction> {
        Box::pin(async move { self.fetch_yield(req).await })
    }

    fn detect_disease<'a>(&'a self, req: DiseaseRequest) -> SourceFuture<'a, DiseaseDetection> {
        Box::pin(async move { self.fetch_disease(req).await })
    }
}

fn or_unknown<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| String::from("unknown"), |value| value.to_string())
}

/// Render the yield prompt sent to the text model.
pub(crate) fn yield_prompt(req: &YieldRequest) -> String {
    let field = &req.field;
    let soil = &req.soil;
    let weather = &req.weather;
    let forecast = weather
        .forecast
        .as_ref()
        .map_or_else(|| String::from("none"), Value::to_string);

    format!(
        "As an agricultural AI expert, predict crop yield based on the following data:

FIELD DATA:
- Crop type: {crop}
- Area: {area} acres
- Planting date: {planting}
- Location: {location}

SOIL CONDITIONS:
- pH: {ph}
- Nitrogen: {nitrogen}%
- Phosphorus: {phosphorus}%
- Potassium: {potassium}%
- Organic matter: {organic}%
- Moisture: {moisture}%

WEATHER DATA:
- Temperature: {temperature}°C
- Humidity: {humidity}%
- Rainfall: {rainfall}mm
- Forecast: {forecast}

Provide a JSON response with:
{{
  \"predictedYield\": number (in tons),
  \"confidence\": number (0-100),
  \"riskFactors\": string[],
  \"recommendations\": string[],
  \"optimalHarvestDate\": \"YYYY-MM-DD\"
}}",
        crop = field.crop_type,
        area = or_unknown(field.area),
        planting = or_unknown(field.planting_date.as_deref()),
        location = or_unknown(field.location.as_deref()),
        ph = or_unknown(soil.ph),
        nitrogen = or_unknown(soil.nitrogen),
        phosphorus = or_unknown(soil.phosphorus),
        potassium = or_unknown(soil.potassium),
        organic = or_unknown(soil.organic_matter),
        moisture = or_unknown(soil.moisture),
        temperature = or_unknown(weather.temperature),
        humidity = or_unknown(weather.humidity),
        rainfall = or_unknown(weather.rainfall),
    )
}

const DISEASE_PROMPT: &str = "As a plant pathologist, examine this crop leaf image and identify any disease.

Provide a JSON response with:
{
  \"disease\": string (\"healthy\" if no disease is visible),
  \"confidence\": number (0-100),
  \"severity\": \"none\" | \"low\" | \"medium\" | \"high\",
  \"symptoms\": string[],
  \"treatments\": string[],
  \"preventiveMeasures\": string[]
}";

#[derive(Debug, Deserialize)]
struct GeneratedPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedContent {
    #[serde(default)]
    parts: Vec<GeneratedPart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: GeneratedContent,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{FixtureHttpClient, HttpMethod, HttpResponse};

    fn gemini_reply(text: &str) -> HttpResponse {
        HttpResponse::ok_json(
            json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }).to_string(),
        )
    }

    fn yield_request() -> YieldRequest {
        YieldRequest::from_parts(
            Some(json!({"fieldId": "f-1", "cropType": "maize", "area": 12.5})),
            Some(json!({"temperature": 24.0, "humidity": 60.0, "rainfall": 3.0})),
            Some(json!({"pH": 6.4, "nitrogen": 0.2})),
        )
        .expect("valid request")
    }

    fn adapter(client: FixtureHttpClient) -> (GoogleAiAdapter, Arc<FixtureHttpClient>) {
        let client = Arc::new(client);
        (GoogleAiAdapter::new(client.clone(), "g-key"), client)
    }

    #[tokio::test]
    async fn yield_prediction_is_parsed_from_fenced_block() {
        let text = "Based on the data:\n```json\n{\"predictedYield\": 48.5, \"confidence\": 82, \"riskFactors\": [\"late frost\"], \"recommendations\": [\"irrigate weekly\"], \"optimalHarvestDate\": \"2024-09-20\"}\n```";
        let (adapter, client) = adapter(FixtureHttpClient::new().respond(
            format!("{BASE_URL}/models/gemini-pro:generateContent"),
            gemini_reply(text),
        ));

        let prediction = adapter
            .predict_yield(yield_request())
            .await
            .expect("prediction");

        assert_eq!(prediction.predicted_yield, 48.5);
        assert_eq!(prediction.confidence, 82.0);
        assert_eq!(prediction.optimal_harvest_date, "2024-09-20");

        let request = &client.recorded_requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("?key=g-key"));
        assert_eq!(request.timeout_ms, 30_000);
        let body: Value =
            serde_json::from_str(request.body.as_deref().expect("json body")).expect("valid json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        let prompt = body["contents"][0]["parts"][0]["text"]
            .as_str()
            .expect("prompt text");
        assert!(prompt.contains("Crop type: maize"));
        assert!(prompt.contains("pH: 6.4"));
        assert!(prompt.contains("Potassium: unknown%"));
    }

    #[tokio::test]
    async fn prose_without_json_is_a_parse_failure() {
        let (adapter, _) = adapter(FixtureHttpClient::new().respond(
            format!("{BASE_URL}/models/gemini-pro:generateContent"),
            gemini_reply("I cannot predict yields for this field."),
        ));

        let error = adapter
            .predict_yield(yield_request())
            .await
            .expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::Parse);
    }

    #[tokio::test]
    async fn out_of_range_prediction_is_a_parse_failure() {
        let text = "{\"predictedYield\": -3, \"confidence\": 50, \"optimalHarvestDate\": \"2024-09-20\"}";
        let (adapter, _) = adapter(FixtureHttpClient::new().respond(
            format!("{BASE_URL}/models/gemini-pro:generateContent"),
            gemini_reply(text),
        ));

        let error = adapter
            .predict_yield(yield_request())
            .await
            .expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::Parse);
    }

    #[tokio::test]
    async fn disease_detection_sends_inline_image() {
        let text = "{\"disease\": \"leaf rust\", \"confidence\": 91, \"severity\": \"medium\", \"symptoms\": [\"orange pustules\"], \"treatments\": [\"fungicide\"], \"preventiveMeasures\": [\"crop rotation\"]}";
        let (adapter, client) = adapter(FixtureHttpClient::new().respond(
            format!("{BASE_URL}/models/gemini-1.5-flash:generateContent"),
            gemini_reply(text),
        ));
        let image = DiseaseRequest::from_base64(Some("data:image/png;base64,aGVsbG8="))
            .expect("valid image");

        let detection = adapter.detect_disease(image).await.expect("detection");

        assert_eq!(detection.disease, "leaf rust");
        assert_eq!(detection.preventive_measures, vec![String::from("crop rotation")]);

        let body: Value = serde_json::from_str(
            client.recorded_requests()[0]
                .body
                .as_deref()
                .expect("json body"),
        )
        .expect("valid json");
        let inline = &body["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(inline["mime_type"], "image/png");
        assert_eq!(inline["data"], "aGVsbG8=");
    }
}
