use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::config::VisionConfig;
use crate::error::AppError;

/// Grams per macronutrient as estimated by the vision model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrients {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub sugar: f64,
}

/// Classification of one uploaded photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageAnalysis {
    pub is_food: bool,
    pub food_items: Vec<String>,
    pub description: String,
    #[serde(alias = "calories")]
    pub estimated_calories: f64,
    pub nutrients: Nutrients,
    pub confidence: f64,
}

impl Default for ImageAnalysis {
    fn default() -> Self {
        Self {
            is_food: false,
            food_items: Vec::new(),
            description: "Image analyzed".to_string(),
            estimated_calories: 0.0,
            nutrients: Nutrients::default(),
            confidence: 0.5,
        }
    }
}

#[async_trait]
pub trait FoodImageAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8], content_type: &str) -> anyhow::Result<ImageAnalysis>;
}

/// Runs the analyzer under `timeout`. Any failure is logged and becomes `None`.
pub async fn analyze_best_effort(
    analyzer: &dyn FoodImageAnalyzer,
    image: &[u8],
    content_type: &str,
    timeout: Duration,
) -> Option<ImageAnalysis> {
    match analyze_within(analyzer, image, content_type, timeout).await {
        Ok(a) => Some(a),
        Err(e) => {
            warn!(error = %e, "image analysis skipped");
            None
        }
    }
}

/// Like [`analyze_best_effort`] but surfaces the failure as `ExternalService`.
pub async fn analyze_within(
    analyzer: &dyn FoodImageAnalyzer,
    image: &[u8],
    content_type: &str,
    timeout: Duration,
) -> Result<ImageAnalysis, AppError> {
    match tokio::time::timeout(timeout, analyzer.analyze(image, content_type)).await {
        Ok(Ok(a)) => Ok(a),
        Ok(Err(e)) => Err(AppError::ExternalService(e.to_string())),
        Err(_) => Err(AppError::ExternalService(format!(
            "image analysis timed out after {:?}",
            timeout
        ))),
    }
}

/// Used when no API key is configured.
pub struct DisabledAnalyzer;

#[async_trait]
impl FoodImageAnalyzer for DisabledAnalyzer {
    async fn analyze(&self, _image: &[u8], _content_type: &str) -> anyhow::Result<ImageAnalysis> {
        bail!("image analysis is disabled (GEMINI_API_KEY not set)")
    }
}

const PROMPT: &str = "Analyze this image carefully and determine if it contains food items. \
Return ONLY a valid JSON object (no markdown formatting) with these exact keys:\n\
- 'is_food': boolean (true if image contains any food items, false if not)\n\
- 'food_items': array of detected food item names as strings (empty array if no food)\n\
- 'description': single sentence describing what's in the image\n\
- 'calories': estimated total calories as a number (0 if no food)\n\
- 'nutrients': object with keys 'protein', 'carbs', 'fat', 'sugar' (all numbers in grams, all 0 if no food)\n\
- 'confidence': confidence score between 0 and 1\n\n\
Example for food image:\n\
{\"is_food\":true,\"food_items\":[\"apple\",\"banana\"],\"description\":\"Fresh fruits on a plate\",\"calories\":120,\"nutrients\":{\"protein\":1,\"carbs\":30,\"fat\":0,\"sugar\":25},\"confidence\":0.85}";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Gemini `generateContent` with the photo inlined as base64.
pub struct GeminiAnalyzer {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl GeminiAnalyzer {
    pub fn new(cfg: &VisionConfig, api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent("fittrack/vision")
            .build()
            .context("build vision http client")?;
        Ok(Self {
            client,
            api_key,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[async_trait]
impl FoodImageAnalyzer for GeminiAnalyzer {
    #[instrument(skip(self, image), fields(model = %self.model, bytes = image.len()))]
    async fn analyze(&self, image: &[u8], content_type: &str) -> anyhow::Result<ImageAnalysis> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: PROMPT },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: content_type,
                            data: STANDARD.encode(image),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 1024,
            },
        };

        let response = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .context("vision request failed")?;

        let status = response.status();
        let text = response.text().await.context("read vision response")?;
        if !status.is_success() {
            let message = serde_json::from_str::<GenerateResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .map_or(text, |e| e.message);
            error!(%status, "vision api error");
            bail!("vision api error ({}): {}", status.as_u16(), message);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).context("decode vision response")?;
        let reply = extract_text(parsed)?;
        debug!(reply = %reply, "vision reply");
        parse_analysis(&reply)
    }
}

fn extract_text(resp: GenerateResponse) -> anyhow::Result<String> {
    if let Some(err) = resp.error {
        bail!("vision api error: {}", err.message);
    }
    let candidate = resp
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| anyhow!("no candidates in vision response"))?;
    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        bail!("vision response blocked by safety filters");
    }
    candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| anyhow!("no text in vision response"))
}

/// Parses the model's reply, tolerating a ```json fence and missing keys.
pub fn parse_analysis(reply: &str) -> anyhow::Result<ImageAnalysis> {
    let mut body = reply.trim();
    body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .unwrap_or(body);
    body = body.strip_suffix("```").unwrap_or(body).trim();

    let mut analysis: ImageAnalysis =
        serde_json::from_str(body).with_context(|| format!("unparseable analysis: {}", body))?;
    analysis.confidence = analysis.confidence.clamp(0.0, 1.0);
    analysis.food_items.retain(|f| !f.trim().is_empty());
    Ok(analysis)
}

#[cfg(test)]
pub(crate) struct FakeAnalyzer(pub Option<ImageAnalysis>);

#[cfg(test)]
#[async_trait]
impl FoodImageAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _image: &[u8], _content_type: &str) -> anyhow::Result<ImageAnalysis> {
        self.0.clone().ok_or_else(|| anyhow!("fake analyzer failure"))
    }
}
