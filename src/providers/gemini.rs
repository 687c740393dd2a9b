//! Google Gemini generator over the public `generativelanguage` REST API,
//! authenticated with an API key sent as a `?key=` query parameter.

use crate::providers::traits::{GenerateOutcome, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public API endpoint for API key users.
const PUBLIC_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiGenerator {
    api_key: String,
    model: String,
    temperature: f64,
    base_url: String,
    client: reqwest::Client,
}

// ══════════════════════════════════════════════════════════════════════════════
// API REQUEST/RESPONSE TYPES
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
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
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: String,
        model: String,
        temperature: f64,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            api_key,
            model,
            temperature,
            base_url: PUBLIC_API_ENDPOINT.to_string(),
            client,
        })
    }

    /// Point the generator at a different endpoint (integration tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn format_model_name(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }

    fn generate_content_url(&self) -> String {
        let model_name = Self::format_model_name(&self.model);
        format!(
            "{}/{model_name}:generateContent?key={}",
            self.base_url, self.api_key
        )
    }

    /// Map a decoded API response onto an outcome. A block reason or a SAFETY
    /// finish reason means the service declined; blank text means nothing to
    /// say; both are normal results rather than errors.
    fn interpret(response: GenerateContentResponse) -> anyhow::Result<GenerateOutcome> {
        if let Some(err) = response.error {
            anyhow::bail!("Gemini API error: {}", err.message);
        }

        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Ok(GenerateOutcome::SafetyBlocked(reason));
        }

        let Some(candidate) = response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
        else {
            return Ok(GenerateOutcome::Empty);
        };

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Ok(GenerateOutcome::SafetyBlocked("SAFETY".to_string()));
        }

        let text = candidate
            .content
            .and_then(|content| content.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            Ok(GenerateOutcome::Empty)
        } else {
            Ok(GenerateOutcome::Text(text))
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<GenerateOutcome> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: 8192,
            },
        };

        let response = self
            .client
            .post(self.generate_content_url())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({status}): {error_text}");
        }

        let decoded: GenerateContentResponse = response.json().await?;
        Self::interpret(decoded)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        self.client
            .get(&url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
