use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::InsightError;

/// LLM client abstraction (allows mocking). Constructed once at startup and
/// injected into the pipeline; the pipeline never reaches for a global.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt and return the raw text completion.
    async fn generate(&self, prompt: &str) -> Result<String, InsightError>;

    /// Minimal liveness probe: ask the model to say OK and report whether
    /// any non-empty completion came back.
    async fn health_check(&self) -> bool {
        match self.generate("Say OK").await {
            Ok(text) => !text.trim().is_empty(),
            Err(e) => {
                tracing::debug!(error = %e, "LLM health probe failed");
                false
            }
        }
    }
}

/// HTTP client for the Gemini generateContent API.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, InsightError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InsightError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// Client for the public Gemini endpoint with a 2-minute timeout.
    pub fn from_config(config: &crate::config::Config) -> Result<Self, InsightError> {
        Self::new(
            &config.gemini_base_url,
            &config.gemini_api_key,
            &config.gemini_model,
            120,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for POST /v1beta/models/{model}:generateContent
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Response body from generateContent
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    InsightError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    InsightError::HttpClient("request timed out".to_string())
                } else {
                    InsightError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| InsightError::ResponseParsing(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(InsightError::EmptyCompletion);
        }
        Ok(text)
    }
}

/// Mock LLM client for testing. Returns a configurable response.
pub struct MockLlmClient {
    response: Result<String, String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
        }
    }

    /// A mock whose every call fails with the given message.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, _prompt: &str) -> Result<String, InsightError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(InsightError::HttpClient(msg.clone())),
        }
    }
}
