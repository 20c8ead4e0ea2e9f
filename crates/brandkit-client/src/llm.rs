use std::time::Duration;

use brandkit_core::error::{AppError, UpstreamReason};
use brandkit_core::prompt::Prompt;
use brandkit_core::traits::TextBackend;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for the text backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    /// Reads `BRANDKIT_LLM_API_KEY` (required), `BRANDKIT_MODEL` and `BRANDKIT_BASE_URL`.
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("BRANDKIT_LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::ConfigError("BRANDKIT_LLM_API_KEY not set".into()))?;

        Ok(Self {
            api_key,
            model: std::env::var("BRANDKIT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("BRANDKIT_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// OpenAI-compatible chat completion backend.
///
/// Works with any OpenAI-compatible API, including:
/// - OpenAI directly (`https://api.openai.com/v1`)
/// - Gemini via compatibility layer (`https://generativelanguage.googleapis.com/v1beta/openai`)
/// - local servers such as Ollama (`http://localhost:11434/v1`)
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    temperature: f32,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AppError> {
        Self::build(api_key, model, base_url, DEFAULT_LLM_TIMEOUT)
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, AppError> {
        Self::with_base_url(&config.api_key, &config.model, &config.base_url)
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        let temperature = self.temperature;
        let backend = Self::build(&self.api_key, &self.model, &self.base_url, timeout)?;
        Ok(backend.with_temperature(temperature))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
            temperature: 0.7,
        })
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Maps a non-success status to a stable reason.
fn status_reason(status: u16) -> UpstreamReason {
    match status {
        429 => UpstreamReason::RateLimited,
        500..=599 => UpstreamReason::ServerError,
        _ => UpstreamReason::HttpStatus,
    }
}

impl TextBackend for OpenAiBackend {
    async fn complete(&self, prompt: &Prompt) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::upstream(
                        UpstreamReason::Timeout,
                        format!("LLM did not respond within {} seconds", self.timeout_secs),
                    )
                } else {
                    AppError::upstream(UpstreamReason::Network, format!("LLM request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));

            let reason = status_reason(status_code);
            tracing::warn!(
                model = %self.model,
                status = status_code,
                %reason,
                "LLM request rejected"
            );
            return Err(AppError::upstream(
                reason,
                format!("LLM returned HTTP {status_code}: {message}"),
            ));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            AppError::upstream(
                UpstreamReason::MalformedResponse,
                format!("Failed to parse LLM response: {e}"),
            )
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                AppError::upstream(
                    UpstreamReason::MalformedResponse,
                    "Empty response from LLM",
                )
            })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
