use std::collections::BTreeMap;
use std::time::Duration;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::{AppError, UpstreamReason};
use crate::models::{BusinessProfile, Language, OutputType};
use crate::prompt::build_prompt;
use crate::traits::TextBackend;

const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Turns a business profile into marketing copy through a [`TextBackend`].
///
/// Every backend call is bounded by a timeout and guarded by a circuit
/// breaker; failures come back classified, never as partial text.
#[derive(Clone)]
pub struct ContentGenerator<B: TextBackend> {
    backend: B,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl<B: TextBackend> ContentGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            breaker: CircuitBreaker::new("generation", CircuitBreakerConfig::default()),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Validates and generates one artifact from string-typed inputs.
    pub async fn generate(
        &self,
        profile: &BusinessProfile,
        output_type: &str,
        details: &BTreeMap<String, String>,
        language: &str,
    ) -> Result<String, AppError> {
        let output_type: OutputType = output_type.parse()?;
        let language: Language = language.parse()?;
        self.generate_for(profile, output_type, details, language)
            .await
    }

    /// Generates one artifact. `details` override profile facts, see
    /// [`ProfileFacts::overlay`](crate::models::ProfileFacts::overlay).
    pub async fn generate_for(
        &self,
        profile: &BusinessProfile,
        output_type: OutputType,
        details: &BTreeMap<String, String>,
        language: Language,
    ) -> Result<String, AppError> {
        let facts = profile.facts.overlay(details);
        let prompt = build_prompt(output_type, language, &facts, profile.summary.as_deref());

        tracing::debug!(
            %output_type,
            %language,
            model = self.backend.model(),
            "Requesting generation"
        );

        let raw = self
            .breaker
            .call(|| async {
                match tokio::time::timeout(self.timeout, self.backend.complete(&prompt)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::upstream(
                        UpstreamReason::Timeout,
                        format!(
                            "Generation backend did not answer within {} seconds",
                            self.timeout.as_secs()
                        ),
                    )),
                }
            })
            .await
            .map_err(AppError::from)?;

        normalize(&raw)
    }
}

/// Strips surrounding whitespace and a wrapping code fence. Empty text and
/// control characters other than line breaks and tabs are malformed.
fn normalize(raw: &str) -> Result<String, AppError> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // drop an optional language tag on the fence line
        let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
        text = rest.trim_end().strip_suffix("```").unwrap_or(rest).trim();
    }

    if text.is_empty() {
        return Err(AppError::upstream(
            UpstreamReason::MalformedResponse,
            "Generation backend returned empty content",
        ));
    }
    if let Some(c) = text
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(AppError::upstream(
            UpstreamReason::MalformedResponse,
            format!(
                "Generation backend returned control character U+{:04X}",
                c as u32
            ),
        ));
    }
    Ok(text.to_string())
}

/// Parses the requested output types and language, deduplicating types.
pub fn parse_request(
    output_types: &[String],
    language: &str,
) -> Result<(Vec<OutputType>, Language), AppError> {
    if output_types.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one output type must be requested".to_string(),
        ));
    }
    let mut types = output_types
        .iter()
        .map(|t| t.parse::<OutputType>())
        .collect::<Result<Vec<_>, _>>()?;
    types.sort();
    types.dedup();

    Ok((types, language.parse()?))
}
