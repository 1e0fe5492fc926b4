//! Gemini vision client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use tracing::{debug, warn};
use vthumb_models::{VisionVerdict, VISION_SCORE_MAX, VISION_SCORE_MIN};

use crate::breaker::CircuitBreaker;
use crate::error::{OracleError, OracleResult};
use crate::types::{Content, GenerateRequest, GenerateResponse, GenerationConfig, InlineData, Part};
use crate::VisionOracle;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the vision oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash`
    pub model: String,
    /// API root without trailing slash
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// How long the breaker stays open
    pub recovery_timeout: Duration,
}

impl OracleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(20),
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
        }
    }

    /// Create config from environment variables.
    ///
    /// Returns `None` when `GEMINI_API_KEY` is unset or empty; the oracle is
    /// then disabled and scoring is pixel-only.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("GEMINI_VISION_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = std::env::var("ORACLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Some(config)
    }
}

/// Vision oracle backed by Gemini `generateContent`.
pub struct GeminiVisionOracle {
    http: Client,
    config: OracleConfig,
    breaker: CircuitBreaker,
}

impl GeminiVisionOracle {
    pub fn new(config: OracleConfig) -> OracleResult<Self> {
        if config.api_key.is_empty() {
            return Err(OracleError::NotConfigured("empty API key".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(OracleError::Network)?;
        let breaker = CircuitBreaker::new(config.failure_threshold, config.recovery_timeout, 1);

        Ok(Self {
            http,
            config,
            breaker,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Ask the model for a raw score.
    pub async fn score(&self, jpeg: &[u8], hint: &str) -> OracleResult<f64> {
        if !self.breaker.allow() {
            return Err(OracleError::CircuitOpen);
        }

        let result = self.call_api(jpeg, hint).await;
        match &result {
            Ok(_) => self.breaker.success(),
            Err(e) if e.counts_against_breaker() => self.breaker.failure(),
            // The backend answered; only its content was unusable
            Err(_) => self.breaker.success(),
        }
        result
    }

    async fn call_api(&self, jpeg: &[u8], hint: &str) -> OracleResult<f64> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: build_prompt(hint),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: BASE64.encode(jpeg),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.0,
            },
        };

        debug!(model = %self.config.model, bytes = jpeg.len(), "Sending frame to vision oracle");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::RequestFailed(format!(
                "Gemini API returned {}: {}",
                status, body
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::invalid_response(format!("unparsable body: {}", e)))?;
        let text = body
            .first_text()
            .ok_or_else(|| OracleError::invalid_response("no content in response"))?;

        parse_score(text)
    }
}

#[async_trait]
impl VisionOracle for GeminiVisionOracle {
    async fn judge(&self, jpeg: &[u8], hint: &str) -> VisionVerdict {
        match self.score(jpeg, hint).await {
            Ok(score) => VisionVerdict::from_raw(score),
            Err(OracleError::CircuitOpen) => {
                debug!("Vision oracle circuit open, skipping");
                VisionVerdict::Unavailable
            }
            Err(e) => {
                warn!(error = %e, "Vision oracle unavailable");
                VisionVerdict::Unavailable
            }
        }
    }
}

fn build_prompt(hint: &str) -> String {
    format!(
        r#"You are rating a still frame captured from a recorded video to decide whether it works as the video's thumbnail.

Context: {hint}

Score the frame from 0 to 100:
- high: people or meaningful content clearly visible, well lit, in focus, looks professional
- low: black or blank screen, loading spinner, empty call window, heavy blur, transition frame

Return ONLY a single JSON object: {{"score": <number 0-100>}}"#
    )
}

/// Extract the score from the model's reply.
///
/// Accepts `{"score": n}` or a bare number, optionally wrapped in a
/// markdown code fence. Anything else is an invalid response.
pub fn parse_score(text: &str) -> OracleResult<f64> {
    let text = strip_code_fence(text.trim());
    let value: serde_json::Value = serde_json::from_str(text)?;

    let score = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::Object(map) => map.get("score").and_then(|s| s.as_f64()),
        _ => None,
    }
    .ok_or_else(|| OracleError::invalid_response(format!("no numeric score in {}", value)))?;

    if !(VISION_SCORE_MIN..=VISION_SCORE_MAX).contains(&score) {
        return Err(OracleError::OutOfRange(score));
    }
    Ok(score)
}

fn strip_code_fence(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_forms() {
        assert_eq!(parse_score(r#"{"score": 72}"#).unwrap(), 72.0);
        assert_eq!(parse_score("```json\n{\"score\": 55.5}\n```").unwrap(), 55.5);
        assert_eq!(parse_score("88").unwrap(), 88.0);
    }

    #[test]
    fn test_parse_score_rejects_invalid() {
        assert!(matches!(parse_score(r#"{"score": 150}"#), Err(OracleError::OutOfRange(_))));
        assert!(matches!(parse_score(r#"{"score": -1}"#), Err(OracleError::OutOfRange(_))));
        assert!(parse_score(r#"{"score": "high"}"#).is_err());
        assert!(parse_score(r#"{"rating": 50}"#).is_err());
        assert!(parse_score("looks great").is_err());
    }

    #[test]
    fn test_new_requires_key() {
        assert!(GeminiVisionOracle::new(OracleConfig::new("")).is_err());
        assert!(GeminiVisionOracle::new(OracleConfig::new("k")).is_ok());
    }
}
