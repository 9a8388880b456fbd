use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use super::{parse_questions, AiError, GenerationRequest, GeneratorStatus, QuestionGenerator};
use crate::config::AiConfig;
use crate::database::models::Question;
use crate::retry::RetryPolicy;

/// Gemini `generateContent` client
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiGenerator {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from_config(config),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate_content(&self, parts: Value) -> Result<String, AiError> {
        let body = json!({ "contents": [{ "parts": parts }] });
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
                .to_string();
            return Err(AiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AiError::InvalidResponse("response contained no text".to_string()))
    }
}

#[async_trait]
impl QuestionGenerator for GeminiGenerator {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, AiError> {
        let parts = json!([
            { "text": request.prompt() },
            { "inline_data": { "mime_type": request.mime_type, "data": STANDARD.encode(&request.image) } }
        ]);

        let text = self
            .retry
            .run(|| self.generate_content(parts.clone()), AiError::is_retryable)
            .await
            .map_err(|e| {
                error!("MCQ generation failed: {}", e);
                if e.is_retryable() {
                    AiError::Unavailable(e.to_string())
                } else {
                    e
                }
            })?;

        debug!("Gemini answered with {} characters", text.len());
        parse_questions(&text)
    }

    async fn status(&self) -> GeneratorStatus {
        let probe = json!([{ "text": "Respond with just the word 'OK' if you can process this request." }]);
        match self.generate_content(probe).await {
            Ok(_) => GeneratorStatus::Available,
            Err(e) if e.is_retryable() => GeneratorStatus::Overloaded,
            Err(e) => {
                error!("Gemini status check failed: {}", e);
                GeneratorStatus::Error
            }
        }
    }
}
