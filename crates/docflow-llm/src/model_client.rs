//! Model-service (LLM) client: remote structured-JSON generation.
//!
//! HTTP status and transport faults are mapped onto the shared error
//! taxonomy so the engine's retry loop can classify them without knowing
//! anything about HTTP.

use crate::fences::strip_markdown_fences;
use async_trait::async_trait;
use docflow_core::error::{DocflowError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub raw_response: String,
    pub parsed_json: Value,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub latency_ms: f64,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<GenerateResponse>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    schema: &'a Value,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateApiResponse {
    content: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

pub struct HttpModelClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl HttpModelClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            schema,
            temperature,
            max_tokens,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(DocflowError::transient_external(format!("model request timed out: {e}")))
            }
            Err(e) => return Err(DocflowError::transient_external(format!("model request failed: {e}"))),
        };

        let status = response.status();
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(DocflowError::transient_external(format!(
                "model service returned status {status}"
            )));
        }
        if !status.is_success() {
            return Err(DocflowError::model_output(format!(
                "model service returned status {status}"
            )));
        }

        let raw_body = response
            .text()
            .await
            .map_err(|e| DocflowError::model_output(format!("failed to read response body: {e}")))?;

        let parsed: GenerateApiResponse = serde_json::from_str(&raw_body)
            .map_err(|e| DocflowError::model_output(format!("malformed response JSON: {e}")))?;

        let content = parsed
            .content
            .ok_or_else(|| DocflowError::model_output("response missing content field"))?;

        let stripped = strip_markdown_fences(&content);
        let parsed_json: Value = serde_json::from_str(&stripped)
            .map_err(|e| DocflowError::model_output(format!("model content is not valid JSON: {e}")))?;

        let words_in = prompt.split_whitespace().count() as u32;
        let words_out = content.split_whitespace().count() as u32;

        let (tokens_in, tokens_out) = match parsed.usage {
            Some(usage) => (
                usage.prompt_tokens.unwrap_or_else(|| estimate_tokens(words_in)),
                usage.completion_tokens.unwrap_or_else(|| estimate_tokens(words_out)),
            ),
            None => (estimate_tokens(words_in), estimate_tokens(words_out)),
        };

        Ok(GenerateResponse {
            raw_response: raw_body,
            parsed_json,
            tokens_in,
            tokens_out,
            latency_ms,
        })
    }
}

fn estimate_tokens(words: u32) -> u32 {
    ((words as f64) * 1.3).ceil() as u32
}
