//! Embedding client: remote batch vector generation, same error contract as
//! the model-service client.

use async_trait::async_trait;
use docflow_core::error::{DocflowError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub type Embedding = Vec<f32>;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;
    fn dimension(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedApiResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    dimension: usize,
}

impl HttpEmbeddingClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        dimension: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

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
                return Err(DocflowError::transient_external(format!("embedding request timed out: {e}")))
            }
            Err(e) => return Err(DocflowError::transient_external(format!("embedding request failed: {e}"))),
        };

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(DocflowError::transient_external(format!(
                "embedding service returned status {status}"
            )));
        }
        if !status.is_success() {
            return Err(DocflowError::embedding(format!(
                "embedding service returned status {status}"
            )));
        }

        let body: EmbedApiResponse = response
            .json()
            .await
            .map_err(|e| DocflowError::embedding(format!("malformed embedding response: {e}")))?;

        Ok(body.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Packs a float32 vector little-endian for storage in `embeddings.vector`.
pub fn pack_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

pub fn unpack_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let vector = vec![1.0f32, -2.5, 0.0, 3.25];
        let packed = pack_vector(&vector);
        assert_eq!(unpack_vector(&packed), vector);
    }
}
