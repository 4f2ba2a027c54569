#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;

/// Dimension of text-embedding-3-large
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 3072;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    model: String,
    batch_size: u32,
    expected_dimension: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: Option<String>,
    pub created: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .embedding_url()
            .context("Failed to generate embedding API URL from config")?;
        let api_key = config
            .embedding
            .resolve_api_key()
            .context("Failed to resolve embedding API key")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            model: config.embedding.model.clone(),
            batch_size: config.embedding.batch_size,
            expected_dimension: config.embedding.embedding_dimension as usize,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Test connection to the embedding API and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check against {}", self.base_url);

        self.ping().context("Server ping failed")?;
        self.validate_model().context("Model validation failed")?;

        info!(
            "Health check passed for embedding API at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// Ping the embedding API to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/v1/models")
            .context("Failed to build ping URL")?;

        debug!("Pinging embedding API at {}", url);

        self.agent
            .get(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Failed to ping embedding API")?;

        debug!("Server ping successful");
        Ok(())
    }

    /// Validate that the configured model is available
    #[inline]
    pub fn validate_model(&self) -> Result<()> {
        debug!("Validating model: {}", self.model);

        let models = self.list_models().context("Failed to list models")?;

        if models.iter().any(|m| m.id == self.model) {
            debug!("Model {} is available", self.model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(anyhow::anyhow!(
                "Model '{}' is not available. Available models: {:?}",
                self.model,
                available_models
            ))
        }
    }

    /// List all models exposed by the API
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/v1/models")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .agent
            .get(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.data.len());
        Ok(models_response.data)
    }

    /// Generate embeddings for multiple text inputs, submitted in batches.
    ///
    /// The returned vectors are in input order, one per text. Any API failure
    /// propagates immediately; there is no retry or partial result.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let batch_vectors = self
                .embed_single_batch(batch)
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;
            vectors.extend(batch_vectors);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let url = self
            .base_url
            .join("/v1/embeddings")
            .context("Failed to build embeddings URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embeddings request")?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Embedding request failed")?;

        let mut response: EmbeddingsResponse =
            serde_json::from_str(&response_text).context("Failed to parse embeddings response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        // The API may return entries out of order; restore input order by index.
        response.data.sort_by_key(|obj| obj.index);

        for obj in &response.data {
            if obj.embedding.len() != self.expected_dimension {
                return Err(anyhow::anyhow!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.expected_dimension,
                    obj.embedding.len()
                ));
            }
        }

        Ok(response.data.into_iter().map(|obj| obj.embedding).collect())
    }
}
