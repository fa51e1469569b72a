//! Shared application state: one store, one engine, both built once at
//! startup from `AppConfig`.

use anyhow::{Context, Result};
use docflow_core::config::AppConfig;
use docflow_engine::PipelineEngine;
use docflow_llm::{HttpEmbeddingClient, HttpModelClient};
use docflow_store::Store;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub engine: Arc<PipelineEngine>,
    pub max_file_size_bytes: u64,
}

impl AppState {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);

        let store = Arc::new(
            Store::connect(&config.database.url, config.database.pool_size)
                .await
                .context("failed to connect to the store")?,
        );

        let model_client = Arc::new(HttpModelClient::new(
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
            config.llm.model.clone(),
            Duration::from_secs(config.llm.timeout_secs),
        ));

        let embedding_client = Arc::new(HttpEmbeddingClient::new(
            config.embedding.base_url.clone(),
            config.embedding.api_key.clone(),
            config.embedding.model.clone(),
            Duration::from_secs(config.embedding.timeout_secs),
            1536,
        ));

        let engine = Arc::new(PipelineEngine::new(
            store.clone(),
            config.clone(),
            model_client,
            embedding_client,
        ));

        Ok(Self {
            store,
            engine,
            max_file_size_bytes: config.storage.max_file_size_mb * 1024 * 1024,
        })
    }
}
