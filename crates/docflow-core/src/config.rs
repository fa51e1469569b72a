//! Environment-variable configuration, loaded once at process start.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Top-level application configuration, assembled from flat environment
/// variables (no `__`-nested prefix — each setting is its own var, matching
/// the flat `DATABASE_URL`/`LLM_MODEL`/... naming used by the CLI and server).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub pipeline: PipelineConfig,
    pub chunk: ChunkConfig,
    pub schema_registry_path: String,
    pub storage: StorageConfig,
    pub cost: CostConfig,
    pub redact_fields: Vec<String>,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let builder = Config::builder()
            .add_source(Environment::default().try_parsing(true))
            .set_default("database_url", "sqlite://./docflow.db")?
            .set_default("database_pool_size", 5)?
            .set_default("database_max_overflow", 10)?
            .set_default("llm_provider", "openai")?
            .set_default("llm_base_url", "https://api.openai.com/v1")?
            .set_default("llm_api_key", "")?
            .set_default("llm_model", "gpt-4-turbo-preview")?
            .set_default("llm_timeout", 120)?
            .set_default("llm_max_retries", 3)?
            .set_default("llm_temperature", 0.0)?
            .set_default("llm_max_tokens", 4096)?
            .set_default("embedding_provider", "openai")?
            .set_default("embedding_base_url", "https://api.openai.com/v1")?
            .set_default("embedding_api_key", "")?
            .set_default("embedding_model", "text-embedding-3-small")?
            .set_default("embedding_batch_size", 100)?
            .set_default("embedding_timeout", 60)?
            .set_default("embedding_max_retries", 3)?
            .set_default("pipeline_max_concurrent_stages", 4)?
            .set_default("pipeline_max_concurrent_chunks", 10)?
            .set_default("pipeline_stage_timeout", 3600)?
            .set_default("pipeline_retry_backoff_base", 2.0)?
            .set_default("pipeline_retry_backoff_max", 60.0)?
            .set_default("pipeline_retry_jitter", true)?
            .set_default("chunk_size", 1000)?
            .set_default("chunk_overlap", 200)?
            .set_default("chunk_min_size", 100)?
            .set_default("schema_registry_path", "./schemas")?
            .set_default("storage_max_file_size_mb", 100)?
            .set_default("storage_persist_prompts", true)?
            .set_default("storage_persist_raw_responses", true)?
            .set_default("cost_per_1k_input_tokens", 0.01)?
            .set_default("cost_per_1k_output_tokens", 0.03)?
            .set_default("cost_per_1k_embedding_tokens", 0.0001)?
            .set_default("redact_fields", "ssn,credit_card,password")?
            .set_default("log_level", "info")?;

        let raw = builder.build()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: Config) -> Result<Self, ConfigError> {
        let redact_fields = raw
            .get_string("redact_fields")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(AppConfig {
            database: DatabaseConfig {
                url: raw.get_string("database_url")?,
                pool_size: raw.get_int("database_pool_size")? as u32,
                max_overflow: raw.get_int("database_max_overflow")? as u32,
            },
            llm: LlmConfig {
                provider: raw.get_string("llm_provider")?,
                base_url: raw.get_string("llm_base_url")?,
                api_key: raw.get_string("llm_api_key")?,
                model: raw.get_string("llm_model")?,
                timeout_secs: raw.get_int("llm_timeout")? as u64,
                max_retries: raw.get_int("llm_max_retries")? as u32,
                temperature: raw.get_float("llm_temperature")? as f32,
                max_tokens: raw.get_int("llm_max_tokens")? as u32,
            },
            embedding: EmbeddingConfig {
                provider: raw.get_string("embedding_provider")?,
                base_url: raw.get_string("embedding_base_url")?,
                api_key: raw.get_string("embedding_api_key")?,
                model: raw.get_string("embedding_model")?,
                batch_size: raw.get_int("embedding_batch_size")? as u32,
                timeout_secs: raw.get_int("embedding_timeout")? as u64,
                max_retries: raw.get_int("embedding_max_retries")? as u32,
            },
            pipeline: PipelineConfig {
                max_concurrent_stages: raw.get_int("pipeline_max_concurrent_stages")? as usize,
                max_concurrent_chunks: raw.get_int("pipeline_max_concurrent_chunks")? as usize,
                stage_timeout_secs: raw.get_int("pipeline_stage_timeout")? as u64,
                retry_backoff_base: raw.get_float("pipeline_retry_backoff_base")?,
                retry_backoff_max_secs: raw.get_float("pipeline_retry_backoff_max")?,
                retry_jitter: raw.get_bool("pipeline_retry_jitter")?,
            },
            chunk: ChunkConfig {
                target_tokens: raw.get_int("chunk_size")? as usize,
                overlap_tokens: raw.get_int("chunk_overlap")? as usize,
                min_chars: raw.get_int("chunk_min_size")? as usize,
            },
            schema_registry_path: raw.get_string("schema_registry_path")?,
            storage: StorageConfig {
                max_file_size_mb: raw.get_int("storage_max_file_size_mb")? as u64,
                persist_prompts: raw.get_bool("storage_persist_prompts")?,
                persist_raw_responses: raw.get_bool("storage_persist_raw_responses")?,
            },
            cost: CostConfig {
                per_1k_input_tokens: raw.get_float("cost_per_1k_input_tokens")?,
                per_1k_output_tokens: raw.get_float("cost_per_1k_output_tokens")?,
                per_1k_embedding_tokens: raw.get_float("cost_per_1k_embedding_tokens")?,
            },
            redact_fields,
            log_level: raw.get_string("log_level")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub max_overflow: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub batch_size: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub max_concurrent_stages: usize,
    pub max_concurrent_chunks: usize,
    pub stage_timeout_secs: u64,
    pub retry_backoff_base: f64,
    pub retry_backoff_max_secs: f64,
    pub retry_jitter: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkConfig {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
    pub min_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub max_file_size_mb: u64,
    pub persist_prompts: bool,
    pub persist_raw_responses: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostConfig {
    pub per_1k_input_tokens: f64,
    pub per_1k_output_tokens: f64,
    pub per_1k_embedding_tokens: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_env() {
        let config = AppConfig::load().expect("defaults must be sufficient to build");
        assert_eq!(config.database.url, "sqlite://./docflow.db");
        assert_eq!(config.pipeline.max_concurrent_chunks, 10);
        assert_eq!(config.chunk.target_tokens, 1000);
        assert_eq!(
            config.redact_fields,
            vec!["ssn".to_string(), "credit_card".to_string(), "password".to_string()]
        );
    }
}
