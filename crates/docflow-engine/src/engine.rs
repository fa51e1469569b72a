//! The pipeline engine: fixed stage order, idempotent skip, retrying
//! execution, durable run/metric bookkeeping.

use crate::backoff::BackoffPolicy;
use crate::stage::{Stage, StageContext};
use crate::stages::{
    ChunkingStage, EmbeddingStage, IngestStage, LayoutNormalizationStage, MetricsAndAuditStage,
    PersistenceStage, StructuredExtractionStage, TextExtractionStage, ValidationStage,
};
use docflow_chunking::{ChunkConfig, TextChunker};
use docflow_core::config::AppConfig;
use docflow_core::correlation::CorrelationId;
use docflow_core::error::Result;
use docflow_llm::{EmbeddingClient, ModelClient};
use docflow_schema::{SchemaRegistry, SchemaValidator};
use docflow_store::Store;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::time::Duration;

/// Builds the fixed, ordered stage list once. Held as trait objects so the
/// engine loop is indifferent to each stage's concrete type.
fn stage_registry() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(IngestStage),
        Box::new(TextExtractionStage),
        Box::new(LayoutNormalizationStage),
        Box::new(ChunkingStage),
        Box::new(EmbeddingStage),
        Box::new(StructuredExtractionStage),
        Box::new(ValidationStage),
        Box::new(PersistenceStage),
        Box::new(MetricsAndAuditStage),
    ]
}

pub struct PipelineEngine {
    store: Arc<Store>,
    config: Arc<AppConfig>,
    chunker: Arc<TextChunker>,
    schema_registry: Arc<SchemaRegistry>,
    validator: Arc<SchemaValidator>,
    model_client: Arc<dyn ModelClient>,
    embedding_client: Arc<dyn EmbeddingClient>,
    chunk_semaphore: Arc<Semaphore>,
    stages: Vec<Box<dyn Stage>>,
    backoff: BackoffPolicy,
    max_retries: u32,
}

impl PipelineEngine {
    pub fn new(
        store: Arc<Store>,
        config: Arc<AppConfig>,
        model_client: Arc<dyn ModelClient>,
        embedding_client: Arc<dyn EmbeddingClient>,
    ) -> Self {
        let chunker = Arc::new(TextChunker::new(ChunkConfig {
            target_tokens: config.chunk.target_tokens,
            overlap_tokens: config.chunk.overlap_tokens,
            min_chars: config.chunk.min_chars,
        }));
        let schema_registry = Arc::new(SchemaRegistry::new(config.schema_registry_path.clone()));
        let chunk_semaphore = Arc::new(Semaphore::new(config.pipeline.max_concurrent_chunks));
        let backoff = BackoffPolicy {
            base: config.pipeline.retry_backoff_base,
            max_seconds: config.pipeline.retry_backoff_max_secs,
            jitter: config.pipeline.retry_jitter,
        };
        let max_retries = config.llm.max_retries;

        Self {
            store,
            config,
            chunker,
            schema_registry,
            validator: Arc::new(SchemaValidator::new()),
            model_client,
            embedding_client,
            chunk_semaphore,
            stages: stage_registry(),
            backoff,
            max_retries,
        }
    }

    /// Runs every not-yet-completed stage for `document_id` in fixed order,
    /// then writes the final authoritative `completed` status.
    pub async fn run_document(&self, document_id: i64, correlation_id: Option<String>) -> Result<()> {
        let correlation_id = correlation_id.unwrap_or_else(|| CorrelationId::default().to_string());

        let ctx = StageContext {
            store: self.store.clone(),
            config: self.config.clone(),
            chunker: self.chunker.clone(),
            schema_registry: self.schema_registry.clone(),
            validator: self.validator.clone(),
            model_client: self.model_client.clone(),
            embedding_client: self.embedding_client.clone(),
            chunk_semaphore: self.chunk_semaphore.clone(),
            document_id,
            correlation_id,
        };

        for stage in &self.stages {
            if self.store.has_completed_run(document_id, stage.name()).await? {
                tracing::info!(document_id, stage = stage.name(), "stage skipped (already completed)");
                continue;
            }
            self.run_with_retry(stage.as_ref(), &ctx).await?;
        }

        self.store.set_document_status(document_id, "completed").await?;
        Ok(())
    }

    /// Retries `stage` against `ctx` per the configured backoff policy,
    /// recording one `PipelineRun` + `Metric` pair per attempt.
    async fn run_with_retry(&self, stage: &dyn Stage, ctx: &StageContext) -> Result<()> {
        let total_attempts = self.max_retries + 1;

        for attempt in 1..=total_attempts {
            let attempt_no = self
                .store
                .next_attempt_number(ctx.document_id, stage.name())
                .await?;
            let run_id = self
                .store
                .start_run(ctx.document_id, stage.name(), attempt_no, &ctx.correlation_id)
                .await?;

            let started = Instant::now();
            let result = stage.run(ctx).await;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(()) => {
                    self.store.complete_run(run_id).await?;
                    self.store
                        .insert_metric(run_id, stage.name(), latency_ms, None, None, None)
                        .await?;
                    tracing::info!(
                        document_id = ctx.document_id,
                        stage = stage.name(),
                        attempt,
                        latency_ms,
                        "stage completed"
                    );
                    return Ok(());
                }
                Err(e) => {
                    self.store
                        .fail_run(run_id, e.kind().as_str(), &e.truncated_message())
                        .await?;
                    self.store
                        .insert_metric(run_id, stage.name(), latency_ms, None, None, None)
                        .await?;
                    tracing::warn!(
                        document_id = ctx.document_id,
                        stage = stage.name(),
                        attempt,
                        error_type = e.kind().as_str(),
                        "stage attempt failed"
                    );

                    if !e.is_retryable() || attempt == total_attempts {
                        return Err(e);
                    }

                    let delay = self.backoff.delay_for_attempt(attempt);
                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                }
            }
        }

        unreachable!("loop always returns on its final attempt")
    }
}
