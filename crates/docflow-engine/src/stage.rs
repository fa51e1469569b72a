//! The stage contract every pipeline step implements, and the shared
//! context handed to each invocation.

use async_trait::async_trait;
use docflow_chunking::TextChunker;
use docflow_core::config::AppConfig;
use docflow_core::error::Result;
use docflow_llm::{EmbeddingClient, ModelClient};
use docflow_schema::{SchemaRegistry, SchemaValidator};
use docflow_store::Store;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Everything a stage needs to do its work against one document. Cheap to
/// clone: every field is an `Arc`.
#[derive(Clone)]
pub struct StageContext {
    pub store: Arc<Store>,
    pub config: Arc<AppConfig>,
    pub chunker: Arc<TextChunker>,
    pub schema_registry: Arc<SchemaRegistry>,
    pub validator: Arc<SchemaValidator>,
    pub model_client: Arc<dyn ModelClient>,
    pub embedding_client: Arc<dyn EmbeddingClient>,
    pub chunk_semaphore: Arc<Semaphore>,
    pub document_id: i64,
    pub correlation_id: String,
}

/// A single unit of the fixed pipeline order. Stable `name()`, one
/// fallible operation. Stages must be idempotent under re-run: a second
/// invocation after a delete-then-insert of their own output must leave
/// the store in the same observable state as a single run.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &StageContext) -> Result<()>;
}
