//! Ingest stage: verifies the raw bytes already captured at submission time
//! actually hash to `document.content_hash`, then advances status.
//!
//! File reading, MIME sniffing, and URL fetching are a submission-time
//! concern (outside the engine's opaque stage contract); by the time this
//! stage runs, `raw_content` already holds the bytes.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::{DocflowError, Result};
use docflow_core::hash::hash_bytes;

pub struct IngestStage;

#[async_trait]
impl Stage for IngestStage {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let document = ctx
            .store
            .get_document(ctx.document_id)
            .await?
            .ok_or_else(|| DocflowError::pipeline_state("document not found"))?;

        let content = ctx
            .store
            .get_raw_content(ctx.document_id)
            .await?
            .ok_or_else(|| DocflowError::pipeline_state("raw content not found"))?;

        let actual_hash = hash_bytes(&content);
        if actual_hash != document.content_hash {
            return Err(DocflowError::pipeline_state("content hash mismatch")
                .detail("expected", document.content_hash)
                .detail("actual", actual_hash));
        }

        ctx.store.set_document_status(ctx.document_id, "ingested").await?;
        Ok(())
    }
}
