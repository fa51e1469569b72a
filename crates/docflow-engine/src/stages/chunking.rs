//! Chunking stage: decodes the document's raw text and replaces its chunks.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::{DocflowError, Result};

pub struct ChunkingStage;

#[async_trait]
impl Stage for ChunkingStage {
    fn name(&self) -> &'static str {
        "chunking"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let content = ctx
            .store
            .get_raw_content(ctx.document_id)
            .await?
            .ok_or_else(|| DocflowError::pipeline_state("raw content not found"))?;
        let text = String::from_utf8_lossy(&content);

        let chunks = ctx.chunker.chunk(&text)?;
        let rows: Vec<(i64, String, i64)> = chunks
            .into_iter()
            .map(|c| (c.sequence as i64, c.text, c.token_count as i64))
            .collect();

        ctx.store.replace_chunks(ctx.document_id, &rows).await?;
        ctx.store.set_document_status(ctx.document_id, "chunked").await?;
        Ok(())
    }
}
