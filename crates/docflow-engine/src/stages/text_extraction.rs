//! Text extraction stage: decodes the submitted bytes as UTF-8 text.
//!
//! PDF/OCR extraction is an external concern; this stage's contract with
//! the engine is simply to prove the raw bytes the chunker will later read
//! are valid text, and to surface a classified failure if they are not.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::{DocflowError, Result};

pub struct TextExtractionStage;

#[async_trait]
impl Stage for TextExtractionStage {
    fn name(&self) -> &'static str {
        "text_extraction"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let content = ctx
            .store
            .get_raw_content(ctx.document_id)
            .await?
            .ok_or_else(|| DocflowError::pipeline_state("raw content not found"))?;

        std::str::from_utf8(&content)
            .map_err(|e| DocflowError::extraction(format!("raw content is not valid utf-8 text: {e}")))?;

        ctx.store.set_document_status(ctx.document_id, "text_extracted").await?;
        Ok(())
    }
}
