//! Layout normalization stage: a pass-through status transition.
//!
//! The core keeps no separate "normalized text" table — normalization of
//! layout artifacts (columns, headers/footers, OCR noise) is an external
//! stage implementation detail the engine treats as opaque. This
//! implementation's contract with the engine is limited to the status
//! advance.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::Result;

pub struct LayoutNormalizationStage;

#[async_trait]
impl Stage for LayoutNormalizationStage {
    fn name(&self) -> &'static str {
        "layout_normalization"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        ctx.store
            .set_document_status(ctx.document_id, "layout_normalized")
            .await?;
        Ok(())
    }
}
