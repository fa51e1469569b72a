//! Persistence stage: a checkpoint transition. Every prior stage already
//! commits its own output incrementally; this stage exists only so the
//! fixed order and its durable `PipelineRun` record are observable,
//! matching the engine's opaque-stage contract.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::Result;

pub struct PersistenceStage;

#[async_trait]
impl Stage for PersistenceStage {
    fn name(&self) -> &'static str {
        "persistence"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        ctx.store.set_document_status(ctx.document_id, "persisted").await?;
        Ok(())
    }
}
