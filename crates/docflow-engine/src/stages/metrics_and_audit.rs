//! Metrics and audit stage: the terminal stage before the engine's own
//! authoritative `completed` write. Logs an aggregate audit line; does not
//! set `document.status` itself (there is no status value between
//! `persisted` and `completed` — the engine's final write is the
//! authoritative one, this stage's writes are advisory only).

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::Result;

pub struct MetricsAndAuditStage;

#[async_trait]
impl Stage for MetricsAndAuditStage {
    fn name(&self) -> &'static str {
        "metrics_and_audit"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let extractions = ctx.store.get_extractions_for_document(ctx.document_id).await?;
        let total_cost: f64 = extractions.iter().map(|e| e.cost_usd).sum();
        let valid_count = extractions.iter().filter(|e| e.is_valid).count();
        let invalid_count = extractions.len() - valid_count;

        tracing::info!(
            document_id = ctx.document_id,
            correlation_id = %ctx.correlation_id,
            total_cost_usd = total_cost,
            extraction_count = extractions.len(),
            valid_count,
            invalid_count,
            "document audit summary"
        );

        Ok(())
    }
}
