//! Validation stage: re-validates every extraction belonging to this
//! document against its schema, replacing prior validation errors.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::{DocflowError, Result};

pub struct ValidationStage;

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let document = ctx
            .store
            .get_document(ctx.document_id)
            .await?
            .ok_or_else(|| DocflowError::pipeline_state("document not found"))?;
        let schema = ctx.schema_registry.get_schema(&document.schema_version)?;

        let extractions = ctx.store.get_extractions_for_document(ctx.document_id).await?;

        for extraction in extractions {
            let data: serde_json::Value = serde_json::from_str(&extraction.json_result)
                .map_err(|e| DocflowError::schema_validation(format!("stored extraction is not valid JSON: {e}")))?;

            let result = ctx.validator.validate(&data, &schema)?;

            ctx.store.delete_validation_errors(extraction.id).await?;
            ctx.store
                .update_extraction_validity(extraction.id, result.is_valid)
                .await?;
            for error in &result.errors {
                ctx.store
                    .insert_validation_error(extraction.id, &error.json_path, &error.message)
                    .await?;
            }
        }

        ctx.store.set_document_status(ctx.document_id, "validated").await?;
        Ok(())
    }
}
