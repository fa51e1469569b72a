//! Structured extraction stage: bounded-concurrency fan-out over chunks,
//! calling the model-service client for schema-constrained JSON output.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::Result;
use docflow_core::hash::hash_string;
use docflow_store::ChunkRow;
use futures::future::try_join_all;

pub struct StructuredExtractionStage;

#[async_trait]
impl Stage for StructuredExtractionStage {
    fn name(&self) -> &'static str {
        "structured_extraction"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        ctx.store.delete_extractions_for_document(ctx.document_id).await?;

        let document = ctx
            .store
            .get_document(ctx.document_id)
            .await?
            .ok_or_else(|| docflow_core::error::DocflowError::pipeline_state("document not found"))?;
        let schema = ctx.schema_registry.get_schema(&document.schema_version)?;
        let chunks = ctx.store.get_chunks(ctx.document_id).await?;

        let schema_version = document.schema_version.clone();
        let futures = chunks.into_iter().map(|chunk| {
            let ctx = ctx.clone();
            let schema = schema.clone();
            let schema_version = schema_version.clone();
            async move { extract_one(&ctx, &chunk, &schema, &schema_version).await }
        });

        try_join_all(futures).await?;

        ctx.store.set_document_status(ctx.document_id, "extracted").await?;
        Ok(())
    }
}

async fn extract_one(
    ctx: &StageContext,
    chunk: &ChunkRow,
    schema: &serde_json::Value,
    schema_version: &str,
) -> Result<()> {
    let _permit = ctx.chunk_semaphore.acquire().await.expect("semaphore never closed");

    let prompt = build_prompt(&chunk.text, schema);
    let prompt_hash = hash_string(&prompt);

    let response = ctx
        .model_client
        .generate_structured(
            &prompt,
            schema,
            ctx.config.llm.temperature,
            ctx.config.llm.max_tokens,
        )
        .await?;

    let cost = response.tokens_in as f64 / 1000.0 * ctx.config.cost.per_1k_input_tokens
        + response.tokens_out as f64 / 1000.0 * ctx.config.cost.per_1k_output_tokens;

    let json_result = serde_json::to_string(&response.parsed_json)
        .map_err(|e| docflow_core::error::DocflowError::model_output(format!("failed to serialize model output: {e}")))?;

    let raw_response = ctx.config.storage.persist_raw_responses.then(|| response.raw_response.as_str());

    let extraction_id = ctx
        .store
        .insert_extraction(
            chunk.id,
            schema_version,
            &ctx.config.llm.model,
            &json_result,
            response.latency_ms,
            response.tokens_in as i64,
            response.tokens_out as i64,
            cost,
            Some(&prompt_hash),
            raw_response,
        )
        .await?;

    if ctx.config.storage.persist_prompts {
        ctx.store.insert_prompt(extraction_id, &prompt, &prompt_hash).await?;
    }

    Ok(())
}

fn build_prompt(chunk_text: &str, schema: &serde_json::Value) -> String {
    let serialized_schema = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "Extract structured information from the following text.\n\
         Return only valid JSON that conforms to the provided schema.\n\n\
         Schema:\n{serialized_schema}\n\n\
         Text:\n{chunk_text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_embeds_serialized_schema_and_chunk_text() {
        let schema = json!({"type": "object", "properties": {"x": {"type": "integer"}}});
        let prompt = build_prompt("some chunk text", &schema);
        assert!(prompt.contains("some chunk text"));
        assert!(prompt.contains("\"type\""));
        assert!(prompt.starts_with("Extract structured information"));
    }

    #[test]
    fn cost_formula_matches_tokens_times_price() {
        let tokens_in = 1000.0_f64;
        let tokens_out = 500.0_f64;
        let price_in = 0.01;
        let price_out = 0.03;
        let cost = tokens_in / 1000.0 * price_in + tokens_out / 1000.0 * price_out;
        assert!((cost - 0.025).abs() < 1e-9);
    }
}
