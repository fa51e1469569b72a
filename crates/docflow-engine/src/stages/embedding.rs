//! Embedding stage: batch-embeds every chunk's text and stores the packed
//! vectors.

use crate::stage::{Stage, StageContext};
use async_trait::async_trait;
use docflow_core::error::Result;
use docflow_llm::pack_vector;

pub struct EmbeddingStage;

#[async_trait]
impl Stage for EmbeddingStage {
    fn name(&self) -> &'static str {
        "embedding"
    }

    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let chunks = ctx.store.get_chunks(ctx.document_id).await?;
        if chunks.is_empty() {
            ctx.store.set_document_status(ctx.document_id, "embedded").await?;
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = ctx.embedding_client.embed_batch(&texts).await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            ctx.store
                .replace_embedding(chunk.id, &ctx.config.embedding.model, &pack_vector(vector))
                .await?;
        }

        ctx.store.set_document_status(ctx.document_id, "embedded").await?;
        Ok(())
    }
}
