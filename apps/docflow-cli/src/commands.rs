//! Subcommand implementations. Each function builds its own store/engine
//! handle from `AppConfig` and talks to them directly — the CLI never makes
//! an HTTP call.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docflow_core::config::AppConfig;
use docflow_core::hash::hash_bytes;
use docflow_engine::PipelineEngine;
use docflow_llm::{HttpEmbeddingClient, HttpModelClient};
use docflow_store::Store;
use serde_json::json;

struct Handles {
    store: Arc<Store>,
    engine: Arc<PipelineEngine>,
}

async fn build_handles() -> Result<Handles> {
    let config = AppConfig::load().context("failed to load configuration")?;
    let config = Arc::new(config);

    let store = Arc::new(
        Store::connect(&config.database.url, config.database.pool_size)
            .await
            .context("failed to connect to the store")?,
    );

    let model_client = Arc::new(HttpModelClient::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    ));

    let embedding_client = Arc::new(HttpEmbeddingClient::new(
        config.embedding.base_url.clone(),
        config.embedding.api_key.clone(),
        config.embedding.model.clone(),
        Duration::from_secs(config.embedding.timeout_secs),
        1536,
    ));

    let engine = Arc::new(PipelineEngine::new(store.clone(), config.clone(), model_client, embedding_client));

    Ok(Handles { store, engine })
}

pub async fn submit(path: &str, schema_version: &str, format: &str) -> Result<()> {
    let handles = build_handles().await?;

    let content = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
    let content_hash = hash_bytes(&content);
    let source = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());

    let (document_id, status, created) = handles
        .store
        .find_or_create_document(&source, &content, &content_hash, schema_version, None)
        .await
        .context("failed to register document")?;

    tracing::info!(document_id, schema_version, deduplicated = !created, "running pipeline");

    handles
        .engine
        .run_document(document_id, None)
        .await
        .context("pipeline run failed")?;

    let document = handles
        .store
        .get_document(document_id)
        .await
        .context("failed to reload document")?
        .context("document vanished after running the pipeline")?;

    print_result(
        format,
        json!({
            "document_id": document_id,
            "deduplicated": !created,
            "submitted_status": status,
            "final_status": document.status,
        }),
    );

    Ok(())
}

pub async fn status(document_id: i64, format: &str) -> Result<()> {
    let handles = build_handles().await?;

    let document = handles
        .store
        .get_document(document_id)
        .await
        .context("failed to load document")?
        .with_context(|| format!("no document with id {document_id}"))?;

    let runs = handles
        .store
        .list_runs_for_document(document_id)
        .await
        .context("failed to load pipeline runs")?;

    print_result(
        format,
        json!({
            "document_id": document.id,
            "source": document.source,
            "schema_version": document.schema_version,
            "status": document.status,
            "stages": runs.iter().map(|r| json!({
                "stage": r.stage,
                "status": r.status,
                "attempt": r.attempt,
                "error_type": r.error_type,
            })).collect::<Vec<_>>(),
        }),
    );

    Ok(())
}

pub async fn extractions(document_id: i64, format: &str) -> Result<()> {
    let handles = build_handles().await?;

    handles
        .store
        .get_document(document_id)
        .await
        .context("failed to load document")?
        .with_context(|| format!("no document with id {document_id}"))?;

    let extractions = handles
        .store
        .get_extractions_for_document(document_id)
        .await
        .context("failed to load extractions")?;

    let entries: Vec<_> = extractions
        .iter()
        .map(|e| {
            json!({
                "sequence": e.sequence,
                "is_valid": e.is_valid,
                "json_result": e.json_result,
                "tokens_in": e.tokens_in,
                "tokens_out": e.tokens_out,
                "cost_usd": e.cost_usd,
            })
        })
        .collect();

    print_result(format, json!({"document_id": document_id, "extractions": entries}));

    Ok(())
}

fn print_result(format: &str, value: serde_json::Value) {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&value).expect("value is always valid json"));
    } else {
        println!("{}", render_text(&value));
    }
}

/// Minimal human-readable rendering for the default `text` format, avoiding a
/// dependency on a table-formatting crate for a handful of flat fields.
fn render_text(value: &serde_json::Value) -> String {
    match value.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n"),
        None => value.to_string(),
    }
}
