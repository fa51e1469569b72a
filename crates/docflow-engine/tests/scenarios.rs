//! End-to-end scenarios over an in-memory store and a stubbed model
//! service, covering the documented invariants and scenarios S1-S6.

use async_trait::async_trait;
use docflow_core::config::{
    ChunkConfig, CostConfig, DatabaseConfig, EmbeddingConfig, LlmConfig, PipelineConfig,
    StorageConfig,
};
use docflow_core::config::AppConfig;
use docflow_core::error::Result;
use docflow_core::hash::hash_bytes;
use docflow_engine::PipelineEngine;
use docflow_llm::{Embedding, EmbeddingClient, HttpModelClient};
use docflow_store::Store;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StubEmbeddingClient;

#[async_trait]
impl EmbeddingClient for StubEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|_| vec![0.0f32; 4]).collect())
    }

    fn dimension(&self) -> usize {
        4
    }
}

fn test_config(base_url: String) -> AppConfig {
    AppConfig {
        database: DatabaseConfig { url: "sqlite::memory:".into(), pool_size: 1, max_overflow: 0 },
        llm: LlmConfig {
            provider: "openai".into(),
            base_url,
            api_key: "test".into(),
            model: "test-model".into(),
            timeout_secs: 5,
            max_retries: 3,
            temperature: 0.0,
            max_tokens: 256,
        },
        embedding: EmbeddingConfig {
            provider: "openai".into(),
            base_url: "http://unused.invalid".into(),
            api_key: "test".into(),
            model: "test-embedding".into(),
            batch_size: 100,
            timeout_secs: 5,
            max_retries: 3,
        },
        pipeline: PipelineConfig {
            max_concurrent_stages: 4,
            max_concurrent_chunks: 10,
            stage_timeout_secs: 3600,
            retry_backoff_base: 1.0,
            retry_backoff_max_secs: 60.0,
            retry_jitter: false,
        },
        chunk: ChunkConfig { target_tokens: 1000, overlap_tokens: 200, min_chars: 1 },
        schema_registry_path: String::new(),
        storage: StorageConfig { max_file_size_mb: 100, persist_prompts: true, persist_raw_responses: true },
        cost: CostConfig { per_1k_input_tokens: 0.01, per_1k_output_tokens: 0.03, per_1k_embedding_tokens: 0.0001 },
        redact_fields: vec![],
        log_level: "info".into(),
    }
}

async fn setup_schema_dir(schema: serde_json::Value) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("invoice_v1.json"), schema.to_string()).unwrap();
    dir
}

async fn new_engine(base_url: String, schema_dir: &tempfile::TempDir) -> (Arc<Store>, PipelineEngine) {
    let store = Arc::new(Store::connect("sqlite::memory:", 1).await.unwrap());
    let mut config = test_config(base_url.clone());
    config.schema_registry_path = schema_dir.path().display().to_string();
    let model_client = Arc::new(HttpModelClient::new(base_url, "test", "test-model", Duration::from_secs(5)));
    let embedding_client = Arc::new(StubEmbeddingClient);
    let engine = PipelineEngine::new(store.clone(), Arc::new(config), model_client, embedding_client);
    (store, engine)
}

fn invoice_schema() -> serde_json::Value {
    json!({"type": "object", "required": ["x"], "properties": {"x": {"type": "integer"}}})
}

#[tokio::test]
async fn s1_happy_path_produces_valid_extraction_and_completes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "{\"x\": 1}"})))
        .mount(&server)
        .await;

    let schema_dir = setup_schema_dir(invoice_schema()).await;
    let (store, engine) = new_engine(server.uri(), &schema_dir).await;

    let (doc_id, ..) = store
        .find_or_create_document("doc", b"hello world\n\nsecond paragraph", &hash_bytes(b"hello world\n\nsecond paragraph"), "invoice_v1", None)
        .await
        .unwrap();

    engine.run_document(doc_id, None).await.unwrap();

    let document = store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(document.status, "completed");

    let extractions = store.get_extractions_for_document(doc_id).await.unwrap();
    assert_eq!(extractions.len(), 1);
    assert!(extractions[0].is_valid);
    assert!(store.get_validation_errors(extractions[0].id).await.unwrap().is_empty());
}

#[tokio::test]
async fn s2_invalid_json_shape_is_persisted_invalid_with_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "{\"x\": \"one\"}"})))
        .mount(&server)
        .await;

    let schema_dir = setup_schema_dir(invoice_schema()).await;
    let (store, engine) = new_engine(server.uri(), &schema_dir).await;

    let (doc_id, ..) = store
        .find_or_create_document("doc", b"some content here", &hash_bytes(b"some content here"), "invoice_v1", None)
        .await
        .unwrap();

    engine.run_document(doc_id, None).await.unwrap();

    let extractions = store.get_extractions_for_document(doc_id).await.unwrap();
    assert_eq!(extractions.len(), 1);
    assert!(!extractions[0].is_valid);

    let errors = store.get_validation_errors(extractions[0].id).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].json_path, "$.x");
    assert!(errors[0].message.contains("integer"));
}

#[tokio::test]
async fn s3_dedup_returns_same_document_id() {
    let server = MockServer::start().await;
    let schema_dir = setup_schema_dir(invoice_schema()).await;
    let (store, _engine) = new_engine(server.uri(), &schema_dir).await;

    let content = b"hello";
    let hash = hash_bytes(content);
    let (id1, ..) = store.find_or_create_document("a", content, &hash, "invoice_v1", None).await.unwrap();
    let (id2, ..) = store.find_or_create_document("a", content, &hash, "invoice_v1", None).await.unwrap();
    assert_eq!(id1, id2);
}

#[tokio::test]
async fn s4_transient_failure_then_success_retries_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "{\"x\": 1}"})))
        .mount(&server)
        .await;

    let schema_dir = setup_schema_dir(invoice_schema()).await;
    let (store, engine) = new_engine(server.uri(), &schema_dir).await;

    let (doc_id, ..) = store
        .find_or_create_document("doc", b"content", &hash_bytes(b"content"), "invoice_v1", None)
        .await
        .unwrap();

    let started = std::time::Instant::now();
    engine.run_document(doc_id, None).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));

    let runs = store.list_runs_for_document(doc_id).await.unwrap();
    let extraction_runs: Vec<_> = runs.iter().filter(|r| r.stage == "structured_extraction").collect();
    assert_eq!(extraction_runs.len(), 2);
    assert_eq!(extraction_runs.iter().filter(|r| r.status == "completed").count(), 1);
    assert_eq!(extraction_runs.iter().filter(|r| r.status == "failed").count(), 1);
}

#[tokio::test]
async fn s5_non_retryable_halts_after_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let schema_dir = setup_schema_dir(invoice_schema()).await;
    let (store, engine) = new_engine(server.uri(), &schema_dir).await;

    let (doc_id, ..) = store
        .find_or_create_document("doc", b"content", &hash_bytes(b"content"), "invoice_v1", None)
        .await
        .unwrap();

    let err = engine.run_document(doc_id, None).await.unwrap_err();
    assert_eq!(err.kind().as_str(), "model_output");

    let runs = store.list_runs_for_document(doc_id).await.unwrap();
    let extraction_runs: Vec<_> = runs.iter().filter(|r| r.stage == "structured_extraction").collect();
    assert_eq!(extraction_runs.len(), 1);
    assert_eq!(extraction_runs[0].status, "failed");

    let document = store.get_document(doc_id).await.unwrap().unwrap();
    assert_ne!(document.status, "completed");
}

#[tokio::test]
async fn s6_resume_after_completion_skips_every_stage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "{\"x\": 1}"})))
        .mount(&server)
        .await;

    let schema_dir = setup_schema_dir(invoice_schema()).await;
    let (store, engine) = new_engine(server.uri(), &schema_dir).await;

    let (doc_id, ..) = store
        .find_or_create_document("doc", b"content here", &hash_bytes(b"content here"), "invoice_v1", None)
        .await
        .unwrap();

    engine.run_document(doc_id, None).await.unwrap();
    let runs_after_first = store.list_runs_for_document(doc_id).await.unwrap().len();

    engine.run_document(doc_id, None).await.unwrap();
    let runs_after_second = store.list_runs_for_document(doc_id).await.unwrap().len();

    assert_eq!(runs_after_first, runs_after_second);
}
