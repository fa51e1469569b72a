//! Row types mirroring the tables created by `migrations/0001_initial.sql`.

use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DocumentRow {
    pub id: i64,
    pub source: String,
    pub content_hash: String,
    pub schema_version: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub file_size_bytes: Option<i64>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PipelineRunRow {
    pub id: i64,
    pub document_id: i64,
    pub stage: String,
    pub status: String,
    pub attempt: i64,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ChunkRow {
    pub id: i64,
    pub document_id: i64,
    pub sequence: i64,
    pub text: String,
    pub token_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ExtractionRow {
    pub id: i64,
    pub chunk_id: i64,
    pub schema_version: String,
    pub model: String,
    pub json_result: String,
    pub is_valid: bool,
    pub latency_ms: f64,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub cost_usd: f64,
    pub created_at: String,
    pub prompt_hash: Option<String>,
    pub raw_response: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ExtractionWithSequenceRow {
    pub id: i64,
    pub chunk_id: i64,
    pub sequence: i64,
    pub schema_version: String,
    pub model: String,
    pub json_result: String,
    pub is_valid: bool,
    pub latency_ms: f64,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ValidationErrorRow {
    pub id: i64,
    pub extraction_id: i64,
    pub json_path: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MetricRow {
    pub id: i64,
    pub run_id: i64,
    pub stage: String,
    pub latency_ms: f64,
    pub tokens_in: Option<i64>,
    pub tokens_out: Option<i64>,
    pub cost_usd: Option<f64>,
    pub created_at: String,
}
