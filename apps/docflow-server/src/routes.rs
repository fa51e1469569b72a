//! The four document routes plus `/health`, per the documented submission
//! API. Every handler is a thin translation between HTTP and the engine
//! library; no business logic lives here.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use docflow_core::correlation::CorrelationId;
use docflow_core::hash::hash_bytes;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/documents", post(submit_document))
        .route("/api/v1/documents/:id/status", get(document_status))
        .route("/api/v1/documents/:id/extractions", get(document_extractions))
        .route("/api/v1/documents/:id/metrics", get(document_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

#[derive(Serialize)]
struct SubmitResponse {
    document_id: i64,
    correlation_id: String,
    status: String,
}

async fn submit_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut mime_type: Option<String> = None;
    let mut schema_version: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                mime_type = field.content_type().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::internal(format!("failed to read file field: {e}")))?;
                file_bytes = Some(bytes.to_vec());
            }
            Some("schema_version") => {
                schema_version = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::internal(format!("failed to read schema_version field: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| ApiError::internal("missing 'file' field"))?;
    let schema_version = schema_version.ok_or_else(|| ApiError::internal("missing 'schema_version' field"))?;

    if file_bytes.len() as u64 > state.max_file_size_bytes {
        return Err(ApiError::payload_too_large());
    }

    let content_hash = hash_bytes(&file_bytes);
    let (document_id, status, _created) = state
        .store
        .find_or_create_document("upload", &file_bytes, &content_hash, &schema_version, mime_type.as_deref())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let correlation_id = CorrelationId::default().to_string();

    let engine = state.engine.clone();
    let run_correlation_id = correlation_id.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.run_document(document_id, Some(run_correlation_id)).await {
            tracing::warn!(document_id, error = %e, "pipeline run ended with an unhandled error");
        }
    });

    Ok(Json(SubmitResponse { document_id, correlation_id, status }))
}

#[derive(Serialize)]
struct StageStatus {
    stage: String,
    status: String,
    attempt: i64,
    started_at: String,
    finished_at: Option<String>,
    error_type: Option<String>,
    error_message: Option<String>,
}

async fn document_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let document = state
        .store
        .get_document(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(ApiError::not_found)?;

    let runs = state
        .store
        .list_runs_for_document(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let stages: Vec<StageStatus> = runs
        .into_iter()
        .map(|r| StageStatus {
            stage: r.stage,
            status: r.status,
            attempt: r.attempt,
            started_at: r.started_at,
            finished_at: r.finished_at,
            error_type: r.error_type,
            error_message: r.error_message,
        })
        .collect();

    Ok(Json(json!({
        "document_id": document.id,
        "source": document.source,
        "schema_version": document.schema_version,
        "status": document.status,
        "created_at": document.created_at,
        "updated_at": document.updated_at,
        "stages": stages,
    })))
}

async fn document_extractions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let document = state
        .store
        .get_document(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(ApiError::not_found)?;

    let extractions = state
        .store
        .get_extractions_for_document(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let mut total_cost_usd = 0.0;
    let mut entries = Vec::with_capacity(extractions.len());
    for extraction in extractions {
        total_cost_usd += extraction.cost_usd;
        let validation_errors = state
            .store
            .get_validation_errors(extraction.id)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;

        entries.push(json!({
            "chunk_id": extraction.chunk_id,
            "sequence": extraction.sequence,
            "json_result": extraction.json_result,
            "is_valid": extraction.is_valid,
            "validation_errors": validation_errors.into_iter().map(|e| json!({
                "json_path": e.json_path,
                "message": e.message,
            })).collect::<Vec<_>>(),
            "latency_ms": extraction.latency_ms,
            "tokens_in": extraction.tokens_in,
            "tokens_out": extraction.tokens_out,
            "cost_usd": extraction.cost_usd,
        }));
    }

    Ok(Json(json!({
        "document_id": document.id,
        "schema_version": document.schema_version,
        "extractions": entries,
        "total_cost_usd": total_cost_usd,
    })))
}

async fn document_metrics(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .get_document(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(ApiError::not_found)?;

    let metrics = state
        .store
        .list_metrics_for_document(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let extractions = state
        .store
        .get_extractions_for_document(id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let total_tokens_in: i64 = extractions.iter().map(|e| e.tokens_in).sum();
    let total_tokens_out: i64 = extractions.iter().map(|e| e.tokens_out).sum();
    let total_cost_usd: f64 = extractions.iter().map(|e| e.cost_usd).sum();
    let valid_count = extractions.iter().filter(|e| e.is_valid).count();
    let invalid_count = extractions.len() - valid_count;

    let stage_metrics: Vec<Value> = metrics
        .into_iter()
        .map(|m| {
            json!({
                "stage": m.stage,
                "latency_ms": m.latency_ms,
                "tokens_in": m.tokens_in,
                "tokens_out": m.tokens_out,
                "cost_usd": m.cost_usd,
            })
        })
        .collect();

    Ok(Json(json!({
        "document_id": id,
        "total_tokens_in": total_tokens_in,
        "total_tokens_out": total_tokens_out,
        "total_cost_usd": total_cost_usd,
        "valid_count": valid_count,
        "invalid_count": invalid_count,
        "stage_metrics": stage_metrics,
    })))
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }

    fn not_found() -> Self {
        Self { status: StatusCode::NOT_FOUND, message: "document not found".to_string() }
    }

    fn payload_too_large() -> Self {
        Self { status: StatusCode::PAYLOAD_TOO_LARGE, message: "file exceeds the configured size limit".to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = health().await;
        assert_eq!(response.0["status"], "healthy");
    }
}
