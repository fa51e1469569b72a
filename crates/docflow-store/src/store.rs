//! Store adapter: owns the connection pool and every read/write operation
//! the engine and stages need, each wrapped in a transaction at its logical
//! commit point.

use crate::models::{
    ChunkRow, DocumentRow, ExtractionRow, ExtractionWithSequenceRow, MetricRow, PipelineRunRow,
    ValidationErrorRow,
};
use chrono::Utc;
use docflow_core::error::{DocflowError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DocflowError::storage(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            DocflowError::storage(format!("migration failed: {e}"))
        })?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- documents ----------------------------------------------------

    /// Finds an existing document by `(content_hash, schema_version)`, or
    /// creates one plus its raw content row. Returns `(document_id, status,
    /// was_created)`.
    pub async fn find_or_create_document(
        &self,
        source: &str,
        content: &[u8],
        content_hash: &str,
        schema_version: &str,
        mime_type: Option<&str>,
    ) -> Result<(i64, String, bool)> {
        if let Some(row) = sqlx::query(
            "SELECT id, status FROM documents WHERE content_hash = ? AND schema_version = ?",
        )
        .bind(content_hash)
        .bind(schema_version)
        .fetch_optional(&self.pool)
        .await?
        {
            let id: i64 = row.try_get("id")?;
            let status: String = row.try_get("status")?;
            return Ok((id, status, false));
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO documents (source, content_hash, schema_version, status, created_at, updated_at, file_size_bytes, mime_type)
             VALUES (?, ?, ?, 'pending', ?, ?, ?, ?)",
        )
        .bind(source)
        .bind(content_hash)
        .bind(schema_version)
        .bind(&now)
        .bind(&now)
        .bind(content.len() as i64)
        .bind(mime_type)
        .execute(&mut *tx)
        .await?;

        let document_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO raw_content (document_id, content, is_hashed, created_at) VALUES (?, ?, 0, ?)",
        )
        .bind(document_id)
        .bind(content)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((document_id, "pending".to_string(), true))
    }

    pub async fn get_document(&self, document_id: i64) -> Result<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = ?")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn set_document_status(&self, document_id: i64, status: &str) -> Result<()> {
        sqlx::query("UPDATE documents SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now().to_rfc3339())
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_raw_content(&self, document_id: i64) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT content FROM raw_content WHERE document_id = ?")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r: SqliteRow| r.get::<Vec<u8>, _>("content")))
    }

    // ---- pipeline runs --------------------------------------------------

    pub async fn has_completed_run(&self, document_id: i64, stage: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM pipeline_runs WHERE document_id = ? AND stage = ? AND status = 'completed' LIMIT 1",
        )
        .bind(document_id)
        .bind(stage)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn next_attempt_number(&self, document_id: i64, stage: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as n FROM pipeline_runs WHERE document_id = ? AND stage = ?",
        )
        .bind(document_id)
        .bind(stage)
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n + 1)
    }

    pub async fn start_run(
        &self,
        document_id: i64,
        stage: &str,
        attempt: i64,
        correlation_id: &str,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO pipeline_runs (document_id, stage, status, attempt, started_at, correlation_id)
             VALUES (?, ?, 'running', ?, ?, ?)",
        )
        .bind(document_id)
        .bind(stage)
        .bind(attempt)
        .bind(&now)
        .bind(correlation_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn complete_run(&self, run_id: i64) -> Result<()> {
        sqlx::query("UPDATE pipeline_runs SET status = 'completed', finished_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn fail_run(&self, run_id: i64, error_type: &str, error_message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE pipeline_runs SET status = 'failed', finished_at = ?, error_type = ?, error_message = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(error_type)
        .bind(error_message)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_runs_for_document(&self, document_id: i64) -> Result<Vec<PipelineRunRow>> {
        let rows = sqlx::query_as::<_, PipelineRunRow>(
            "SELECT * FROM pipeline_runs WHERE document_id = ? ORDER BY stage, attempt",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_runs(&self, document_id: i64, stage: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as n FROM pipeline_runs WHERE document_id = ? AND stage = ?",
        )
        .bind(document_id)
        .bind(stage)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("n")?)
    }

    // ---- metrics --------------------------------------------------------

    pub async fn insert_metric(
        &self,
        run_id: i64,
        stage: &str,
        latency_ms: f64,
        tokens_in: Option<i64>,
        tokens_out: Option<i64>,
        cost_usd: Option<f64>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO metrics (run_id, stage, latency_ms, tokens_in, tokens_out, cost_usd, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(stage)
        .bind(latency_ms)
        .bind(tokens_in)
        .bind(tokens_out)
        .bind(cost_usd)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_metrics_for_document(&self, document_id: i64) -> Result<Vec<MetricRow>> {
        let rows = sqlx::query_as::<_, MetricRow>(
            "SELECT m.* FROM metrics m JOIN pipeline_runs r ON m.run_id = r.id WHERE r.document_id = ? ORDER BY m.id",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ---- chunks ----------------------------------------------------------

    /// Deletes any existing chunks for `document_id`, inserts the given
    /// `(sequence, text, token_count)` rows, and returns the new chunk ids
    /// in sequence order, all in one transaction.
    pub async fn replace_chunks(
        &self,
        document_id: i64,
        chunks: &[(i64, String, i64)],
    ) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;

        // Cascade: delete dependent extractions/validation errors/prompts
        // for this document's chunks before the chunks themselves.
        let chunk_ids: Vec<i64> = sqlx::query("SELECT id FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|r| r.get::<i64, _>("id"))
            .collect();

        for chunk_id in &chunk_ids {
            delete_extractions_for_chunk(&mut tx, *chunk_id).await?;
        }
        sqlx::query("DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE document_id = ?)")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(chunks.len());
        for (sequence, text, token_count) in chunks {
            let result = sqlx::query(
                "INSERT INTO chunks (document_id, sequence, text, token_count, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(document_id)
            .bind(sequence)
            .bind(text)
            .bind(token_count)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    pub async fn get_chunks(&self, document_id: i64) -> Result<Vec<ChunkRow>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT * FROM chunks WHERE document_id = ? ORDER BY sequence",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn replace_embedding(&self, chunk_id: i64, model: &str, vector: &[u8]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM embeddings WHERE chunk_id = ? AND model = ?")
            .bind(chunk_id)
            .bind(model)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO embeddings (chunk_id, model, vector, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(chunk_id)
        .bind(model)
        .bind(vector)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    // ---- extractions -------------------------------------------------------

    /// Pre-step of the structured-extraction stage: delete extractions (and
    /// their prompts/validation errors) for every chunk belonging to this
    /// document. Idempotency hinge for the stage.
    pub async fn delete_extractions_for_document(&self, document_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let chunk_ids: Vec<i64> = sqlx::query("SELECT id FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|r| r.get::<i64, _>("id"))
            .collect();
        for chunk_id in chunk_ids {
            delete_extractions_for_chunk(&mut tx, chunk_id).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_extraction(
        &self,
        chunk_id: i64,
        schema_version: &str,
        model: &str,
        json_result: &str,
        latency_ms: f64,
        tokens_in: i64,
        tokens_out: i64,
        cost_usd: f64,
        prompt_hash: Option<&str>,
        raw_response: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO extractions (chunk_id, schema_version, model, json_result, is_valid, latency_ms, tokens_in, tokens_out, cost_usd, created_at, prompt_hash, raw_response)
             VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(chunk_id)
        .bind(schema_version)
        .bind(model)
        .bind(json_result)
        .bind(latency_ms)
        .bind(tokens_in)
        .bind(tokens_out)
        .bind(cost_usd)
        .bind(Utc::now().to_rfc3339())
        .bind(prompt_hash)
        .bind(raw_response)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_prompt(&self, extraction_id: i64, prompt_text: &str, prompt_hash: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO prompts (extraction_id, prompt_text, prompt_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(extraction_id)
        .bind(prompt_text)
        .bind(prompt_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_extractions_for_document(&self, document_id: i64) -> Result<Vec<ExtractionWithSequenceRow>> {
        let rows = sqlx::query_as::<_, ExtractionWithSequenceRow>(
            "SELECT e.id, e.chunk_id, c.sequence, e.schema_version, e.model, e.json_result,
                    e.is_valid, e.latency_ms, e.tokens_in, e.tokens_out, e.cost_usd
             FROM extractions e
             JOIN chunks c ON e.chunk_id = c.id
             WHERE c.document_id = ?
             ORDER BY c.sequence",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_extraction(&self, extraction_id: i64) -> Result<Option<ExtractionRow>> {
        let row = sqlx::query_as::<_, ExtractionRow>("SELECT * FROM extractions WHERE id = ?")
            .bind(extraction_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_extraction_validity(&self, extraction_id: i64, is_valid: bool) -> Result<()> {
        sqlx::query("UPDATE extractions SET is_valid = ? WHERE id = ?")
            .bind(is_valid)
            .bind(extraction_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_validation_errors(&self, extraction_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM validation_errors WHERE extraction_id = ?")
            .bind(extraction_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_validation_error(&self, extraction_id: i64, json_path: &str, message: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO validation_errors (extraction_id, json_path, message, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(extraction_id)
        .bind(json_path)
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_validation_errors(&self, extraction_id: i64) -> Result<Vec<ValidationErrorRow>> {
        let rows = sqlx::query_as::<_, ValidationErrorRow>(
            "SELECT * FROM validation_errors WHERE extraction_id = ? ORDER BY id",
        )
        .bind(extraction_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn delete_extractions_for_chunk(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, chunk_id: i64) -> Result<()> {
    let extraction_ids: Vec<i64> = sqlx::query("SELECT id FROM extractions WHERE chunk_id = ?")
        .bind(chunk_id)
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(|r| r.get::<i64, _>("id"))
        .collect();

    for extraction_id in extraction_ids {
        sqlx::query("DELETE FROM validation_errors WHERE extraction_id = ?")
            .bind(extraction_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM prompts WHERE extraction_id = ?")
            .bind(extraction_id)
            .execute(&mut **tx)
            .await?;
    }
    sqlx::query("DELETE FROM extractions WHERE chunk_id = ?")
        .bind(chunk_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
