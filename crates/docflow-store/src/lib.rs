pub mod models;
pub mod store;

pub use models::{
    ChunkRow, DocumentRow, ExtractionRow, ExtractionWithSequenceRow, MetricRow, PipelineRunRow,
    ValidationErrorRow,
};
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> Store {
        Store::connect("sqlite::memory:", 1).await.expect("connect")
    }

    #[tokio::test]
    async fn find_or_create_document_is_idempotent_by_hash() {
        let store = test_store().await;
        let (id1, status1, created1) = store
            .find_or_create_document("doc.pdf", b"hello world", "hash1", "v1", Some("application/pdf"))
            .await
            .unwrap();
        assert_eq!(status1, "pending");
        assert!(created1);

        let (id2, _status2, created2) = store
            .find_or_create_document("doc.pdf", b"hello world", "hash1", "v1", Some("application/pdf"))
            .await
            .unwrap();
        assert_eq!(id1, id2);
        assert!(!created2);
    }

    #[tokio::test]
    async fn run_lifecycle_tracks_attempts_and_completion() {
        let store = test_store().await;
        let (doc_id, ..) = store
            .find_or_create_document("a.txt", b"content", "h", "v1", None)
            .await
            .unwrap();

        assert!(!store.has_completed_run(doc_id, "chunking").await.unwrap());
        assert_eq!(store.next_attempt_number(doc_id, "chunking").await.unwrap(), 1);

        let run_id = store.start_run(doc_id, "chunking", 1, "corr-1").await.unwrap();
        store.fail_run(run_id, "transient_external", "boom").await.unwrap();
        assert!(!store.has_completed_run(doc_id, "chunking").await.unwrap());
        assert_eq!(store.next_attempt_number(doc_id, "chunking").await.unwrap(), 2);

        let run_id2 = store.start_run(doc_id, "chunking", 2, "corr-1").await.unwrap();
        store.complete_run(run_id2).await.unwrap();
        assert!(store.has_completed_run(doc_id, "chunking").await.unwrap());

        let runs = store.list_runs_for_document(doc_id).await.unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[tokio::test]
    async fn replace_chunks_is_idempotent_and_cascades_extractions() {
        let store = test_store().await;
        let (doc_id, ..) = store
            .find_or_create_document("b.txt", b"content", "h2", "v1", None)
            .await
            .unwrap();

        let ids = store
            .replace_chunks(doc_id, &[(0, "para one".to_string(), 2), (1, "para two".to_string(), 2)])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let extraction_id = store
            .insert_extraction(ids[0], "v1", "gpt", "{}", 10.0, 5, 5, 0.001, None, None)
            .await
            .unwrap();
        store.insert_validation_error(extraction_id, "$.x", "missing").await.unwrap();

        // Re-chunking the same document must wipe prior chunks and their extractions.
        let ids2 = store
            .replace_chunks(doc_id, &[(0, "para one revised".to_string(), 3)])
            .await
            .unwrap();
        assert_eq!(ids2.len(), 1);
        assert_ne!(ids2[0], ids[0]);

        let extractions = store.get_extractions_for_document(doc_id).await.unwrap();
        assert!(extractions.is_empty());
    }

    #[tokio::test]
    async fn extraction_validity_roundtrip() {
        let store = test_store().await;
        let (doc_id, ..) = store
            .find_or_create_document("c.txt", b"content", "h3", "v1", None)
            .await
            .unwrap();
        let chunk_ids = store
            .replace_chunks(doc_id, &[(0, "text".to_string(), 1)])
            .await
            .unwrap();

        let extraction_id = store
            .insert_extraction(chunk_ids[0], "v1", "gpt", "{\"a\":1}", 12.5, 10, 4, 0.002, Some("ph"), Some("raw"))
            .await
            .unwrap();
        store.insert_prompt(extraction_id, "prompt text", "ph").await.unwrap();
        store.update_extraction_validity(extraction_id, true).await.unwrap();

        let extraction = store.get_extraction(extraction_id).await.unwrap().unwrap();
        assert!(extraction.is_valid);

        store.insert_validation_error(extraction_id, "$.a", "wrong type").await.unwrap();
        let errors = store.get_validation_errors(extraction_id).await.unwrap();
        assert_eq!(errors.len(), 1);

        store.delete_validation_errors(extraction_id).await.unwrap();
        assert!(store.get_validation_errors(extraction_id).await.unwrap().is_empty());
    }
}
