pub mod chunking;
pub mod embedding;
pub mod ingest;
pub mod layout_normalization;
pub mod metrics_and_audit;
pub mod persistence;
pub mod structured_extraction;
pub mod text_extraction;
pub mod validation;

pub use chunking::ChunkingStage;
pub use embedding::EmbeddingStage;
pub use ingest::IngestStage;
pub use layout_normalization::LayoutNormalizationStage;
pub use metrics_and_audit::MetricsAndAuditStage;
pub use persistence::PersistenceStage;
pub use structured_extraction::StructuredExtractionStage;
pub use text_extraction::TextExtractionStage;
pub use validation::ValidationStage;
