pub mod backoff;
pub mod engine;
pub mod stage;
pub mod stages;

pub use backoff::BackoffPolicy;
pub use engine::PipelineEngine;
pub use stage::{Stage, StageContext};
