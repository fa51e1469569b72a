//! Shared ambient stack for the docflow workspace: error taxonomy,
//! configuration, content hashing, correlation ids, and logging setup.

pub mod config;
pub mod correlation;
pub mod error;
pub mod hash;
pub mod tracing_setup;

pub use config::AppConfig;
pub use correlation::CorrelationId;
pub use error::{DocflowError, ErrorKind, Result};
