//! Structured logging setup.
//!
//! Ambient concern the engine always carries: every run emits JSON lines with
//! at minimum `timestamp`, `level`, `target`, `message`, plus whatever fields
//! (`document_id`, `correlation_id`, `stage`, `attempt`, ...) the call site
//! attaches via `tracing`'s structured fields.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl TracingConfig {
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Install a global subscriber. Call once at process start.
pub fn init(config: &TracingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
