//! Command-line argument parsing for the HTTP server binary.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "docflow-server", about = "Document extraction pipeline HTTP server", version)]
pub struct Args {
    /// HTTP server port
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON log format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}
