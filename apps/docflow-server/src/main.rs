mod cli;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use docflow_core::config::AppConfig;
use docflow_core::tracing_setup::{self, TracingConfig};
use tracing::info;

use crate::cli::Args;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();

    tracing_setup::init(
        &TracingConfig::default()
            .with_log_level(args.log_level.clone())
            .with_json_logs(args.json_logs),
    );

    info!(version = env!("CARGO_PKG_VERSION"), "starting docflow-server");

    let config = AppConfig::load().context("failed to load configuration")?;
    let state = AppState::build(config).await.context("failed to build application state")?;

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("failed to bind port {}", args.port))?;

    info!(port = args.port, "listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert()
    }
}
