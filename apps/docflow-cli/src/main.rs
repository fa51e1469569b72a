mod cli;
mod commands;

use clap::Parser;
use colored::Colorize;
use docflow_core::tracing_setup::{self, TracingConfig};
use std::process::ExitCode;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    tracing_setup::init(&TracingConfig::default().with_json_logs(false));

    let result = match &cli.command {
        Commands::Submit { path, schema_version } => commands::submit(path, schema_version, &cli.format).await,
        Commands::Status { document_id } => commands::status(*document_id, &cli.format).await,
        Commands::Extractions { document_id } => commands::extractions(*document_id, &cli.format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }
}
