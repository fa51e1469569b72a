//! Argument parsing for the `docflow` command-line tool.
//!
//! The CLI drives the same engine the server does, directly and in-process —
//! no HTTP hop, per the "thin driver" shape this tool is meant to have.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docflow", about = "Document extraction pipeline CLI", version)]
pub struct Cli {
    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a local file for extraction and run the pipeline to completion
    Submit {
        /// Path to the file to ingest
        path: String,

        /// Schema version to extract against (must exist in the schema registry)
        #[arg(short, long)]
        schema_version: String,
    },

    /// Show the pipeline status of a previously submitted document
    Status {
        /// Document id
        document_id: i64,
    },

    /// Show the structured extractions produced for a document
    Extractions {
        /// Document id
        document_id: i64,
    },
}
