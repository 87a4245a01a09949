pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "factcheck")]
#[command(author = "factcheck authors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fact-extraction pipeline: chunk, extract, verify, and search documents", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long, default_value = "false")]
        force: bool,
    },

    /// Submit a document for chunking, extraction, and verification
    Submit {
        /// Path to the document (.txt, .md, .html, .pdf)
        #[arg(required = true)]
        path: PathBuf,

        /// Override the document name derived from the file name
        #[arg(long)]
        document_name: Option<String>,
    },

    /// Semantic search over verified facts
    Search {
        /// Natural language query
        query: String,

        /// Number of results to return
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// List extracted facts
    Facts {
        /// Restrict to one document
        #[arg(long)]
        document: Option<String>,

        /// Include rejected facts as well as verified ones
        #[arg(long, default_value = "false")]
        include_rejected: bool,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for --output
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
    },

    /// Edit a fact's statement, status, or verification reason
    Update {
        /// The fact to edit
        fact_id: String,

        /// Replace the statement text (re-embedded if the fact is verified)
        #[arg(long)]
        statement: Option<String>,

        /// Move the fact to a new verification status
        #[arg(long)]
        status: Option<VerificationStatusArg>,

        /// Reason recorded alongside the change
        #[arg(long)]
        reason: Option<String>,
    },

    /// Remove a document and all its chunks/facts from every store
    Purge {
        /// Document to remove
        document_name: String,
    },

    /// Check system health and diagnose common problems
    Doctor,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VerificationStatusArg {
    Verified,
    Rejected,
}

impl From<VerificationStatusArg> for crate::model::VerificationStatus {
    fn from(value: VerificationStatusArg) -> Self {
        match value {
            VerificationStatusArg::Verified => crate::model::VerificationStatus::Verified,
            VerificationStatusArg::Rejected => crate::model::VerificationStatus::Rejected,
        }
    }
}
