//! CLI argument definitions for the Brolly binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use brolly_core::PolicyType;
use uuid::Uuid;

/// Brolly: retrieval-grounded question answering over insurance policies.
#[derive(Parser, Debug)]
#[command(name = "brolly", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the similarity index from a directory of policy documents.
    Ingest {
        /// Directory containing policy text files.
        #[arg(long = "docs")]
        docs: PathBuf,

        /// Output directory for index artifacts (default: the configured data dir).
        #[arg(long = "out")]
        out: Option<PathBuf>,

        /// Base name for the artifact files (default: from config).
        #[arg(long = "index-name")]
        index_name: Option<String>,
    },

    /// Interactive question-answering session over the built index.
    Chat {
        /// Resume an existing session by id instead of starting fresh.
        #[arg(long = "session")]
        session: Option<Uuid>,

        /// Restrict retrieval to one policy type (health, car, bike).
        #[arg(long = "type", value_name = "TYPE")]
        policy_type: Option<PolicyType>,

        /// Restrict retrieval to one region code.
        #[arg(long = "region")]
        region: Option<String>,
    },

    /// Ask a single question and print the answer.
    Ask {
        /// The question to answer.
        query: String,

        /// Restrict retrieval to one policy type (health, car, bike).
        #[arg(long = "type", value_name = "TYPE")]
        policy_type: Option<PolicyType>,

        /// Restrict retrieval to one region code.
        #[arg(long = "region")]
        region: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > BROLLY_CONFIG env var > ./brolly.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("BROLLY_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("brolly.toml")
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    /// Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}
