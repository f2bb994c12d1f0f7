use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::provider::{Platform, Scope};

/// Host Configuration Baseline Manager
///
/// Reconciles a declarative policy baseline against the host's native
/// settings store (Windows registry or macOS preference domains), reporting
/// drift and optionally enforcing compliance.
#[derive(Parser, Debug)]
#[command(name = "host-baseline")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assess the host against a baseline without changing anything
    Scan {
        /// Path to the baseline document (JSON)
        #[arg(short, long)]
        baseline: PathBuf,

        /// Policy storage scope (Windows only; ignored on macOS)
        #[arg(long, value_enum, default_value_t = Scope::Machine)]
        scope: Scope,

        /// Write the JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the JSON report to stdout instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Assess the host and remediate non-compliant policies
    Enforce {
        /// Path to the baseline document (JSON)
        #[arg(short, long)]
        baseline: PathBuf,

        /// Policy storage scope (Windows only; ignored on macOS)
        #[arg(long, value_enum, default_value_t = Scope::Machine)]
        scope: Scope,

        /// Write the JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the JSON report to stdout instead of the summary
        #[arg(long)]
        json: bool,

        /// Show what would be remediated without making changes
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Read a single policy's current value
    GetPolicy {
        /// Friendly policy name
        name: String,

        /// Policy storage scope (Windows only; ignored on macOS)
        #[arg(long, value_enum, default_value_t = Scope::Machine)]
        scope: Scope,
    },

    /// Write a single policy value
    SetPolicy {
        /// Friendly policy name
        name: String,

        /// New value (JSON literal; bare words are treated as strings)
        value: String,

        /// Policy storage scope (Windows only; ignored on macOS)
        #[arg(long, value_enum, default_value_t = Scope::Machine)]
        scope: Scope,
    },

    /// List policies available in the catalog
    ListPolicies {
        /// Limit the listing to one platform
        #[arg(long, value_enum)]
        platform: Option<Platform>,
    },
}
