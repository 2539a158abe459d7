use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// docpipe-setup - provision the document-processing pipeline
#[derive(Parser)]
#[command(name = "docpipe-setup")]
#[command(about = "Idempotently provision the document-processing pipeline on Google Cloud")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Existence checks still run so the preview reflects the real project.
    /// Create, update and deploy calls are printed and skipped.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every provisioning step in order
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Do not check that gcloud, gsutil and bq are installed
        #[arg(long)]
        skip_preflight: bool,
    },
    /// Print the derived resource names without touching the project
    Names {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options selecting the environment to provision
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Path to configuration file (defaults are used otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Project id (overrides the config file and the active gcloud project)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Region (overrides the config file)
    #[arg(short, long)]
    pub region: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter directive for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
