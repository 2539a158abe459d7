//! Type-safe argument structs for every provider CLI call.
//!
//! Each struct implements `CloudCommand` and maps its fields to the exact
//! flags the corresponding `gcloud` / `gsutil` / `bq` subcommand expects.

pub mod bigquery;
pub mod iam;
pub mod project;
pub mod pubsub;
pub mod run;
pub mod services;
pub mod storage;

/// `--project <id>` pair appended to most gcloud calls
pub(crate) fn project_flag(project: &str) -> [String; 2] {
    ["--project".to_string(), project.to_string()]
}
