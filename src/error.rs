//! Error handling for the provisioning sequencer
//!
//! Library code returns `ProvisionError`; process and config glue use
//! `anyhow` and convert at the boundary through the `Other` variant.

use crate::provision_state::{ProvisionStage, ProvisionTransitionError};
use thiserror::Error;

/// Main error type for a provisioning run
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// A create/update/deploy call exited non-zero. Fatal for the run.
    #[error("{stage} failed: `{command}` exited with code {exit_code}: {stderr}")]
    CommandFailed {
        stage: ProvisionStage,
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// An existence probe failed for a reason other than "not found"
    /// while strict existence checks are enabled
    #[error("Existence check for {resource} was inconclusive: {detail}")]
    ExistenceCheck { resource: String, detail: String },

    /// The deployed service reported no URL
    #[error("Service {service} has no resolvable endpoint URL")]
    EmptyEndpoint { service: String },

    /// No project id from flags, config, or the active gcloud configuration
    #[error(
        "No project id: pass --project, set project_id in the config, \
         or run `gcloud config set project <ID>`"
    )]
    ProjectUnresolved,

    /// Required CLIs missing from PATH
    #[error("Missing required binaries: {}", missing.join(", "))]
    Preflight { missing: Vec<String> },

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sequencer stage machine violations
    #[error("Stage transition error: {0}")]
    Transition(#[from] ProvisionTransitionError),

    /// Spawn/wait failures and other glue errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The stage a command failure happened in, if this error carries one
    pub fn stage(&self) -> Option<ProvisionStage> {
        match self {
            Self::CommandFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
