//! docpipe-setup Library
//!
//! Idempotent provisioning of the document-processing pipeline: a storage
//! bucket whose uploads publish to a topic, a push subscription delivering
//! to a containerized processor, and an analytics table the processor writes
//! metadata into.

pub mod cli;
pub mod command_runner;
pub mod command_traits;
pub mod commands;
pub mod config_file;
pub mod error;
pub mod naming;
pub mod preflight;
pub mod process_guard;
pub mod provision_state;
pub mod provisioner;
pub mod report;
pub mod schema;

// Re-export main types for convenience
pub use command_runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use command_traits::{CloudCommand, Program};
pub use config_file::SetupConfig;
pub use error::ProvisionError;
pub use naming::{EnvironmentContext, ResourceKind, ServiceEndpoint, derive_name};
pub use process_guard::{ChildCleanupGuard, ChildRegistry, CommandProcessGroup};
pub use provision_state::{ProvisionStage, ProvisionTracker, ProvisionTransitionError};
pub use provisioner::{Existence, Provisioner, classify_probe, resolve_project_id};
pub use report::{SetupReport, StepOutcome, StepRecord};
pub use schema::{Column, ColumnType, METADATA_COLUMNS};
