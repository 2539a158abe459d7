//! Active gcloud configuration lookups.

use crate::command_traits::{CloudCommand, Program};

/// `gcloud config get-value project`
///
/// Prints the project id of the active configuration, or `(unset)` /
/// nothing when none is configured.
#[derive(Debug, Clone, Default)]
pub struct ConfigGetProjectArgs;

impl CloudCommand for ConfigGetProjectArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["config".into(), "get-value".into(), "project".into()]
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// Interpret `gcloud config get-value project` output.
///
/// gcloud prints `(unset)` (or an empty line) when no project is active.
pub fn parse_project_value(stdout: &str) -> Option<String> {
    let value = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    if value == "(unset)" {
        None
    } else {
        Some(value.to_string())
    }
}
