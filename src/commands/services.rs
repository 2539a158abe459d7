//! Provider API enablement.

use super::project_flag;
use crate::command_traits::{CloudCommand, Program};

/// `gcloud services enable <api>... --project <id>`
///
/// Enabling an already-enabled API is a no-op on the provider side, so this
/// step runs unconditionally.
#[derive(Debug, Clone)]
pub struct ServicesEnableArgs {
    pub services: Vec<String>,
    pub project: String,
}

impl CloudCommand for ServicesEnableArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["services".to_string(), "enable".to_string()];
        args.extend(self.services.iter().cloned());
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}
