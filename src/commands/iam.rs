//! Service account calls for the push invoker identity.

use super::project_flag;
use crate::command_traits::{CloudCommand, Program};

pub const INVOKER_DISPLAY_NAME: &str = "Pub/Sub Cloud Run Invoker";

/// `gcloud iam service-accounts describe <email> --project <id>`
#[derive(Debug, Clone)]
pub struct ServiceAccountDescribeArgs {
    pub email: String,
    pub project: String,
}

impl CloudCommand for ServiceAccountDescribeArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "iam".to_string(),
            "service-accounts".to_string(),
            "describe".to_string(),
            self.email.clone(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `gcloud iam service-accounts create <id> --display-name <name> --project <id>`
#[derive(Debug, Clone)]
pub struct ServiceAccountCreateArgs {
    pub account_id: String,
    pub display_name: String,
    pub project: String,
}

impl CloudCommand for ServiceAccountCreateArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "iam".to_string(),
            "service-accounts".to_string(),
            "create".to_string(),
            self.account_id.clone(),
            "--display-name".to_string(),
            self.display_name.clone(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}
