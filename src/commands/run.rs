//! Cloud Build and Cloud Run calls.

use super::project_flag;
use crate::command_traits::{CloudCommand, Program};
use std::path::PathBuf;

/// Role the push identity needs on the service
pub const INVOKER_ROLE: &str = "roles/run.invoker";

/// `gcloud builds submit --tag <image> --project <id> <source_dir>`
#[derive(Debug, Clone)]
pub struct BuildSubmitArgs {
    pub image: String,
    pub project: String,
    pub source_dir: PathBuf,
}

impl CloudCommand for BuildSubmitArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "builds".to_string(),
            "submit".to_string(),
            "--tag".to_string(),
            self.image.clone(),
        ];
        args.extend(project_flag(&self.project));
        args.push(self.source_dir.display().to_string());
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

/// `gcloud run deploy <service> --image <image> ... --set-env-vars K=V,...`
///
/// Deploys are unconditional: every run pushes a new revision and
/// overwrites the service's environment.
#[derive(Debug, Clone)]
pub struct RunDeployArgs {
    pub service: String,
    pub image: String,
    pub region: String,
    pub project: String,
    pub env_vars: Vec<(String, String)>,
    /// Push delivery authenticates, so public access stays off by default
    pub allow_unauthenticated: bool,
}

impl RunDeployArgs {
    /// `K=V,K=V` form accepted by `--set-env-vars`
    pub fn env_vars_flag_value(&self) -> String {
        self.env_vars
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl CloudCommand for RunDeployArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "deploy".to_string(),
            self.service.clone(),
            "--image".to_string(),
            self.image.clone(),
            "--region".to_string(),
            self.region.clone(),
            "--platform".to_string(),
            "managed".to_string(),
        ];
        if self.allow_unauthenticated {
            args.push("--allow-unauthenticated".to_string());
        } else {
            args.push("--no-allow-unauthenticated".to_string());
        }
        if !self.env_vars.is_empty() {
            args.push("--set-env-vars".to_string());
            args.push(self.env_vars_flag_value());
        }
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

/// `gcloud run services describe <service> --format value(status.url)`
#[derive(Debug, Clone)]
pub struct ServiceUrlArgs {
    pub service: String,
    pub region: String,
    pub project: String,
}

impl CloudCommand for ServiceUrlArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "services".to_string(),
            "describe".to_string(),
            self.service.clone(),
            "--region".to_string(),
            self.region.clone(),
            "--platform".to_string(),
            "managed".to_string(),
            "--format".to_string(),
            "value(status.url)".to_string(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `gcloud run services add-iam-policy-binding <service> --member ... --role ...`
///
/// Adding a binding that already exists leaves the policy unchanged.
#[derive(Debug, Clone)]
pub struct AddInvokerBindingArgs {
    pub service: String,
    pub member_email: String,
    pub role: String,
    pub region: String,
    pub project: String,
}

impl CloudCommand for AddInvokerBindingArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "services".to_string(),
            "add-iam-policy-binding".to_string(),
            self.service.clone(),
            "--member".to_string(),
            format!("serviceAccount:{}", self.member_email),
            "--role".to_string(),
            self.role.clone(),
            "--region".to_string(),
            self.region.clone(),
            "--platform".to_string(),
            "managed".to_string(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}
