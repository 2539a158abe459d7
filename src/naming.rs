//! Resource naming and the per-run environment context.
//!
//! `derive_name` is pure: the same project id and resource kind always yield
//! the same name. `EnvironmentContext` computes every name once at run start
//! and is then only ever borrowed.

use crate::config_file::{SetupConfig, validate_project_id};
use crate::error::{ProvisionError, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};

/// Kinds of derived resource names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Bucket,
    Topic,
    Subscription,
    Service,
    Dataset,
    Table,
    InvokerAccount,
    InvokerEmail,
    Image,
}

/// Base names that derivation rules are applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSpec {
    pub bucket_suffix: String,
    pub topic: String,
    pub subscription: String,
    pub service: String,
    pub dataset: String,
    pub table: String,
    pub invoker_account: String,
    pub image_registry: String,
}

impl Default for NameSpec {
    fn default() -> Self {
        Self::from(&SetupConfig::default())
    }
}

impl From<&SetupConfig> for NameSpec {
    fn from(config: &SetupConfig) -> Self {
        Self {
            bucket_suffix: config.bucket_suffix.clone(),
            topic: config.topic.clone(),
            subscription: config.subscription.clone(),
            service: config.service.clone(),
            dataset: config.dataset.clone(),
            table: config.table.clone(),
            invoker_account: config.invoker_account.clone(),
            image_registry: config.image_registry.clone(),
        }
    }
}

impl NameSpec {
    /// Derive the name of `kind` within `project_id`
    pub fn derive(&self, project_id: &str, kind: ResourceKind) -> String {
        match kind {
            // Bucket names are global, so they carry the project id
            ResourceKind::Bucket => format!("{}-{}", project_id, self.bucket_suffix),
            ResourceKind::Topic => self.topic.clone(),
            ResourceKind::Subscription => self.subscription.clone(),
            ResourceKind::Service => self.service.clone(),
            ResourceKind::Dataset => self.dataset.clone(),
            ResourceKind::Table => self.table.clone(),
            ResourceKind::InvokerAccount => self.invoker_account.clone(),
            ResourceKind::InvokerEmail => format!(
                "{}@{}.iam.gserviceaccount.com",
                self.invoker_account, project_id
            ),
            ResourceKind::Image => {
                format!("{}/{}/{}", self.image_registry, project_id, self.service)
            }
        }
    }
}

/// Derive a resource name using the default base names
pub fn derive_name(project_id: &str, kind: ResourceKind) -> String {
    NameSpec::default().derive(project_id, kind)
}

/// Immutable per-run configuration: project, region and every derived name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentContext {
    project_id: String,
    region: String,
    bucket: String,
    topic: String,
    subscription: String,
    service: String,
    dataset: String,
    table: String,
    invoker_account: String,
    invoker_email: String,
    image: String,
    source_dir: PathBuf,
    required_services: Vec<String>,
    strict_existence_checks: bool,
}

impl EnvironmentContext {
    /// Build the context for `project_id`. Names are derived here and never again.
    pub fn new(project_id: &str, config: &SetupConfig) -> Result<Self> {
        let project_id = project_id.trim();
        validate_project_id(project_id).map_err(|e| ProvisionError::config(e.to_string()))?;

        let spec = NameSpec::from(config);
        let name = |kind| spec.derive(project_id, kind);

        Ok(Self {
            project_id: project_id.to_string(),
            region: config.region.trim().to_string(),
            bucket: name(ResourceKind::Bucket),
            topic: name(ResourceKind::Topic),
            subscription: name(ResourceKind::Subscription),
            service: name(ResourceKind::Service),
            dataset: name(ResourceKind::Dataset),
            table: name(ResourceKind::Table),
            invoker_account: name(ResourceKind::InvokerAccount),
            invoker_email: name(ResourceKind::InvokerEmail),
            image: name(ResourceKind::Image),
            source_dir: config.source_dir.clone(),
            required_services: config.required_services.clone(),
            strict_existence_checks: config.strict_existence_checks,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `gs://` URL of the upload bucket
    pub fn bucket_url(&self) -> String {
        format!("gs://{}", self.bucket)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `project:dataset` as `bq` expects it
    pub fn dataset_ref(&self) -> String {
        format!("{}:{}", self.project_id, self.dataset)
    }

    /// `project:dataset.table` as `bq` expects it
    pub fn table_ref(&self) -> String {
        format!("{}:{}.{}", self.project_id, self.dataset, self.table)
    }

    pub fn invoker_account(&self) -> &str {
        &self.invoker_account
    }

    pub fn invoker_email(&self) -> &str {
        &self.invoker_email
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn required_services(&self) -> &[String] {
        &self.required_services
    }

    pub fn strict_existence_checks(&self) -> bool {
        self.strict_existence_checks
    }

    /// Environment variables handed to the deployed processor unchanged
    pub fn service_env_vars(&self) -> Vec<(String, String)> {
        vec![
            ("BQ_DATASET".to_string(), self.dataset.clone()),
            ("BQ_TABLE".to_string(), self.table.clone()),
        ]
    }

    /// Name/value rows for display (`names` subcommand, run banner)
    pub fn name_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("project", self.project_id.clone()),
            ("region", self.region.clone()),
            ("bucket", self.bucket_url()),
            ("dataset", self.dataset_ref()),
            ("table", self.table_ref()),
            ("service", self.service.clone()),
            ("image", self.image.clone()),
            ("invoker", self.invoker_email.clone()),
            ("topic", self.topic.clone()),
            ("subscription", self.subscription.clone()),
        ]
    }
}

/// URL of the deployed processor. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServiceEndpoint(String);

impl ServiceEndpoint {
    /// Parse the output of the endpoint query; `None` if it is blank
    pub fn parse(raw: &str) -> Option<Self> {
        let url = raw.trim();
        if url.is_empty() {
            None
        } else {
            Some(Self(url.to_string()))
        }
    }

    /// Stand-in used when previewing a service that has not been deployed yet
    pub fn placeholder(service: &str) -> Self {
        Self(format!("https://{}.dry-run.invalid", service))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
