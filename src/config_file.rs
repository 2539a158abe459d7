//! Configuration file handling for provisioning runs.
//!
//! Every field has a default, so an absent or partial file yields the
//! pipeline's standard layout. The file only overrides base names; the
//! derivation rules live in `naming`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_BUCKET_SUFFIX: &str = "doc-uploads";
pub const DEFAULT_TOPIC: &str = "doc-processing-topic";
pub const DEFAULT_SUBSCRIPTION: &str = "doc-processing-sub";
pub const DEFAULT_SERVICE: &str = "doc-processor";
pub const DEFAULT_DATASET: &str = "doc_processing";
pub const DEFAULT_TABLE: &str = "metadata";
pub const DEFAULT_INVOKER_ACCOUNT: &str = "pubsub-invoker";
pub const DEFAULT_IMAGE_REGISTRY: &str = "gcr.io";

/// Provider APIs enabled in step 1
pub const DEFAULT_REQUIRED_SERVICES: &[&str] = &[
    "run.googleapis.com",
    "pubsub.googleapis.com",
    "storage.googleapis.com",
    "bigquery.googleapis.com",
    "cloudbuild.googleapis.com",
];

/// Provisioning configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Overrides `gcloud config get-value project` when set
    pub project_id: Option<String>,
    pub region: String,

    // Resource base names
    pub bucket_suffix: String,
    pub topic: String,
    pub subscription: String,
    pub service: String,
    pub dataset: String,
    pub table: String,
    pub invoker_account: String,

    // Build
    pub image_registry: String,
    /// Directory submitted to the build (contains the processor's Dockerfile)
    pub source_dir: PathBuf,

    pub required_services: Vec<String>,

    /// Abort when an existence probe fails for a reason other than "not found"
    pub strict_existence_checks: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            region: DEFAULT_REGION.to_string(),
            bucket_suffix: DEFAULT_BUCKET_SUFFIX.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            subscription: DEFAULT_SUBSCRIPTION.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            table: DEFAULT_TABLE.to_string(),
            invoker_account: DEFAULT_INVOKER_ACCOUNT.to_string(),
            image_registry: DEFAULT_IMAGE_REGISTRY.to_string(),
            source_dir: PathBuf::from("."),
            required_services: DEFAULT_REQUIRED_SERVICES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            strict_existence_checks: false,
        }
    }
}

impl SetupConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate names against the provider's naming rules
    pub fn validate(&self) -> Result<()> {
        if let Some(project) = &self.project_id {
            validate_project_id(project)?;
        }

        let region = self.region.trim();
        if region.is_empty() {
            anyhow::bail!("Region must be specified");
        }
        if !region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            anyhow::bail!("Region '{}' must be lowercase letters, digits and dashes", region);
        }

        if self.bucket_suffix.is_empty()
            || !self
                .bucket_suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            anyhow::bail!(
                "Bucket suffix '{}' must be non-empty lowercase letters, digits, \
                 dashes or underscores",
                self.bucket_suffix
            );
        }

        validate_pubsub_name("Topic", &self.topic)?;
        validate_pubsub_name("Subscription", &self.subscription)?;
        validate_bigquery_id("Dataset", &self.dataset)?;
        validate_bigquery_id("Table", &self.table)?;

        // Cloud Run: lowercase letters, digits, dashes; starts with a letter; < 50 chars
        let service = self.service.as_str();
        if service.is_empty() || service.len() > 49 {
            anyhow::bail!("Service name must be 1-49 characters long");
        }
        if !service.starts_with(|c: char| c.is_ascii_lowercase()) || service.ends_with('-') {
            anyhow::bail!("Service name must start with a letter and not end with a dash");
        }
        if !service
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            anyhow::bail!("Service name can only contain lowercase letters, digits and dashes");
        }

        // Service account ids: 6-30 chars, lowercase, starts with a letter
        let account = self.invoker_account.as_str();
        if account.len() < 6 || account.len() > 30 {
            anyhow::bail!("Invoker account id must be 6-30 characters long");
        }
        if !account.starts_with(|c: char| c.is_ascii_lowercase())
            || !account
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            anyhow::bail!(
                "Invoker account id must start with a letter and contain only \
                 lowercase letters, digits and dashes"
            );
        }

        if self.image_registry.trim().is_empty() {
            anyhow::bail!("Image registry must be specified");
        }

        if self.required_services.iter().any(|s| s.trim().is_empty()) {
            anyhow::bail!("Required services cannot contain empty entries");
        }

        Ok(())
    }
}

/// Project ids: 6-30 chars, lowercase letters, digits, dashes; starts with a letter.
///
/// Legacy domain-scoped ids (`example.com:my-proj`) are rejected: derived
/// bucket and image names cannot carry the domain prefix.
pub fn validate_project_id(project: &str) -> Result<()> {
    if project.contains(':') {
        anyhow::bail!(
            "Project id '{}' is domain-scoped, which is not supported: \
             bucket and image names cannot contain ':'",
            project
        );
    }
    if project.len() < 6 || project.len() > 30 {
        anyhow::bail!("Project id '{}' must be 6-30 characters long", project);
    }
    if !project.starts_with(|c: char| c.is_ascii_lowercase()) || project.ends_with('-') {
        anyhow::bail!(
            "Project id '{}' must start with a letter and not end with a dash",
            project
        );
    }
    if !project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        anyhow::bail!(
            "Project id '{}' can only contain lowercase letters, digits and dashes",
            project
        );
    }
    Ok(())
}

fn validate_pubsub_name(kind: &str, name: &str) -> Result<()> {
    if name.len() < 3 || name.len() > 255 {
        anyhow::bail!("{} name must be 3-255 characters long", kind);
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        anyhow::bail!("{} name must start with a letter", kind);
    }
    if name.starts_with("goog") {
        anyhow::bail!("{} name cannot start with 'goog'", kind);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_.~+%".contains(c))
    {
        anyhow::bail!("{} name contains characters outside [A-Za-z0-9-_.~+%]", kind);
    }
    Ok(())
}

fn validate_bigquery_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 1024 {
        anyhow::bail!("{} id must be 1-1024 characters long", kind);
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("{} id can only contain letters, numbers, and underscores", kind);
    }
    Ok(())
}
