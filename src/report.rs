//! Structured record of a provisioning run.

use crate::naming::ServiceEndpoint;
use crate::provision_state::ProvisionStage;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use strum::Display;

/// What a step did to its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepOutcome {
    Created,
    AlreadyExists,
    Updated,
    /// Unconditional step ran (enable, deploy, bind, notify)
    Applied,
    /// Endpoint read from the deployed service
    Resolved,
    /// Mutation skipped by dry-run
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub stage: ProvisionStage,
    pub outcome: StepOutcome,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupReport {
    pub project_id: String,
    pub region: String,
    pub dry_run: bool,
    pub endpoint: Option<ServiceEndpoint>,
    pub steps: Vec<StepRecord>,
    pub failed_at: Option<ProvisionStage>,
}

impl SetupReport {
    pub fn new(project_id: &str, region: &str, dry_run: bool) -> Self {
        Self {
            project_id: project_id.to_string(),
            region: region.to_string(),
            dry_run,
            ..Default::default()
        }
    }

    pub fn record(
        &mut self,
        stage: ProvisionStage,
        outcome: StepOutcome,
        detail: impl Into<String>,
    ) {
        self.steps.push(StepRecord {
            stage,
            outcome,
            detail: detail.into(),
        });
    }

    /// Outcome recorded for `stage`, if it ran
    pub fn outcome_of(&self, stage: ProvisionStage) -> Option<StepOutcome> {
        self.steps.iter().find(|s| s.stage == stage).map(|s| s.outcome)
    }

    pub fn is_success(&self) -> bool {
        self.failed_at.is_none() && self.steps.len() == ProvisionStage::STEP_COUNT as usize
    }

    /// Human-readable summary table
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Provisioning summary for {} ({})", self.project_id, self.region);
        for step in &self.steps {
            let _ = writeln!(
                out,
                "  {:>2}. {:<34} {:<15} {}",
                step.stage.step_number().unwrap_or(0),
                step.stage.description(),
                step.outcome,
                step.detail
            );
        }
        if let Some(stage) = self.failed_at {
            let _ = writeln!(out, "  Aborted at: {}", stage);
        }
        if let Some(endpoint) = &self.endpoint {
            let _ = writeln!(out, "  Endpoint: {}", endpoint);
        }
        out
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize setup report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lookup() {
        let mut report = SetupReport::new("acme-docs", "us-central1", false);
        report.record(ProvisionStage::EnablingServices, StepOutcome::Applied, "5 services");
        report.record(ProvisionStage::EnsuringBucket, StepOutcome::AlreadyExists, "gs://b");

        assert_eq!(
            report.outcome_of(ProvisionStage::EnsuringBucket),
            Some(StepOutcome::AlreadyExists)
        );
        assert_eq!(report.outcome_of(ProvisionStage::EnsuringTopic), None);
        assert!(!report.is_success());
    }

    #[test]
    fn test_summary_marks_abort() {
        let mut report = SetupReport::new("acme-docs", "us-central1", false);
        report.record(ProvisionStage::EnablingServices, StepOutcome::Applied, "");
        report.failed_at = Some(ProvisionStage::EnsuringBucket);

        let summary = report.render_summary();
        assert!(summary.contains("Enabling required services"));
        assert!(summary.contains("applied"));
        assert!(summary.contains("Aborted at: Ensuring storage bucket"));
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let mut report = SetupReport::new("acme-docs", "us-central1", true);
        report.record(ProvisionStage::EnsuringTopic, StepOutcome::AlreadyExists, "t");
        report.endpoint = ServiceEndpoint::parse("https://x.a.run.app");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["stage"], "ensuring_topic");
        assert_eq!(json["steps"][0]["outcome"], "already_exists");
        assert_eq!(json["endpoint"], "https://x.a.run.app");
        assert_eq!(json["dry_run"], true);
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        SetupReport::new("acme-docs", "us-central1", false)
            .save_to_file(&path)
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"project_id\": \"acme-docs\""));
    }
}
