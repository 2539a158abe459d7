//! Pre-flight checks for the runtime environment
//!
//! Verifies that the provider CLIs the sequencer drives are on `PATH` before
//! the first step runs, so a missing tool fails up front instead of halfway
//! through the pipeline.

use crate::command_traits::Program;
use crate::error::{ProvisionError, Result};
use strum::IntoEnumIterator;

/// Result of environment verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub missing_binaries: Vec<String>,
}

impl PreflightReport {
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty()
    }

    /// Convert into an error if anything is missing
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ProvisionError::Preflight {
                missing: self.missing_binaries,
            })
        }
    }
}

/// Check every program against `lookup`
pub fn verify_with<F>(lookup: F) -> PreflightReport
where
    F: Fn(&str) -> bool,
{
    let missing_binaries = Program::iter()
        .map(Program::binary)
        .filter(|binary| !lookup(binary))
        .map(str::to_string)
        .collect();

    PreflightReport { missing_binaries }
}

fn binary_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Verify the real `PATH`
pub fn verify_environment() -> PreflightReport {
    let report = verify_with(binary_exists);
    if report.is_ok() {
        tracing::debug!("pre-flight checks passed");
    } else {
        tracing::warn!(missing = ?report.missing_binaries, "pre-flight checks failed");
    }
    report
}

/// How to obtain a missing binary
pub fn install_hint(binary: &str) -> &'static str {
    match binary {
        "gcloud" => "install the Google Cloud SDK: https://cloud.google.com/sdk/docs/install",
        "gsutil" => "gcloud components install gsutil",
        "bq" => "gcloud components install bq",
        _ => "install the Google Cloud SDK",
    }
}

/// Print a readable failure message to stderr
pub fn print_failure(report: &PreflightReport) {
    eprintln!();
    eprintln!("Pre-flight check failed: missing required binaries");
    for binary in &report.missing_binaries {
        eprintln!("  • {} ({})", binary, install_hint(binary));
    }
    eprintln!();
}
