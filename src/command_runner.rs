//! Cloud CLI execution
//!
//! `CommandRunner` is the seam between the sequencer and the outside world.
//! `ProcessRunner` is the production implementation: it spawns the provider
//! CLI in its own process group, registers the PID for signal cleanup, and
//! captures output. Tests substitute an in-memory control plane.
//!
//! # Dry-run
//!
//! In dry-run mode read-only probes still execute so the preview reflects
//! the real project; mutating calls are printed and skipped.

use crate::command_traits::CloudCommand;
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Runs typed cloud CLI commands
pub trait CommandRunner {
    /// Execute `command` and return its captured output.
    ///
    /// A non-zero exit is reported through `CommandOutput::success`, not as
    /// `Err`; `Err` means the command could not be run at all.
    fn run(&self, command: &dyn CloudCommand) -> Result<CommandOutput>;

    /// Whether mutating commands are being skipped
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Output from a CLI execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// None if terminated by signal
    pub exit_code: Option<i32>,
    pub success: bool,
    /// True when the command was skipped by dry-run
    pub dry_run: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
            dry_run: false,
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            success: false,
            dry_run: false,
        }
    }

    /// Placeholder result for a mutation skipped by dry-run
    pub fn skipped() -> Self {
        Self {
            dry_run: true,
            ..Self::ok("")
        }
    }

    /// Exit code, with -1 standing in for signal termination
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }
}

/// Spawns the real provider CLIs
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    dry_run: bool,
}

impl ProcessRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &dyn CloudCommand) -> Result<CommandOutput> {
        let rendered = command.render();

        if self.dry_run && command.is_mutating() {
            tracing::info!(command = %rendered, "dry-run: skipping mutating command");
            println!("[DRY RUN] {}", rendered);
            return Ok(CommandOutput::skipped());
        }

        let env_vars = command.get_env_vars();
        tracing::debug!(command = %rendered, env = ?env_vars, "spawning");

        let binary = command.program().binary();
        let mut cmd = Command::new(binary);
        cmd.args(command.to_cli_args())
            // Never block on an interactive prompt
            .env("CLOUDSDK_CORE_DISABLE_PROMPTS", "1")
            .envs(env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group();

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn {}", binary))?;
        let pid = child.id();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let output = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        let output = output.with_context(|| format!("Failed waiting for `{}`", rendered))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            success: output.status.success(),
            dry_run: false,
        };

        // Mutations surface whatever the CLI printed; probe output stays in the debug log
        if command.is_mutating() {
            if !result.stdout.is_empty() {
                print!("{}", result.stdout);
            }
            if !result.stderr.is_empty() {
                eprint!("{}", result.stderr);
            }
        } else {
            tracing::trace!(
                stdout = %result.stdout.trim(),
                stderr = %result.stderr.trim(),
                "lookup output"
            );
        }

        tracing::debug!(command = %rendered, exit_code = result.code(), "finished");
        Ok(result)
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
