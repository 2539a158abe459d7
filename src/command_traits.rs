//! Type-safe cloud CLI argument contracts.
//!
//! Each provider call is a struct implementing `CloudCommand`. The struct
//! definition is the contract: flag names live in exactly one place, and the
//! runner never sees a hand-assembled argv.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// The provider CLIs the sequencer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Program {
    Gcloud,
    Gsutil,
    Bq,
}

impl Program {
    /// Executable name looked up on PATH
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Gcloud => "gcloud",
            Self::Gsutil => "gsutil",
            Self::Bq => "bq",
        }
    }
}

/// Trait for typed cloud CLI invocations.
///
/// # Contract
///
/// - `program()`: which CLI to run.
/// - `to_cli_args()`: arguments exactly as the CLI expects them (no shell parsing).
/// - `get_env_vars()`: extra environment for the child process.
/// - `is_mutating()`: false for read-only probes. Dry-run still executes
///   probes so the preview reflects the real environment.
///
/// # Example
///
/// ```
/// use docpipe_setup::command_traits::CloudCommand;
/// use docpipe_setup::commands::pubsub::TopicCreateArgs;
///
/// let args = TopicCreateArgs {
///     topic: "doc-processing-topic".to_string(),
///     project: "acme-docs".to_string(),
/// };
/// assert_eq!(
///     args.render(),
///     "gcloud pubsub topics create doc-processing-topic --project acme-docs"
/// );
/// ```
pub trait CloudCommand {
    fn program(&self) -> Program;

    fn to_cli_args(&self) -> Vec<String>;

    /// Additional environment variables. Most calls need none.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![]
    }

    /// Whether this call changes cloud state
    fn is_mutating(&self) -> bool;

    /// Full command line, shell-quoted, for logs and dry-run output
    fn render(&self) -> String {
        let mut words = vec![self.program().binary().to_string()];
        words.extend(self.to_cli_args());
        shell_words::join(words)
    }
}
