//! Provisioning State Machine
//!
//! Authoritative record of how far a provisioning run has progressed.
//! Transitions are validated so a step can never be skipped or replayed
//! within one run.
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! EnablingServices
//!     ↓
//! EnsuringBucket
//!     ↓
//! EnsuringDataset
//!     ↓
//! EnsuringTable
//!     ↓
//! DeployingService
//!     ↓
//! ResolvingEndpoint
//!     ↓
//! EnsuringInvoker
//!     ↓
//! BindingInvoker
//!     ↓
//! EnsuringTopic
//!     ↓
//! EnsuringSubscription
//!     ↓
//! ConfiguringNotification
//!     ↓
//! Completed
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Provisioning stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProvisionStage {
    NotStarted = 0,
    /// Step 1: enable the provider APIs the pipeline uses
    EnablingServices = 1,
    /// Step 2: upload bucket
    EnsuringBucket = 2,
    /// Step 3: analytics dataset
    EnsuringDataset = 3,
    /// Step 4: metadata table with the fixed schema
    EnsuringTable = 4,
    /// Step 5: rebuild the image and redeploy the processor (unconditional)
    DeployingService = 5,
    /// Step 6: read the deployed service URL
    ResolvingEndpoint = 6,
    /// Step 7: push-auth service account
    EnsuringInvoker = 7,
    /// Step 8: grant the invoker role on the service
    BindingInvoker = 8,
    /// Step 9: message topic
    EnsuringTopic = 9,
    /// Step 10: push subscription (create or update)
    EnsuringSubscription = 10,
    /// Step 11: bucket-change notification (not idempotent)
    ConfiguringNotification = 11,
    /// Setup complete (terminal state)
    Completed = 12,
    /// Aborted on first failure (terminal state)
    Failed = 255,
}

impl ProvisionStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a terminal state (Completed or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true for the stages that perform one of the eleven steps
    #[inline]
    pub const fn is_step(self) -> bool {
        !matches!(self, Self::NotStarted | Self::Completed | Self::Failed)
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::EnablingServices),
            Self::EnablingServices => Some(Self::EnsuringBucket),
            Self::EnsuringBucket => Some(Self::EnsuringDataset),
            Self::EnsuringDataset => Some(Self::EnsuringTable),
            Self::EnsuringTable => Some(Self::DeployingService),
            Self::DeployingService => Some(Self::ResolvingEndpoint),
            Self::ResolvingEndpoint => Some(Self::EnsuringInvoker),
            Self::EnsuringInvoker => Some(Self::BindingInvoker),
            Self::BindingInvoker => Some(Self::EnsuringTopic),
            Self::EnsuringTopic => Some(Self::EnsuringSubscription),
            Self::EnsuringSubscription => Some(Self::ConfiguringNotification),
            Self::ConfiguringNotification => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Human-readable description, used in progress lines and the report
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::EnablingServices => "Enabling required services",
            Self::EnsuringBucket => "Ensuring storage bucket",
            Self::EnsuringDataset => "Ensuring dataset",
            Self::EnsuringTable => "Ensuring table",
            Self::DeployingService => "Building and deploying service",
            Self::ResolvingEndpoint => "Resolving service endpoint",
            Self::EnsuringInvoker => "Ensuring invoker identity",
            Self::BindingInvoker => "Binding invoker role",
            Self::EnsuringTopic => "Ensuring message topic",
            Self::EnsuringSubscription => "Ensuring push subscription",
            Self::ConfiguringNotification => "Configuring bucket notification",
            Self::Completed => "Setup complete",
            Self::Failed => "Setup aborted",
        }
    }

    /// 1-based step number for the eleven step stages
    pub const fn step_number(self) -> Option<u8> {
        if self.is_step() {
            Some(self.order())
        } else {
            None
        }
    }

    /// Returns all stages in order (excluding Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::EnablingServices,
            Self::EnsuringBucket,
            Self::EnsuringDataset,
            Self::EnsuringTable,
            Self::DeployingService,
            Self::ResolvingEndpoint,
            Self::EnsuringInvoker,
            Self::BindingInvoker,
            Self::EnsuringTopic,
            Self::EnsuringSubscription,
            Self::ConfiguringNotification,
            Self::Completed,
        ]
    }

    /// Number of step stages
    pub const STEP_COUNT: u8 = 11;
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionTransitionError {
    #[error("Cannot skip from {from} to {to} (steps run strictly in order)")]
    SkippedStage {
        from: ProvisionStage,
        to: ProvisionStage,
    },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition {
        from: ProvisionStage,
        to: ProvisionStage,
    },

    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: ProvisionStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: ProvisionStage },
}

/// Tracks the progress of one provisioning run.
///
/// # Example
///
/// ```
/// use docpipe_setup::provision_state::{ProvisionStage, ProvisionTracker};
///
/// let mut tracker = ProvisionTracker::new();
/// tracker.advance().unwrap();
/// assert_eq!(tracker.current_stage(), ProvisionStage::EnablingServices);
///
/// // Cannot skip stages
/// assert!(tracker.transition_to(ProvisionStage::EnsuringTopic).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ProvisionTracker {
    current: ProvisionStage,
    failed_at: Option<ProvisionStage>,
}

impl Default for ProvisionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisionTracker {
    pub fn new() -> Self {
        Self {
            current: ProvisionStage::NotStarted,
            failed_at: None,
        }
    }

    #[inline]
    pub fn current_stage(&self) -> ProvisionStage {
        self.current
    }

    /// Returns the stage at which failure occurred, if any
    #[inline]
    pub fn failed_at(&self) -> Option<ProvisionStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == ProvisionStage::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == ProvisionStage::Failed
    }

    /// Advance to the next stage in sequence.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if already at Completed or Failed
    pub fn advance(&mut self) -> Result<ProvisionStage, ProvisionTransitionError> {
        let Some(next_stage) = self.current.next() else {
            return Err(ProvisionTransitionError::FromTerminalState { from: self.current });
        };

        self.current = next_stage;

        Ok(next_stage)
    }

    /// Transition to a specific stage, which must be the immediate next one.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if current is a terminal state
    /// - `AlreadyAtStage` if target is the current stage
    /// - `BackwardTransition` if target is before current
    /// - `SkippedStage` if target is not the immediate next stage
    pub fn transition_to(
        &mut self,
        target: ProvisionStage,
    ) -> Result<ProvisionStage, ProvisionTransitionError> {
        if self.current.is_terminal() {
            return Err(ProvisionTransitionError::FromTerminalState { from: self.current });
        }

        if target == self.current {
            return Err(ProvisionTransitionError::AlreadyAtStage { stage: target });
        }

        // Failed is only reachable through fail()
        if target == ProvisionStage::Failed {
            return Err(ProvisionTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.order() < self.current.order() {
            return Err(ProvisionTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }

        if self.current.next() != Some(target) {
            return Err(ProvisionTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        self.current = target;

        Ok(target)
    }

    /// Mark the run as failed at the current stage.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if already at Completed or Failed
    pub fn fail(&mut self) -> Result<(), ProvisionTransitionError> {
        if self.current.is_terminal() {
            return Err(ProvisionTransitionError::FromTerminalState { from: self.current });
        }

        self.failed_at = Some(self.current);
        self.current = ProvisionStage::Failed;

        Ok(())
    }
}
