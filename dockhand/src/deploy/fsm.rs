//! Finite State Machine for a single deploy/update run

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Deploy run settings
#[derive(Debug, Clone)]
pub struct FsmSettings {
    /// Wait between starting the new container and reading its status
    pub settle_delay: Duration,
}

impl Default for FsmSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(5),
        }
    }
}

/// Deploy phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
    /// Nothing done yet
    Pending,

    /// Fetching and hard-resetting the source tree
    SyncingSource,

    /// Recording the id of the image currently tagged
    SnapshottingImage,

    /// Building the new image
    Building,

    /// Stopping the previous deployment
    TearingDown,

    /// Emptying the container log directory
    PurgingLogs,

    /// Starting the new deployment
    Starting,

    /// Removing the superseded image and dangling layers
    PruningImages,

    /// Showing service status
    Verifying,

    /// Every phase finished
    Completed,

    /// A phase failed; the rest was skipped
    Failed,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployPhase::Pending => "pending",
            DeployPhase::SyncingSource => "sync source",
            DeployPhase::SnapshottingImage => "snapshot image",
            DeployPhase::Building => "build",
            DeployPhase::TearingDown => "teardown",
            DeployPhase::PurgingLogs => "purge logs",
            DeployPhase::Starting => "start",
            DeployPhase::PruningImages => "prune images",
            DeployPhase::Verifying => "verify",
            DeployPhase::Completed => "completed",
            DeployPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Deploy event
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// Begin the run
    Start,

    /// The current phase finished
    PhaseDone,

    /// The current phase failed
    PhaseFailed(String),
}

/// Deploy FSM.
///
/// Phases run strictly in order; there is no way back once a phase is done,
/// and a failure is terminal for the run.
#[derive(Debug, Clone)]
pub struct DeployFsm {
    phase: DeployPhase,
    failed_at: Option<DeployPhase>,
    error: Option<String>,
    history: Vec<DeployPhase>,
}

impl DeployFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            phase: DeployPhase::Pending,
            failed_at: None,
            error: None,
            history: Vec::new(),
        }
    }

    /// Get current phase
    pub fn phase(&self) -> DeployPhase {
        self.phase
    }

    /// Phase that failed, if any
    pub fn failed_at(&self) -> Option<DeployPhase> {
        self.failed_at
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Phases completed so far, in order
    pub fn completed(&self) -> &[DeployPhase] {
        &self.history
    }

    /// Whether the run reached [`DeployPhase::Completed`]
    pub fn is_complete(&self) -> bool {
        self.phase == DeployPhase::Completed
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeployEvent) -> Result<DeployPhase, DeployError> {
        let new_phase = match (self.phase, &event) {
            (DeployPhase::Pending, DeployEvent::Start) => DeployPhase::SyncingSource,

            (DeployPhase::Pending, _) | (DeployPhase::Completed, _) | (DeployPhase::Failed, _) => {
                return Err(DeployError::InvalidTransition(format!(
                    "{} -> {:?}",
                    self.phase, event
                )));
            }

            (current, DeployEvent::PhaseDone) => {
                self.history.push(current);
                next_phase(current)
            }

            (current, DeployEvent::PhaseFailed(err)) => {
                self.failed_at = Some(current);
                self.error = Some(err.clone());
                DeployPhase::Failed
            }

            (current, DeployEvent::Start) => {
                return Err(DeployError::InvalidTransition(format!(
                    "{} -> {:?}: run already started",
                    current, event
                )));
            }
        };

        self.phase = new_phase;
        Ok(new_phase)
    }
}

impl Default for DeployFsm {
    fn default() -> Self {
        Self::new()
    }
}

fn next_phase(phase: DeployPhase) -> DeployPhase {
    match phase {
        DeployPhase::Pending => DeployPhase::SyncingSource,
        DeployPhase::SyncingSource => DeployPhase::SnapshottingImage,
        DeployPhase::SnapshottingImage => DeployPhase::Building,
        DeployPhase::Building => DeployPhase::TearingDown,
        DeployPhase::TearingDown => DeployPhase::PurgingLogs,
        DeployPhase::PurgingLogs => DeployPhase::Starting,
        DeployPhase::Starting => DeployPhase::PruningImages,
        DeployPhase::PruningImages => DeployPhase::Verifying,
        DeployPhase::Verifying => DeployPhase::Completed,
        DeployPhase::Completed => DeployPhase::Completed,
        DeployPhase::Failed => DeployPhase::Failed,
    }
}
