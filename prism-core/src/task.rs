//! Generation task lifecycle

use crate::{MediaKind, TaskStateError, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a remote generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Submitted,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::TimedOut | TaskState::Canceled
        )
    }

    fn rank(&self) -> u8 {
        match self {
            TaskState::Submitted => 0,
            TaskState::Running => 1,
            _ => 2,
        }
    }
}

/// A single provider job, owned by the request that submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationTask {
    pub task_id: String,
    pub kind: MediaKind,
    state: TaskState,
    pub submitted_at: Timestamp,
    pub last_polled_at: Option<Timestamp>,
    result_url: Option<String>,
    failure_reason: Option<String>,
}

impl GenerationTask {
    pub fn submitted(task_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            state: TaskState::Submitted,
            submitted_at: Utc::now(),
            last_polled_at: None,
            result_url: None,
            failure_reason: None,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Remote result URL, present only once `Succeeded`.
    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    /// Failure reason, present only in `Failed` or `TimedOut`.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn record_poll(&mut self) {
        self.last_polled_at = Some(Utc::now());
    }

    /// Observe a non-terminal provider state. Going backwards is a no-op.
    pub fn mark_running(&mut self) -> Result<(), TaskStateError> {
        self.advance(TaskState::Running)
    }

    pub fn succeed(&mut self, result_url: impl Into<String>) -> Result<(), TaskStateError> {
        self.advance(TaskState::Succeeded)?;
        self.result_url = Some(result_url.into());
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TaskStateError> {
        self.advance(TaskState::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), TaskStateError> {
        self.advance(TaskState::Canceled)
    }

    /// Local deadline expiry. Only reachable from `Submitted` or `Running`.
    pub fn time_out(&mut self, reason: impl Into<String>) -> Result<(), TaskStateError> {
        self.advance(TaskState::TimedOut)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn advance(&mut self, to: TaskState) -> Result<(), TaskStateError> {
        if self.state.is_terminal() {
            return Err(TaskStateError::AlreadyTerminal {
                task_id: self.task_id.clone(),
                from: self.state,
                to,
            });
        }
        if to.rank() > self.state.rank() {
            self.state = to;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
