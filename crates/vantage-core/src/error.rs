//! Error types shared by the scheduler and its hosts.

use thiserror::Error;

/// Terminal failure of a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The owning listener was disabled while the task was suspended.
    #[error("listener {listener} is not running, task cancelled")]
    ListenerNotActive { listener: String },
    /// The task was cancelled explicitly.
    #[error("task cancelled")]
    Cancelled,
    /// The task body reported a fault.
    #[error("task failed: {0}")]
    Failed(String),
}

impl TaskError {
    /// Cancellation-kind errors end a task quietly instead of being reported.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            TaskError::ListenerNotActive { .. } | TaskError::Cancelled
        )
    }
}

/// Result type of every task body.
pub type TaskResult = Result<(), TaskError>;

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
