use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[default]
    Pending,
    Processing,
    Paused,
    Completed,
    Stopped,
    Error,
}

impl TaskStatus {
    /// Completed, Stopped and Error are final until an explicit reset
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }

    /// A process exists (running or suspended)
    pub fn is_active(self) -> bool {
        matches!(self, Self::Processing | Self::Paused)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Pending, Processing | Stopped | Error) => true,
            (Processing, Paused | Completed | Stopped | Error) => true,
            (Paused, Processing | Completed | Stopped | Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Notification from the runner's reader and waiter threads
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// Status changed; sent while the task lock is held, so per-task order is exact
    StatusChanged { task_id: Uuid, status: TaskStatus },

    /// One line of ffmpeg output
    OutputReceived { task_id: Uuid, line: String },

    /// New progress data is staged and waiting for `drain()`
    ProgressUpdated { task_id: Uuid },
}

impl TaskEvent {
    pub fn task_id(&self) -> Uuid {
        match self {
            Self::StatusChanged { task_id, .. }
            | Self::OutputReceived { task_id, .. }
            | Self::ProgressUpdated { task_id } => *task_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("cannot move task from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("task {0} is not in the queue")]
    NotFound(Uuid),

    #[error("input file not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("failed to start ffmpeg")]
    Spawn(#[source] std::io::Error),
}
