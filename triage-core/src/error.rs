//! Scheduler error type.
//!
//! Every variant is raised before any mutation, so a failed request leaves
//! the task collection exactly as it was.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("task title must not be empty")]
    MissingTitle,

    #[error("task due date is required")]
    MissingDueDate,

    #[error("estimated time must be at least 1 minute (got {0})")]
    InvalidEstimate(u32),

    #[error("task not found: {0}")]
    NotFound(TaskId),
}

impl SchedulerError {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::MissingTitle => "missing_title",
            SchedulerError::MissingDueDate => "missing_due_date",
            SchedulerError::InvalidEstimate(_) => "invalid_estimate",
            SchedulerError::NotFound(_) => "not_found",
        }
    }

    pub fn is_validation(&self) -> bool {
        !matches!(self, SchedulerError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
