//! Custom error types for the goal engine.
//!
//! Every error carries a discriminated [`ErrorKind`] and a stable
//! snake_case [`EngineError::code`] so the presentation layer can render a
//! specific remedy ("upgrade tier" vs. "choose a later date") instead of a
//! generic failure. Degenerate computations (zero-weight goals, zero-length
//! timelines) are never errors; they produce well-defined zero/null values.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{GoalId, TaskId, TaskType};
use crate::tier::Tier;

/// Broad classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input shape (missing or malformed request fields).
    Validation,
    /// The request is well-formed but forbidden by policy.
    PolicyViolation,
    /// A goal, task or consultation id did not resolve.
    NotFound,
    /// The backing datastore or activity log failed.
    Storage,
    /// Configuration could not be loaded or is invalid.
    Config,
    /// Anything else.
    Internal,
}

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// A request field failed validation
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Consultation booking without any discussion topic
    #[error("At least one discussion topic must be selected")]
    NoTopicsSelected,

    // =========================================================================
    // Policy Violations
    // =========================================================================
    /// Caller's membership tier is below the required minimum
    #[error("Membership tier '{actual}' is insufficient; '{required}' or higher is required")]
    InsufficientTier { required: Tier, actual: Tier },

    /// Consultation requested too close to now
    #[error("Consultations must be booked at least {minimum_days} days ahead (requested {requested_hours}h ahead)")]
    LeadTimeTooShort {
        minimum_days: i64,
        requested_hours: i64,
    },

    /// Task completion is reserved for another actor
    #[error("Task {task_id} is {task_type} and cannot be completed by the learner")]
    CompletionReserved { task_id: TaskId, task_type: TaskType },

    // =========================================================================
    // Not Found
    // =========================================================================
    /// Goal id did not resolve
    #[error("Goal not found: {id}")]
    GoalNotFound { id: GoalId },

    /// Task id did not resolve within the goal
    #[error("Task {task_id} not found in goal {goal_id}")]
    TaskNotFound { goal_id: GoalId, task_id: TaskId },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Datastore failure
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        path: Option<PathBuf>,
    },

    /// Activity log could not be read or written
    #[error("Activity log unavailable: {message}")]
    ActivityLogUnavailable { message: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: None,
        }
    }

    /// Create a storage error with path
    pub fn storage_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Storage {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an activity log error
    pub fn activity_log(message: impl Into<String>) -> Self {
        Self::ActivityLogUnavailable {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create a task-not-found error
    pub fn task_not_found(goal_id: &GoalId, task_id: &TaskId) -> Self {
        Self::TaskNotFound {
            goal_id: goal_id.clone(),
            task_id: task_id.clone(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Broad classification used for transport mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::NoTopicsSelected => ErrorKind::Validation,
            Self::InsufficientTier { .. }
            | Self::LeadTimeTooShort { .. }
            | Self::CompletionReserved { .. } => ErrorKind::PolicyViolation,
            Self::GoalNotFound { .. } | Self::TaskNotFound { .. } => ErrorKind::NotFound,
            Self::Storage { .. }
            | Self::ActivityLogUnavailable { .. }
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Storage,
            Self::Config { .. } | Self::InvalidConfig { .. } => ErrorKind::Config,
            Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for the specific failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NoTopicsSelected => "no_topics_selected",
            Self::InsufficientTier { .. } => "insufficient_tier",
            Self::LeadTimeTooShort { .. } => "lead_time_too_short",
            Self::CompletionReserved { .. } => "completion_reserved",
            Self::GoalNotFound { .. } => "goal_not_found",
            Self::TaskNotFound { .. } => "task_not_found",
            Self::Storage { .. } | Self::Io(_) | Self::Json(_) => "storage_error",
            Self::ActivityLogUnavailable { .. } => "activity_log_unavailable",
            Self::Config { .. } | Self::InvalidConfig { .. } => "config_error",
            Self::Other(_) => "internal_error",
        }
    }

    /// Check if the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::PolicyViolation | ErrorKind::NotFound
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::PolicyViolation => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::Storage => 5,
            ErrorKind::Config => 7,
            ErrorKind::Internal => 1,
        }
    }
}

/// Type alias for engine results
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for converting foreign errors to EngineError
pub trait IntoEngineError<T> {
    fn into_storage(self) -> Result<T>;
    fn into_config(self) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoEngineError<T> for std::result::Result<T, E> {
    fn into_storage(self) -> Result<T> {
        self.map_err(|e| EngineError::storage(e.into().to_string()))
    }

    fn into_config(self) -> Result<T> {
        self.map_err(|e| EngineError::config(e.into().to_string()))
    }
}
