//! Core records: goals, their weighted tasks, and mentor consultations.
//!
//! A [`Goal`] is an aggregate root: it exclusively owns its [`Task`]s, which
//! are persisted and deleted together with it.

pub mod consultation;
pub mod goal;
pub mod task;

pub use consultation::MentorConsultation;
pub use goal::{Goal, GoalDraft, GoalView, TaskView};
pub use task::{Category, MentorReview, ParseCategoryError, ParseTaskTypeError, Task, TaskDraft, TaskType};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tier::Tier;

/// Defines a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from an existing string.
            #[must_use]
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

/// Defines a UUID-v4 identifier newtype with a random constructor.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        string_id!($(#[$meta])* $name);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a goal.
    GoalId
);

uuid_id!(
    /// Unique identifier for a task within a goal.
    TaskId
);

uuid_id!(
    /// Unique identifier for a booked mentor consultation.
    ConsultationId
);

string_id!(
    /// Opaque learner identifier supplied by the identity provider.
    UserId
);

/// The authenticated learner behind a request, as resolved by the
/// identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub tier: Tier,
}

impl Caller {
    #[must_use]
    pub fn new(user_id: UserId, tier: Tier) -> Self {
        Self { user_id, tier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = GoalId::new();
        let b = GoalId::new();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = TaskId::from_string("task-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"task-1\"");
        let back: TaskId = serde_json::from_str("\"task-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_user_id_display() {
        let user = UserId::from("learner-42");
        assert_eq!(user.to_string(), "learner-42");
    }
}
