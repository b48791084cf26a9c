//! Weighted tasks owned by a goal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{GoalId, TaskId};

// ============================================================================
// Task Type
// ============================================================================

/// How completion of a task is authorized.
///
/// # Example
///
/// ```
/// use goal_engine::model::TaskType;
///
/// let kind: TaskType = "mentor_assessed".parse().unwrap();
/// assert_eq!(kind, TaskType::MentorAssessed);
/// assert!(!kind.learner_can_complete());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Completion recorded from platform activity (events attended, tests taken)
    System,
    /// Learner marks completion themselves
    SelfTrack,
    /// Completed only by a mentor reviewing a submission
    MentorAssessed,
}

impl TaskType {
    /// All task types in display order.
    pub const ALL: [TaskType; 3] = [
        TaskType::System,
        TaskType::SelfTrack,
        TaskType::MentorAssessed,
    ];

    /// Whether a learner action may flip this task's completion.
    #[must_use]
    pub fn learner_can_complete(self) -> bool {
        !matches!(self, TaskType::MentorAssessed)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::System => write!(f, "system"),
            TaskType::SelfTrack => write!(f, "self_track"),
            TaskType::MentorAssessed => write!(f, "mentor_assessed"),
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = ParseTaskTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "system" => Ok(TaskType::System),
            "self_track" => Ok(TaskType::SelfTrack),
            "mentor_assessed" => Ok(TaskType::MentorAssessed),
            _ => Err(ParseTaskTypeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid task type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTaskTypeError(pub String);

impl fmt::Display for ParseTaskTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task type: {}", self.0)
    }
}

impl std::error::Error for ParseTaskTypeError {}

// ============================================================================
// Category
// ============================================================================

/// Skill area a task exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Reading,
    Writing,
    Speaking,
    Listening,
    Test,
    Event,
    Other,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 7] = [
        Category::Reading,
        Category::Writing,
        Category::Speaking,
        Category::Listening,
        Category::Test,
        Category::Event,
        Category::Other,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Reading => "reading",
            Category::Writing => "writing",
            Category::Speaking => "speaking",
            Category::Listening => "listening",
            Category::Test => "test",
            Category::Event => "event",
            Category::Other => "other",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Error returned when parsing an invalid category string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryError(pub String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid category: {}", self.0)
    }
}

impl std::error::Error for ParseCategoryError {}

// ============================================================================
// Task
// ============================================================================

/// A single weighted unit of work contributing to a goal's progress.
///
/// Tasks are never hard-deleted while their goal exists so that analytics
/// history stays intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub goal_id: GoalId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub task_type: TaskType,
    pub category: Category,
    /// Points contributed to the goal's overall progress (0-100 scale).
    pub weight: u32,
    /// Gated behind a minimum membership tier.
    #[serde(default)]
    pub requires_verification: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submission_url: Option<String>,
    #[serde(default)]
    pub mentor_feedback: Option<String>,
    #[serde(default)]
    pub mentor_score: Option<u32>,
    pub display_order: u32,
}

impl Task {
    /// Set completion state, stamping or clearing `completed_at`.
    ///
    /// Setting the current state again is a no-op and keeps the original
    /// timestamp.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if self.is_completed == completed {
            return;
        }
        self.is_completed = completed;
        self.completed_at = completed.then_some(now);
    }

    /// Whether the task has work awaiting mentor review.
    #[must_use]
    pub fn awaiting_review(&self) -> bool {
        self.task_type == TaskType::MentorAssessed
            && self.submission_url.is_some()
            && !self.is_completed
    }
}

/// Input for one roadmap entry when a goal is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub task_type: TaskType,
    pub category: Category,
    pub weight: u32,
    #[serde(default)]
    pub requires_verification: bool,
}

impl TaskDraft {
    /// Materialize the draft as a task of `goal_id` at position `display_order`.
    #[must_use]
    pub fn into_task(self, goal_id: &GoalId, display_order: u32) -> Task {
        Task {
            id: TaskId::new(),
            goal_id: goal_id.clone(),
            title: self.title,
            description: self.description,
            task_type: self.task_type,
            category: self.category,
            weight: self.weight,
            requires_verification: self.requires_verification,
            is_completed: false,
            completed_at: None,
            submission_url: None,
            mentor_feedback: None,
            mentor_score: None,
            display_order,
        }
    }
}

/// Outcome of a mentor reviewing submitted work.
///
/// Feedback and score are opaque human input and are stored as given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MentorReview {
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    /// Whether the work is accepted, which completes the task.
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(task_type: TaskType) -> TaskDraft {
        TaskDraft {
            title: "Read a graded reader".to_string(),
            description: String::new(),
            task_type,
            category: Category::Reading,
            weight: 20,
            requires_verification: false,
        }
    }

    #[test]
    fn test_task_type_parse_and_display() {
        for kind in TaskType::ALL {
            assert_eq!(kind.to_string().parse::<TaskType>().unwrap(), kind);
        }
        assert_eq!("self-track".parse::<TaskType>().unwrap(), TaskType::SelfTrack);
        assert!("homework".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Speaking".parse::<Category>().unwrap(), Category::Speaking);
        assert_eq!(
            "grammar".parse::<Category>().unwrap_err().to_string(),
            "invalid category: grammar"
        );
    }

    #[test]
    fn test_only_mentor_assessed_is_reserved() {
        assert!(TaskType::System.learner_can_complete());
        assert!(TaskType::SelfTrack.learner_can_complete());
        assert!(!TaskType::MentorAssessed.learner_can_complete());
    }

    #[test]
    fn test_set_completed_stamps_and_clears() {
        let goal_id = GoalId::new();
        let mut task = draft(TaskType::SelfTrack).into_task(&goal_id, 0);
        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();

        task.set_completed(true, t1);
        assert!(task.is_completed);
        assert_eq!(task.completed_at, Some(t1));

        // Re-completing keeps the first timestamp
        task.set_completed(true, t2);
        assert_eq!(task.completed_at, Some(t1));

        task.set_completed(false, t2);
        assert!(!task.is_completed);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn test_awaiting_review() {
        let goal_id = GoalId::new();
        let mut task = draft(TaskType::MentorAssessed).into_task(&goal_id, 3);
        assert_eq!(task.display_order, 3);
        assert!(!task.awaiting_review());
        task.submission_url = Some("https://docs.example/essay".to_string());
        assert!(task.awaiting_review());
    }
}
