//! The goal aggregate and its presentation view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GoalId, Task, TaskDraft, TaskId, UserId};
use crate::error::{EngineError, Result};
use crate::progress::{compute_progress, ProgressReport};
use crate::tier::{Tier, TierGate};

/// A learner's tracked objective with a deadline and a weighted checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub owner_id: UserId,
    pub objective: String,
    pub created_at: DateTime<Utc>,
    pub target_deadline: DateTime<Utc>,
    /// Cached weighted completion (0-100) as of the last task mutation.
    #[serde(default)]
    pub overall_progress: u8,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Goal {
    /// Build a goal and its roadmap from drafts.
    ///
    /// Tasks receive sequential `display_order` values in draft order and
    /// the cached progress is computed immediately.
    #[must_use]
    pub fn from_draft(draft: GoalDraft, owner_id: UserId, created_at: DateTime<Utc>) -> Self {
        let id = GoalId::new();
        let tasks = draft
            .tasks
            .into_iter()
            .zip(0u32..)
            .map(|(task, order)| task.into_task(&id, order))
            .collect();

        let mut goal = Self {
            id,
            owner_id,
            objective: draft.objective,
            created_at,
            target_deadline: draft.target_deadline,
            overall_progress: 0,
            tasks,
        };
        goal.recompute_progress();
        goal
    }

    /// Check whether `user` owns this goal.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }

    /// Look up a task by id.
    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == task_id)
    }

    /// Look up a task by id for mutation, failing with `TaskNotFound`.
    pub fn task_mut(&mut self, task_id: &TaskId) -> Result<&mut Task> {
        let goal_id = self.id.clone();
        self.tasks
            .iter_mut()
            .find(|t| &t.id == task_id)
            .ok_or_else(|| EngineError::task_not_found(&goal_id, task_id))
    }

    /// Tasks sorted by `display_order`.
    #[must_use]
    pub fn ordered_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by_key(|t| t.display_order);
        tasks
    }

    /// Recompute and cache `overall_progress` from the current tasks.
    pub fn recompute_progress(&mut self) -> ProgressReport {
        let report = compute_progress(&self.tasks);
        if !report.weights_balanced {
            tracing::warn!(
                goal = %self.id,
                weight_total = report.weight_total,
                "task weights do not sum to 100"
            );
        }
        self.overall_progress = report.overall_progress;
        report
    }
}

/// Request to create a goal with its generated roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalDraft {
    pub objective: String,
    pub target_deadline: DateTime<Utc>,
    #[serde(default)]
    pub tasks: Vec<TaskDraft>,
}

/// A task as presented to a specific caller.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    /// Whether the caller's tier allows toggling or submitting this task.
    pub is_actionable: bool,
}

/// A goal with per-caller actionability flags.
///
/// Gated tasks are never filtered out: learners see what they are missing.
#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    pub id: GoalId,
    pub owner_id: UserId,
    pub objective: String,
    pub created_at: DateTime<Utc>,
    pub target_deadline: DateTime<Utc>,
    pub overall_progress: u8,
    pub tier: Tier,
    pub tasks: Vec<TaskView>,
}

impl GoalView {
    /// Present `goal` to a caller at `tier`.
    #[must_use]
    pub fn new(goal: &Goal, gate: &TierGate, tier: Tier) -> Self {
        let tasks = goal
            .ordered_tasks()
            .into_iter()
            .map(|task| TaskView {
                is_actionable: gate.is_task_actionable(task, tier),
                task: task.clone(),
            })
            .collect();

        Self {
            id: goal.id.clone(),
            owner_id: goal.owner_id.clone(),
            objective: goal.objective.clone(),
            created_at: goal.created_at,
            target_deadline: goal.target_deadline,
            overall_progress: goal.overall_progress,
            tier,
            tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, TaskType};
    use chrono::{Duration, TimeZone};

    fn draft(title: &str, weight: u32, requires_verification: bool) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: String::new(),
            task_type: TaskType::SelfTrack,
            category: Category::Speaking,
            weight,
            requires_verification,
        }
    }

    fn goal() -> Goal {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Goal::from_draft(
            GoalDraft {
                objective: "Hold a 10 minute conversation".to_string(),
                target_deadline: now + Duration::days(90),
                tasks: vec![
                    draft("Shadow a podcast", 50, false),
                    draft("Join a speaking club", 30, false),
                    draft("Verified speaking test", 20, true),
                ],
            },
            UserId::from("learner-1"),
            now,
        )
    }

    #[test]
    fn test_from_draft_assigns_order_and_goal_id() {
        let goal = goal();
        let orders: Vec<u32> = goal.tasks.iter().map(|t| t.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(goal.tasks.iter().all(|t| t.goal_id == goal.id));
        assert_eq!(goal.overall_progress, 0);
    }

    #[test]
    fn test_task_mut_unknown_id() {
        let mut goal = goal();
        let err = goal.task_mut(&TaskId::from_string("missing")).unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound { .. }));
    }

    #[test]
    fn test_recompute_progress_caches_value() {
        let mut goal = goal();
        let now = goal.created_at;
        let first = goal.tasks[0].id.clone();
        goal.task_mut(&first).unwrap().set_completed(true, now);
        let report = goal.recompute_progress();
        assert_eq!(report.overall_progress, 50);
        assert_eq!(goal.overall_progress, 50);
    }

    #[test]
    fn test_ordered_tasks_follows_display_order() {
        let mut goal = goal();
        goal.tasks.reverse();
        let titles: Vec<&str> = goal.ordered_tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Shadow a podcast", "Join a speaking club", "Verified speaking test"]
        );
    }

    #[test]
    fn test_view_keeps_gated_tasks_visible() {
        let goal = goal();
        let gate = TierGate::default();

        let view = GoalView::new(&goal, &gate, Tier::Explorer);
        assert_eq!(view.tasks.len(), 3);
        assert!(view.tasks[0].is_actionable);
        assert!(!view.tasks[2].is_actionable);

        let view = GoalView::new(&goal, &gate, Tier::Insider);
        assert!(view.tasks.iter().all(|t| t.is_actionable));
    }
}
