//! Weighted progress calculation over a goal's tasks.
//!
//! Everything here is a pure function of the task list. Tier-gated tasks are
//! included: gating changes what a learner may act on, not how much a task
//! is worth.
//!
//! # Example
//!
//! ```
//! use goal_engine::progress::compute_progress;
//!
//! let report = compute_progress(&[]);
//! assert_eq!(report.overall_progress, 0);
//! assert!(report.category_progress.values().all(|c| c.percentage == 0));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Category, Task, TaskType};

/// Weight budget a goal's tasks are expected to add up to.
pub const EXPECTED_WEIGHT_TOTAL: u32 = 100;

/// Largest weight a single task may carry.
pub const MAX_TASK_WEIGHT: u32 = 100;

// ============================================================================
// Category Progress
// ============================================================================

/// Completion of the tasks in one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub completed: u32,
    pub total: u32,
    /// `round(completed / max(total, 1) * 100)`
    pub percentage: u8,
}

impl CategoryProgress {
    fn record(&mut self, completed: bool) {
        self.total += 1;
        if completed {
            self.completed += 1;
        }
    }

    fn finish(&mut self) {
        self.percentage = percent(u64::from(self.completed), u64::from(self.total.max(1)));
    }
}

// ============================================================================
// Type Counts
// ============================================================================

/// Completed task counts per task type.
///
/// # Example
///
/// ```
/// use goal_engine::progress::TypeCounts;
///
/// let counts = TypeCounts { system: 2, self_track: 3, mentor_assessed: 1 };
/// assert_eq!(counts.total(), 6);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub system: u32,
    pub self_track: u32,
    pub mentor_assessed: u32,
}

impl TypeCounts {
    /// Total completed tasks across all types.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.system + self.self_track + self.mentor_assessed
    }

    fn increment(&mut self, task_type: TaskType) {
        match task_type {
            TaskType::System => self.system += 1,
            TaskType::SelfTrack => self.self_track += 1,
            TaskType::MentorAssessed => self.mentor_assessed += 1,
        }
    }
}

// ============================================================================
// Progress Report
// ============================================================================

/// Output of [`compute_progress`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Weighted completion, 0-100.
    pub overall_progress: u8,
    /// One entry per category, including categories with no tasks.
    pub category_progress: BTreeMap<Category, CategoryProgress>,
    pub type_counts: TypeCounts,
    /// Sum of all task weights.
    pub weight_total: u32,
    /// Whether `weight_total` matches [`EXPECTED_WEIGHT_TOTAL`].
    pub weights_balanced: bool,
}

/// Derive overall, per-category and per-type progress from a task list.
///
/// Overall progress is `round(completed weight / total weight * 100)`, or 0
/// when the total weight is zero. Weight totals other than 100 are reported
/// through `weights_balanced` and never renormalized.
#[must_use]
pub fn compute_progress(tasks: &[Task]) -> ProgressReport {
    let mut category_progress: BTreeMap<Category, CategoryProgress> = Category::ALL
        .into_iter()
        .map(|c| (c, CategoryProgress::default()))
        .collect();
    let mut type_counts = TypeCounts::default();
    let mut weight_total: u64 = 0;
    let mut weight_completed: u64 = 0;

    for task in tasks {
        weight_total += u64::from(task.weight);
        category_progress
            .entry(task.category)
            .or_default()
            .record(task.is_completed);

        if task.is_completed {
            weight_completed += u64::from(task.weight);
            type_counts.increment(task.task_type);
        }
    }

    for progress in category_progress.values_mut() {
        progress.finish();
    }

    let overall_progress = if weight_total == 0 {
        0
    } else {
        percent(weight_completed, weight_total)
    };

    let weight_total = u32::try_from(weight_total).unwrap_or(u32::MAX);

    ProgressReport {
        overall_progress,
        category_progress,
        type_counts,
        weight_total,
        weights_balanced: weight_total == EXPECTED_WEIGHT_TOTAL,
    }
}

/// `round(part / whole * 100)` clamped to 0-100. `whole` must be non-zero.
fn percent(part: u64, whole: u64) -> u8 {
    let value = (part as f64 / whole as f64 * 100.0).round();
    value.clamp(0.0, 100.0) as u8
}
