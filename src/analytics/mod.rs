//! Goal analytics snapshots.
//!
//! Combines the progress calculator, a schedule projector and the activity
//! log into a [`GoalAnalytics`] snapshot. Snapshots are recomputed on every
//! read and never persisted.
//!
//! # Architecture
//!
//! ```text
//! AnalyticsAggregator
//!   ├── compute_progress     - weighted, per-category and per-type completion
//!   ├── ScheduleProjector    - pace vs. deadline, projected completion
//!   └── ActivityLog          - days active, completion streak, last activity
//! ```
//!
//! When the activity log is unavailable the snapshot still carries progress
//! and schedule fields; activity fields fall back to zero/null.

pub mod activity;

pub use activity::{ActivityEvent, ActivityKind, ActivityLog, JsonlActivityLog, MemoryActivityLog};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::model::{Category, Goal, GoalId};
use crate::progress::{compute_progress, CategoryProgress};
use crate::schedule::{LinearProjector, ScheduleProjector};

/// Derived analytics for one goal at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAnalytics {
    pub goal_id: GoalId,
    pub generated_at: DateTime<Utc>,

    // ===== Progress =====
    pub overall_progress: u8,
    pub category_progress: BTreeMap<Category, CategoryProgress>,
    pub system_tasks_completed: u32,
    pub self_track_tasks_completed: u32,
    pub mentor_assessed_tasks_completed: u32,
    pub weight_total: u32,
    pub weights_balanced: bool,

    // ===== Schedule =====
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub expected_progress: f64,
    pub is_ahead_of_schedule: bool,
    pub projected_completion_date: Option<DateTime<Utc>>,
    /// Percentage points gained per week since creation.
    pub average_progress_per_week: f64,

    // ===== Activity =====
    /// False when the activity log could not be read.
    pub activity_available: bool,
    pub days_active: u32,
    pub completion_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
}

/// Activity-derived fields of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySummary {
    pub days_active: u32,
    pub completion_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
}

impl ActivitySummary {
    /// Summarize `events` for `goal` as of `today`.
    ///
    /// Events for other goals are ignored; goal-less events (logins) count
    /// towards every goal of the user. Events dated after `today` and
    /// bookings count towards none of the fields.
    #[must_use]
    pub fn from_events(events: &[ActivityEvent], goal: &GoalId, today: NaiveDate) -> Self {
        let relevant: Vec<&ActivityEvent> = events
            .iter()
            .filter(|e| e.relates_to(goal) && e.kind.counts_as_active() && e.day() <= today)
            .collect();

        let active_days: BTreeSet<NaiveDate> = relevant.iter().map(|e| e.day()).collect();

        let completion_days: BTreeSet<NaiveDate> = relevant
            .iter()
            .filter(|e| e.kind == ActivityKind::TaskCompleted)
            .map(|e| e.day())
            .collect();

        Self {
            days_active: u32::try_from(active_days.len()).unwrap_or(u32::MAX),
            completion_streak: completion_streak(&completion_days, today),
            last_activity_date: active_days.last().copied(),
        }
    }
}

/// Length of the current run of consecutive completion days.
///
/// The run must end today or yesterday; otherwise the streak is broken and
/// reported as 0. Days after `today` are ignored.
#[must_use]
pub fn completion_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut past = days.range(..=today).rev();
    let Some(&latest) = past.next() else {
        return 0;
    };
    if latest < today - Duration::days(1) {
        return 0;
    }

    let mut streak = 1;
    let mut expected = latest - Duration::days(1);
    for &day in past {
        if day != expected {
            break;
        }
        streak += 1;
        expected = day - Duration::days(1);
    }
    streak
}

/// Builds [`GoalAnalytics`] snapshots.
#[derive(Debug, Clone)]
pub struct AnalyticsAggregator {
    projector: Arc<dyn ScheduleProjector>,
}

impl Default for AnalyticsAggregator {
    fn default() -> Self {
        Self::new(Arc::new(LinearProjector))
    }
}

impl AnalyticsAggregator {
    /// Create an aggregator using `projector` for schedule fields.
    #[must_use]
    pub fn new(projector: Arc<dyn ScheduleProjector>) -> Self {
        Self { projector }
    }

    /// Build a snapshot, reading activity from `log`.
    ///
    /// A failing log degrades the snapshot instead of failing it.
    #[must_use]
    pub fn analyze(&self, goal: &Goal, log: &dyn ActivityLog, now: DateTime<Utc>) -> GoalAnalytics {
        match log.events_for_user(&goal.owner_id) {
            Ok(events) => self.build_analytics(goal, Some(&events), now),
            Err(e) => {
                tracing::warn!(goal = %goal.id, error = %e, "activity log unavailable, returning partial analytics");
                self.build_analytics(goal, None, now)
            }
        }
    }

    /// Build a snapshot from already-loaded activity.
    ///
    /// `activity` is `None` when the log was unavailable.
    #[must_use]
    pub fn build_analytics(
        &self,
        goal: &Goal,
        activity: Option<&[ActivityEvent]>,
        now: DateTime<Utc>,
    ) -> GoalAnalytics {
        let progress = compute_progress(&goal.tasks);
        let schedule = self.projector.project(
            goal.created_at,
            goal.target_deadline,
            progress.overall_progress,
            now,
        );

        let summary = activity
            .map(|events| ActivitySummary::from_events(events, &goal.id, now.date_naive()))
            .unwrap_or_default();

        let weeks = (schedule.days_elapsed as f64 / 7.0).max(1.0);
        let average_progress_per_week = round2(f64::from(progress.overall_progress) / weeks);

        tracing::debug!(
            goal = %goal.id,
            projector = self.projector.name(),
            overall = progress.overall_progress,
            expected = schedule.expected_progress,
            "analytics computed"
        );

        GoalAnalytics {
            goal_id: goal.id.clone(),
            generated_at: now,
            overall_progress: progress.overall_progress,
            category_progress: progress.category_progress,
            system_tasks_completed: progress.type_counts.system,
            self_track_tasks_completed: progress.type_counts.self_track,
            mentor_assessed_tasks_completed: progress.type_counts.mentor_assessed,
            weight_total: progress.weight_total,
            weights_balanced: progress.weights_balanced,
            days_elapsed: schedule.days_elapsed,
            days_remaining: schedule.days_remaining,
            expected_progress: schedule.expected_progress,
            is_ahead_of_schedule: schedule.is_ahead_of_schedule,
            projected_completion_date: schedule.projected_completion_date,
            average_progress_per_week,
            activity_available: activity.is_some(),
            days_active: summary.days_active,
            completion_streak: summary.completion_streak,
            last_activity_date: summary.last_activity_date,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
