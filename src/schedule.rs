//! Pace tracking and completion projection against a goal's deadline.
//!
//! The default [`LinearProjector`] assumes progress accrues evenly over the
//! goal's lifetime. Projection strategies sit behind [`ScheduleProjector`] so
//! a velocity-based model can replace it without touching the aggregator.
//!
//! All day arithmetic truncates with floor/ceil, matching the
//! "Days Elapsed / Days Remaining" display contract.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Pace of a goal relative to its timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleProjection {
    /// Whole days since the goal was created, never negative.
    pub days_elapsed: i64,
    /// Whole days (rounded up) until the deadline, never negative.
    pub days_remaining: i64,
    /// Progress a linearly-paced learner would have by now, 0-100.
    pub expected_progress: f64,
    pub is_ahead_of_schedule: bool,
    /// `None` while progress is zero: there is no pace to extrapolate.
    pub projected_completion_date: Option<DateTime<Utc>>,
}

/// Strategy for projecting a goal's schedule.
pub trait ScheduleProjector: Send + Sync + std::fmt::Debug {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Project the schedule of a goal at `now`.
    fn project(
        &self,
        created_at: DateTime<Utc>,
        target_deadline: DateTime<Utc>,
        overall_progress: u8,
        now: DateTime<Utc>,
    ) -> ScheduleProjection;
}

/// Linear-pace projector.
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use goal_engine::schedule::project_schedule;
///
/// let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
/// let p = project_schedule(start, start + Duration::days(100), 60, start + Duration::days(50));
/// assert_eq!(p.expected_progress, 50.0);
/// assert!(p.is_ahead_of_schedule);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearProjector;

impl ScheduleProjector for LinearProjector {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn project(
        &self,
        created_at: DateTime<Utc>,
        target_deadline: DateTime<Utc>,
        overall_progress: u8,
        now: DateTime<Utc>,
    ) -> ScheduleProjection {
        let days_elapsed = floor_days(now - created_at).max(0);
        let days_remaining = ceil_days(target_deadline - now).max(0);

        let total_days = days_elapsed + days_remaining;
        let expected_progress = if total_days == 0 {
            if now >= target_deadline {
                100.0
            } else {
                0.0
            }
        } else {
            days_elapsed as f64 / total_days as f64 * 100.0
        };

        let is_ahead_of_schedule = f64::from(overall_progress) - expected_progress >= 0.0;

        let projected_completion_date = if overall_progress == 0 {
            None
        } else {
            // days_elapsed + days_elapsed * (100 / p - 1), rounded up to a whole day
            let days_to_finish =
                (days_elapsed as f64 * 100.0 / f64::from(overall_progress)).ceil() as i64;
            created_at.checked_add_signed(Duration::days(days_to_finish))
        };

        ScheduleProjection {
            days_elapsed,
            days_remaining,
            expected_progress,
            is_ahead_of_schedule,
            projected_completion_date,
        }
    }
}

/// Project a schedule with the default linear strategy.
#[must_use]
pub fn project_schedule(
    created_at: DateTime<Utc>,
    target_deadline: DateTime<Utc>,
    overall_progress: u8,
    now: DateTime<Utc>,
) -> ScheduleProjection {
    LinearProjector.project(created_at, target_deadline, overall_progress, now)
}

fn floor_days(span: Duration) -> i64 {
    span.num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

fn ceil_days(span: Duration) -> i64 {
    let millis = span.num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
        days + 1
    } else {
        days
    }
}
