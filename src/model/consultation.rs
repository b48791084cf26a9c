//! Mentor consultation bookings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{ConsultationId, GoalId, UserId};

/// A booked mentor consultation tied to a goal.
///
/// Immutable once scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentorConsultation {
    pub id: ConsultationId,
    pub goal_id: GoalId,
    pub user_id: UserId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub discussion_topics: BTreeSet<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Assigned by the mentor after booking.
    #[serde(default)]
    pub meeting_link: Option<String>,
}

impl MentorConsultation {
    /// When the consultation is expected to finish.
    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}
