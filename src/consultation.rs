//! Mentor consultation booking.
//!
//! Bookings share the goal aggregate's identity and the tier gate's rules
//! but are independent of progress math. There is no slot capacity: two
//! learners (or one learner twice) may book the same time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::model::{Caller, ConsultationId, GoalId, MentorConsultation};
use crate::store::{ConsultationStore, GoalStore};
use crate::tier::{Feature, Tier, TierGate};

/// Default consultation length in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Booking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationConfig {
    /// Length assigned to every new booking.
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
}

fn default_duration_minutes() -> u32 {
    DEFAULT_DURATION_MINUTES
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: default_duration_minutes(),
        }
    }
}

/// A learner's request to book a consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validates and persists consultation bookings.
#[derive(Debug, Clone, Default)]
pub struct ConsultationScheduler {
    gate: TierGate,
    config: ConsultationConfig,
}

impl ConsultationScheduler {
    /// Create a scheduler enforcing `gate` and using `config`.
    #[must_use]
    pub fn new(gate: TierGate, config: ConsultationConfig) -> Self {
        Self { gate, config }
    }

    /// Book a consultation for `caller` against `goal_id`.
    ///
    /// Checks, in order: the goal exists and belongs to the caller, the tier
    /// allows consultations, at least one topic is given, and the requested
    /// time respects the minimum lead time.
    ///
    /// # Errors
    ///
    /// `GoalNotFound`, `InsufficientTier`, `NoTopicsSelected`,
    /// `LeadTimeTooShort`, or a storage error.
    pub fn book(
        &self,
        goals: &dyn GoalStore,
        consultations: &dyn ConsultationStore,
        caller: &Caller,
        goal_id: &GoalId,
        request: BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<MentorConsultation> {
        let user = &caller.user_id;
        let goal = goals.get_goal(goal_id)?;
        if !goal.is_owned_by(user) {
            return Err(EngineError::GoalNotFound {
                id: goal_id.clone(),
            });
        }

        let validated = self.validate(caller.tier, &request, now);
        if let Err(e) = &validated {
            warn!(goal = %goal_id, user = %user, code = e.code(), "consultation booking rejected");
        }
        let topics = validated?;

        let consultation = MentorConsultation {
            id: ConsultationId::new(),
            goal_id: goal_id.clone(),
            user_id: user.clone(),
            scheduled_at: request.scheduled_at,
            duration_minutes: self.config.default_duration_minutes,
            discussion_topics: topics,
            notes: request
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            meeting_link: None,
        };

        consultations.insert_consultation(consultation.clone())?;
        info!(
            goal = %goal_id,
            consultation = %consultation.id,
            scheduled_at = %consultation.scheduled_at,
            "consultation booked"
        );
        Ok(consultation)
    }

    /// Policy and shape checks, returning the normalized topic set.
    fn validate(
        &self,
        tier: Tier,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<BTreeSet<String>> {
        self.gate.require_feature(Feature::MentorConsultation, tier)?;

        let topics = normalize_topics(&request.topics);
        if topics.is_empty() {
            return Err(EngineError::NoTopicsSelected);
        }

        self.gate.require_lead_time(request.scheduled_at, now)?;
        Ok(topics)
    }
}

/// Trim topics, dropping blanks and duplicates.
#[must_use]
pub fn normalize_topics(topics: &[String]) -> BTreeSet<String> {
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
