//! Membership tier gating for tasks and features.
//!
//! Tiers form a strict total order: `explorer < insider < visionary`.
//! Backend systems use their own plan names, so every tier string entering
//! the engine goes through [`Tier::from_backend`] exactly once.
//!
//! # Example
//!
//! ```rust
//! use goal_engine::tier::{Feature, Tier, TierGate};
//!
//! let gate = TierGate::default();
//! assert!(!gate.is_feature_available(Feature::MentorConsultation, Tier::Explorer));
//! assert!(gate.is_feature_available(Feature::MentorConsultation, Tier::Insider));
//!
//! let tier = Tier::from_backend("premium").unwrap();
//! assert_eq!(tier, Tier::Visionary);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};
use crate::model::Task;

/// Upper bound for `min_lead_time_days`.
pub const MAX_LEAD_TIME_DAYS: i64 = 3650;

/// Membership levels, ordered from least to most privileged.
///
/// Deserialization goes through [`Tier::from_backend`], so config files
/// accept backend plan names as well.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Tier {
    /// Free membership (default)
    #[default]
    Explorer,
    /// Paid membership, backend name `pro`
    Insider,
    /// Top membership, backend name `premium`
    Visionary,
}

impl Tier {
    /// Map a tier name from any upstream naming scheme to the canonical tier.
    ///
    /// Accepts the display names (`explorer`, `insider`, `visionary`) and the
    /// billing backend names (`free`, `basic`, `pro`, `premium`), ignoring
    /// case and surrounding whitespace.
    pub fn from_backend(name: &str) -> std::result::Result<Self, ParseTierError> {
        match name.trim().to_lowercase().as_str() {
            "explorer" | "free" | "basic" => Ok(Tier::Explorer),
            "insider" | "pro" => Ok(Tier::Insider),
            "visionary" | "premium" => Ok(Tier::Visionary),
            _ => Err(ParseTierError(name.to_string())),
        }
    }

    /// Check whether this tier is at least `minimum`.
    #[must_use]
    pub fn at_least(self, minimum: Tier) -> bool {
        self >= minimum
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Explorer => write!(f, "explorer"),
            Tier::Insider => write!(f, "insider"),
            Tier::Visionary => write!(f, "visionary"),
        }
    }
}

impl TryFrom<String> for Tier {
    type Error = ParseTierError;

    fn try_from(name: String) -> std::result::Result<Self, Self::Error> {
        Tier::from_backend(&name)
    }
}

impl std::str::FromStr for Tier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Tier::from_backend(s)
    }
}

/// Error returned when parsing an unknown tier name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTierError(pub String);

impl fmt::Display for ParseTierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown membership tier: {}", self.0)
    }
}

impl std::error::Error for ParseTierError {}

/// Features whose availability depends on tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Acting on tasks that require verification
    VerifiedTasks,
    /// Booking one-to-one mentor consultations
    MentorConsultation,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::VerifiedTasks => write!(f, "verified_tasks"),
            Feature::MentorConsultation => write!(f, "mentor_consultation"),
        }
    }
}

/// Tier thresholds and booking rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Minimum tier to act on `requires_verification` tasks.
    #[serde(default = "default_min_tier")]
    pub verified_task_min_tier: Tier,

    /// Minimum tier to book a mentor consultation.
    #[serde(default = "default_min_tier")]
    pub consultation_min_tier: Tier,

    /// Minimum days between booking and the consultation start.
    #[serde(default = "default_lead_time_days")]
    pub min_lead_time_days: i64,
}

fn default_min_tier() -> Tier {
    Tier::Insider
}

fn default_lead_time_days() -> i64 {
    14
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            verified_task_min_tier: default_min_tier(),
            consultation_min_tier: default_min_tier(),
            min_lead_time_days: default_lead_time_days(),
        }
    }
}

/// Decides what a caller at a given tier may act on.
///
/// Visibility is never gated; only toggling, submitting and booking are.
#[derive(Debug, Clone, Default)]
pub struct TierGate {
    policy: TierPolicy,
}

impl TierGate {
    /// Create a gate enforcing `policy`.
    #[must_use]
    pub fn new(policy: TierPolicy) -> Self {
        Self { policy }
    }

    /// Minimum tier for a feature.
    #[must_use]
    pub fn required_tier(&self, feature: Feature) -> Tier {
        match feature {
            Feature::VerifiedTasks => self.policy.verified_task_min_tier,
            Feature::MentorConsultation => self.policy.consultation_min_tier,
        }
    }

    /// Check if a feature is available at `tier`.
    #[must_use]
    pub fn is_feature_available(&self, feature: Feature, tier: Tier) -> bool {
        tier.at_least(self.required_tier(feature))
    }

    /// Check if `task` may be toggled or submitted at `tier`.
    #[must_use]
    pub fn is_task_actionable(&self, task: &Task, tier: Tier) -> bool {
        !task.requires_verification || self.is_feature_available(Feature::VerifiedTasks, tier)
    }

    /// Require access to `feature`, failing with `InsufficientTier`.
    pub fn require_feature(&self, feature: Feature, tier: Tier) -> Result<()> {
        if self.is_feature_available(feature, tier) {
            Ok(())
        } else {
            Err(EngineError::InsufficientTier {
                required: self.required_tier(feature),
                actual: tier,
            })
        }
    }

    /// Require that `task` is actionable at `tier`.
    pub fn require_task_actionable(&self, task: &Task, tier: Tier) -> Result<()> {
        if task.requires_verification {
            self.require_feature(Feature::VerifiedTasks, tier)
        } else {
            Ok(())
        }
    }

    /// Require that `scheduled_at` leaves at least the minimum lead time.
    ///
    /// Requests inside the window are rejected, never clamped forward.
    /// A policy outside `0..=MAX_LEAD_TIME_DAYS` is an `InvalidConfig` error.
    pub fn require_lead_time(&self, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        let days = self.policy.min_lead_time_days;
        let minimum = Some(days)
            .filter(|d| (0..=MAX_LEAD_TIME_DAYS).contains(d))
            .and_then(Duration::try_days)
            .ok_or_else(|| EngineError::InvalidConfig {
                field: "policy.min_lead_time_days".to_string(),
                reason: format!("{days} is outside 0..={MAX_LEAD_TIME_DAYS}"),
            })?;
        let lead = scheduled_at - now;
        if lead >= minimum {
            Ok(())
        } else {
            Err(EngineError::LeadTimeTooShort {
                minimum_days: self.policy.min_lead_time_days,
                requested_hours: lead.num_hours(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, GoalId, TaskDraft, TaskType};
    use chrono::TimeZone;

    fn verified_task(requires_verification: bool) -> Task {
        TaskDraft {
            title: "IELTS mock exam".to_string(),
            description: String::new(),
            task_type: TaskType::System,
            category: Category::Test,
            weight: 25,
            requires_verification,
        }
        .into_task(&GoalId::new(), 0)
    }

    #[test]
    fn test_tier_order() {
        assert!(Tier::Explorer < Tier::Insider);
        assert!(Tier::Insider < Tier::Visionary);
        assert!(Tier::Visionary.at_least(Tier::Insider));
        assert!(!Tier::Explorer.at_least(Tier::Insider));
    }

    #[test]
    fn test_backend_mapping() {
        assert_eq!(Tier::from_backend("free").unwrap(), Tier::Explorer);
        assert_eq!(Tier::from_backend("PRO").unwrap(), Tier::Insider);
        assert_eq!(Tier::from_backend(" premium ").unwrap(), Tier::Visionary);
        assert_eq!("insider".parse::<Tier>().unwrap(), Tier::Insider);
        assert!(Tier::from_backend("gold").is_err());
    }

    #[test]
    fn test_display_round_trips_canonical_names() {
        for tier in [Tier::Explorer, Tier::Insider, Tier::Visionary] {
            assert_eq!(tier.to_string().parse::<Tier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_verified_task_visible_but_gated() {
        let gate = TierGate::default();
        let task = verified_task(true);
        assert!(!gate.is_task_actionable(&task, Tier::Explorer));
        assert!(gate.is_task_actionable(&task, Tier::Insider));
        assert!(gate.is_task_actionable(&task, Tier::Visionary));
    }

    #[test]
    fn test_unverified_task_always_actionable() {
        let gate = TierGate::default();
        assert!(gate.is_task_actionable(&verified_task(false), Tier::Explorer));
    }

    #[test]
    fn test_require_feature_reports_tiers() {
        let gate = TierGate::default();
        match gate.require_feature(Feature::MentorConsultation, Tier::Explorer) {
            Err(EngineError::InsufficientTier { required, actual }) => {
                assert_eq!(required, Tier::Insider);
                assert_eq!(actual, Tier::Explorer);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_custom_policy() {
        let gate = TierGate::new(TierPolicy {
            consultation_min_tier: Tier::Visionary,
            ..TierPolicy::default()
        });
        assert!(!gate.is_feature_available(Feature::MentorConsultation, Tier::Insider));
        assert!(gate.is_feature_available(Feature::VerifiedTasks, Tier::Insider));
    }

    #[test]
    fn test_lead_time() {
        let gate = TierGate::default();
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();

        let err = gate
            .require_lead_time(now + Duration::days(5), now)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::LeadTimeTooShort {
                minimum_days: 14,
                requested_hours: 120
            }
        ));

        assert!(gate.require_lead_time(now + Duration::days(14), now).is_ok());
        assert!(gate.require_lead_time(now + Duration::days(20), now).is_ok());
    }

    #[test]
    fn test_out_of_range_lead_time_is_config_error() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        for days in [MAX_LEAD_TIME_DAYS + 1, 1_000_000_000_000_000, i64::MAX, -1] {
            let gate = TierGate::new(TierPolicy {
                min_lead_time_days: days,
                ..TierPolicy::default()
            });
            let err = gate
                .require_lead_time(now + Duration::days(20), now)
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidConfig { .. }));
        }
    }

    #[test]
    fn test_policy_accepts_backend_tier_names() {
        let policy: TierPolicy = serde_json::from_str(
            r#"{"verified_task_min_tier": "pro", "consultation_min_tier": "Premium"}"#,
        )
        .unwrap();
        assert_eq!(policy.verified_task_min_tier, Tier::Insider);
        assert_eq!(policy.consultation_min_tier, Tier::Visionary);

        assert!(serde_json::from_str::<TierPolicy>(r#"{"consultation_min_tier": "gold"}"#).is_err());
        assert_eq!(serde_json::to_string(&Tier::Insider).unwrap(), "\"insider\"");
    }

    #[test]
    fn test_default_tier_is_explorer() {
        assert_eq!(Tier::default(), Tier::Explorer);
    }
}
