//! In-memory store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{sort_goals, ConsultationStore, GoalStore};
use crate::error::{EngineError, Result};
use crate::model::{Goal, GoalId, MentorConsultation, UserId};

/// Goal and consultation records held in process memory.
///
/// # Example
///
/// ```rust,ignore
/// let store = MemoryStore::new();
/// store.insert_goal(goal.clone())?;
/// let updated = store.update_goal(&goal.id, &mut |g| {
///     g.objective = "Reach C1".to_string();
///     Ok(())
/// })?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    goals: RwLock<HashMap<GoalId, Goal>>,
    consultations: RwLock<Vec<MentorConsultation>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> EngineError {
    EngineError::storage("store lock poisoned")
}

impl GoalStore for MemoryStore {
    fn get_goal(&self, id: &GoalId) -> Result<Goal> {
        self.goals
            .read()
            .map_err(|_| poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::GoalNotFound { id: id.clone() })
    }

    fn insert_goal(&self, goal: Goal) -> Result<()> {
        let mut goals = self.goals.write().map_err(|_| poisoned())?;
        if goals.contains_key(&goal.id) {
            return Err(EngineError::validation(
                "id",
                format!("goal {} already exists", goal.id),
            ));
        }
        goals.insert(goal.id.clone(), goal);
        Ok(())
    }

    fn update_goal(
        &self,
        id: &GoalId,
        apply: &mut dyn FnMut(&mut Goal) -> Result<()>,
    ) -> Result<Goal> {
        let mut goals = self.goals.write().map_err(|_| poisoned())?;
        let stored = goals
            .get_mut(id)
            .ok_or_else(|| EngineError::GoalNotFound { id: id.clone() })?;

        let mut working = stored.clone();
        apply(&mut working)?;
        *stored = working.clone();
        Ok(working)
    }

    fn delete_goal(&self, id: &GoalId) -> Result<Goal> {
        self.goals
            .write()
            .map_err(|_| poisoned())?
            .remove(id)
            .ok_or_else(|| EngineError::GoalNotFound { id: id.clone() })
    }

    fn goals_for_owner(&self, owner: &UserId) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = self
            .goals
            .read()
            .map_err(|_| poisoned())?
            .values()
            .filter(|g| g.is_owned_by(owner))
            .cloned()
            .collect();
        sort_goals(&mut goals);
        Ok(goals)
    }
}

impl ConsultationStore for MemoryStore {
    fn insert_consultation(&self, consultation: MentorConsultation) -> Result<()> {
        self.consultations
            .write()
            .map_err(|_| poisoned())?
            .push(consultation);
        Ok(())
    }

    fn consultations_for_goal(&self, goal: &GoalId) -> Result<Vec<MentorConsultation>> {
        let mut matching: Vec<MentorConsultation> = self
            .consultations
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .filter(|c| &c.goal_id == goal)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.scheduled_at);
        Ok(matching)
    }

    fn delete_consultations_for_goal(&self, goal: &GoalId) -> Result<usize> {
        let mut consultations = self.consultations.write().map_err(|_| poisoned())?;
        let before = consultations.len();
        consultations.retain(|c| &c.goal_id != goal);
        Ok(before - consultations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConsultationId, GoalDraft};
    use chrono::{Duration, Utc};
    use std::collections::BTreeSet;

    fn goal(owner: &str) -> Goal {
        let now = Utc::now();
        Goal::from_draft(
            GoalDraft {
                objective: "Read a novel in English".to_string(),
                target_deadline: now + Duration::days(60),
                tasks: Vec::new(),
            },
            UserId::from(owner),
            now,
        )
    }

    #[test]
    fn test_insert_and_get() {
        let store = MemoryStore::new();
        let goal = goal("u1");
        store.insert_goal(goal.clone()).unwrap();
        assert_eq!(store.get_goal(&goal.id).unwrap(), goal);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let goal = goal("u1");
        store.insert_goal(goal.clone()).unwrap();
        assert!(store.insert_goal(goal).is_err());
    }

    #[test]
    fn test_failed_update_is_not_committed() {
        let store = MemoryStore::new();
        let goal = goal("u1");
        store.insert_goal(goal.clone()).unwrap();

        let result = store.update_goal(&goal.id, &mut |g| {
            g.objective = "changed".to_string();
            Err(EngineError::validation("objective", "rejected"))
        });
        assert!(result.is_err());
        assert_eq!(store.get_goal(&goal.id).unwrap().objective, goal.objective);
    }

    #[test]
    fn test_delete_and_missing() {
        let store = MemoryStore::new();
        let goal = goal("u1");
        store.insert_goal(goal.clone()).unwrap();
        store.delete_goal(&goal.id).unwrap();
        assert!(matches!(
            store.get_goal(&goal.id),
            Err(EngineError::GoalNotFound { .. })
        ));
        assert!(store.delete_goal(&goal.id).is_err());
    }

    #[test]
    fn test_delete_consultations_for_goal() {
        let store = MemoryStore::new();
        let kept = goal("u1");
        let dropped = goal("u1");
        for goal in [&kept, &dropped, &dropped] {
            store
                .insert_consultation(MentorConsultation {
                    id: ConsultationId::new(),
                    goal_id: goal.id.clone(),
                    user_id: goal.owner_id.clone(),
                    scheduled_at: goal.created_at + Duration::days(20),
                    duration_minutes: 60,
                    discussion_topics: BTreeSet::from(["idioms".to_string()]),
                    notes: None,
                    meeting_link: None,
                })
                .unwrap();
        }

        assert_eq!(store.delete_consultations_for_goal(&dropped.id).unwrap(), 2);
        assert!(store.consultations_for_goal(&dropped.id).unwrap().is_empty());
        assert_eq!(store.consultations_for_goal(&kept.id).unwrap().len(), 1);
        assert_eq!(store.delete_consultations_for_goal(&dropped.id).unwrap(), 0);
    }

    #[test]
    fn test_goals_for_owner() {
        let store = MemoryStore::new();
        store.insert_goal(goal("u1")).unwrap();
        store.insert_goal(goal("u2")).unwrap();
        store.insert_goal(goal("u1")).unwrap();
        assert_eq!(store.goals_for_owner(&UserId::from("u1")).unwrap().len(), 2);
        assert!(store.goals_for_owner(&UserId::from("u3")).unwrap().is_empty());
    }
}
