//! Record storage for goals (with their owned tasks) and consultations.
//!
//! Stores are abstracted behind traits so the engine runs against an
//! in-memory store in tests and a locked JSON document on disk otherwise.
//! Task state lives inside its goal aggregate; every task mutation goes
//! through [`GoalStore::update_goal`], which applies the change and the
//! progress recompute as one atomic read-modify-write.

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::model::{Goal, GoalId, MentorConsultation, UserId};

/// Persistence for goal aggregates.
pub trait GoalStore: Send + Sync {
    /// Fetch a goal with its tasks.
    ///
    /// # Errors
    ///
    /// Returns `GoalNotFound` if the id does not resolve.
    fn get_goal(&self, id: &GoalId) -> Result<Goal>;

    /// Persist a new goal.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a goal with the same id exists.
    fn insert_goal(&self, goal: Goal) -> Result<()>;

    /// Atomically read, modify and write a goal.
    ///
    /// `apply` runs against a working copy while the store's write lock is
    /// held; the copy is committed only if `apply` succeeds. Returns the
    /// committed goal.
    ///
    /// # Errors
    ///
    /// Returns `GoalNotFound`, any error from `apply`, or a storage error.
    fn update_goal(
        &self,
        id: &GoalId,
        apply: &mut dyn FnMut(&mut Goal) -> Result<()>,
    ) -> Result<Goal>;

    /// Remove a goal together with its tasks, returning it.
    ///
    /// # Errors
    ///
    /// Returns `GoalNotFound` if the id does not resolve.
    fn delete_goal(&self, id: &GoalId) -> Result<Goal>;

    /// All goals owned by `owner`, oldest first.
    fn goals_for_owner(&self, owner: &UserId) -> Result<Vec<Goal>>;
}

/// Persistence for mentor consultations.
pub trait ConsultationStore: Send + Sync {
    /// Persist a newly booked consultation.
    fn insert_consultation(&self, consultation: MentorConsultation) -> Result<()>;

    /// Consultations booked against `goal`, ordered by `scheduled_at`.
    fn consultations_for_goal(&self, goal: &GoalId) -> Result<Vec<MentorConsultation>>;

    /// Remove every consultation booked against `goal`, returning how many
    /// were removed.
    fn delete_consultations_for_goal(&self, goal: &GoalId) -> Result<usize>;
}

/// Sort goals oldest first, breaking ties by id.
pub(crate) fn sort_goals(goals: &mut [Goal]) {
    goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
