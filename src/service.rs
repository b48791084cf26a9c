//! Engine service: the operations exposed to the CLI and HTTP layers.
//!
//! [`GoalService`] owns the stores, the tier gate, the analytics aggregator
//! and the consultation scheduler. Every operation is request-scoped; the
//! service keeps no state between calls beyond what the stores hold.
//!
//! Task mutations run inside [`GoalStore::update_goal`] so that the change
//! and the `overall_progress` recompute commit together. Activity is
//! recorded afterwards; a failing activity log is logged and ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::{
    ActivityEvent, ActivityKind, ActivityLog, AnalyticsAggregator, GoalAnalytics,
    JsonlActivityLog, MemoryActivityLog,
};
use crate::config::EngineConfig;
use crate::consultation::{BookingRequest, ConsultationScheduler};
use crate::error::{EngineError, Result};
use crate::model::{
    Caller, Goal, GoalDraft, GoalId, GoalView, MentorConsultation, MentorReview, Task, TaskId,
    TaskType, UserId,
};
use crate::store::{ConsultationStore, GoalStore, JsonFileStore, MemoryStore};
use crate::progress::MAX_TASK_WEIGHT;
use crate::tier::TierGate;

/// A task after a mutation, with its goal's recomputed progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub task: Task,
    pub overall_progress: u8,
}

impl TaskUpdate {
    fn from_goal(goal: &Goal, task_id: &TaskId) -> Result<Self> {
        let task = goal
            .task(task_id)
            .cloned()
            .ok_or_else(|| EngineError::task_not_found(&goal.id, task_id))?;
        Ok(Self {
            task,
            overall_progress: goal.overall_progress,
        })
    }
}

/// Orchestrates goals, tasks, analytics and consultations.
#[derive(Clone)]
pub struct GoalService {
    goals: Arc<dyn GoalStore>,
    consultations: Arc<dyn ConsultationStore>,
    activity: Arc<dyn ActivityLog>,
    gate: TierGate,
    aggregator: AnalyticsAggregator,
    scheduler: ConsultationScheduler,
}

impl std::fmt::Debug for GoalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalService")
            .field("gate", &self.gate)
            .field("aggregator", &self.aggregator)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl GoalService {
    /// Create a service over the given stores with the default policy.
    pub fn new(
        goals: Arc<dyn GoalStore>,
        consultations: Arc<dyn ConsultationStore>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            goals,
            consultations,
            activity,
            gate: TierGate::default(),
            aggregator: AnalyticsAggregator::default(),
            scheduler: ConsultationScheduler::default(),
        }
    }

    /// A service backed entirely by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, Arc::new(MemoryActivityLog::new()))
    }

    /// A service persisting to `data_dir` with `config` applied.
    ///
    /// Records go to `store.json` and activity to `activity.jsonl`; neither
    /// file is created until the first write.
    #[must_use]
    pub fn open(data_dir: &Path, config: &EngineConfig) -> Self {
        let store = Arc::new(JsonFileStore::new(data_dir));
        let activity = Arc::new(JsonlActivityLog::new(JsonlActivityLog::default_path(data_dir)));
        Self::new(store.clone(), store, activity).with_config(config)
    }

    /// Apply tier policy and booking settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.gate = TierGate::new(config.policy.clone());
        self.scheduler = ConsultationScheduler::new(self.gate.clone(), config.consultation.clone());
        self
    }

    /// The tier gate in force.
    #[must_use]
    pub fn gate(&self) -> &TierGate {
        &self.gate
    }

    // ========================================================================
    // Goals
    // ========================================================================

    /// Create a goal and its roadmap for `owner`.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank objective, a blank task title, a task weight
    /// above [`MAX_TASK_WEIGHT`] or a deadline that is not after `now`;
    /// otherwise a storage error.
    pub fn create_goal(&self, owner: &UserId, draft: GoalDraft, now: DateTime<Utc>) -> Result<Goal> {
        validate_draft(&draft, now)?;

        let mut draft = draft;
        draft.objective = draft.objective.trim().to_string();
        let goal = Goal::from_draft(draft, owner.clone(), now);
        self.goals.insert_goal(goal.clone())?;

        info!(
            goal = %goal.id,
            owner = %owner,
            tasks = goal.tasks.len(),
            "goal created"
        );
        Ok(goal)
    }

    /// A goal as seen by `caller`, with per-task actionability.
    ///
    /// # Errors
    ///
    /// `GoalNotFound` if the goal does not exist or belongs to someone else.
    pub fn goal_view(&self, goal_id: &GoalId, caller: &Caller) -> Result<GoalView> {
        let goal = self.owned_goal(goal_id, &caller.user_id)?;
        Ok(GoalView::new(&goal, &self.gate, caller.tier))
    }

    /// All goals of `owner`, oldest first.
    pub fn list_goals(&self, owner: &UserId) -> Result<Vec<Goal>> {
        self.goals.goals_for_owner(owner)
    }

    /// Delete a goal together with its tasks and booked consultations.
    pub fn delete_goal(&self, goal_id: &GoalId, user: &UserId) -> Result<Goal> {
        self.owned_goal(goal_id, user)?;
        let removed = self.goals.delete_goal(goal_id)?;
        let consultations = self.consultations.delete_consultations_for_goal(goal_id)?;
        info!(
            goal = %goal_id,
            tasks = removed.tasks.len(),
            consultations,
            "goal deleted"
        );
        Ok(removed)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    /// Flip the completion state of a learner-completable task.
    ///
    /// # Errors
    ///
    /// `GoalNotFound`/`TaskNotFound`, `CompletionReserved` for mentor-assessed
    /// tasks, `InsufficientTier` for gated tasks, or a storage error.
    pub fn toggle_task(
        &self,
        goal_id: &GoalId,
        task_id: &TaskId,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<TaskUpdate> {
        let gate = &self.gate;
        let goal = self.goals.update_goal(goal_id, &mut |goal| {
            ensure_owner(goal, &caller.user_id)?;
            let task = goal.task_mut(task_id)?;
            if !task.task_type.learner_can_complete() {
                return Err(EngineError::CompletionReserved {
                    task_id: task_id.clone(),
                    task_type: task.task_type,
                });
            }
            gate.require_task_actionable(task, caller.tier)?;

            let completed = !task.is_completed;
            task.set_completed(completed, now);
            goal.recompute_progress();
            Ok(())
        })?;

        let update = TaskUpdate::from_goal(&goal, task_id)?;
        let kind = if update.task.is_completed {
            ActivityKind::TaskCompleted
        } else {
            ActivityKind::TaskReopened
        };
        self.record(ActivityEvent::for_goal(
            caller.user_id.clone(),
            goal_id.clone(),
            Some(task_id.clone()),
            kind,
            now,
        ));

        info!(
            goal = %goal_id,
            task = %task_id,
            completed = update.task.is_completed,
            overall = update.overall_progress,
            "task toggled"
        );
        Ok(update)
    }

    /// Attach submitted work to a mentor-assessed task.
    ///
    /// Resubmitting replaces the previous URL.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank URL or a task that is not mentor-assessed,
    /// `InsufficientTier` for gated tasks, or a not-found/storage error.
    pub fn submit_assignment(
        &self,
        goal_id: &GoalId,
        task_id: &TaskId,
        caller: &Caller,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let url = url.trim();
        if url.is_empty() {
            return Err(EngineError::validation("submission_url", "must not be empty"));
        }

        let gate = &self.gate;
        let goal = self.goals.update_goal(goal_id, &mut |goal| {
            ensure_owner(goal, &caller.user_id)?;
            let task = goal.task_mut(task_id)?;
            require_mentor_assessed(task)?;
            gate.require_task_actionable(task, caller.tier)?;
            task.submission_url = Some(url.to_string());
            Ok(())
        })?;

        let task = TaskUpdate::from_goal(&goal, task_id)?.task;
        self.record(ActivityEvent::for_goal(
            caller.user_id.clone(),
            goal_id.clone(),
            Some(task_id.clone()),
            ActivityKind::Submission,
            now,
        ));
        info!(goal = %goal_id, task = %task_id, "assignment submitted");
        Ok(task)
    }

    /// Store a mentor's review of a mentor-assessed task.
    ///
    /// Approval completes the task; a rejection reopens it. Feedback and
    /// score are stored as given. The goal's owner cannot review their own
    /// work.
    ///
    /// # Errors
    ///
    /// `Validation` if the task is not mentor-assessed, `CompletionReserved`
    /// when `reviewer` owns the goal, or a not-found/storage error.
    pub fn record_review(
        &self,
        goal_id: &GoalId,
        task_id: &TaskId,
        reviewer: &Caller,
        review: MentorReview,
        now: DateTime<Utc>,
    ) -> Result<TaskUpdate> {
        let goal = self.goals.update_goal(goal_id, &mut |goal| {
            let owned = goal.is_owned_by(&reviewer.user_id);
            let task = goal.task_mut(task_id)?;
            require_mentor_assessed(task)?;
            if owned {
                return Err(EngineError::CompletionReserved {
                    task_id: task_id.clone(),
                    task_type: task.task_type,
                });
            }
            task.mentor_feedback = review.feedback.clone();
            task.mentor_score = review.score;
            task.set_completed(review.approved, now);
            goal.recompute_progress();
            Ok(())
        })?;

        let update = TaskUpdate::from_goal(&goal, task_id)?;
        let event = |kind| {
            ActivityEvent::for_goal(
                goal.owner_id.clone(),
                goal_id.clone(),
                Some(task_id.clone()),
                kind,
                now,
            )
        };
        self.record(event(ActivityKind::MentorReview));
        if review.approved {
            self.record(event(ActivityKind::TaskCompleted));
        }

        info!(
            goal = %goal_id,
            task = %task_id,
            reviewer = %reviewer.user_id,
            approved = review.approved,
            overall = update.overall_progress,
            "mentor review recorded"
        );
        Ok(update)
    }

    // ========================================================================
    // Analytics and activity
    // ========================================================================

    /// Analytics snapshot for a goal owned by `user`.
    ///
    /// Never fails because of the activity log; see
    /// [`AnalyticsAggregator::analyze`].
    pub fn analytics(&self, goal_id: &GoalId, user: &UserId, now: DateTime<Utc>) -> Result<GoalAnalytics> {
        let goal = self.owned_goal(goal_id, user)?;
        Ok(self.aggregator.analyze(&goal, self.activity.as_ref(), now))
    }

    /// Record that `user` logged in.
    pub fn record_login(&self, user: &UserId, now: DateTime<Utc>) {
        self.record(ActivityEvent::login(user.clone(), now));
    }

    // ========================================================================
    // Consultations
    // ========================================================================

    /// Book a mentor consultation for one of the caller's goals.
    pub fn book_consultation(
        &self,
        goal_id: &GoalId,
        caller: &Caller,
        request: BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<MentorConsultation> {
        let booked = self.scheduler.book(
            self.goals.as_ref(),
            self.consultations.as_ref(),
            caller,
            goal_id,
            request,
            now,
        )?;
        self.record(ActivityEvent::for_goal(
            caller.user_id.clone(),
            goal_id.clone(),
            None,
            ActivityKind::ConsultationBooked,
            now,
        ));
        Ok(booked)
    }

    /// Consultations booked against a goal owned by `user`.
    pub fn consultations(&self, goal_id: &GoalId, user: &UserId) -> Result<Vec<MentorConsultation>> {
        self.owned_goal(goal_id, user)?;
        self.consultations.consultations_for_goal(goal_id)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn owned_goal(&self, goal_id: &GoalId, user: &UserId) -> Result<Goal> {
        let goal = self.goals.get_goal(goal_id)?;
        ensure_owner(&goal, user)?;
        Ok(goal)
    }

    fn record(&self, event: ActivityEvent) {
        match self.activity.record(&event) {
            Ok(()) => debug!(kind = ?event.kind, user = %event.user_id, "activity recorded"),
            Err(e) => warn!(kind = ?event.kind, error = %e, "failed to record activity"),
        }
    }
}

/// Goals of other users are reported as missing.
fn ensure_owner(goal: &Goal, user: &UserId) -> Result<()> {
    if goal.is_owned_by(user) {
        Ok(())
    } else {
        Err(EngineError::GoalNotFound {
            id: goal.id.clone(),
        })
    }
}

fn require_mentor_assessed(task: &Task) -> Result<()> {
    if task.task_type == TaskType::MentorAssessed {
        Ok(())
    } else {
        Err(EngineError::validation(
            "task_type",
            format!("task {} is {}, not mentor_assessed", task.id, task.task_type),
        ))
    }
}

fn validate_draft(draft: &GoalDraft, now: DateTime<Utc>) -> Result<()> {
    if draft.objective.trim().is_empty() {
        return Err(EngineError::validation("objective", "must not be empty"));
    }
    if draft.target_deadline <= now {
        return Err(EngineError::validation(
            "target_deadline",
            "must be after the creation time",
        ));
    }
    if let Some(index) = draft.tasks.iter().position(|t| t.title.trim().is_empty()) {
        return Err(EngineError::validation(
            format!("tasks[{index}].title"),
            "must not be empty",
        ));
    }
    if let Some(index) = draft.tasks.iter().position(|t| t.weight > MAX_TASK_WEIGHT) {
        return Err(EngineError::validation(
            format!("tasks[{index}].weight"),
            format!("must be between 0 and {MAX_TASK_WEIGHT}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, TaskDraft};
    use crate::tier::Tier;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
    }

    fn learner(tier: Tier) -> Caller {
        Caller::new(UserId::from("learner"), tier)
    }

    fn mentor() -> Caller {
        Caller::new(UserId::from("mentor"), Tier::Explorer)
    }

    fn draft(title: &str, task_type: TaskType, weight: u32, requires_verification: bool) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: String::new(),
            task_type,
            category: Category::Writing,
            weight,
            requires_verification,
        }
    }

    fn roadmap() -> GoalDraft {
        GoalDraft {
            objective: "  Write a cover letter in English  ".to_string(),
            target_deadline: start() + Duration::days(100),
            tasks: vec![
                draft("Learn letter structure", TaskType::System, 40, false),
                draft("Write three drafts", TaskType::SelfTrack, 30, false),
                draft("Mentor-reviewed letter", TaskType::MentorAssessed, 30, true),
            ],
        }
    }

    fn service_with_log(log: Arc<dyn ActivityLog>) -> (GoalService, Goal) {
        let store = Arc::new(MemoryStore::new());
        let service = GoalService::new(store.clone(), store, log);
        let goal = service
            .create_goal(&UserId::from("learner"), roadmap(), start())
            .unwrap();
        (service, goal)
    }

    fn service() -> (GoalService, Goal) {
        service_with_log(Arc::new(MemoryActivityLog::new()))
    }

    #[test]
    fn test_create_goal_trims_objective_and_orders_tasks() {
        let (_, goal) = service();
        assert_eq!(goal.objective, "Write a cover letter in English");
        assert_eq!(goal.tasks.len(), 3);
        assert_eq!(goal.overall_progress, 0);
    }

    #[test]
    fn test_create_goal_rejects_past_deadline() {
        let service = GoalService::in_memory();
        let mut draft = roadmap();
        draft.target_deadline = start();
        let err = service
            .create_goal(&UserId::from("learner"), draft, start())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "target_deadline"));
    }

    #[test]
    fn test_create_goal_rejects_blank_task_title() {
        let service = GoalService::in_memory();
        let mut draft = roadmap();
        draft.tasks[1].title = "  ".to_string();
        let err = service
            .create_goal(&UserId::from("learner"), draft, start())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "tasks[1].title"));
    }

    #[test]
    fn test_create_goal_rejects_oversized_weight() {
        let service = GoalService::in_memory();
        let mut draft = roadmap();
        draft.tasks[2].weight = 4_000_000_000;
        let err = service
            .create_goal(&UserId::from("learner"), draft, start())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "tasks[2].weight"));
        assert!(service.list_goals(&UserId::from("learner")).unwrap().is_empty());

        let mut draft = roadmap();
        draft.tasks[0].weight = MAX_TASK_WEIGHT;
        assert!(service
            .create_goal(&UserId::from("learner"), draft, start())
            .is_ok());
    }

    #[test]
    fn test_toggle_two_tasks_reaches_seventy() {
        let (service, goal) = service();
        let caller = learner(Tier::Explorer);
        service
            .toggle_task(&goal.id, &goal.tasks[0].id, &caller, start())
            .unwrap();
        let update = service
            .toggle_task(&goal.id, &goal.tasks[1].id, &caller, start())
            .unwrap();
        assert_eq!(update.overall_progress, 70);
        assert!(update.task.is_completed);
        assert_eq!(update.task.completed_at, Some(start()));
    }

    #[test]
    fn test_toggle_back_restores_progress() {
        let (service, goal) = service();
        let caller = learner(Tier::Explorer);
        let task = &goal.tasks[0].id;

        let on = service.toggle_task(&goal.id, task, &caller, start()).unwrap();
        assert_eq!(on.overall_progress, 40);
        let off = service.toggle_task(&goal.id, task, &caller, start()).unwrap();
        assert_eq!(off.overall_progress, goal.overall_progress);
        assert!(!off.task.is_completed);
        assert_eq!(off.task.completed_at, None);
    }

    #[test]
    fn test_toggle_mentor_task_is_reserved() {
        let (service, goal) = service();
        let err = service
            .toggle_task(&goal.id, &goal.tasks[2].id, &learner(Tier::Visionary), start())
            .unwrap_err();
        assert_eq!(err.code(), "completion_reserved");
    }

    #[test]
    fn test_toggle_gated_task_needs_tier() {
        let store = Arc::new(MemoryStore::new());
        let service = GoalService::new(store.clone(), store, Arc::new(MemoryActivityLog::new()));
        let mut draft = roadmap();
        draft.tasks[0].requires_verification = true;
        let goal = service
            .create_goal(&UserId::from("learner"), draft, start())
            .unwrap();

        let err = service
            .toggle_task(&goal.id, &goal.tasks[0].id, &learner(Tier::Explorer), start())
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientTier { .. }));

        let ok = service
            .toggle_task(&goal.id, &goal.tasks[0].id, &learner(Tier::Insider), start())
            .unwrap();
        assert_eq!(ok.overall_progress, 40);
    }

    #[test]
    fn test_toggle_by_other_user_is_not_found() {
        let (service, goal) = service();
        let stranger = Caller::new(UserId::from("stranger"), Tier::Visionary);
        let err = service
            .toggle_task(&goal.id, &goal.tasks[0].id, &stranger, start())
            .unwrap_err();
        assert!(matches!(err, EngineError::GoalNotFound { .. }));
    }

    #[test]
    fn test_toggle_unknown_task() {
        let (service, goal) = service();
        let err = service
            .toggle_task(
                &goal.id,
                &TaskId::from_string("nope"),
                &learner(Tier::Explorer),
                start(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound { .. }));
    }

    #[test]
    fn test_submission_then_approval_completes_task() {
        let (service, goal) = service();
        let mentor_task = &goal.tasks[2].id;

        let submitted = service
            .submit_assignment(
                &goal.id,
                mentor_task,
                &learner(Tier::Insider),
                " https://docs.example.com/letter ",
                start(),
            )
            .unwrap();
        assert_eq!(
            submitted.submission_url.as_deref(),
            Some("https://docs.example.com/letter")
        );
        assert!(submitted.awaiting_review());

        let reviewed = service
            .record_review(
                &goal.id,
                mentor_task,
                &mentor(),
                MentorReview {
                    feedback: Some("Clear and concise".to_string()),
                    score: Some(8),
                    approved: true,
                },
                start(),
            )
            .unwrap();
        assert!(reviewed.task.is_completed);
        assert_eq!(reviewed.task.mentor_score, Some(8));
        assert_eq!(reviewed.overall_progress, 30);
    }

    #[test]
    fn test_submission_rejected_for_explorer_on_verified_task() {
        let (service, goal) = service();
        let err = service
            .submit_assignment(
                &goal.id,
                &goal.tasks[2].id,
                &learner(Tier::Explorer),
                "https://example.com",
                start(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientTier { .. }));
    }

    #[test]
    fn test_submission_requires_url_and_mentor_task() {
        let (service, goal) = service();
        let caller = learner(Tier::Insider);
        let blank = service
            .submit_assignment(&goal.id, &goal.tasks[2].id, &caller, "   ", start())
            .unwrap_err();
        assert_eq!(blank.code(), "validation_error");

        let wrong_type = service
            .submit_assignment(&goal.id, &goal.tasks[0].id, &caller, "https://x", start())
            .unwrap_err();
        assert_eq!(wrong_type.code(), "validation_error");
    }

    #[test]
    fn test_rejected_review_reopens_task() {
        let (service, goal) = service();
        let task = &goal.tasks[2].id;
        let approve = MentorReview {
            approved: true,
            ..MentorReview::default()
        };
        service
            .record_review(&goal.id, task, &mentor(), approve, start())
            .unwrap();
        let reopened = service
            .record_review(&goal.id, task, &mentor(), MentorReview::default(), start())
            .unwrap();
        assert!(!reopened.task.is_completed);
        assert_eq!(reopened.overall_progress, 0);
    }

    #[test]
    fn test_owner_cannot_review_own_task() {
        let (service, goal) = service();
        let approve = MentorReview {
            approved: true,
            score: Some(10),
            ..MentorReview::default()
        };
        let err = service
            .record_review(&goal.id, &goal.tasks[2].id, &learner(Tier::Visionary), approve, start())
            .unwrap_err();
        assert_eq!(err.code(), "completion_reserved");

        let stored = service.goal_view(&goal.id, &learner(Tier::Visionary)).unwrap();
        assert!(!stored.tasks[2].task.is_completed);
        assert_eq!(stored.tasks[2].task.mentor_score, None);
        assert_eq!(stored.overall_progress, 0);
    }

    #[test]
    fn test_activity_recorded_for_mutations() {
        let log = Arc::new(MemoryActivityLog::new());
        let (service, goal) = service_with_log(log.clone());
        let caller = learner(Tier::Explorer);

        service.record_login(&caller.user_id, start());
        service
            .toggle_task(&goal.id, &goal.tasks[0].id, &caller, start())
            .unwrap();
        service
            .toggle_task(&goal.id, &goal.tasks[0].id, &caller, start())
            .unwrap();

        let kinds: Vec<ActivityKind> = log
            .events_for_user(&caller.user_id)
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::Login,
                ActivityKind::TaskCompleted,
                ActivityKind::TaskReopened
            ]
        );
    }

    #[test]
    fn test_failing_activity_log_does_not_fail_mutation() {
        let (service, goal) = service_with_log(Arc::new(MemoryActivityLog::unavailable()));
        let caller = learner(Tier::Explorer);
        let update = service
            .toggle_task(&goal.id, &goal.tasks[0].id, &caller, start())
            .unwrap();
        assert_eq!(update.overall_progress, 40);

        let analytics = service
            .analytics(&goal.id, &caller.user_id, start() + Duration::days(1))
            .unwrap();
        assert!(!analytics.activity_available);
        assert_eq!(analytics.overall_progress, 40);
        assert_eq!(analytics.days_active, 0);
    }

    #[test]
    fn test_analytics_counts_streak_from_toggles() {
        let (service, goal) = service();
        let caller = learner(Tier::Explorer);
        service
            .toggle_task(&goal.id, &goal.tasks[0].id, &caller, start())
            .unwrap();
        service
            .toggle_task(&goal.id, &goal.tasks[1].id, &caller, start() + Duration::days(1))
            .unwrap();

        let analytics = service
            .analytics(&goal.id, &caller.user_id, start() + Duration::days(1))
            .unwrap();
        assert!(analytics.activity_available);
        assert_eq!(analytics.completion_streak, 2);
        assert_eq!(analytics.days_active, 2);
        assert_eq!(analytics.overall_progress, 70);
    }

    #[test]
    fn test_goal_view_flags_gated_tasks() {
        let (service, goal) = service();
        let view = service.goal_view(&goal.id, &learner(Tier::Explorer)).unwrap();
        let flags: Vec<bool> = view.tasks.iter().map(|t| t.is_actionable).collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_book_and_list_consultations() {
        let (service, goal) = service();
        let caller = learner(Tier::Insider);
        let request = BookingRequest {
            scheduled_at: start() + Duration::days(20),
            topics: vec!["cover letters".to_string()],
            notes: None,
        };
        service
            .book_consultation(&goal.id, &caller, request, start())
            .unwrap();

        let listed = service.consultations(&goal.id, &caller.user_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(service
            .consultations(&goal.id, &UserId::from("stranger"))
            .is_err());
    }

    #[test]
    fn test_delete_goal() {
        let (service, goal) = service();
        let owner = UserId::from("learner");
        assert!(service.delete_goal(&goal.id, &UserId::from("stranger")).is_err());
        service.delete_goal(&goal.id, &owner).unwrap();
        assert!(service.list_goals(&owner).unwrap().is_empty());
    }

    #[test]
    fn test_delete_goal_drops_its_consultations() {
        let store = Arc::new(MemoryStore::new());
        let service = GoalService::new(store.clone(), store.clone(), Arc::new(MemoryActivityLog::new()));
        let caller = learner(Tier::Insider);
        let doomed = service.create_goal(&caller.user_id, roadmap(), start()).unwrap();
        let kept = service.create_goal(&caller.user_id, roadmap(), start()).unwrap();
        let request = || BookingRequest {
            scheduled_at: start() + Duration::days(20),
            topics: vec!["interview answers".to_string()],
            notes: None,
        };
        for goal in [&doomed, &doomed, &kept] {
            service
                .book_consultation(&goal.id, &caller, request(), start())
                .unwrap();
        }

        service.delete_goal(&doomed.id, &caller.user_id).unwrap();
        assert!(store.consultations_for_goal(&doomed.id).unwrap().is_empty());
        assert_eq!(service.consultations(&kept.id, &caller.user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_with_config_applies_policy() {
        let mut config = EngineConfig::default();
        config.policy.consultation_min_tier = Tier::Visionary;
        let service = GoalService::in_memory().with_config(&config);
        let goal = service
            .create_goal(&UserId::from("learner"), roadmap(), start())
            .unwrap();
        let request = BookingRequest {
            scheduled_at: start() + Duration::days(30),
            topics: vec!["grammar".to_string()],
            notes: None,
        };
        let err = service
            .book_consultation(&goal.id, &learner(Tier::Insider), request, start())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientTier {
                required: Tier::Visionary,
                ..
            }
        ));
    }
}
