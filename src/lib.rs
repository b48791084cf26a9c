//! Goal Engine - weighted goal progress for language learners
//!
//! Tracks a learner's goals as weighted task checklists, projects their pace
//! against a deadline, aggregates activity into analytics, and gates premium
//! actions (verified tasks, mentor consultations) behind membership tiers.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`model`] - Goals, tasks, consultations and identifiers
//! - [`progress`] - Weighted completion, per category and per task type
//! - [`schedule`] - Pace projection against the target deadline
//! - [`analytics`] - Activity log and goal analytics snapshots
//! - [`tier`] - Membership tiers and feature gating
//! - [`consultation`] - Mentor consultation booking
//! - [`store`] - Goal and consultation persistence
//! - [`service`] - The operations exposed to the CLI and HTTP layers
//! - [`server`] - axum HTTP router
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Custom error types and handling
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use goal_engine::model::{Caller, Category, GoalDraft, TaskDraft, TaskType, UserId};
//! use goal_engine::service::GoalService;
//! use goal_engine::tier::Tier;
//!
//! let service = GoalService::in_memory();
//! let learner = Caller::new(UserId::from("learner-1"), Tier::Explorer);
//! let now = Utc::now();
//!
//! let goal = service
//!     .create_goal(
//!         &learner.user_id,
//!         GoalDraft {
//!             objective: "Order food in Spanish".to_string(),
//!             target_deadline: now + Duration::days(30),
//!             tasks: vec![TaskDraft {
//!                 title: "Learn restaurant vocabulary".to_string(),
//!                 description: String::new(),
//!                 task_type: TaskType::SelfTrack,
//!                 category: Category::Speaking,
//!                 weight: 100,
//!                 requires_verification: false,
//!             }],
//!         },
//!         now,
//!     )
//!     .unwrap();
//!
//! let update = service
//!     .toggle_task(&goal.id, &goal.tasks[0].id, &learner, now)
//!     .unwrap();
//! assert_eq!(update.overall_progress, 100);
//! ```

pub mod analytics;
pub mod config;
pub mod consultation;
pub mod error;
pub mod model;
pub mod progress;
pub mod schedule;
pub mod server;
pub mod service;
pub mod store;
pub mod tier;

// Re-export commonly used types
pub use error::{EngineError, ErrorKind, IntoEngineError, Result};

pub use analytics::{AnalyticsAggregator, GoalAnalytics};
pub use config::EngineConfig;
pub use model::{Caller, Goal, GoalId, Task, TaskId, UserId};
pub use progress::{compute_progress, ProgressReport};
pub use schedule::{LinearProjector, ScheduleProjection, ScheduleProjector};
pub use service::{GoalService, TaskUpdate};
pub use tier::{Feature, Tier, TierGate, TierPolicy};
