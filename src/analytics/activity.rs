//! Append-only activity log.
//!
//! Learner actions are recorded as JSONL events and read back only as input
//! to analytics. Reads fail with `ActivityLogUnavailable` so the aggregator
//! can degrade instead of failing a whole request.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{EngineError, Result};
use crate::model::{GoalId, TaskId, UserId};

/// Kinds of recorded learner activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Login,
    TaskCompleted,
    TaskReopened,
    Submission,
    MentorReview,
    ConsultationBooked,
}

impl ActivityKind {
    /// Whether the event marks the learner as active that day.
    ///
    /// Task mutations and logins count; bookings do not.
    #[must_use]
    pub fn counts_as_active(self) -> bool {
        !matches!(self, ActivityKind::ConsultationBooked)
    }
}

/// A single activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<GoalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub kind: ActivityKind,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    /// A login event, not tied to any goal.
    #[must_use]
    pub fn login(user_id: UserId, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id,
            goal_id: None,
            task_id: None,
            kind: ActivityKind::Login,
            timestamp,
        }
    }

    /// An event about a goal, optionally naming a task.
    #[must_use]
    pub fn for_goal(
        user_id: UserId,
        goal_id: GoalId,
        task_id: Option<TaskId>,
        kind: ActivityKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            goal_id: Some(goal_id),
            task_id,
            kind,
            timestamp,
        }
    }

    /// Whether the event belongs to `goal`; goal-less events (logins) belong
    /// to every goal of their user.
    #[must_use]
    pub fn relates_to(&self, goal: &GoalId) -> bool {
        self.goal_id.as_ref().is_none_or(|g| g == goal)
    }

    /// UTC calendar day of the event.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Source of recorded learner activity.
pub trait ActivityLog: Send + Sync {
    /// Append an event.
    ///
    /// # Errors
    ///
    /// Returns `ActivityLogUnavailable` if the log cannot be written.
    fn record(&self, event: &ActivityEvent) -> Result<()>;

    /// All events recorded for `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ActivityLogUnavailable` if the log cannot be read.
    fn events_for_user(&self, user: &UserId) -> Result<Vec<ActivityEvent>>;
}

// ============================================================================
// JSONL file log
// ============================================================================

/// Activity log stored as one JSON event per line.
#[derive(Debug)]
pub struct JsonlActivityLog {
    path: PathBuf,
}

impl JsonlActivityLog {
    /// Create a log backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default log location inside a data directory.
    #[must_use]
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("activity.jsonl")
    }

    fn write_line(&self, event: &ActivityEvent) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json)
    }

    /// Parse one log line. Malformed lines are skipped with a warning.
    fn parse_line(&self, line_number: usize, line: &str) -> Option<ActivityEvent> {
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<ActivityEvent>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    line = line_number,
                    error = %e,
                    "skipping malformed activity event"
                );
                None
            }
        }
    }
}

impl ActivityLog for JsonlActivityLog {
    fn record(&self, event: &ActivityEvent) -> Result<()> {
        self.write_line(event).map_err(|e| {
            EngineError::activity_log(format!("failed to append to {}: {e}", self.path.display()))
        })
    }

    fn events_for_user(&self, user: &UserId) -> Result<Vec<ActivityEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(|e| {
            EngineError::activity_log(format!("failed to open {}: {e}", self.path.display()))
        })?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                EngineError::activity_log(format!("failed to read {}: {e}", self.path.display()))
            })?;
            if let Some(event) = self.parse_line(index + 1, &line) {
                if &event.user_id == user {
                    events.push(event);
                }
            }
        }
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

// ============================================================================
// In-memory log
// ============================================================================

/// In-memory activity log for tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    events: Mutex<Vec<ActivityEvent>>,
    unavailable: bool,
}

impl MemoryActivityLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that fails every read and write.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            unavailable: true,
        }
    }

    /// Create a log pre-populated with `events`.
    #[must_use]
    pub fn with_events(events: Vec<ActivityEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            unavailable: false,
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            Err(EngineError::activity_log("activity log offline"))
        } else {
            Ok(())
        }
    }
}

impl ActivityLog for MemoryActivityLog {
    fn record(&self, event: &ActivityEvent) -> Result<()> {
        self.check_available()?;
        self.events
            .lock()
            .map_err(|_| EngineError::activity_log("activity log lock poisoned"))?
            .push(event.clone());
        Ok(())
    }

    fn events_for_user(&self, user: &UserId) -> Result<Vec<ActivityEvent>> {
        self.check_available()?;
        let events = self
            .events
            .lock()
            .map_err(|_| EngineError::activity_log("activity log lock poisoned"))?;
        let mut matching: Vec<ActivityEvent> = events
            .iter()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.timestamp);
        Ok(matching)
    }
}
