//! JSON document store with atomic, lock-protected writes.
//!
//! All records live in a single `store.json` document. Writers take an
//! exclusive `fs2` lock on a sibling lock file for the whole
//! read-modify-write and replace the document via a temp-file rename, so a
//! crash never leaves a half-written store and concurrent devices cannot
//! lose each other's updates.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{sort_goals, ConsultationStore, GoalStore};
use crate::error::{EngineError, IntoEngineError, Result};
use crate::model::{Goal, GoalId, MentorConsultation, UserId};

/// Store document file name.
const STORE_FILE: &str = "store.json";

/// Temporary file suffix for atomic writes.
const TMP_SUFFIX: &str = ".tmp";

/// Lock file suffix for concurrent access prevention.
const LOCK_SUFFIX: &str = ".lock";

/// Current document format version.
pub const STORE_VERSION: u32 = 1;

/// On-disk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    goals: BTreeMap<GoalId, Goal>,
    #[serde(default)]
    consultations: Vec<MentorConsultation>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            goals: BTreeMap::new(),
            consultations: Vec::new(),
        }
    }
}

/// File-backed store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Directory where store files are kept.
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. Nothing is written until the first
    /// mutation.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the path to the store document.
    #[must_use]
    pub fn store_file_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    /// Returns the path to the temporary document.
    #[must_use]
    pub fn tmp_file_path(&self) -> PathBuf {
        self.dir.join(format!("{STORE_FILE}{TMP_SUFFIX}"))
    }

    /// Returns the path to the lock file.
    #[must_use]
    pub fn lock_file_path(&self) -> PathBuf {
        self.dir.join(format!("{STORE_FILE}{LOCK_SUFFIX}"))
    }

    fn lock_error(e: std::io::Error) -> EngineError {
        EngineError::storage(format!("Failed to acquire store lock: {e}"))
    }

    /// Read the document under a shared lock.
    fn read<T>(&self, view: impl FnOnce(&StoreDocument) -> Result<T>) -> Result<T> {
        let store_path = self.store_file_path();
        if !store_path.exists() {
            return view(&StoreDocument::default());
        }

        let lock_path = self.lock_file_path();
        let _lock = if lock_path.exists() {
            let lock_file = File::open(&lock_path)?;
            FileExt::lock_shared(&lock_file).map_err(Self::lock_error)?;
            Some(lock_file)
        } else {
            None
        };

        let document = self.load_document()?;
        view(&document)
    }

    /// Read, modify and replace the document under an exclusive lock.
    ///
    /// Nothing is written if `modify` fails.
    fn write<T>(&self, modify: impl FnOnce(&mut StoreDocument) -> Result<T>) -> Result<T> {
        fs::create_dir_all(&self.dir)?;

        let lock_file = File::create(self.lock_file_path())?;
        FileExt::lock_exclusive(&lock_file).map_err(Self::lock_error)?;

        let mut document = self.load_document()?;
        let value = modify(&mut document)?;

        let tmp_path = self.tmp_file_path();
        let json = serde_json::to_string_pretty(&document).into_storage()?;

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;

        fs::rename(&tmp_path, self.store_file_path())?;
        debug!(path = %self.store_file_path().display(), "store written");

        Ok(value)
    }

    fn load_document(&self) -> Result<StoreDocument> {
        let store_path = self.store_file_path();

        let mut file = match File::open(&store_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreDocument::default())
            }
            Err(e) => return Err(e.into()),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let document: StoreDocument = serde_json::from_str(&contents).map_err(|e| {
            EngineError::storage_with_path(format!("Corrupted store document: {e}"), store_path.clone())
        })?;

        if document.version != STORE_VERSION {
            return Err(EngineError::storage_with_path(
                format!(
                    "Incompatible store version {} (supported: {})",
                    document.version, STORE_VERSION
                ),
                store_path,
            ));
        }

        Ok(document)
    }
}

impl GoalStore for JsonFileStore {
    fn get_goal(&self, id: &GoalId) -> Result<Goal> {
        self.read(|doc| {
            doc.goals
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::GoalNotFound { id: id.clone() })
        })
    }

    fn insert_goal(&self, goal: Goal) -> Result<()> {
        self.write(|doc| {
            if doc.goals.contains_key(&goal.id) {
                return Err(EngineError::validation(
                    "id",
                    format!("goal {} already exists", goal.id),
                ));
            }
            doc.goals.insert(goal.id.clone(), goal);
            Ok(())
        })
    }

    fn update_goal(
        &self,
        id: &GoalId,
        apply: &mut dyn FnMut(&mut Goal) -> Result<()>,
    ) -> Result<Goal> {
        self.write(|doc| {
            let stored = doc
                .goals
                .get_mut(id)
                .ok_or_else(|| EngineError::GoalNotFound { id: id.clone() })?;
            apply(stored)?;
            Ok(stored.clone())
        })
    }

    fn delete_goal(&self, id: &GoalId) -> Result<Goal> {
        self.write(|doc| {
            doc.goals
                .remove(id)
                .ok_or_else(|| EngineError::GoalNotFound { id: id.clone() })
        })
    }

    fn goals_for_owner(&self, owner: &UserId) -> Result<Vec<Goal>> {
        self.read(|doc| {
            let mut goals: Vec<Goal> = doc
                .goals
                .values()
                .filter(|g| g.is_owned_by(owner))
                .cloned()
                .collect();
            sort_goals(&mut goals);
            Ok(goals)
        })
    }
}

impl ConsultationStore for JsonFileStore {
    fn insert_consultation(&self, consultation: MentorConsultation) -> Result<()> {
        self.write(|doc| {
            doc.consultations.push(consultation);
            Ok(())
        })
    }

    fn consultations_for_goal(&self, goal: &GoalId) -> Result<Vec<MentorConsultation>> {
        self.read(|doc| {
            let mut matching: Vec<MentorConsultation> = doc
                .consultations
                .iter()
                .filter(|c| &c.goal_id == goal)
                .cloned()
                .collect();
            matching.sort_by_key(|c| c.scheduled_at);
            Ok(matching)
        })
    }

    fn delete_consultations_for_goal(&self, goal: &GoalId) -> Result<usize> {
        if !self.store_file_path().exists() {
            return Ok(0);
        }
        self.write(|doc| {
            let before = doc.consultations.len();
            doc.consultations.retain(|c| &c.goal_id != goal);
            Ok(before - doc.consultations.len())
        })
    }
}
