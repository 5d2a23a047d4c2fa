//! File-backed feedback store
//!
//! One read-write lock guards the whole file. Reads share the lock; `save`
//! and `delete_by_id` hold it exclusively across read, mutate and full
//! rewrite. Nothing is cached between calls, every operation re-reads the
//! file.

pub mod format;

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::{FeedbackError, Result};
use crate::types::FeedbackEntry;

/// Fields that support case-insensitive lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindField {
    Department,
    Sentiment,
}

impl FindField {
    fn value_of<'a>(&self, entry: &'a FeedbackEntry) -> Option<&'a str> {
        match self {
            FindField::Department => entry.department.as_deref(),
            FindField::Sentiment => entry.sentiment.as_deref(),
        }
    }

    /// Case-insensitive exact match of this field against `value`
    pub fn matches(&self, entry: &FeedbackEntry, value: &str) -> bool {
        self.value_of(entry)
            .map(|v| v.to_lowercase() == value.to_lowercase())
            .unwrap_or(false)
    }
}

impl std::fmt::Display for FindField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindField::Department => write!(f, "department"),
            FindField::Sentiment => write!(f, "sentiment"),
        }
    }
}

/// Full-scan read access to stored feedback
pub trait FeedbackSource: Send + Sync {
    fn scan_all(&self) -> Result<Vec<FeedbackEntry>>;
}

impl FeedbackSource for FeedbackStore {
    fn scan_all(&self) -> Result<Vec<FeedbackEntry>> {
        FeedbackStore::scan_all(self)
    }
}

/// Lock-guarded collection of feedback records in a flat text file
pub struct FeedbackStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FeedbackStore {
    /// Create a store over `path`. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every well-formed record, in file order
    pub fn scan_all(&self) -> Result<Vec<FeedbackEntry>> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| FeedbackError::LockPoisoned("feedback store"))?;
        self.read_entries()
    }

    /// Point lookup; read failures are logged and reported as not found
    pub fn find_by_id(&self, id: u64) -> Option<FeedbackEntry> {
        match self.scan_all() {
            Ok(entries) => entries.into_iter().find(|e| e.id == Some(id)),
            Err(e) => {
                error!("Error finding feedback by ID {}: {}", id, e);
                None
            }
        }
    }

    /// Case-insensitive exact match; read failures yield an empty list
    pub fn find_by_field(&self, field: FindField, value: &str) -> Vec<FeedbackEntry> {
        match self.scan_all() {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| field.matches(e, value))
                .collect(),
            Err(e) => {
                error!("Error finding feedback by {} {}: {}", field, value, e);
                Vec::new()
            }
        }
    }

    pub fn find_by_department(&self, department: &str) -> Vec<FeedbackEntry> {
        self.find_by_field(FindField::Department, department)
    }

    pub fn find_by_sentiment(&self, sentiment: &str) -> Vec<FeedbackEntry> {
        self.find_by_field(FindField::Sentiment, sentiment)
    }

    /// Insert or replace a record and rewrite the file.
    ///
    /// A record without an id gets `max(id) + 1` (1 for an empty store). A
    /// record with an id replaces any stored record with that id and moves
    /// to the end of the file.
    pub fn save(&self, mut entry: FeedbackEntry) -> Result<FeedbackEntry> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| FeedbackError::LockPoisoned("feedback store"))?;
        let mut entries = self.read_entries()?;

        match entry.id {
            None => {
                let max_id = entries.iter().filter_map(|e| e.id).max().unwrap_or(0);
                let next = max_id.checked_add(1).ok_or(FeedbackError::IdExhausted(max_id))?;
                entry.id = Some(next);
            }
            Some(id) => entries.retain(|e| e.id != Some(id)),
        }
        entries.push(entry.clone());

        self.write_entries(&entries)?;
        info!("Saved feedback with ID: {}", entry.id_label());
        Ok(entry)
    }

    /// Remove a record and rewrite the file. Returns whether anything was removed.
    pub fn delete_by_id(&self, id: u64) -> Result<bool> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| FeedbackError::LockPoisoned("feedback store"))?;
        let mut entries = self.read_entries()?;

        let before = entries.len();
        entries.retain(|e| e.id != Some(id));
        let removed = entries.len() != before;

        self.write_entries(&entries)?;
        info!("Deleted feedback with ID: {}", id);
        Ok(removed)
    }

    // Callers hold the lock.
    fn read_entries(&self) -> Result<Vec<FeedbackEntry>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(format::parse_entries(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Feedback file not found: {}", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    // Truncates in place; a crash mid-write leaves a partial file.
    fn write_entries(&self, entries: &[FeedbackEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = fs::File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(format::render_entries(entries).as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
