//! Per-puzzle progress records and the local progress store.
//!
//! Absence of a record IS the not-started state: a record with no
//! entries, zero elapsed time, and non-complete status is never
//! persisted, and stores may return `None` for any key.

use crate::error::{Result, SyncError};
use crate::key::PuzzleKey;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Lifecycle state of one puzzle attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    Started,
    Paused,
    Complete,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not-started",
            ProgressStatus::Started => "started",
            ProgressStatus::Paused => "paused",
            ProgressStatus::Complete => "complete",
        }
    }
}

impl FromStr for ProgressStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "not-started" => Ok(ProgressStatus::NotStarted),
            "started" => Ok(ProgressStatus::Started),
            "paused" => Ok(ProgressStatus::Paused),
            "complete" => Ok(ProgressStatus::Complete),
            other => Err(SyncError::MalformedPayload(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

/// One puzzle's local progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleProgress {
    /// Composite key, also the local-store address
    #[serde(rename = "storageKey")]
    pub key: PuzzleKey,
    /// Lifecycle status
    pub status: ProgressStatus,
    /// Cell coordinate (`"row-col"`) to uppercase letter
    pub entries: HashMap<String, char>,
    /// Accumulated timer, seconds
    pub elapsed_seconds: u32,
    /// Milliseconds since epoch, authoritative for conflict resolution
    pub updated_at: i64,
}

impl PuzzleProgress {
    /// Create an empty record. Not persistable until it has progress.
    pub fn new(key: PuzzleKey) -> Self {
        Self {
            key,
            status: ProgressStatus::NotStarted,
            entries: HashMap::new(),
            elapsed_seconds: 0,
            updated_at: 0,
        }
    }

    /// Whether this record carries anything worth syncing. Empty records
    /// must never reach the wire or the store.
    pub fn has_progress(&self) -> bool {
        !self.entries.is_empty()
            || self.elapsed_seconds > 0
            || self.status == ProgressStatus::Complete
    }
}

/// Consumed interface of the local per-puzzle store.
///
/// Keys are the composite `"{date}-{size}"` tokens. How the host
/// persists records (IndexedDB, sqlite, files) is its own business.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(&self, key: &PuzzleKey) -> Result<Option<PuzzleProgress>>;
    async fn set(&self, record: &PuzzleProgress) -> Result<()>;
    async fn delete(&self, key: &PuzzleKey) -> Result<()>;
}

/// In-memory progress store.
///
/// Also the ephemeral fallback when the host's persistent store fails
/// to open; the session still works, it just forgets on exit.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<String, PuzzleProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get(&self, key: &PuzzleKey) -> Result<Option<PuzzleProgress>> {
        Ok(self.records.lock().get(&key.to_string()).cloned())
    }

    async fn set(&self, record: &PuzzleProgress) -> Result<()> {
        self.records
            .lock()
            .insert(record.key.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &PuzzleKey) -> Result<()> {
        self.records.lock().remove(&key.to_string());
        Ok(())
    }
}
