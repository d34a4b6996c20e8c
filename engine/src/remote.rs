//! Wire types for the remote sync API, shared by client and server.
//!
//! The server is the clock authority: `RemoteProgress::updated_at` is
//! always a server-assigned timestamp, never client-supplied. The
//! client's own clock travels separately as `client_updated_at`.

use crate::error::Result;
use crate::key::{GridSize, PuzzleKey};
use crate::progress::{ProgressStatus, PuzzleProgress};
use crate::stats::GridStats;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The inner JSON document carried as a string in `progress_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBlob {
    pub entries: HashMap<String, char>,
    pub storage_key: PuzzleKey,
    pub updated_at: i64,
}

impl ProgressBlob {
    pub fn from_record(record: &PuzzleProgress) -> Self {
        Self {
            entries: record.entries.clone(),
            storage_key: record.key,
            updated_at: record.updated_at,
        }
    }
}

/// Body of `POST /sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub puzzle_id: String,
    pub grid_size: GridSize,
    pub elapsed_seconds: u32,
    pub was_paused: bool,
    /// JSON string of [`ProgressBlob`]
    pub progress_json: String,
    pub status: ProgressStatus,
    pub client_updated_at: DateTime<Utc>,
    pub immediate: bool,
}

impl SyncRequest {
    /// Build a save request from a local record.
    pub fn from_record(record: &PuzzleProgress, was_paused: bool, immediate: bool) -> Result<Self> {
        let blob = ProgressBlob::from_record(record);
        Ok(Self {
            puzzle_id: record.key.to_string(),
            grid_size: record.key.grid_size,
            elapsed_seconds: record.elapsed_seconds,
            was_paused,
            progress_json: serde_json::to_string(&blob)?,
            status: record.status,
            client_updated_at: DateTime::from_timestamp_millis(record.updated_at)
                .unwrap_or_else(Utc::now),
            immediate,
        })
    }
}

/// Response of `POST /sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SyncOutcome {
    /// Local state was accepted as newest. `log_id` is absent for the
    /// empty-immediate no-op acknowledgment, which writes nothing.
    #[serde(rename = "SAVED")]
    Saved { log_id: Option<i64> },
    /// The server holds newer state; apply it locally.
    #[serde(rename = "LOADED")]
    Loaded { latest_progress: RemoteProgress },
}

/// Server-side progress row, as returned on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProgress {
    pub puzzle_id: String,
    pub grid_size: GridSize,
    pub status: ProgressStatus,
    pub elapsed_seconds: u32,
    pub was_paused: bool,
    pub progress_json: Option<String>,
    pub completed_at: Option<NaiveDate>,
    /// Server clock, authoritative for newest-wins.
    pub updated_at: DateTime<Utc>,
}

impl RemoteProgress {
    /// Convert to a local record for storage.
    ///
    /// A malformed or missing `progress_json` degrades to empty entries
    /// rather than failing the download; the row's own fields still land.
    pub fn to_local(&self, key: PuzzleKey) -> PuzzleProgress {
        let entries = match self.progress_json.as_deref() {
            Some(raw) => match serde_json::from_str::<ProgressBlob>(raw) {
                Ok(blob) => blob.entries,
                Err(e) => {
                    tracing::warn!(puzzle_id = %self.puzzle_id, error = %e, "malformed progress payload, treating as no entries");
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };
        PuzzleProgress {
            key,
            status: self.status,
            entries,
            elapsed_seconds: self.elapsed_seconds,
            updated_at: self.updated_at.timestamp_millis(),
        }
    }
}

/// Body of `POST /sync-bulk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRequest {
    pub puzzle_ids: Vec<String>,
}

/// Response of `POST /sync-bulk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub puzzles: HashMap<String, RemoteProgress>,
}

/// Response of `GET /stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum StatsFetchResponse {
    #[serde(rename = "FETCHED")]
    Fetched {
        stats: HashMap<GridSize, GridStats>,
    },
}

/// Body of `POST /stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsPushRequest {
    pub grid_size: GridSize,
    pub stats: GridStats,
}

/// Response of `POST /stats`. The server has merged against its stored
/// row; the returned record is final.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum StatsPushResponse {
    #[serde(rename = "SYNCED")]
    Synced { merged_stats: GridStats },
}

/// The remote sync API as consumed by the orchestrator.
///
/// Implementations carry the bearer token and transport; the engine
/// only sees typed requests and responses.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn sync(&self, request: SyncRequest) -> Result<SyncOutcome>;
    async fn sync_bulk(&self, puzzle_ids: Vec<String>) -> Result<HashMap<String, RemoteProgress>>;
    async fn fetch_stats(&self, grid_sizes: &[GridSize]) -> Result<HashMap<GridSize, GridStats>>;
    async fn push_stats(&self, grid_size: GridSize, stats: &GridStats) -> Result<GridStats>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::GridSize;
    use std::str::FromStr;

    fn test_key() -> PuzzleKey {
        PuzzleKey::from_str("2025-11-20-5x5").unwrap()
    }

    fn started_record() -> PuzzleProgress {
        let mut record = PuzzleProgress::new(test_key());
        record.status = ProgressStatus::Started;
        record.entries.insert("0-0".to_string(), 'A');
        record.elapsed_seconds = 30;
        record.updated_at = 1_763_600_000_000;
        record
    }

    #[test]
    fn sync_request_from_record() {
        let request = SyncRequest::from_record(&started_record(), false, true).unwrap();
        assert_eq!(request.puzzle_id, "2025-11-20-5x5");
        assert_eq!(request.grid_size, GridSize(5));
        assert_eq!(request.elapsed_seconds, 30);
        assert!(request.immediate);

        let blob: ProgressBlob = serde_json::from_str(&request.progress_json).unwrap();
        assert_eq!(blob.entries.get("0-0"), Some(&'A'));
        assert_eq!(blob.storage_key, test_key());
        assert_eq!(blob.updated_at, 1_763_600_000_000);
    }

    #[test]
    fn outcome_wire_format() {
        let saved = SyncOutcome::Saved { log_id: Some(7) };
        let json = serde_json::to_string(&saved).unwrap();
        assert!(json.contains("\"action\":\"SAVED\""));
        assert!(json.contains("\"log_id\":7"));

        let parsed: SyncOutcome = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, SyncOutcome::Saved { log_id: Some(7) }));
    }

    #[test]
    fn remote_progress_to_local_roundtrip() {
        let record = started_record();
        let blob = serde_json::to_string(&ProgressBlob::from_record(&record)).unwrap();
        let remote = RemoteProgress {
            puzzle_id: record.key.to_string(),
            grid_size: record.key.grid_size,
            status: record.status,
            elapsed_seconds: record.elapsed_seconds,
            was_paused: false,
            progress_json: Some(blob),
            completed_at: None,
            updated_at: DateTime::from_timestamp_millis(record.updated_at).unwrap(),
        };

        let local = remote.to_local(record.key);
        assert_eq!(local, record);
    }

    #[test]
    fn malformed_progress_json_degrades_to_empty() {
        let remote = RemoteProgress {
            puzzle_id: "2025-11-20-5x5".to_string(),
            grid_size: GridSize(5),
            status: ProgressStatus::Started,
            elapsed_seconds: 12,
            was_paused: false,
            progress_json: Some("{broken".to_string()),
            completed_at: None,
            updated_at: Utc::now(),
        };

        let local = remote.to_local(test_key());
        assert!(local.entries.is_empty());
        assert_eq!(local.elapsed_seconds, 12);
    }

    #[test]
    fn stats_fetch_response_format() {
        let mut stats = HashMap::new();
        stats.insert(GridSize(5), GridStats::default());
        let response = StatsFetchResponse::Fetched { stats };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"action\":\"FETCHED\""));
        assert!(json.contains("\"5x5\""));
    }
}
