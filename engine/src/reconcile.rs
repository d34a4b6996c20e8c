//! Single-record reconciliation: decide who wins for one puzzle key.
//!
//! The single source of truth is the server-assigned `updated_at`
//! timestamp, with two policy overrides:
//!
//! - The bulk path trusts a present remote row unconditionally. Stale
//!   local clocks across devices would otherwise produce false "local
//!   newer" positives. The cost: a more-recent offline edit that never
//!   got pushed can be overwritten by the next bulk pull. Accepted.
//! - An immediate sync of an untouched puzzle does nothing at all, so
//!   navigating away from an empty grid never manufactures a record.

use crate::progress::PuzzleProgress;
use crate::remote::RemoteProgress;
use serde::{Deserialize, Serialize};

/// Which trigger path asked for the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncMode {
    /// Full weekly pass; remote wins whenever it has a row.
    Bulk,
    /// Pause, puzzle switch, or day switch; bypasses the debounce window.
    Immediate,
    /// Coalesced edit burst after the quiet period.
    Debounced,
}

/// The action that follows from comparing local and remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcileAction {
    /// Push local to remote.
    Save,
    /// Pull remote into the local store.
    Load,
    /// Server already consistent; touch nothing.
    Noop,
}

/// Decide the action for one puzzle key.
///
/// `local` and `remote` are snapshot reads; the remote upsert is the
/// unit of atomicity, so two devices syncing in the same instant race
/// within that snapshot window. Best-effort by design.
///
/// The orchestrator calls this with `remote: None` on the incremental
/// path, where it never holds the server row; the `Immediate` and
/// `Debounced` arms with a remote present state the timestamp rule the
/// sync endpoint applies server-side, including tie-resolves-as-load.
/// The bulk path runs the full decision client-side.
pub fn decide(
    local: Option<&PuzzleProgress>,
    remote: Option<&RemoteProgress>,
    mode: SyncMode,
) -> ReconcileAction {
    let local_has_progress = local.map_or(false, |r| r.has_progress());

    match remote {
        None => {
            if local_has_progress {
                ReconcileAction::Save
            } else {
                ReconcileAction::Noop
            }
        }
        Some(remote) => {
            if !local_has_progress && mode == SyncMode::Immediate {
                // Pure acknowledgment; don't pull state into a puzzle
                // the user merely glanced at.
                return ReconcileAction::Noop;
            }
            match mode {
                SyncMode::Bulk => ReconcileAction::Load,
                SyncMode::Immediate | SyncMode::Debounced => {
                    let local_ms = local.map_or(0, |r| r.updated_at);
                    if local_ms > remote.updated_at.timestamp_millis() {
                        ReconcileAction::Save
                    } else {
                        ReconcileAction::Load
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{GridSize, PuzzleKey};
    use crate::progress::ProgressStatus;
    use chrono::{DateTime, Utc};
    use std::str::FromStr;

    fn key() -> PuzzleKey {
        PuzzleKey::from_str("2025-11-20-5x5").unwrap()
    }

    fn local_at(updated_at: i64) -> PuzzleProgress {
        let mut record = PuzzleProgress::new(key());
        record.status = ProgressStatus::Started;
        record.entries.insert("0-0".to_string(), 'A');
        record.elapsed_seconds = 30;
        record.updated_at = updated_at;
        record
    }

    fn remote_at(updated_at_ms: i64) -> RemoteProgress {
        RemoteProgress {
            puzzle_id: key().to_string(),
            grid_size: GridSize(5),
            status: ProgressStatus::Started,
            elapsed_seconds: 10,
            was_paused: false,
            progress_json: None,
            completed_at: None,
            updated_at: DateTime::from_timestamp_millis(updated_at_ms).unwrap(),
        }
    }

    #[test]
    fn both_absent_is_noop() {
        assert_eq!(decide(None, None, SyncMode::Immediate), ReconcileAction::Noop);
        assert_eq!(decide(None, None, SyncMode::Bulk), ReconcileAction::Noop);
    }

    #[test]
    fn empty_local_no_remote_is_noop() {
        let empty = PuzzleProgress::new(key());
        assert_eq!(
            decide(Some(&empty), None, SyncMode::Immediate),
            ReconcileAction::Noop
        );
    }

    #[test]
    fn local_progress_no_remote_is_save() {
        let local = local_at(1000);
        for mode in [SyncMode::Bulk, SyncMode::Immediate, SyncMode::Debounced] {
            assert_eq!(decide(Some(&local), None, mode), ReconcileAction::Save);
        }
    }

    #[test]
    fn bulk_always_trusts_remote() {
        // Even a newer local record loses on the bulk path.
        let local = local_at(2_000_000);
        let remote = remote_at(1_000_000);
        assert_eq!(
            decide(Some(&local), Some(&remote), SyncMode::Bulk),
            ReconcileAction::Load
        );
    }

    #[test]
    fn incremental_compares_timestamps() {
        let remote = remote_at(1_000_000);

        let newer_local = local_at(2_000_000);
        assert_eq!(
            decide(Some(&newer_local), Some(&remote), SyncMode::Debounced),
            ReconcileAction::Save
        );

        let older_local = local_at(500_000);
        assert_eq!(
            decide(Some(&older_local), Some(&remote), SyncMode::Debounced),
            ReconcileAction::Load
        );

        // Exact tie: remote wins
        let tied_local = local_at(1_000_000);
        assert_eq!(
            decide(Some(&tied_local), Some(&remote), SyncMode::Immediate),
            ReconcileAction::Load
        );
    }

    #[test]
    fn immediate_with_empty_local_is_noop_even_with_remote() {
        let empty = PuzzleProgress::new(key());
        let remote = remote_at(1_000_000);
        assert_eq!(
            decide(Some(&empty), Some(&remote), SyncMode::Immediate),
            ReconcileAction::Noop
        );
        assert_eq!(
            decide(None, Some(&remote), SyncMode::Immediate),
            ReconcileAction::Noop
        );
        // But the bulk path still downloads it.
        assert_eq!(
            decide(Some(&empty), Some(&remote), SyncMode::Bulk),
            ReconcileAction::Load
        );
    }
}
