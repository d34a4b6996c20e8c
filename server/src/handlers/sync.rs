//! Sync handlers - single-puzzle reconciliation and the weekly bulk fetch.

use crate::db;
use crate::error::{AppError, Result};
use gokuro_sync::remote::{BulkRequest, BulkResponse, ProgressBlob, SyncOutcome, SyncRequest};
use gokuro_sync::{ProgressStatus, PuzzleKey};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;

/// Most puzzle ids accepted in one bulk request. A full week is 28.
const BULK_LIMIT: usize = 64;

/// Process a single-puzzle sync.
///
/// The stored `updated_at` is compared against the client's own clock:
/// the client state is accepted and answered SAVED only when it is
/// strictly newer than the stored row; otherwise the row answers
/// LOADED. The upsert assigns NOW() as the row's timestamp, so stored
/// ordering never depends on client clocks.
pub async fn handle_sync(
    pool: &PgPool,
    auth_id: &str,
    request: SyncRequest,
) -> Result<SyncOutcome> {
    let key = PuzzleKey::from_str(&request.puzzle_id)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if key.grid_size != request.grid_size {
        return Err(AppError::BadRequest(format!(
            "grid size {} does not match puzzle id {}",
            request.grid_size, request.puzzle_id
        )));
    }

    let blob: ProgressBlob = serde_json::from_str(&request.progress_json)
        .map_err(|e| AppError::BadRequest(format!("invalid progress payload: {}", e)))?;

    // An immediate sync of an untouched puzzle is acknowledged without
    // touching storage; absence of a row is the not-started state.
    let untouched = blob.entries.is_empty()
        && request.elapsed_seconds == 0
        && request.status != ProgressStatus::Complete;
    if untouched && request.immediate {
        return Ok(SyncOutcome::Saved { log_id: None });
    }

    if let Some(existing) = db::get_progress(pool, auth_id, &request.puzzle_id).await? {
        if stored_wins(existing.updated_at, request.client_updated_at) {
            tracing::debug!(puzzle_id = %request.puzzle_id, "server row newer, responding LOADED");
            return Ok(SyncOutcome::Loaded {
                latest_progress: existing.to_wire(),
            });
        }
    }

    db::upsert_progress(pool, auth_id, &request).await?;
    let log_id = db::insert_sync_log(pool, auth_id, &request.puzzle_id, "save").await?;
    tracing::debug!(puzzle_id = %request.puzzle_id, log_id, "client state saved");

    Ok(SyncOutcome::Saved {
        log_id: Some(log_id),
    })
}

/// A stored row at least as new as the client's snapshot answers
/// LOADED; a timestamp tie is not a save. This matches the client-side
/// reconciliation rule, where a tie resolves as a load.
fn stored_wins(
    stored_at: chrono::DateTime<chrono::Utc>,
    client_at: chrono::DateTime<chrono::Utc>,
) -> bool {
    stored_at >= client_at
}

/// Fetch every stored row for the requested puzzle ids in one round
/// trip. Puzzles with no row are simply absent from the response.
pub async fn handle_sync_bulk(
    pool: &PgPool,
    auth_id: &str,
    request: BulkRequest,
) -> Result<BulkResponse> {
    if request.puzzle_ids.len() > BULK_LIMIT {
        return Err(AppError::BadRequest(format!(
            "too many puzzle ids: {} (limit {})",
            request.puzzle_ids.len(),
            BULK_LIMIT
        )));
    }
    for id in &request.puzzle_ids {
        PuzzleKey::from_str(id).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    let rows = db::get_progress_bulk(pool, auth_id, &request.puzzle_ids).await?;
    let puzzles: HashMap<String, _> = rows
        .iter()
        .map(|row| (row.puzzle_id.clone(), row.to_wire()))
        .collect();

    tracing::debug!(
        requested = request.puzzle_ids.len(),
        found = puzzles.len(),
        "bulk fetch"
    );
    Ok(BulkResponse { puzzles })
}
