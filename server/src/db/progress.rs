//! Database operations for the puzzle_progress and sync_log tables.

use gokuro_sync::remote::{RemoteProgress, SyncRequest};
use gokuro_sync::{GridSize, ProgressStatus};
use sqlx::{PgPool, Row};
use std::str::FromStr;

/// A stored progress row from the database.
#[derive(Debug)]
pub struct StoredProgress {
    pub puzzle_id: String,
    pub grid_size: String,
    pub status: String,
    pub elapsed_seconds: i32,
    pub was_paused: bool,
    pub progress_json: Option<String>,
    pub completed_at: Option<chrono::NaiveDate>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredProgress {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredProgress {
            puzzle_id: row.try_get("puzzle_id")?,
            grid_size: row.try_get("grid_size")?,
            status: row.try_get("status")?,
            elapsed_seconds: row.try_get("elapsed_seconds")?,
            was_paused: row.try_get("was_paused")?,
            progress_json: row.try_get("progress_json")?,
            completed_at: row.try_get("completed_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredProgress {
    /// Convert database row to the wire representation.
    ///
    /// Stored text columns that fail to parse fall back to defaults so
    /// one bad row cannot poison a whole bulk response.
    pub fn to_wire(&self) -> RemoteProgress {
        let grid_size = GridSize::from_str(&self.grid_size).unwrap_or_else(|_| {
            tracing::warn!(puzzle_id = %self.puzzle_id, grid_size = %self.grid_size, "unparseable stored grid size");
            GridSize(5)
        });
        let status = ProgressStatus::from_str(&self.status).unwrap_or_else(|_| {
            tracing::warn!(puzzle_id = %self.puzzle_id, status = %self.status, "unparseable stored status");
            ProgressStatus::NotStarted
        });
        RemoteProgress {
            puzzle_id: self.puzzle_id.clone(),
            grid_size,
            status,
            elapsed_seconds: self.elapsed_seconds.max(0) as u32,
            was_paused: self.was_paused,
            progress_json: self.progress_json.clone(),
            completed_at: self.completed_at,
            updated_at: self.updated_at,
        }
    }
}

/// Get one progress row for an account, if it exists.
pub async fn get_progress(
    pool: &PgPool,
    auth_id: &str,
    puzzle_id: &str,
) -> Result<Option<StoredProgress>, sqlx::Error> {
    sqlx::query_as::<_, StoredProgress>(
        r#"
        SELECT puzzle_id, grid_size, status, elapsed_seconds, was_paused,
               progress_json, completed_at, updated_at
        FROM puzzle_progress
        WHERE auth_id = $1 AND puzzle_id = $2
        "#,
    )
    .bind(auth_id)
    .bind(puzzle_id)
    .fetch_optional(pool)
    .await
}

/// Get all progress rows for an account matching the given puzzle ids.
pub async fn get_progress_bulk(
    pool: &PgPool,
    auth_id: &str,
    puzzle_ids: &[String],
) -> Result<Vec<StoredProgress>, sqlx::Error> {
    sqlx::query_as::<_, StoredProgress>(
        r#"
        SELECT puzzle_id, grid_size, status, elapsed_seconds, was_paused,
               progress_json, completed_at, updated_at
        FROM puzzle_progress
        WHERE auth_id = $1 AND puzzle_id = ANY($2)
        "#,
    )
    .bind(auth_id)
    .bind(puzzle_ids)
    .fetch_all(pool)
    .await
}

/// Insert or update one progress row.
///
/// `updated_at` is always NOW(): the server clock, not the client's,
/// orders rows. `completed_at` is set once, on the first transition to
/// complete, and never moves afterward.
pub async fn upsert_progress(
    pool: &PgPool,
    auth_id: &str,
    request: &SyncRequest,
) -> Result<StoredProgress, sqlx::Error> {
    sqlx::query_as::<_, StoredProgress>(
        r#"
        INSERT INTO puzzle_progress (
            auth_id, puzzle_id, grid_size, status, elapsed_seconds,
            was_paused, progress_json, completed_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7,
                CASE WHEN $4 = 'complete' THEN CURRENT_DATE END, NOW())
        ON CONFLICT (auth_id, puzzle_id) DO UPDATE SET
            status = EXCLUDED.status,
            elapsed_seconds = EXCLUDED.elapsed_seconds,
            was_paused = EXCLUDED.was_paused,
            progress_json = EXCLUDED.progress_json,
            completed_at = COALESCE(puzzle_progress.completed_at, EXCLUDED.completed_at),
            updated_at = NOW()
        RETURNING puzzle_id, grid_size, status, elapsed_seconds, was_paused,
                  progress_json, completed_at, updated_at
        "#,
    )
    .bind(auth_id)
    .bind(&request.puzzle_id)
    .bind(request.grid_size.to_string())
    .bind(request.status.as_str())
    .bind(request.elapsed_seconds as i32)
    .bind(request.was_paused)
    .bind(&request.progress_json)
    .fetch_one(pool)
    .await
}

/// Record one accepted save in the sync log. Returns the log row id
/// echoed back to the client for correlation.
pub async fn insert_sync_log(
    pool: &PgPool,
    auth_id: &str,
    puzzle_id: &str,
    action: &str,
) -> Result<i64, sqlx::Error> {
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO sync_log (auth_id, puzzle_id, action)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(auth_id)
    .bind(puzzle_id)
    .bind(action)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}
