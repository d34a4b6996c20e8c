//! Database operations for the grid_stats table.

use gokuro_sync::{GridSize, GridStats};
use sqlx::{PgPool, Row};
use std::str::FromStr;

/// A stored per-grid stats row from the database.
#[derive(Debug)]
pub struct StoredStats {
    pub grid_size: String,
    pub best_time_seconds: Option<i32>,
    pub best_time_date: Option<chrono::DateTime<chrono::Utc>>,
    pub current_streak_days: i32,
    pub max_streak_days: i32,
    pub last_completed_date: Option<chrono::NaiveDate>,
    pub max_streak_date: Option<chrono::NaiveDate>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredStats {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredStats {
            grid_size: row.try_get("grid_size")?,
            best_time_seconds: row.try_get("best_time_seconds")?,
            best_time_date: row.try_get("best_time_date")?,
            current_streak_days: row.try_get("current_streak_days")?,
            max_streak_days: row.try_get("max_streak_days")?,
            last_completed_date: row.try_get("last_completed_date")?,
            max_streak_date: row.try_get("max_streak_date")?,
        })
    }
}

impl StoredStats {
    pub fn grid_size(&self) -> Option<GridSize> {
        GridSize::from_str(&self.grid_size).ok()
    }

    /// Convert database row to the wire representation.
    pub fn to_wire(&self) -> GridStats {
        GridStats {
            best_time_seconds: self.best_time_seconds.map(|s| s.max(0) as u32),
            best_time_date: self.best_time_date,
            current_streak_days: self.current_streak_days.max(0) as u32,
            max_streak_days: self.max_streak_days.max(0) as u32,
            last_completed_date: self.last_completed_date,
            max_streak_date: self.max_streak_date,
        }
    }
}

/// Get all stats rows for an account.
pub async fn get_stats_all(pool: &PgPool, auth_id: &str) -> Result<Vec<StoredStats>, sqlx::Error> {
    sqlx::query_as::<_, StoredStats>(
        r#"
        SELECT grid_size, best_time_seconds, best_time_date, current_streak_days,
               max_streak_days, last_completed_date, max_streak_date
        FROM grid_stats
        WHERE auth_id = $1
        "#,
    )
    .bind(auth_id)
    .fetch_all(pool)
    .await
}

/// Get one grid's stats row for an account, if it exists.
pub async fn get_stats(
    pool: &PgPool,
    auth_id: &str,
    grid_size: GridSize,
) -> Result<Option<StoredStats>, sqlx::Error> {
    sqlx::query_as::<_, StoredStats>(
        r#"
        SELECT grid_size, best_time_seconds, best_time_date, current_streak_days,
               max_streak_days, last_completed_date, max_streak_date
        FROM grid_stats
        WHERE auth_id = $1 AND grid_size = $2
        "#,
    )
    .bind(auth_id)
    .bind(grid_size.to_string())
    .fetch_optional(pool)
    .await
}

/// Insert or replace one grid's stats row with the merged record.
pub async fn upsert_stats(
    pool: &PgPool,
    auth_id: &str,
    grid_size: GridSize,
    stats: &GridStats,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO grid_stats (
            auth_id, grid_size, best_time_seconds, best_time_date,
            current_streak_days, max_streak_days, last_completed_date,
            max_streak_date, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (auth_id, grid_size) DO UPDATE SET
            best_time_seconds = EXCLUDED.best_time_seconds,
            best_time_date = EXCLUDED.best_time_date,
            current_streak_days = EXCLUDED.current_streak_days,
            max_streak_days = EXCLUDED.max_streak_days,
            last_completed_date = EXCLUDED.last_completed_date,
            max_streak_date = EXCLUDED.max_streak_date,
            updated_at = NOW()
        "#,
    )
    .bind(auth_id)
    .bind(grid_size.to_string())
    .bind(stats.best_time_seconds.map(|s| s as i32))
    .bind(stats.best_time_date)
    .bind(stats.current_streak_days as i32)
    .bind(stats.max_streak_days as i32)
    .bind(stats.last_completed_date)
    .bind(stats.max_streak_date)
    .execute(pool)
    .await?;

    Ok(())
}
