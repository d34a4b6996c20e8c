//! Stats handlers - per-grid statistics fetch and merge-on-push.

use crate::db;
use crate::error::{AppError, Result};
use gokuro_sync::remote::{StatsFetchResponse, StatsPushRequest, StatsPushResponse};
use gokuro_sync::{GridSize, GridStats};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;

/// Return stored stats rows for the account, keyed by grid size.
/// `grid_sizes` is the comma-separated query filter; `None` returns
/// every stored row.
pub async fn handle_fetch_stats(
    pool: &PgPool,
    auth_id: &str,
    grid_sizes: Option<&str>,
) -> Result<StatsFetchResponse> {
    let filter: Option<Vec<GridSize>> = match grid_sizes {
        Some(raw) => Some(
            raw.split(',')
                .map(|s| {
                    GridSize::from_str(s.trim()).map_err(|e| AppError::BadRequest(e.to_string()))
                })
                .collect::<Result<_>>()?,
        ),
        None => None,
    };

    let rows = db::get_stats_all(pool, auth_id).await?;
    let mut stats = HashMap::new();
    for row in rows {
        match row.grid_size() {
            Some(size) => {
                if filter.as_ref().is_some_and(|sizes| !sizes.contains(&size)) {
                    continue;
                }
                stats.insert(size, row.to_wire());
            }
            None => {
                tracing::warn!(grid_size = %row.grid_size, "skipping row with unparseable grid size");
            }
        }
    }
    Ok(StatsFetchResponse::Fetched { stats })
}

/// Merge the pushed record against the stored row and persist the
/// result. The same field-wise merge runs on the client; running it
/// here again makes the server the final authority when both sides
/// raced.
pub async fn handle_push_stats(
    pool: &PgPool,
    auth_id: &str,
    request: StatsPushRequest,
) -> Result<StatsPushResponse> {
    let stored = db::get_stats(pool, auth_id, request.grid_size).await?;
    let merged = match stored {
        Some(row) => GridStats::merge(&request.stats, &row.to_wire()),
        None => request.stats.clone(),
    };

    db::upsert_stats(pool, auth_id, request.grid_size, &merged).await?;
    tracing::debug!(grid_size = %request.grid_size, "stats merged and stored");

    Ok(StatsPushResponse::Synced {
        merged_stats: merged,
    })
}
