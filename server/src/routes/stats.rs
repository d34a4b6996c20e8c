//! Stats endpoint routes.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_fetch_stats, handle_push_stats};
use crate::AppState;
use gokuro_sync::remote::{StatsFetchResponse, StatsPushRequest, StatsPushResponse};

/// Query parameters for GET /stats.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Comma-separated grid sizes, e.g. `grid_sizes=4x4,5x5`.
    pub grid_sizes: Option<String>,
}

/// Create stats routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/stats", get(fetch_stats_handler).post(push_stats_handler))
}

/// GET /stats - Fetch stored per-grid stats for the account.
async fn fetch_stats_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsFetchResponse>> {
    let response =
        handle_fetch_stats(&state.pool, &auth.auth_id, query.grid_sizes.as_deref()).await?;
    Ok(Json(response))
}

/// POST /stats - Merge and store one grid's stats record.
async fn push_stats_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<StatsPushRequest>,
) -> Result<Json<StatsPushResponse>> {
    let response = handle_push_stats(&state.pool, &auth.auth_id, request).await?;
    Ok(Json(response))
}
