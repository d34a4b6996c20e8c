//! Sync endpoint routes.

use axum::{extract::State, routing::post, Json, Router};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_sync, handle_sync_bulk};
use crate::AppState;
use gokuro_sync::remote::{BulkRequest, BulkResponse, SyncOutcome, SyncRequest};

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync_handler))
        .route("/sync-bulk", post(sync_bulk_handler))
}

/// POST /sync - Reconcile one puzzle's progress.
async fn sync_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncOutcome>> {
    let response = handle_sync(&state.pool, &auth.auth_id, request).await?;
    Ok(Json(response))
}

/// POST /sync-bulk - Fetch stored rows for a set of puzzle ids.
async fn sync_bulk_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkResponse>> {
    let response = handle_sync_bulk(&state.pool, &auth.auth_id, request).await?;
    Ok(Json(response))
}
