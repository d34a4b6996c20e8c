//! Live integration tests for the sync endpoints.
//!
//! These require a running server backed by PostgreSQL. Set
//! GOKURO_SERVER_URL (e.g. http://localhost:3000) and run with
//! `cargo test -- --ignored`.

use gokuro_sync::remote::{BulkRequest, BulkResponse, SyncOutcome, SyncRequest};
use gokuro_sync::{ProgressStatus, PuzzleKey, PuzzleProgress};
use std::str::FromStr;

fn server_url() -> String {
    std::env::var("GOKURO_SERVER_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// A token unique per test run, so reruns never collide on stored rows.
fn fresh_token() -> String {
    format!(
        "test-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}

fn request_for(puzzle_id: &str, elapsed: u32) -> SyncRequest {
    let key = PuzzleKey::from_str(puzzle_id).unwrap();
    let mut record = PuzzleProgress::new(key);
    record.status = ProgressStatus::Started;
    record.entries.insert("0-0".to_string(), 'G');
    record.elapsed_seconds = elapsed;
    record.updated_at = chrono::Utc::now().timestamp_millis();
    SyncRequest::from_record(&record, false, false).unwrap()
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn health_endpoint_responds() {
    let response = client()
        .get(format!("{}/health", server_url()))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn sync_without_token_is_rejected() {
    let response = client()
        .post(format!("{}/sync", server_url()))
        .json(&request_for("2025-11-20-5x5", 10))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn save_then_bulk_fetch_round_trip() {
    let token = fresh_token();
    let base = server_url();

    let outcome: SyncOutcome = client()
        .post(format!("{}/sync", base))
        .bearer_auth(&token)
        .json(&request_for("2025-11-20-5x5", 42))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(matches!(outcome, SyncOutcome::Saved { log_id: Some(_) }));

    let bulk: BulkResponse = client()
        .post(format!("{}/sync-bulk", base))
        .bearer_auth(&token)
        .json(&BulkRequest {
            puzzle_ids: vec!["2025-11-20-5x5".to_string(), "2025-11-20-6x6".to_string()],
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let row = bulk.puzzles.get("2025-11-20-5x5").unwrap();
    assert_eq!(row.elapsed_seconds, 42);
    // Never touched, never present.
    assert!(!bulk.puzzles.contains_key("2025-11-20-6x6"));
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn stale_client_state_answers_loaded() {
    let token = fresh_token();
    let base = server_url();

    let first: SyncOutcome = client()
        .post(format!("{}/sync", base))
        .bearer_auth(&token)
        .json(&request_for("2025-11-21-5x5", 100))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(matches!(first, SyncOutcome::Saved { .. }));

    // Same puzzle with a client clock far in the past.
    let mut stale = request_for("2025-11-21-5x5", 5);
    stale.client_updated_at = chrono::DateTime::from_timestamp_millis(1_000).unwrap();

    let second: SyncOutcome = client()
        .post(format!("{}/sync", base))
        .bearer_auth(&token)
        .json(&stale)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    match second {
        SyncOutcome::Loaded { latest_progress } => {
            assert_eq!(latest_progress.elapsed_seconds, 100);
        }
        other => panic!("expected LOADED, got {:?}", other),
    }
}
