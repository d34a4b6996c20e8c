//! # Gokuro Sync
//!
//! Offline-first progress synchronization for daily Gokuro puzzles.
//!
//! The local store is the primary data home: gameplay always reads and
//! writes locally first, and this crate reconciles that state with a
//! remote account in the background. An unauthenticated player loses
//! nothing; logging in layers sync on top.
//!
//! ## Core Concepts
//!
//! ### Puzzle keys
//!
//! Every daily puzzle instance is addressed by a composite
//! [`PuzzleKey`] of publication date and [`GridSize`], rendered as a
//! single token (`"2025-11-20-5x5"`) that doubles as the local-store
//! key and the server-side `puzzle_id`.
//!
//! ### Reconciliation
//!
//! [`reconcile::decide`] compares a local [`PuzzleProgress`] record
//! against the server's row and yields a [`ReconcileAction`]. The
//! server-assigned `updated_at` timestamp is the single source of
//! truth; the bulk path trusts a present remote row unconditionally.
//!
//! ### Orchestration
//!
//! [`SyncEngine`] drives the whole lifecycle: the initial bulk pass
//! over the active week after login, debounced edit syncs, immediate
//! syncs on pause and switch, and the completion path into the
//! [`stats`] engine. Lifecycle state lives in one [`SyncPhase`] FSM.
//!
//! ### Host interface
//!
//! The game/UI layer plugs in through the [`Host`] trait; the engine
//! never reaches into UI state directly. Transport plugs in through
//! [`RemoteApi`], so the orchestrator is testable against fakes.

pub mod error;
pub mod host;
pub mod key;
pub mod orchestrator;
pub mod phase;
pub mod progress;
pub mod reconcile;
pub mod remote;
pub mod stats;
pub mod trigger;

// Re-export main types at crate root
pub use error::{Result, SyncError};
pub use host::Host;
pub use key::{week_keys, GridSize, PuzzleKey, GRID_SIZES, WEEK_DAYS};
pub use orchestrator::{BulkSummary, SyncConfig, SyncEngine, SyncStatus};
pub use phase::{PhaseGuard, SyncPhase};
pub use progress::{MemoryProgressStore, ProgressStatus, ProgressStore, PuzzleProgress};
pub use reconcile::{decide, ReconcileAction, SyncMode};
pub use remote::{
    BulkRequest, BulkResponse, ProgressBlob, RemoteApi, RemoteProgress, StatsFetchResponse,
    StatsPushRequest, StatsPushResponse, SyncOutcome, SyncRequest,
};
pub use stats::{GridStats, MemoryStatsStore, StatsChanges, StatsStore};
pub use trigger::{Debouncer, Readiness, SwitchQueue, DEBOUNCE_DELAY, READY_CEILING};
