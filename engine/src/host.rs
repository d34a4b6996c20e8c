//! The host capability interface.
//!
//! The game/UI layer is an external collaborator. Instead of probing a
//! global namespace for callback functions at runtime, the orchestrator
//! takes a [`Host`] implementation at construction; a host that is not
//! configured is a typed `None`, handled explicitly.

use crate::key::PuzzleKey;
use crate::progress::PuzzleProgress;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Capabilities the host application exposes to the sync engine.
#[async_trait]
pub trait Host: Send + Sync {
    /// The puzzle currently on screen, if any.
    fn current_puzzle(&self) -> Option<PuzzleKey>;

    /// Every puzzle key in the active week (date x grid-size cross
    /// product, at most 28).
    fn active_puzzle_keys(&self) -> Vec<PuzzleKey>;

    /// Live (unpersisted) state of the displayed puzzle, if it differs
    /// from what the store holds.
    async fn live_state(&self, key: &PuzzleKey) -> Option<PuzzleProgress>;

    /// Re-render the displayed puzzle from the just-written local
    /// record. Called only for the on-screen puzzle; downloads for
    /// other puzzles stay in the store.
    async fn reload_displayed(&self, key: &PuzzleKey);

    /// Refresh the per-day button/status indicators.
    async fn refresh_indicators(&self, date: NaiveDate);
}
