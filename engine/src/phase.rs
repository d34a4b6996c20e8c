//! The sync lifecycle state machine.
//!
//! Replaces the trio of ad-hoc guard flags (`isBulkSyncing`,
//! `isInitializing`, `hasLoadedInitialProgress`) with one FSM. Only
//! transition methods are exposed; callers never touch raw state, so
//! "no incremental sync while a bulk pass runs" holds in one place.

use parking_lot::Mutex;

/// Where the engine is in its sync lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No authenticated session.
    Idle,
    /// Logged in, first bulk sync not yet started.
    Initializing,
    /// A full reconciliation pass is running.
    BulkSyncing,
    /// Between syncs; incremental triggers may fire.
    Ready,
}

#[derive(Debug)]
struct PhaseInner {
    phase: SyncPhase,
    /// True once the first bulk pass has completed this session.
    initial_load_done: bool,
}

/// Shared coordination latch for the sync engine.
#[derive(Debug)]
pub struct PhaseGuard {
    inner: Mutex<PhaseInner>,
}

impl Default for PhaseGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseGuard {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PhaseInner {
                phase: SyncPhase::Idle,
                initial_load_done: false,
            }),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.lock().phase
    }

    /// Login completed; the session now awaits its first bulk sync.
    pub fn begin_session(&self) {
        let mut inner = self.inner.lock();
        inner.phase = SyncPhase::Initializing;
        inner.initial_load_done = false;
    }

    /// Try to enter the bulk-syncing phase.
    ///
    /// Returns false if a pass is already running (the caller skips
    /// silently; concurrent bulk requests are never queued) or no
    /// session exists.
    pub fn try_begin_bulk(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.phase {
            SyncPhase::Initializing | SyncPhase::Ready => {
                inner.phase = SyncPhase::BulkSyncing;
                true
            }
            SyncPhase::BulkSyncing | SyncPhase::Idle => false,
        }
    }

    /// Whether the running bulk pass is the session's first.
    pub fn is_initial_load(&self) -> bool {
        !self.inner.lock().initial_load_done
    }

    /// Bulk pass finished (successfully or not); back to ready.
    pub fn finish_bulk(&self, completed: bool) {
        let mut inner = self.inner.lock();
        if inner.phase == SyncPhase::BulkSyncing {
            inner.phase = SyncPhase::Ready;
            if completed {
                inner.initial_load_done = true;
            }
        }
    }

    /// Session ended; everything resets.
    pub fn end_session(&self) {
        let mut inner = self.inner.lock();
        inner.phase = SyncPhase::Idle;
        inner.initial_load_done = false;
    }

    /// Incremental (debounced/immediate) triggers are allowed only when
    /// the initial bulk pass has completed and no pass is running.
    pub fn incremental_allowed(&self) -> bool {
        let inner = self.inner.lock();
        inner.phase == SyncPhase::Ready && inner.initial_load_done
    }
}
