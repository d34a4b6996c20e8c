//! The sync orchestrator: bulk passes, incremental syncs, and the
//! completion path, driven through the phase FSM.
//!
//! Ordering guarantees live here: bulk passes process keys
//! sequentially, every download is durably written before the next key
//! starts, and the single post-loop UI refresh happens after all of
//! them. Switch serialization is delegated to [`SwitchQueue`] workers.

use crate::error::{Result, SyncError};
use crate::host::Host;
use crate::key::{GridSize, PuzzleKey, GRID_SIZES};
use crate::phase::{PhaseGuard, SyncPhase};
use crate::progress::{ProgressStatus, ProgressStore, PuzzleProgress};
use crate::reconcile::{self, ReconcileAction, SyncMode};
use crate::remote::{RemoteApi, RemoteProgress, SyncOutcome, SyncRequest};
use crate::stats::{GridStats, StatsChanges, StatsStore};
use crate::trigger::{Debouncer, Readiness, SwitchQueue, DEBOUNCE_DELAY, READY_CEILING};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Tunable delays and limits.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet period for the debounced edit trigger.
    pub debounce_delay: Duration,
    /// Pause between a local write and the live-UI reload, letting the
    /// store write settle.
    pub settle_delay: Duration,
    /// Held after a bulk pass before releasing the latch, absorbing
    /// debounced saves the UI refresh kicks off.
    pub grace_delay: Duration,
    /// How long to wait for host readiness before skipping bulk sync.
    pub ready_ceiling: Duration,
    /// Upper bound on the failure text shown in the status line.
    pub max_failure_len: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_delay: DEBOUNCE_DELAY,
            settle_delay: Duration::from_millis(100),
            grace_delay: Duration::from_millis(250),
            ready_ceiling: READY_CEILING,
            max_failure_len: 120,
        }
    }
}

/// Last sync outcome, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Failed(String),
}

/// Counters from one bulk pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub uploaded: usize,
    pub downloaded: usize,
    pub failed: usize,
    /// True when another pass was already running and this one skipped.
    pub skipped: bool,
}

/// The sync engine. One per authenticated session.
///
/// Construction requires a running tokio runtime (the switch-queue
/// workers are spawned eagerly).
pub struct SyncEngine {
    progress: Arc<dyn ProgressStore>,
    stats: Arc<dyn StatsStore>,
    remote: Arc<dyn RemoteApi>,
    host: Option<Arc<dyn Host>>,
    phase: PhaseGuard,
    config: SyncConfig,
    status: watch::Sender<SyncStatus>,
    debouncer: Debouncer,
    puzzle_switches: SwitchQueue,
    day_switches: SwitchQueue,
}

impl SyncEngine {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        stats: Arc<dyn StatsStore>,
        remote: Arc<dyn RemoteApi>,
        config: SyncConfig,
    ) -> Self {
        let debounce_delay = config.debounce_delay;
        Self {
            progress,
            stats,
            remote,
            host: None,
            phase: PhaseGuard::new(),
            config,
            status: watch::channel(SyncStatus::Idle).0,
            debouncer: Debouncer::new(debounce_delay),
            puzzle_switches: SwitchQueue::new(),
            day_switches: SwitchQueue::new(),
        }
    }

    /// Attach the host capability interface. Without one, bulk sync has
    /// no key set and UI refreshes are skipped.
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Subscribe to status-line updates.
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase.phase()
    }

    /// Login completed: wait for the host, then run the initial bulk
    /// sync. If the host never becomes ready within the ceiling, bulk
    /// sync simply never runs this session.
    pub async fn start_session(&self, readiness: &Readiness) {
        self.phase.begin_session();
        if !readiness.wait(self.config.ready_ceiling).await {
            tracing::warn!("host never became ready, skipping bulk sync this session");
            return;
        }
        if let Err(e) = self.bulk_sync().await {
            tracing::warn!(error = %e, "initial bulk sync failed");
        }
    }

    /// Session ended (logout); cancels pending debounced work.
    pub fn end_session(&self) {
        self.debouncer.cancel();
        self.phase.end_session();
        let _ = self.status.send(SyncStatus::Idle);
    }

    /// Run a full reconciliation pass over the active week.
    ///
    /// A pass observed while another runs is a silent skip, not queued.
    /// The latch releases only after a grace delay past completion.
    pub async fn bulk_sync(&self) -> Result<BulkSummary> {
        if !self.phase.try_begin_bulk() {
            tracing::debug!("bulk sync already running, skipping");
            return Ok(BulkSummary {
                skipped: true,
                ..BulkSummary::default()
            });
        }
        let initial = self.phase.is_initial_load();
        let result = self.run_bulk(initial).await;

        tokio::time::sleep(self.config.grace_delay).await;
        self.phase.finish_bulk(result.is_ok());
        result
    }

    async fn run_bulk(&self, initial: bool) -> Result<BulkSummary> {
        let host = self.host.as_ref().ok_or(SyncError::NotReady)?;
        let keys = host.active_puzzle_keys();
        if keys.is_empty() {
            tracing::warn!("host reports no active puzzles, nothing to sync");
            return Ok(BulkSummary::default());
        }

        self.set_status(SyncStatus::Syncing);
        let ids: Vec<String> = keys.iter().map(ToString::to_string).collect();
        let rows = match self.remote.sync_bulk(ids).await {
            Ok(rows) => rows,
            Err(e) => {
                self.fail_status(&e);
                return Err(e);
            }
        };

        let displayed = host.current_puzzle();
        let mut summary = BulkSummary::default();
        let mut displayed_downloaded = false;

        // Sequential by await: key N's download is durably written
        // before key N+1 begins.
        for key in &keys {
            match self.bulk_key(key, rows.get(&key.to_string())).await {
                Ok(ReconcileAction::Save) => summary.uploaded += 1,
                Ok(ReconcileAction::Load) => {
                    summary.downloaded += 1;
                    if displayed == Some(*key) {
                        displayed_downloaded = true;
                    }
                }
                Ok(ReconcileAction::Noop) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "bulk sync step failed, continuing");
                    summary.failed += 1;
                }
            }
        }

        let active_day = displayed
            .map(|k| k.date)
            .unwrap_or_else(|| Utc::now().date_naive());
        host.refresh_indicators(active_day).await;

        if displayed_downloaded {
            if let Some(key) = displayed {
                tokio::time::sleep(self.config.settle_delay).await;
                host.reload_displayed(&key).await;
            }
        }

        // Chain into the stats pass on the same session.
        if let Err(e) = self.sync_stats().await {
            tracing::warn!(error = %e, "stats sync failed after bulk pass");
        }

        tracing::info!(
            initial,
            uploaded = summary.uploaded,
            downloaded = summary.downloaded,
            failed = summary.failed,
            "bulk sync complete"
        );
        self.set_status(SyncStatus::Synced);
        Ok(summary)
    }

    async fn bulk_key(
        &self,
        key: &PuzzleKey,
        row: Option<&RemoteProgress>,
    ) -> Result<ReconcileAction> {
        let local = self.read_local(key).await;
        let action = reconcile::decide(local.as_ref(), row, SyncMode::Bulk);
        match action {
            ReconcileAction::Save => {
                if let Some(record) = &local {
                    let request = self.save_request(record, false)?;
                    self.remote.sync(request).await?;
                }
            }
            ReconcileAction::Load => {
                if let Some(row) = row {
                    let record = row.to_local(*key);
                    self.progress.set(&record).await?;
                }
            }
            ReconcileAction::Noop => {}
        }
        Ok(action)
    }

    /// Incremental sync of one puzzle, from a pause, switch, or
    /// debounced-edit trigger.
    ///
    /// The client pushes its snapshot and the server, as clock
    /// authority, answers SAVED or LOADED. A puzzle with no progress
    /// produces zero network calls: absence of a record is the
    /// not-started state and must never be manufactured remotely.
    pub async fn sync_puzzle(&self, key: PuzzleKey, mode: SyncMode) -> Result<ReconcileAction> {
        if !self.phase.incremental_allowed() {
            tracing::debug!(key = %key, phase = ?self.phase.phase(), "incremental sync gated off");
            return Ok(ReconcileAction::Noop);
        }

        // For the on-screen puzzle, unpersisted live edits supersede
        // the stored snapshot.
        let local = match &self.host {
            Some(host) if host.current_puzzle() == Some(key) => {
                match host.live_state(&key).await {
                    Some(live) => Some(live),
                    None => self.read_local(&key).await,
                }
            }
            _ => self.read_local(&key).await,
        };
        // The pre-flight decision sees only the local side; the server
        // holds the remote row and applies the same timestamp rule.
        let record = match (reconcile::decide(local.as_ref(), None, mode), local) {
            (ReconcileAction::Save, Some(record)) => record,
            _ => return Ok(ReconcileAction::Noop),
        };

        self.set_status(SyncStatus::Syncing);
        let request = self.save_request(&record, mode == SyncMode::Immediate)?;
        match self.remote.sync(request).await {
            Err(e) => {
                self.fail_status(&e);
                Err(e)
            }
            Ok(SyncOutcome::Saved { log_id }) => {
                tracing::debug!(key = %key, ?log_id, "local state saved");
                self.set_status(SyncStatus::Synced);
                Ok(ReconcileAction::Save)
            }
            Ok(SyncOutcome::Loaded { latest_progress }) => {
                let loaded_key = latest_progress
                    .puzzle_id
                    .parse::<PuzzleKey>()
                    .unwrap_or(key);
                let loaded = latest_progress.to_local(loaded_key);
                self.progress.set(&loaded).await?;

                if let Some(host) = &self.host {
                    if host.current_puzzle() == Some(loaded_key) {
                        tokio::time::sleep(self.config.settle_delay).await;
                        host.reload_displayed(&loaded_key).await;
                    } else {
                        // The user has navigated elsewhere since this
                        // sync started; the store has the data, the
                        // live UI is left alone.
                        tracing::debug!(key = %loaded_key, "load applied to store only");
                    }
                }
                self.set_status(SyncStatus::Synced);
                Ok(ReconcileAction::Load)
            }
        }
    }

    /// Debounced edit trigger: coalesces an edit burst into one sync
    /// after the quiet period; only the last call fires.
    pub fn on_edit(self: &Arc<Self>, key: PuzzleKey) {
        let engine = Arc::clone(self);
        self.debouncer.call(async move {
            if let Err(e) = engine.sync_puzzle(key, SyncMode::Debounced).await {
                tracing::warn!(key = %key, error = %e, "debounced sync failed");
            }
        });
    }

    /// Immediate trigger on pause.
    pub async fn on_pause(&self, key: PuzzleKey) -> Result<ReconcileAction> {
        self.sync_puzzle(key, SyncMode::Immediate).await
    }

    /// Queue a puzzle switch: persist the outgoing puzzle, then reload
    /// the incoming one. Switches are serialized; rapid switching never
    /// interleaves persist/restore phases.
    pub fn queue_puzzle_switch(self: &Arc<Self>, from: PuzzleKey, to: PuzzleKey) -> bool {
        let engine = Arc::clone(self);
        self.puzzle_switches.enqueue(async move {
            if let Err(e) = engine.sync_puzzle(from, SyncMode::Immediate).await {
                tracing::warn!(key = %from, error = %e, "switch-out sync failed");
            }
            if let Some(host) = &engine.host {
                host.reload_displayed(&to).await;
            }
        })
    }

    /// Queue a day switch: persist the displayed puzzle, then refresh
    /// the new day's indicators. Serialized on its own queue.
    pub fn queue_day_switch(self: &Arc<Self>, date: NaiveDate) -> bool {
        let engine = Arc::clone(self);
        self.day_switches.enqueue(async move {
            if let Some(host) = &engine.host {
                if let Some(current) = host.current_puzzle() {
                    if let Err(e) = engine.sync_puzzle(current, SyncMode::Immediate).await {
                        tracing::warn!(key = %current, error = %e, "day-switch sync failed");
                    }
                }
                host.refresh_indicators(date).await;
            }
        })
    }

    /// A puzzle was completed. Updates local stats, pushes them (the
    /// server's merge is final), then syncs the puzzle itself.
    pub async fn on_completion(
        &self,
        key: PuzzleKey,
        elapsed_seconds: u32,
        pristine: bool,
    ) -> Result<StatsChanges> {
        let grid = key.grid_size;
        let mut stats = self.read_stats(grid).await;
        let changes = stats.record_completion(key.date, elapsed_seconds, pristine, Utc::now());
        self.stats.set_one(grid, &stats).await?;

        match self.remote.push_stats(grid, &stats).await {
            Ok(merged) => {
                if let Err(e) = self.stats.set_one(grid, &merged).await {
                    tracing::warn!(%grid, error = %e, "failed to store merged stats");
                }
            }
            Err(e) => {
                tracing::warn!(%grid, error = %e, "stats push failed, keeping local record");
            }
        }

        if let Err(e) = self.sync_puzzle(key, SyncMode::Immediate).await {
            tracing::warn!(key = %key, error = %e, "post-completion sync failed");
        }

        Ok(changes)
    }

    /// Reset is local-only: the server row, if any, survives. Known
    /// asymmetry; no delete propagation exists.
    pub async fn reset_puzzle(&self, key: PuzzleKey) -> Result<()> {
        self.progress.delete(&key).await
    }

    /// Reconcile stats for every grid size against the server.
    ///
    /// Fetches the remote records, merges field-wise with local, and
    /// pushes any merged result that differs from the server's row; the
    /// server re-merges and its answer is accepted as final.
    pub async fn sync_stats(&self) -> Result<()> {
        let sizes: Vec<GridSize> = GRID_SIZES.to_vec();
        let remote_stats = self.remote.fetch_stats(&sizes).await?;
        let empty = GridStats::default();

        for size in sizes {
            let local = self.read_stats(size).await;
            let remote_row = remote_stats.get(&size);
            let merged = GridStats::merge(&local, remote_row.unwrap_or(&empty));

            let differs_from_server = remote_row.map_or(merged != empty, |row| *row != merged);
            let final_stats = if differs_from_server {
                match self.remote.push_stats(size, &merged).await {
                    Ok(server_merged) => server_merged,
                    Err(e) => {
                        tracing::warn!(grid = %size, error = %e, "stats push failed, keeping client merge");
                        merged
                    }
                }
            } else {
                merged
            };

            if let Err(e) = self.stats.set_one(size, &final_stats).await {
                tracing::warn!(grid = %size, error = %e, "failed to store stats");
            }
        }
        Ok(())
    }

    async fn read_local(&self, key: &PuzzleKey) -> Option<PuzzleProgress> {
        match self.progress.get(key).await {
            Ok(record) => record,
            Err(e) => {
                // Fail open: an unreadable record is the not-started state.
                tracing::warn!(key = %key, error = %e, "local store read failed, treating as not started");
                None
            }
        }
    }

    async fn read_stats(&self, grid: GridSize) -> GridStats {
        match self.stats.get_one(grid).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(%grid, error = %e, "stats store read failed, treating as empty");
                GridStats::default()
            }
        }
    }

    fn save_request(&self, record: &PuzzleProgress, immediate: bool) -> Result<SyncRequest> {
        let was_paused = record.status == ProgressStatus::Paused;
        SyncRequest::from_record(record, was_paused, immediate)
    }

    fn set_status(&self, status: SyncStatus) {
        let _ = self.status.send(status);
    }

    fn fail_status(&self, error: &SyncError) {
        let mut message = error.to_string();
        if message.len() > self.config.max_failure_len {
            message = message
                .chars()
                .take(self.config.max_failure_len)
                .collect();
        }
        let _ = self.status.send(SyncStatus::Failed(message));
    }
}
