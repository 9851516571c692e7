//! Per-operation retry state and the handle callers cancel through.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Mutable record of one retry operation.
///
/// Created fresh for every operation and never shared between two of them.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    pub active: bool,
    pub operation_label: String,
    pub attempt: u32,
    /// Set only by an explicit user cancellation.
    pub cancelled: bool,
    pub started_at: Option<Instant>,
    /// Present only while an attempt's request is outstanding.
    pub abort_handle: Option<CancellationToken>,
    /// Live timers (attempt timeout, countdown) owned by the operation.
    pub pending_timers: usize,
    finished_at: Option<Instant>,
}

impl RetryState {
    /// Clear every field back to its idle value.
    pub fn reset(&mut self) {
        *self = RetryState::default();
    }

    fn start(&mut self, label: &str) {
        self.reset();
        self.active = true;
        self.operation_label = label.to_string();
        self.started_at = Some(Instant::now());
    }

    fn elapsed(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<RetryState>,
    /// Operation-wide token; fires on user cancellation or engine shutdown.
    token: CancellationToken,
    finished: Mutex<bool>,
}

/// Cloneable handle to one retry operation.
///
/// Obtained from a prepared operation before it runs. Offers cancellation and
/// read-only observation; everything else stays with the engine.
#[derive(Debug, Clone)]
pub struct RetryHandle {
    shared: Arc<Shared>,
}

impl RetryHandle {
    pub(crate) fn new(label: &str, token: CancellationToken) -> Self {
        let state = RetryState {
            operation_label: label.to_string(),
            ..Default::default()
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                token,
                finished: Mutex::new(false),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RetryState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_finished(&self) -> bool {
        *self
            .shared
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the operation: interrupt the outstanding attempt and any pending
    /// countdown. Returns `false` when there was nothing to cancel, either
    /// because it already was or because the operation has finished.
    pub fn cancel(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        let (abort, label) = {
            let mut state = self.lock();
            if state.cancelled {
                return false;
            }
            state.cancelled = true;
            (state.abort_handle.take(), state.operation_label.clone())
        };
        if let Some(abort) = abort {
            abort.cancel();
        }
        self.shared.token.cancel();
        tracing::info!(operation = %label, "retry operation cancelled by user");
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn attempt(&self) -> u32 {
        self.lock().attempt
    }

    pub fn operation_label(&self) -> String {
        self.lock().operation_label.clone()
    }

    /// Time since the operation started; frozen once it finishes.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed()
    }

    pub fn has_abort_handle(&self) -> bool {
        self.lock().abort_handle.is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.lock().pending_timers
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> RetryState {
        self.lock().clone()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.shared.token
    }

    /// Whether the operation must stop: user cancellation or shutdown.
    pub(crate) fn should_stop(&self) -> bool {
        self.shared.token.is_cancelled() || self.lock().cancelled
    }

    /// Reset and mark active. Only called once, before the first attempt; a
    /// cancel that already landed survives the reset.
    pub(crate) fn start(&self) {
        let mut state = self.lock();
        let label = std::mem::take(&mut state.operation_label);
        let cancelled = state.cancelled;
        state.start(&label);
        state.cancelled = cancelled;
    }

    pub(crate) fn begin_attempt(&self) -> u32 {
        let mut state = self.lock();
        state.attempt += 1;
        state.attempt
    }

    /// Install a fresh abort handle for the attempt about to be issued.
    pub(crate) fn install_abort(&self) -> CancellationToken {
        let abort = self.shared.token.child_token();
        self.lock().abort_handle = Some(abort.clone());
        abort
    }

    /// Release the attempt's abort handle, triggering it if still installed.
    pub(crate) fn clear_abort(&self) {
        if let Some(abort) = self.lock().abort_handle.take() {
            abort.cancel();
        }
    }

    pub(crate) fn timer(&self) -> TimerGuard {
        self.lock().pending_timers += 1;
        TimerGuard {
            handle: self.clone(),
        }
    }

    /// Tear down on a terminal outcome. Later `cancel` calls are no-ops.
    pub(crate) fn finish(&self) {
        *self
            .shared
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = true;
        self.clear_abort();
        let mut state = self.lock();
        state.active = false;
        state.finished_at = Some(Instant::now());
    }
}

/// Counts a live timer for as long as it is held.
#[derive(Debug)]
pub(crate) struct TimerGuard {
    handle: RetryHandle,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        let mut state = self.handle.lock();
        state.pending_timers = state.pending_timers.saturating_sub(1);
    }
}
