//! Progress reporting contract
//!
//! The engine tells a [`ProgressReporter`] what is happening; how (or whether)
//! that gets rendered is entirely the reporter's business. Per attempt the
//! engine emits `on_attempt_start`, then exactly one of `on_attempt_success`,
//! `on_attempt_failure` or `on_cancelled`. `on_surface` fires once, when the
//! attempt number reaches `show_progress_after_attempt`; `on_dismiss` fires on
//! the terminal outcome of a surfaced operation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::payload::ResponsePayload;

/// A failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// 1-indexed attempt that failed
    pub attempt: u32,
    /// Human-readable reason
    pub reason: String,
    /// Wait before the next attempt; `None` when the failure is final.
    pub next_delay: Option<Duration>,
    /// Time since the operation started
    pub elapsed: Duration,
}

/// Receives progress callbacks. Every method defaults to a no-op.
pub trait ProgressReporter: Send + Sync {
    fn on_surface(&self, _label: &str) {}

    fn on_attempt_start(&self, _attempt: u32, _label: &str) {}

    fn on_attempt_success(&self, _payload: &ResponsePayload) {}

    fn on_attempt_failure(&self, _failure: &AttemptFailure) {}

    fn on_countdown_tick(&self, _attempt: u32, _remaining: Duration) {}

    fn on_cancelled(&self) {}

    fn on_dismiss(&self) {}
}

/// Reporter for operations nobody is watching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {}

impl<R: ProgressReporter + ?Sized> ProgressReporter for Arc<R> {
    fn on_surface(&self, label: &str) {
        (**self).on_surface(label);
    }

    fn on_attempt_start(&self, attempt: u32, label: &str) {
        (**self).on_attempt_start(attempt, label);
    }

    fn on_attempt_success(&self, payload: &ResponsePayload) {
        (**self).on_attempt_success(payload);
    }

    fn on_attempt_failure(&self, failure: &AttemptFailure) {
        (**self).on_attempt_failure(failure);
    }

    fn on_countdown_tick(&self, attempt: u32, remaining: Duration) {
        (**self).on_countdown_tick(attempt, remaining);
    }

    fn on_cancelled(&self) {
        (**self).on_cancelled();
    }

    fn on_dismiss(&self) {
        (**self).on_dismiss();
    }
}

/// Callback as a value, for reporters that live on the other end of a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Surfaced { label: String },
    AttemptStarted { attempt: u32, label: String },
    AttemptSucceeded(ResponsePayload),
    AttemptFailed(AttemptFailure),
    CountdownTick { attempt: u32, remaining: Duration },
    Cancelled,
    Dismissed,
}

/// Forwards every callback as a [`ProgressEvent`] into an unbounded channel.
///
/// Sends never block the engine; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_surface(&self, label: &str) {
        self.emit(ProgressEvent::Surfaced {
            label: label.to_string(),
        });
    }

    fn on_attempt_start(&self, attempt: u32, label: &str) {
        self.emit(ProgressEvent::AttemptStarted {
            attempt,
            label: label.to_string(),
        });
    }

    fn on_attempt_success(&self, payload: &ResponsePayload) {
        self.emit(ProgressEvent::AttemptSucceeded(payload.clone()));
    }

    fn on_attempt_failure(&self, failure: &AttemptFailure) {
        self.emit(ProgressEvent::AttemptFailed(failure.clone()));
    }

    fn on_countdown_tick(&self, attempt: u32, remaining: Duration) {
        self.emit(ProgressEvent::CountdownTick { attempt, remaining });
    }

    fn on_cancelled(&self) {
        self.emit(ProgressEvent::Cancelled);
    }

    fn on_dismiss(&self) {
        self.emit(ProgressEvent::Dismissed);
    }
}

/// `"42 sec"` under a minute, `"3 min 5 sec"` beyond.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let mins = total / 60;
    let secs = total % 60;
    if mins == 0 {
        format!("{secs} sec")
    } else {
        format!("{mins} min {secs} sec")
    }
}

/// Whole seconds left, rounded up so a countdown never shows "0s" early.
pub fn remaining_secs(remaining: Duration) -> u64 {
    remaining.as_millis().div_ceil(1_000) as u64
}
