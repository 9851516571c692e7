//! Async utilities for cancellation-aware waiting.
//!
//! Provides the `OrCancelExt` trait for racing any future against a tokio
//! `CancellationToken`, and [`countdown`], a ticking delay that reports the
//! remaining time on every tick and stops as soon as the token fires.

mod countdown;

pub use countdown::CountdownEnd;
pub use countdown::countdown;

use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Error returned when a future is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelErr {
    Cancelled,
}

/// Extension trait for making futures cancellable.
///
/// Allows any future to race against a `CancellationToken`, returning
/// `Err(CancelErr::Cancelled)` if the token is cancelled before the
/// future completes. The losing future is dropped, which is how an
/// outstanding HTTP request gets aborted.
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    /// Race this future against the cancellation token.
    ///
    /// Returns `Ok(output)` if the future completes first, or
    /// `Err(CancelErr::Cancelled)` if the token is cancelled.
    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr> {
        tokio::select! {
            // Cancellation wins ties so a cancelled operation never reports success.
            biased;
            _ = token.cancelled() => Err(CancelErr::Cancelled),
            res = self => Ok(res),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    /// Flags when the in-flight "request" is dropped.
    struct InFlight(Arc<AtomicBool>);

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn request(dropped: &Arc<AtomicBool>, latency: Duration) -> impl Future<Output = u16> + Send {
        let guard = InFlight(Arc::clone(dropped));
        async move {
            tokio::time::sleep(latency).await;
            drop(guard);
            200
        }
    }

    #[tokio::test(start_paused = true)]
    async fn response_before_abort_is_returned() {
        let dropped = Arc::new(AtomicBool::new(false));
        let abort = CancellationToken::new();

        let status = request(&dropped, Duration::from_millis(300))
            .or_cancel(&abort)
            .await;

        assert_eq!(Ok(200), status);
    }

    #[tokio::test(start_paused = true)]
    async fn aborting_the_attempt_drops_the_request() {
        let dropped = Arc::new(AtomicBool::new(false));
        let operation = CancellationToken::new();
        let abort = operation.child_token();

        tokio::spawn({
            let operation = operation.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(400)).await;
                operation.cancel();
            }
        });
        let started = tokio::time::Instant::now();
        let status = request(&dropped, Duration::from_secs(30))
            .or_cancel(&abort)
            .await;

        assert_eq!(Err(CancelErr::Cancelled), status);
        assert_eq!(started.elapsed(), Duration::from_millis(400));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelled_token_beats_a_ready_response() {
        let abort = CancellationToken::new();
        abort.cancel();

        let status = std::future::ready(200).or_cancel(&abort).await;

        assert_eq!(Err(CancelErr::Cancelled), status);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_and_abort_compose() {
        let dropped = Arc::new(AtomicBool::new(false));
        let abort = CancellationToken::new();

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            request(&dropped, Duration::from_secs(30)).or_cancel(&abort),
        )
        .await;

        assert!(outcome.is_err());
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!abort.is_cancelled());
    }
}
