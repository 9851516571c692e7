use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::CancelErr;
use crate::OrCancelExt;

/// How a [`countdown`] finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    /// The full duration elapsed.
    Elapsed,
    /// The token fired before the duration elapsed.
    Cancelled,
}

/// Wait for `total`, one `tick` at a time.
///
/// `on_tick` receives the time still remaining at the start of every tick, so
/// a UI can render a live "retry in Ns" line without owning a timer of its
/// own. The token is checked before every tick and raced against every
/// sleep, so cancellation ends the wait immediately.
pub async fn countdown<F>(
    total: Duration,
    tick: Duration,
    token: &CancellationToken,
    mut on_tick: F,
) -> CountdownEnd
where
    F: FnMut(Duration),
{
    // A zero tick would spin forever.
    let tick = tick.max(Duration::from_millis(1));
    let mut remaining = total;

    while !remaining.is_zero() {
        if token.is_cancelled() {
            return CountdownEnd::Cancelled;
        }
        on_tick(remaining);

        let step = remaining.min(tick);
        match tokio::time::sleep(step).or_cancel(token).await {
            Ok(()) => remaining = remaining.saturating_sub(step),
            Err(CancelErr::Cancelled) => return CountdownEnd::Cancelled,
        }
    }

    if token.is_cancelled() {
        CountdownEnd::Cancelled
    } else {
        CountdownEnd::Elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_until_elapsed() {
        let token = CancellationToken::new();
        let mut ticks = Vec::new();
        let start = Instant::now();

        let end = countdown(
            Duration::from_millis(2500),
            Duration::from_secs(1),
            &token,
            |remaining| ticks.push(remaining),
        )
        .await;

        assert_eq!(CountdownEnd::Elapsed, end);
        assert_eq!(
            vec![
                Duration::from_millis(2500),
                Duration::from_millis(1500),
                Duration::from_millis(500),
            ],
            ticks
        );
        assert_eq!(Duration::from_millis(2500), start.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_mid_tick() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            canceller.cancel();
        });
        let start = Instant::now();

        let end = countdown(
            Duration::from_secs(10),
            Duration::from_secs(1),
            &token,
            |_| {},
        )
        .await;

        assert_eq!(CountdownEnd::Cancelled, end);
        assert_eq!(Duration::from_millis(400), start.elapsed());
    }

    #[tokio::test]
    async fn zero_duration_returns_without_ticking() {
        let token = CancellationToken::new();
        let mut ticked = false;

        let end = countdown(Duration::ZERO, Duration::from_secs(1), &token, |_| {
            ticked = true;
        })
        .await;

        assert_eq!(CountdownEnd::Elapsed, end);
        assert!(!ticked);
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_the_wait() {
        let token = CancellationToken::new();
        token.cancel();

        let end = countdown(Duration::from_secs(5), Duration::from_secs(1), &token, |_| {}).await;

        assert_eq!(CountdownEnd::Cancelled, end);
    }
}
