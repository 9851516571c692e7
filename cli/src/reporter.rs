//! Renders retry progress on stderr so stdout stays clean for exports.

use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use coursefetch_retry::AttemptFailure;
use coursefetch_retry::ProgressReporter;
use coursefetch_retry::ResponsePayload;
use coursefetch_retry::progress::format_elapsed;
use coursefetch_retry::progress::remaining_secs;
use owo_colors::OwoColorize;
use owo_colors::Style;

#[derive(Debug, Clone, Copy)]
struct Styles {
    bold: Style,
    dimmed: Style,
    red: Style,
    yellow: Style,
    green: Style,
}

impl Styles {
    fn new(ansi: bool) -> Self {
        if ansi {
            Self {
                bold: Style::new().bold(),
                dimmed: Style::new().dimmed(),
                red: Style::new().red(),
                yellow: Style::new().yellow(),
                green: Style::new().green(),
            }
        } else {
            Self {
                bold: Style::new(),
                dimmed: Style::new(),
                red: Style::new(),
                yellow: Style::new(),
                green: Style::new(),
            }
        }
    }
}

#[derive(Debug, Default)]
struct View {
    surfaced: bool,
    /// A countdown line is on screen without its newline.
    open_line: bool,
}

/// Terminal progress reporter.
///
/// Silent until the engine surfaces the operation. With `live` set the countdown redraws in place; otherwise ticks are not
/// printed at all, which keeps piped stderr readable.
pub struct TerminalReporter<W = io::Stderr> {
    out: Mutex<W>,
    view: Mutex<View>,
    styles: Styles,
    live: bool,
}

impl TerminalReporter {
    pub fn stderr(ansi: bool, live: bool) -> Self {
        Self::new(io::stderr(), ansi, live)
    }
}

impl<W: Write + Send> TerminalReporter<W> {
    pub fn new(out: W, ansi: bool, live: bool) -> Self {
        Self {
            out: Mutex::new(out),
            view: Mutex::new(View::default()),
            styles: Styles::new(ansi),
            live,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn view(&self) -> std::sync::MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Print a full line, closing any open countdown line first.
    fn line(&self, text: String) {
        let reopen = std::mem::take(&mut self.view().open_line);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let prefix = if reopen { "\n" } else { "" };
        // Progress output is best effort; a closed stderr must not stop the retry loop.
        let _ = writeln!(out, "{prefix}{text}");
        let _ = out.flush();
    }
}

impl<W: Write + Send> ProgressReporter for TerminalReporter<W> {
    fn on_surface(&self, label: &str) {
        self.view().surfaced = true;
        self.line(format!(
            "{} {}",
            label.style(self.styles.bold),
            "is taking longer than usual, retrying until it succeeds (Ctrl-C to cancel)"
                .style(self.styles.dimmed)
        ));
    }

    fn on_attempt_start(&self, attempt: u32, label: &str) {
        if self.view().surfaced {
            self.line(format!(
                "{}",
                format!("{label}: attempt {attempt}").style(self.styles.dimmed)
            ));
        }
    }

    fn on_attempt_success(&self, _payload: &ResponsePayload) {
        if self.view().surfaced {
            self.line(format!("{}", "Done.".style(self.styles.green)));
        }
    }

    fn on_attempt_failure(&self, failure: &AttemptFailure) {
        if !self.view().surfaced {
            return;
        }
        let outlook = match failure.next_delay {
            Some(delay) => format!(
                "({} elapsed, retrying in {}s)",
                format_elapsed(failure.elapsed),
                remaining_secs(delay)
            ),
            None => format!("({} elapsed, giving up)", format_elapsed(failure.elapsed)),
        };
        self.line(format!(
            "{} {} {}",
            format!("attempt {} failed:", failure.attempt).style(self.styles.yellow),
            failure.reason,
            outlook.style(self.styles.dimmed)
        ));
    }

    fn on_countdown_tick(&self, _attempt: u32, remaining: Duration) {
        if !self.live {
            return;
        }
        {
            let mut view = self.view();
            if !view.surfaced {
                return;
            }
            view.open_line = true;
        }
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = write!(
            out,
            "\r{}",
            format!("  retrying in {}s ", remaining_secs(remaining)).style(self.styles.dimmed)
        );
        let _ = out.flush();
    }

    fn on_cancelled(&self) {
        if self.view().surfaced {
            self.line(format!("{}", "Cancelled by user".style(self.styles.red)));
        }
    }

    fn on_dismiss(&self) {
        let mut view = self.view();
        view.surfaced = false;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use coursefetch_retry::HttpResponse;
    use coursefetch_retry::RequestDescriptor;
    use coursefetch_retry::RetryConfig;
    use coursefetch_retry::RetryEngine;
    use coursefetch_retry::Transport;
    use coursefetch_retry::transport::TransportError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn failure(attempt: u32, delay_ms: Option<u64>, elapsed_ms: u64) -> AttemptFailure {
        AttemptFailure {
            attempt,
            reason: "Network error".to_string(),
            next_delay: delay_ms.map(Duration::from_millis),
            elapsed: Duration::from_millis(elapsed_ms),
        }
    }

    fn output(reporter: TerminalReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    /// Refuses the first `refusals` calls, then answers with success.
    struct FlakyPortal {
        replies: Mutex<VecDeque<bool>>,
    }

    impl FlakyPortal {
        fn new(refusals: usize) -> Self {
            let mut replies: VecDeque<bool> = std::iter::repeat_n(false, refusals).collect();
            replies.push_back(true);
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl Transport for FlakyPortal {
        async fn send(&self, _request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
            match self.replies.lock().unwrap().pop_front() {
                Some(false) => Err(TransportError::Network("connection refused".into())),
                _ => Ok(HttpResponse::new(200, r#"{"status":"success"}"#)),
            }
        }
    }

    async fn transcript(show_progress_after_attempt: u32, refusals: usize) -> String {
        let reporter = Arc::new(TerminalReporter::new(Vec::new(), false, true));
        let config = RetryConfig {
            show_progress_after_attempt,
            ..Default::default()
        };
        let engine = RetryEngine::new(config, FlakyPortal::new(refusals))
            .unwrap()
            .with_reporter(reporter.clone());
        let request = RequestDescriptor::post_json("http://portal.test/login", json!({}));
        engine.execute(request, "Logging in").await.unwrap();
        drop(engine);
        output(Arc::into_inner(reporter).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn failures_before_the_threshold_print_nothing() {
        assert_eq!(transcript(3, 1).await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn surfaced_operation_prints_its_retries() {
        assert_eq!(
            transcript(2, 2).await,
            "Logging in is taking longer than usual, retrying until it succeeds (Ctrl-C to cancel)\n\
             Logging in: attempt 2\n\
             attempt 2 failed: Network error (1 sec elapsed, retrying in 2s)\n\
             \r  retrying in 2s \r  retrying in 1s \n\
             Logging in: attempt 3\n\
             Done.\n"
        );
    }

    #[test]
    fn final_failure_says_it_gives_up() {
        let reporter = TerminalReporter::new(Vec::new(), false, false);
        reporter.on_surface("Logging in");
        reporter.on_attempt_failure(&failure(4, None, 61_000));
        reporter.on_dismiss();
        reporter.on_attempt_failure(&failure(5, Some(1_000), 62_000));

        assert_eq!(
            output(reporter),
            "Logging in is taking longer than usual, retrying until it succeeds (Ctrl-C to cancel)\n\
             attempt 4 failed: Network error (1 min 1 sec elapsed, giving up)\n"
        );
    }

    #[test]
    fn live_countdown_is_closed_before_the_next_line() {
        let reporter = TerminalReporter::new(Vec::new(), false, true);

        reporter.on_surface("Logging in");
        reporter.on_countdown_tick(2, Duration::from_millis(2_000));
        reporter.on_countdown_tick(2, Duration::from_millis(1_000));
        reporter.on_cancelled();

        assert_eq!(
            output(reporter),
            "Logging in is taking longer than usual, retrying until it succeeds (Ctrl-C to cancel)\n\
             \r  retrying in 2s \r  retrying in 1s \nCancelled by user\n"
        );
    }

    #[test]
    fn cancel_before_surfacing_is_silent() {
        let reporter = TerminalReporter::new(Vec::new(), true, true);
        reporter.on_attempt_start(1, "Fetching courses");
        reporter.on_attempt_failure(&failure(1, Some(1_000), 0));
        reporter.on_countdown_tick(1, Duration::from_millis(1_000));
        reporter.on_cancelled();
        assert_eq!(output(reporter), "");
    }
}
