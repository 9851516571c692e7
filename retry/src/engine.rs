//! The retry loop.

use std::sync::Arc;

use coursefetch_async_utils::CancelErr;
use coursefetch_async_utils::CountdownEnd;
use coursefetch_async_utils::OrCancelExt;
use coursefetch_async_utils::countdown;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backoff::Backoff;
use crate::classifier::AttemptOutcome;
use crate::classifier::FailureClassifier;
use crate::classifier::KeywordClassifier;
use crate::classifier::classify_response;
use crate::config::InvalidConfig;
use crate::config::RetryConfig;
use crate::error::AttemptError;
use crate::error::Result;
use crate::error::RetryError;
use crate::payload::ResponsePayload;
use crate::progress::AttemptFailure;
use crate::progress::NoopReporter;
use crate::progress::ProgressReporter;
use crate::state::RetryHandle;
use crate::transport::RequestDescriptor;
use crate::transport::ReqwestTransport;
use crate::transport::Transport;

/// Drives retry operations against one transport.
///
/// Cheap to clone. Operations share configuration, transport, reporter and
/// classifier, but each gets its own [`RetryHandle`].
pub struct RetryEngine<T = ReqwestTransport> {
    config: Arc<RetryConfig>,
    transport: Arc<T>,
    reporter: Arc<dyn ProgressReporter>,
    classifier: Arc<dyn FailureClassifier>,
    shutdown: Option<CancellationToken>,
}

impl<T> Clone for RetryEngine<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            reporter: Arc::clone(&self.reporter),
            classifier: Arc::clone(&self.classifier),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T: Transport> RetryEngine<T> {
    pub fn new(config: RetryConfig, transport: T) -> std::result::Result<Self, InvalidConfig> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            reporter: Arc::new(NoopReporter),
            classifier: Arc::new(KeywordClassifier),
            shutdown: None,
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Tie every operation to `token`: cancelling it cancels whatever is
    /// running, as if the user had cancelled each operation.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Set up an operation without running it, so the caller can hold on to
    /// its [`RetryHandle`] first.
    pub fn prepare(&self, request: RequestDescriptor, label: impl Into<String>) -> RetryOperation<T> {
        let label = label.into();
        let token = match &self.shutdown {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        RetryOperation {
            engine: self.clone(),
            handle: RetryHandle::new(&label, token),
            request,
            label,
        }
    }

    /// Run `request` until it succeeds, is rejected for good, or is cancelled.
    pub async fn execute(
        &self,
        request: RequestDescriptor,
        label: impl Into<String>,
    ) -> Result<ResponsePayload> {
        self.prepare(request, label).execute().await
    }

    async fn run(
        &self,
        request: &RequestDescriptor,
        label: &str,
        handle: &RetryHandle,
        surfaced: &mut bool,
    ) -> Result<ResponsePayload> {
        // A cancel issued between prepare and execute still counts.
        if handle.should_stop() {
            return Err(RetryError::UserCancelled);
        }
        handle.start();
        let mut backoff = Backoff::new(&self.config);

        loop {
            if handle.should_stop() {
                return Err(RetryError::UserCancelled);
            }

            let attempt = handle.begin_attempt();
            if !*surfaced && attempt >= self.config.show_progress_after_attempt {
                *surfaced = true;
                self.reporter.on_surface(label);
            }
            self.reporter.on_attempt_start(attempt, label);

            let attempt_started = Instant::now();
            let outcome = self.run_attempt(request, handle).await;
            debug!(
                operation = %label,
                attempt,
                duration_ms = attempt_started.elapsed().as_millis() as u64,
                "attempt finished"
            );

            match outcome {
                AttemptOutcome::Success(payload) => {
                    info!(operation = %label, attempt, "operation succeeded");
                    return Ok(payload);
                }
                AttemptOutcome::NonRetryableFailure(err) => {
                    warn!(operation = %label, attempt, error = %err, "non-retryable failure");
                    let message = err.reason();
                    self.reporter.on_attempt_failure(&AttemptFailure {
                        attempt,
                        reason: message.clone(),
                        next_delay: None,
                        elapsed: handle.elapsed(),
                    });
                    return Err(RetryError::NonRetryable { message });
                }
                AttemptOutcome::Cancelled => return Err(RetryError::UserCancelled),
                AttemptOutcome::RetryableFailure(err) => {
                    let delay = backoff.next_delay();
                    warn!(
                        operation = %label,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying"
                    );
                    self.reporter.on_attempt_failure(&AttemptFailure {
                        attempt,
                        reason: err.reason(),
                        next_delay: Some(delay),
                        elapsed: handle.elapsed(),
                    });

                    let _timer = handle.timer();
                    let end = countdown(
                        delay,
                        self.config.countdown_tick(),
                        handle.token(),
                        |remaining| self.reporter.on_countdown_tick(attempt, remaining),
                    )
                    .await;
                    if end == CountdownEnd::Cancelled {
                        return Err(RetryError::UserCancelled);
                    }
                }
            }
        }
    }

    /// Issue one attempt under the per-attempt timeout and a fresh abort handle.
    async fn run_attempt(&self, request: &RequestDescriptor, handle: &RetryHandle) -> AttemptOutcome {
        let abort = handle.install_abort();
        let timeout = self.config.per_attempt_timeout();
        let sent = {
            let _timer = handle.timer();
            tokio::time::timeout(timeout, self.transport.send(request).or_cancel(&abort)).await
        };
        handle.clear_abort();

        let result = match sent {
            Err(_elapsed) => Err(AttemptError::Timeout(timeout)),
            Ok(Err(CancelErr::Cancelled)) => return AttemptOutcome::Cancelled,
            Ok(Ok(Err(err))) => Err(AttemptError::Transport(err.to_string())),
            Ok(Ok(Ok(response))) => {
                classify_response(&response, &self.config, self.classifier.as_ref())
            }
        };

        // A response that raced a cancel is discarded.
        if handle.should_stop() {
            return AttemptOutcome::Cancelled;
        }
        AttemptOutcome::from_result(result)
    }
}

/// A prepared, not yet running, retry operation.
pub struct RetryOperation<T = ReqwestTransport> {
    engine: RetryEngine<T>,
    handle: RetryHandle,
    request: RequestDescriptor,
    label: String,
}

impl<T: Transport> RetryOperation<T> {
    pub fn handle(&self) -> RetryHandle {
        self.handle.clone()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn execute(self) -> Result<ResponsePayload> {
        let RetryOperation {
            engine,
            handle,
            request,
            label,
        } = self;

        let mut surfaced = false;
        let result = engine.run(&request, &label, &handle, &mut surfaced).await;
        handle.finish();

        match &result {
            Ok(payload) => engine.reporter.on_attempt_success(payload),
            Err(RetryError::UserCancelled) => {
                info!(operation = %label, attempt = handle.attempt(), "operation cancelled");
                engine.reporter.on_cancelled();
            }
            Err(RetryError::NonRetryable { .. }) => {}
        }
        if surfaced {
            engine.reporter.on_dismiss();
        }
        result
    }
}
