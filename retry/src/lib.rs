//! Resilient fetch/retry engine for backend proxy calls
//!
//! Every call to the course-portal proxy goes through [`RetryEngine`]. The
//! engine owns the whole loop for one operation:
//! - per-attempt timeout and abort handle
//! - failure classification (retryable vs non-retryable)
//! - exponential backoff capped at a ceiling, with no attempt cap
//! - a live countdown between attempts that honours cancellation every tick
//! - progress callbacks for whatever UI is listening
//!
//! Each `execute` call gets its own [`RetryState`], so independent operations
//! (login, course fetch) can run side by side without sharing anything.

pub mod backoff;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod payload;
pub mod progress;
pub mod state;
pub mod transport;

pub use backoff::Backoff;
pub use classifier::{AttemptOutcome, ErrorClass, FailureClassifier, KeywordClassifier};
pub use config::RetryConfig;
pub use engine::{RetryEngine, RetryOperation};
pub use error::{AttemptError, Result, RetryError};
pub use payload::ResponsePayload;
pub use progress::{AttemptFailure, ChannelReporter, NoopReporter, ProgressEvent, ProgressReporter};
pub use state::{RetryHandle, RetryState};
pub use transport::{HttpResponse, RequestBody, RequestDescriptor, ReqwestTransport, Transport};
