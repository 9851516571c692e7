//! Response classification for retry decisions
//!
//! The proxy overloads a single free-text `message` for both transient and
//! permanent failures, so permanence is decided by matching that text against
//! a fixed vocabulary. All of it sits behind [`FailureClassifier`] so a
//! structured error code can replace the matching without touching the loop.

use serde_json::Value;

use crate::config::RetryConfig;
use crate::error::AttemptError;
use crate::payload::ResponsePayload;
use crate::transport::HttpResponse;

/// Terms that mark a failure message as non-retryable. Matched as substrings
/// of the lower-cased message.
pub const NON_RETRYABLE_TERMS: &[&str] = &[
    "suspended",
    "banned",
    "blocked",
    "invalid credentials",
    "incorrect",
    "wrong password",
];

/// Dedicated status some proxy versions return for a rejected login.
pub const INVALID_CREDENTIALS_STATUS: &str = "invalid_credentials";

/// Top-level error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient, retry with backoff
    Retryable,
    /// Permanent, surface to the caller immediately
    Permanent,
}

/// Result of one attempt, as seen by the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(ResponsePayload),
    RetryableFailure(AttemptError),
    NonRetryableFailure(AttemptError),
    Cancelled,
}

impl AttemptOutcome {
    pub fn from_result(result: Result<ResponsePayload, AttemptError>) -> Self {
        match result {
            Ok(payload) => AttemptOutcome::Success(payload),
            Err(err) if err.is_retryable() => AttemptOutcome::RetryableFailure(err),
            Err(err) => AttemptOutcome::NonRetryableFailure(err),
        }
    }
}

/// Decides whether a failure message describes a permanent condition.
pub trait FailureClassifier: Send + Sync {
    fn is_non_retryable(&self, message: &str) -> bool;
}

/// Substring matching against [`NON_RETRYABLE_TERMS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl FailureClassifier for KeywordClassifier {
    fn is_non_retryable(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        NON_RETRYABLE_TERMS
            .iter()
            .any(|term| lowered.contains(term))
    }
}

/// Turn a raw HTTP response into a payload or an [`AttemptError`].
pub fn classify_response(
    response: &HttpResponse,
    config: &RetryConfig,
    classifier: &dyn FailureClassifier,
) -> Result<ResponsePayload, AttemptError> {
    if !response.is_success() {
        return Err(AttemptError::HttpStatus(response.status));
    }

    let value: Value = serde_json::from_slice(&response.body)
        .map_err(|e| AttemptError::Protocol(e.to_string()))?;
    let Value::Object(body) = value else {
        return Err(AttemptError::Protocol("expected a JSON object".to_string()));
    };
    let Some(status) = body.get("status").and_then(Value::as_str) else {
        return Err(AttemptError::Protocol(
            "missing string `status` field".to_string(),
        ));
    };
    let status = status.to_string();

    if config.is_success_status(&status) {
        return Ok(ResponsePayload::new(status, body));
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if status == INVALID_CREDENTIALS_STATUS {
        let message = if message.is_empty() {
            "Invalid credentials".to_string()
        } else {
            message
        };
        return Err(AttemptError::NonRetryableBusiness(message));
    }
    if classifier.is_non_retryable(&message) {
        return Err(AttemptError::NonRetryableBusiness(message));
    }
    if message.is_empty() {
        return Err(AttemptError::GenericBusiness(format!("status `{status}`")));
    }
    Err(AttemptError::GenericBusiness(message))
}
