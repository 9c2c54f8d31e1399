//! Two-stage recovery for classifier calls over free text.
//!
//! Stage one retries a failed call once with the text cut down to a fixed
//! number of characters, but only when the text was actually over that limit.
//! Stage two gives up and hands the caller a [`RecoveryResult::Fallback`] so a
//! single oversized or malformed post never aborts a larger batch.

use crate::{CoreError, ErrorExt};
use std::future::Future;
use tracing::{debug, warn};

/// Character count above which free text is truncated before the retry.
pub const DEFAULT_TRUNCATION_THRESHOLD: usize = 4000;

/// Result of a recoverable classifier call
#[derive(Debug)]
pub enum RecoveryResult<T> {
    /// The first attempt with the full text succeeded
    Completed(T),
    /// The first attempt failed and the truncated retry succeeded
    RecoveredTruncated(T),
    /// Every attempt failed; the caller should use its fallback value
    Fallback(CoreError),
}

impl<T> RecoveryResult<T> {
    /// Returns true if either attempt produced a value
    pub fn is_success(&self) -> bool {
        !self.is_fallback()
    }

    /// Returns true if the value came from the truncated retry
    pub fn is_truncated(&self) -> bool {
        matches!(self, RecoveryResult::RecoveredTruncated(_))
    }

    /// Returns true if the caller must fall back
    pub fn is_fallback(&self) -> bool {
        matches!(self, RecoveryResult::Fallback(_))
    }

    /// Returns the value if either attempt succeeded
    pub fn ok(self) -> Option<T> {
        match self {
            RecoveryResult::Completed(value) | RecoveryResult::RecoveredTruncated(value) => {
                Some(value)
            }
            RecoveryResult::Fallback(_) => None,
        }
    }

    /// Returns the value, or `fallback` if every attempt failed
    pub fn unwrap_or(self, fallback: T) -> T {
        self.ok().unwrap_or(fallback)
    }

    /// Returns the last error if the caller must fall back
    pub fn err(self) -> Option<CoreError> {
        match self {
            RecoveryResult::Fallback(error) => Some(error),
            _ => None,
        }
    }
}

/// Retry-with-truncation policy shared by every classifier that reads
/// arbitrarily long text.
#[derive(Debug, Clone, Copy)]
pub struct TruncationRetry {
    threshold: usize,
}

impl Default for TruncationRetry {
    fn default() -> Self {
        Self::new(DEFAULT_TRUNCATION_THRESHOLD)
    }
}

impl TruncationRetry {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Run `operation` on `text`, retrying once on a truncated copy.
    ///
    /// `operation` is called at most twice.
    pub async fn run<T, F, Fut>(
        &self,
        operation_name: &str,
        text: &str,
        mut operation: F,
    ) -> RecoveryResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let error = match operation(text.to_string()).await {
            Ok(value) => return RecoveryResult::Completed(value),
            Err(error) => error,
        };

        let length = text.chars().count();
        if length <= self.threshold {
            warn!(
                operation = operation_name,
                length,
                kind = ?error.failure_kind(),
                "Classifier call failed and input is within limit, using fallback: {}",
                error
            );
            return RecoveryResult::Fallback(error);
        }

        warn!(
            operation = operation_name,
            length,
            threshold = self.threshold,
            kind = ?error.failure_kind(),
            "Classifier call failed on oversized input, retrying truncated: {}",
            error
        );

        let truncated = truncate_chars(text, self.threshold);
        match operation(truncated.to_string()).await {
            Ok(value) => {
                debug!(operation = operation_name, "Truncated retry succeeded");
                RecoveryResult::RecoveredTruncated(value)
            }
            Err(retry_error) => {
                warn!(
                    operation = operation_name,
                    code = %retry_error.error_code(),
                    "Truncated retry failed, using fallback: {}",
                    retry_error
                );
                RecoveryResult::Fallback(retry_error)
            }
        }
    }
}

/// The first `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
