//! # Outcome Classification
//!
//! Turns the result of one provisioning attempt into an [`AttemptOutcome`]
//! and sorts it into a [`FailureClass`]. Classification is pure: it never
//! touches the backoff state or metrics.

use crate::constants::RATE_LIMITED_STATUS;
use regex::Regex;
use std::sync::LazyLock;

/// The provider embeds a human readable reason after this marker
static MESSAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Message: ([^\r\n]+)")
        .expect("Failed to compile MESSAGE_PATTERN - this should never happen")
});

/// What one attempt produced, as far as cadence and metrics are concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// HTTP status of the response, absent for transport-level failures
    pub status_code: Option<u16>,
    /// Raw error text. Empty for a successful attempt.
    pub error_message: String,
}

impl AttemptOutcome {
    /// A failure that never produced an HTTP response
    pub fn transport(error_message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            error_message: error_message.into(),
        }
    }

    /// A response carrying an HTTP status
    pub fn http(status_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            error_message: error_message.into(),
        }
    }

    #[must_use]
    pub fn success(status_code: u16) -> Self {
        Self::http(status_code, String::new())
    }

    #[must_use]
    pub fn has_http_response(&self) -> bool {
        self.status_code.is_some()
    }

    /// Reasons embedded in the error text, see [`extract_messages`]
    #[must_use]
    pub fn extracted_messages(&self) -> Vec<String> {
        extract_messages(&self.error_message)
    }
}

/// Cadence-relevant category of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// No HTTP response (connection refused, DNS, TLS, timeout...)
    Transport,
    /// HTTP 429
    RateLimited,
    /// Any other status, successes included
    Other,
}

#[must_use]
pub fn classify(outcome: &AttemptOutcome) -> FailureClass {
    match outcome.status_code {
        None => FailureClass::Transport,
        Some(RATE_LIMITED_STATUS) => FailureClass::RateLimited,
        Some(_) => FailureClass::Other,
    }
}

/// Extract every reason following a `Message: ` marker.
///
/// A reason runs to the end of its line; one trailing period is dropped.
/// Markers with nothing after them are skipped.
#[must_use]
pub fn extract_messages(error_message: &str) -> Vec<String> {
    MESSAGE_PATTERN
        .captures_iter(error_message)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let text = m.as_str().trim_end();
            text.strip_suffix('.').unwrap_or(text).trim().to_string()
        })
        .filter(|text| !text.is_empty())
        .collect()
}
