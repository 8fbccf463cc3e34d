//! Harness errors.
//!
//! Only conditions that stop the harness before a connection exists are
//! errors. Everything that goes wrong on a live connection is reported as an
//! [`ErrorEvent`](wsprobe_core::ErrorEvent) instead.

/// Fatal harness error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    #[error("invalid endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("no transport available for {scheme}:// endpoints: {hint}")]
    EnvironmentUnavailable {
        scheme: &'static str,
        hint: &'static str,
    },
}

impl HarnessError {
    pub(crate) fn invalid(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
