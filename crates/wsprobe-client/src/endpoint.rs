//! Target endpoint parsing.

use crate::HarnessError;
use std::fmt;
use tokio_tungstenite::tungstenite::http::Uri;

/// Endpoint used when none is given.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:7450";

/// Transport security, derived from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// `ws://`
    Plain,
    /// `wss://`
    Encrypted,
}

impl Security {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Plain => "ws",
            Self::Encrypted => "wss",
        }
    }
}

/// A WebSocket endpoint. Its URL is the connection's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    security: Security,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, HarnessError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| HarnessError::invalid(url, format!("{e}")))?;

        let security = match uri.scheme_str() {
            Some("ws") => Security::Plain,
            Some("wss") => Security::Encrypted,
            Some(other) => {
                return Err(HarnessError::invalid(
                    url,
                    format!("scheme must be ws or wss, got {other}"),
                ));
            }
            None => return Err(HarnessError::invalid(url, "missing ws:// or wss:// scheme")),
        };

        if uri.host().is_none_or(str::is_empty) {
            return Err(HarnessError::invalid(url, "missing host"));
        }

        Ok(Self {
            url: url.to_string(),
            security,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn security(&self) -> Security {
        self.security
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            security: Security::Plain,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
