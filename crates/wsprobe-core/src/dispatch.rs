//! Inbound message classification.
//!
//! [`classify`] is total: every [`Payload`] maps to exactly one [`Kind`].
//! Binary payloads render their length and at most [`PREVIEW_LEN`] leading
//! bytes, so a large frame still produces a one-line summary.

use crate::Payload;
use std::fmt;

/// Number of leading bytes shown for binary payloads.
pub const PREVIEW_LEN: usize = 16;

/// Classification of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    Binary,
    Unknown,
}

/// Bounded rendering of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Text(String),
    Binary {
        len: usize,
        head: Vec<u8>,
        /// Reconstructed from a view rather than an owned buffer.
        view: bool,
    },
    Unknown(String),
}

impl Summary {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Text(_) => Kind::Text,
            Self::Binary { .. } => Kind::Binary,
            Self::Unknown(_) => Kind::Unknown,
        }
    }

    /// Payload length in bytes, for binary summaries.
    pub fn binary_len(&self) -> Option<usize> {
        match self {
            Self::Binary { len, .. } => Some(*len),
            _ => None,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "message (text): {text}"),
            Self::Binary { len, head, view } => {
                let label = if *view { "binary view" } else { "binary" };
                write!(f, "message ({label}): {len} bytes {head:?}")
            }
            Self::Unknown(value) => write!(f, "message (unknown): {value}"),
        }
    }
}

/// Classify a payload. Never panics.
pub fn classify(payload: &Payload) -> Summary {
    match payload {
        Payload::Text(text) => Summary::Text(text.clone()),
        Payload::Binary(data) => binary(data, false),
        Payload::View(view) => binary(view.as_bytes(), true),
        Payload::Unknown(value) => Summary::Unknown(value.clone()),
    }
}

fn binary(bytes: &[u8], view: bool) -> Summary {
    Summary::Binary {
        len: bytes.len(),
        head: bytes[..bytes.len().min(PREVIEW_LEN)].to_vec(),
        view,
    }
}

/// Classifies inbound messages and logs one line per message.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dispatcher;

impl Dispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch(&self, payload: &Payload) -> Summary {
        let summary = classify(payload);
        tracing::info!("{}", summary);
        summary
    }
}
