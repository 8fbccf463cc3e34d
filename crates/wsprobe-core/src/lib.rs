//! Core types for wsprobe.
//!
//! This crate holds the pieces of the harness that need no runtime: the
//! connection lifecycle states, the outbound and inbound message shapes, the
//! terminal close record, and the dispatcher that classifies inbound
//! payloads. The client crate drives these over a real connection.

mod dispatch;
mod message;

pub use dispatch::{Dispatcher, Kind, PREVIEW_LEN, Summary, classify};
pub use message::{BufferView, OutboundMessage, Payload, PayloadError};

use std::fmt;

/// Status code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Reported when the peer closed without a status code.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Reported when the connection ended without a close handshake.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Establishing connection.
    Connecting,
    /// Handshake complete, messages flow both ways.
    Open,
    /// Close requested, waiting for the transport to finish.
    Closing,
    /// Terminal. The handle accepts no further sends.
    Closed,
}

impl ConnectionState {
    /// Whether inbound messages may be classified in this state.
    pub fn accepts_messages(self) -> bool {
        matches!(self, Self::Open | Self::Closing)
    }

    /// Whether the state is terminal.
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// The terminal event of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// A close with no handshake behind it.
    pub fn abnormal() -> Self {
        Self::new(ABNORMAL_CLOSURE, "")
    }

    pub fn is_normal(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }
}

/// A diagnostic reported by the transport or the controller.
///
/// Errors never end a connection on their own; only a [`CloseEvent`] does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
}

impl ErrorEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
