//! The connection handle and the event stream a transport produces.
//!
//! A [`Connection`] is the controller's half: a handle for commands and a
//! receiver for events. A [`Remote`] is the transport's half. Both ends are
//! plain channels, so a transport is anything that drives a `Remote`.

use tokio::sync::mpsc;
use wsprobe_core::{CloseEvent, ErrorEvent, OutboundMessage, Payload};

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Open,
    Message(Payload),
    Close(CloseEvent),
    Error(ErrorEvent),
}

/// A request to close the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    pub code: u16,
    pub reason: String,
}

impl CloseRequest {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// A command for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(OutboundMessage),
    Close(CloseRequest),
}

/// Command side of a connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ConnectionHandle {
    /// Queue a message. Delivery is not confirmed.
    pub fn send(&self, message: OutboundMessage) -> Result<(), ErrorEvent> {
        self.commands
            .send(Command::Send(message))
            .map_err(|_| ErrorEvent::new("transport is gone, message dropped"))
    }

    /// Ask the transport to close.
    pub fn close(&self, request: CloseRequest) -> Result<(), ErrorEvent> {
        self.commands
            .send(Command::Close(request))
            .map_err(|_| ErrorEvent::new("transport is gone, close request dropped"))
    }
}

/// The controller's end of a connection.
#[derive(Debug)]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

/// The transport's end of a connection.
#[derive(Debug)]
pub struct Remote {
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl Remote {
    /// Report an event. Events emitted after the controller has gone are
    /// discarded.
    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    /// Next command, or `None` once every handle has been dropped.
    pub async fn next_command(&mut self) -> Option<Command> {
        self.commands.recv().await
    }

    /// Next command if one is already queued.
    #[cfg(test)]
    pub(crate) fn try_command(&mut self) -> Option<Command> {
        self.commands.try_recv().ok()
    }
}

/// Create a linked connection pair.
pub fn channel() -> (Connection, Remote) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (
        Connection {
            handle: ConnectionHandle {
                commands: command_tx,
            },
            events: event_rx,
        },
        Remote {
            commands: command_rx,
            events: event_tx,
        },
    )
}
