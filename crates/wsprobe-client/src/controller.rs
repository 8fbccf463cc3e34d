//! Connection controller.
//!
//! The controller owns the connection state machine:
//! `Connecting -> Open -> Closing -> Closed`. Transport events and the
//! delayed close are processed one at a time, each to completion, on a single
//! task. On `Open` it sends the configured script, then schedules a close.

use crate::connection::{CloseRequest, Connection, ConnectionEvent, ConnectionHandle};
use crate::endpoint::Endpoint;
use crate::timer::CloseTimer;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use wsprobe_core::{
    CloseEvent, ConnectionState, Dispatcher, ErrorEvent, NORMAL_CLOSURE, OutboundMessage,
    Payload, Summary,
};

/// Text sent first on open.
pub const GREETING: &str = "hello from wsprobe";
/// Small binary payload; includes bytes above 0x7F.
pub const SMALL_BINARY: [u8; 7] = [1, 2, 3, 4, 250, 251, 252];
/// Size of the patterned binary payload.
pub const FILL_LEN: usize = 1024;

/// `len` bytes where byte `i` is `i % 256`.
pub fn fill_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

/// The default send sequence: greeting, small binary, patterned binary.
pub fn default_script() -> Vec<OutboundMessage> {
    vec![
        OutboundMessage::text(GREETING),
        OutboundMessage::binary(SMALL_BINARY),
        OutboundMessage::binary(fill_pattern(FILL_LEN)),
    ]
}

/// Harness settings.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub endpoint: Endpoint,
    /// Delay between finishing the script and requesting close.
    pub close_delay: Duration,
    pub close_code: u16,
    pub close_reason: String,
    /// Messages sent on open, in order.
    pub script: Vec<OutboundMessage>,
}

impl HarnessConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            close_delay: Duration::from_millis(500),
            close_code: NORMAL_CLOSURE,
            close_reason: "bye".to_string(),
            script: default_script(),
        }
    }
}

/// An event as the controller observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Opened,
    Message { payload: Payload, summary: Summary },
    Error(ErrorEvent),
    Closed(CloseEvent),
}

/// An observed event and when it happened, relative to controller start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub at: Duration,
    pub event: Observed,
}

/// Everything a run observed, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn opened_at(&self) -> Option<Duration> {
        self.entries
            .iter()
            .find(|e| e.event == Observed::Opened)
            .map(|e| e.at)
    }

    pub fn close(&self) -> Option<(&CloseEvent, Duration)> {
        self.entries.iter().find_map(|e| match &e.event {
            Observed::Closed(close) => Some((close, e.at)),
            _ => None,
        })
    }

    pub fn messages(&self) -> impl Iterator<Item = (&Payload, &Summary)> {
        self.entries.iter().filter_map(|e| match &e.event {
            Observed::Message { payload, summary } => Some((payload, summary)),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorEvent> {
        self.entries.iter().filter_map(|e| match &e.event {
            Observed::Error(error) => Some(error),
            _ => None,
        })
    }

    fn push(&mut self, at: Duration, event: Observed) {
        self.entries.push(Entry { at, event });
    }
}

/// Drives one connection through its lifecycle.
pub struct Controller {
    config: HarnessConfig,
    handle: ConnectionHandle,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    transport_alive: bool,
    state: ConnectionState,
    dispatcher: Dispatcher,
    timer_tx: mpsc::UnboundedSender<CloseRequest>,
    timer_rx: mpsc::UnboundedReceiver<CloseRequest>,
    close_timer: Option<CloseTimer>,
    started: Instant,
    transcript: Transcript,
}

impl Controller {
    pub fn new(config: HarnessConfig, connection: Connection) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            config,
            handle: connection.handle,
            events: connection.events,
            transport_alive: true,
            state: ConnectionState::Connecting,
            dispatcher: Dispatcher::new(),
            timer_tx,
            timer_rx,
            close_timer: None,
            started: Instant::now(),
            transcript: Transcript::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Process events until the connection is closed and no close is still
    /// scheduled.
    pub async fn run(mut self) -> Transcript {
        while !(self.state.is_closed() && self.close_timer.is_none()) {
            tokio::select! {
                event = self.events.recv(), if self.transport_alive => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        self.transport_alive = false;
                        if !self.state.is_closed() {
                            tracing::warn!("transport ended without reporting close");
                            self.handle_event(ConnectionEvent::Close(CloseEvent::abnormal()));
                        }
                    }
                },
                Some(request) = self.timer_rx.recv() => {
                    self.close_timer = None;
                    self.close(request.code, request.reason);
                }
            }
        }
        self.transcript
    }

    /// Send one message. Only allowed while open.
    pub fn send(&mut self, message: OutboundMessage) {
        if self.state != ConnectionState::Open {
            let kind = if message.is_text() { "text" } else { "binary" };
            self.report_error(ErrorEvent::new(format!(
                "cannot send {kind} message while {}",
                self.state
            )));
            return;
        }
        if let Err(error) = self.handle.send(message) {
            self.report_error(error);
        }
    }

    /// Request closure. A no-op once closing or closed.
    pub fn close(&mut self, code: u16, reason: impl Into<String>) {
        match self.state {
            ConnectionState::Closing | ConnectionState::Closed => {
                tracing::debug!("close requested while {}, ignoring", self.state);
            }
            ConnectionState::Connecting | ConnectionState::Open => {
                tracing::info!("closing...");
                self.state = ConnectionState::Closing;
                if let Err(error) = self.handle.close(CloseRequest::new(code, reason)) {
                    self.report_error(error);
                }
            }
        }
    }

    /// Stop a scheduled close from firing.
    pub fn cancel_scheduled_close(&mut self) {
        if let Some(timer) = self.close_timer.take() {
            timer.cancel();
        }
    }

    fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open => self.on_open(),
            ConnectionEvent::Message(payload) => self.on_message(payload),
            ConnectionEvent::Error(error) => self.report_error(error),
            ConnectionEvent::Close(close) => self.on_close(close),
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::warn!("ignoring open while {}", self.state);
            return;
        }
        self.state = ConnectionState::Open;
        tracing::info!("open: {}", self.config.endpoint);
        self.record(Observed::Opened);

        for message in self.config.script.clone() {
            self.send(message);
        }

        let request = CloseRequest::new(self.config.close_code, self.config.close_reason.clone());
        self.close_timer = Some(CloseTimer::schedule(
            self.config.close_delay,
            request,
            self.timer_tx.clone(),
        ));
    }

    fn on_message(&mut self, payload: Payload) {
        if !self.state.accepts_messages() {
            tracing::warn!("dropping message received while {}", self.state);
            return;
        }
        let summary = self.dispatcher.dispatch(&payload);
        self.record(Observed::Message { payload, summary });
    }

    fn on_close(&mut self, close: CloseEvent) {
        if self.state.is_closed() {
            tracing::debug!("ignoring repeated close {}", close.code);
            return;
        }
        self.state = ConnectionState::Closed;
        tracing::info!("close: {} {}", close.code, close.reason);
        self.record(Observed::Closed(close));
    }

    fn report_error(&mut self, error: ErrorEvent) {
        tracing::warn!("error: {}", error);
        self.record(Observed::Error(error));
    }

    fn record(&mut self, event: Observed) {
        self.transcript.push(self.started.elapsed(), event);
    }
}
