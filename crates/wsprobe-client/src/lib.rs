//! Client side of the wsprobe harness.
//!
//! [`run`] opens one WebSocket connection, sends a short fixed script of
//! text and binary messages, reports everything that comes back, and closes
//! the connection after a delay. There is exactly one connection attempt; a
//! failure is reported, never retried.

mod connection;
mod controller;
mod endpoint;
mod error;
mod timer;
mod transport;

pub use connection::{
    CloseRequest, Command, Connection, ConnectionEvent, ConnectionHandle, Remote, channel,
};
pub use controller::{
    Controller, Entry, FILL_LEN, GREETING, HarnessConfig, Observed, SMALL_BINARY, Transcript,
    default_script, fill_pattern,
};
pub use endpoint::{DEFAULT_URL, Endpoint, Security};
pub use error::HarnessError;
pub use timer::CloseTimer;
pub use transport::{Transport, TungsteniteTransport, transport_for};

/// Connect to the configured endpoint and run the harness to completion.
///
/// Fails only when no transport exists for the endpoint; connection problems
/// show up as errors in the returned transcript.
pub async fn run(config: HarnessConfig) -> Result<Transcript, HarnessError> {
    let transport = transport_for(&config.endpoint)?;
    tracing::info!("connecting to {}", config.endpoint);
    let connection = transport.open(&config.endpoint);
    Ok(Controller::new(config, connection).run().await)
}
