//! Transport capability.
//!
//! The harness never speaks the wire protocol itself. A [`Transport`] turns an
//! [`Endpoint`] into a [`Connection`]; [`TungsteniteTransport`] does so with
//! `tokio-tungstenite`, running one driver task per connection.

use crate::HarnessError;
use crate::connection::{self, CloseRequest, Command, Connection, ConnectionEvent, Remote};
use crate::endpoint::{Endpoint, Security};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use wsprobe_core::{CloseEvent, ErrorEvent, NO_STATUS_RECEIVED, OutboundMessage, Payload};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens connections.
pub trait Transport {
    /// Begin connecting. The returned connection reports `Open` once the
    /// handshake completes; there is no timeout.
    fn open(&self, endpoint: &Endpoint) -> Connection;
}

/// Pick the transport for an endpoint.
pub fn transport_for(endpoint: &Endpoint) -> Result<Box<dyn Transport>, HarnessError> {
    match endpoint.security() {
        Security::Plain => Ok(Box::new(TungsteniteTransport)),
        Security::Encrypted if cfg!(feature = "tls") => Ok(Box::new(TungsteniteTransport)),
        Security::Encrypted => Err(HarnessError::EnvironmentUnavailable {
            scheme: Security::Encrypted.scheme(),
            hint: "rebuild wsprobe-cli with `--features tls`",
        }),
    }
}

/// WebSocket transport backed by `tokio-tungstenite`.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteTransport;

impl Transport for TungsteniteTransport {
    fn open(&self, endpoint: &Endpoint) -> Connection {
        let (connection, remote) = connection::channel();
        tokio::spawn(drive(endpoint.url().to_string(), remote));
        connection
    }
}

async fn drive(url: String, mut remote: Remote) {
    let Some(ws) = establish(&url, &mut remote).await else {
        return;
    };
    tracing::debug!("handshake with {} complete", url);
    remote.emit(ConnectionEvent::Open);
    pump(ws, remote).await;
}

/// Connect, while still honouring close requests that arrive first.
async fn establish(url: &str, remote: &mut Remote) -> Option<WsStream> {
    let connect = connect_async(url);
    tokio::pin!(connect);

    loop {
        tokio::select! {
            result = &mut connect => {
                return match result {
                    Ok((ws, _response)) => Some(ws),
                    Err(e) => {
                        remote.emit(ConnectionEvent::Error(ErrorEvent::new(format!(
                            "connect to {url} failed: {e}"
                        ))));
                        remote.emit(ConnectionEvent::Close(CloseEvent::abnormal()));
                        None
                    }
                };
            }
            command = remote.next_command() => match command {
                Some(Command::Send(message)) => {
                    remote.emit(ConnectionEvent::Error(ErrorEvent::new(format!(
                        "dropped {}-byte message sent before open",
                        message.byte_len()
                    ))));
                }
                Some(Command::Close(_)) | None => {
                    tracing::debug!("connect to {} abandoned", url);
                    remote.emit(ConnectionEvent::Close(CloseEvent::abnormal()));
                    return None;
                }
            }
        }
    }
}

async fn pump(ws: WsStream, mut remote: Remote) {
    let (mut sink, mut stream) = ws.split();
    let mut handle_alive = true;
    let mut close: Option<CloseEvent> = None;

    loop {
        tokio::select! {
            command = remote.next_command(), if handle_alive => match command {
                Some(Command::Send(message)) => {
                    if let Err(e) = sink.send(to_frame(message)).await {
                        remote.emit(ConnectionEvent::Error(ErrorEvent::new(format!("send failed: {e}"))));
                    }
                }
                Some(Command::Close(request)) => {
                    if let Err(e) = sink.send(close_frame(request)).await {
                        remote.emit(ConnectionEvent::Error(ErrorEvent::new(format!("close failed: {e}"))));
                    }
                }
                None => {
                    handle_alive = false;
                    if let Err(e) = sink.close().await {
                        tracing::debug!("close after handle dropped failed: {}", e);
                    }
                }
            },

            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    remote.emit(ConnectionEvent::Message(Payload::Text(text.as_str().to_owned())));
                }
                Some(Ok(Message::Binary(data))) => {
                    remote.emit(ConnectionEvent::Message(Payload::Binary(data.to_vec())));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    close = Some(match frame {
                        Some(frame) => CloseEvent::new(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseEvent::new(NO_STATUS_RECEIVED, ""),
                    });
                }
                Some(Ok(Message::Frame(frame))) => {
                    remote.emit(ConnectionEvent::Message(Payload::Unknown(frame.to_string())));
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => break,
                Some(Err(e)) => {
                    remote.emit(ConnectionEvent::Error(ErrorEvent::new(e.to_string())));
                    break;
                }
            }
        }
    }

    remote.emit(ConnectionEvent::Close(close.unwrap_or_else(CloseEvent::abnormal)));
}

fn to_frame(message: OutboundMessage) -> Message {
    match message {
        OutboundMessage::Text(text) => Message::Text(text.into()),
        OutboundMessage::Binary(data) => Message::Binary(data.into()),
    }
}

fn close_frame(request: CloseRequest) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::from(request.code),
        reason: request.reason.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_endpoints_have_a_transport() {
        let endpoint = Endpoint::parse("ws://127.0.0.1:1").unwrap();
        assert!(transport_for(&endpoint).is_ok());
    }

    #[cfg(feature = "tls")]
    #[test]
    fn encrypted_endpoints_have_a_transport() {
        let endpoint = Endpoint::parse("wss://echo.example.com/").unwrap();
        assert!(transport_for(&endpoint).is_ok());
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn encrypted_endpoints_need_tls() {
        let endpoint = Endpoint::parse("wss://example.com").unwrap();
        let err = transport_for(&endpoint).err().unwrap();
        assert!(matches!(
            err,
            HarnessError::EnvironmentUnavailable { scheme: "wss", .. }
        ));
        assert!(err.to_string().contains("wsprobe-cli with `--features tls`"));
    }

    #[test]
    fn close_frame_carries_code_and_reason() {
        let Message::Close(Some(frame)) = close_frame(CloseRequest::new(1000, "bye")) else {
            panic!("expected close frame");
        };
        assert_eq!(u16::from(frame.code), 1000);
        assert_eq!(frame.reason.as_str(), "bye");
    }

    #[test]
    fn binary_frames_keep_high_bytes() {
        let Message::Binary(data) = to_frame(OutboundMessage::binary(vec![1, 250, 252])) else {
            panic!("expected binary frame");
        };
        assert_eq!(&data[..], &[1, 250, 252]);
    }

    #[tokio::test]
    async fn refused_connection_reports_error_then_abnormal_close() {
        // Grab a free port, then release it so nothing is listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::parse(&format!("ws://{addr}")).unwrap();
        let mut connection = TungsteniteTransport.open(&endpoint);

        let first = connection.events.recv().await.unwrap();
        assert!(matches!(first, ConnectionEvent::Error(_)), "{first:?}");
        assert_eq!(
            connection.events.recv().await,
            Some(ConnectionEvent::Close(CloseEvent::abnormal()))
        );
    }
}
