//! End-to-end runs against an in-process WebSocket server.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use wsprobe_client::{
    ConnectionEvent, Endpoint, FILL_LEN, GREETING, HarnessConfig, Observed, SMALL_BINARY,
    Transport, TungsteniteTransport, fill_pattern,
};
use wsprobe_core::{CloseEvent, Kind, NO_STATUS_RECEIVED, Payload, Summary};

const CLOSE_DELAY: Duration = Duration::from_millis(100);

/// How the test server behaves after accepting a connection.
#[derive(Clone, Copy)]
enum Behaviour {
    /// Echo every data frame back unchanged.
    Echo,
    /// Echo `n` data frames, then close with 1001.
    EchoThenClose(usize),
}

async fn serve_one(behaviour: Behaviour) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut echoed = 0;

        while let Some(Ok(msg)) = ws.next().await {
            if !(msg.is_text() || msg.is_binary()) {
                continue;
            }
            ws.send(msg).await.unwrap();
            echoed += 1;

            if let Behaviour::EchoThenClose(n) = behaviour {
                if echoed == n {
                    ws.close(Some(CloseFrame {
                        code: CloseCode::Away,
                        reason: "shutting down".into(),
                    }))
                    .await
                    .unwrap();
                }
            }
        }
    });

    addr
}

fn config(addr: SocketAddr) -> HarnessConfig {
    HarnessConfig {
        close_delay: CLOSE_DELAY,
        ..HarnessConfig::new(Endpoint::parse(&format!("ws://{addr}")).unwrap())
    }
}

#[tokio::test]
async fn echo_round_trip() {
    let addr = serve_one(Behaviour::Echo).await;
    let transcript = wsprobe_client::run(config(addr)).await.unwrap();

    assert_eq!(transcript.errors().count(), 0, "{transcript:?}");

    let events: Vec<&Observed> = transcript.entries().iter().map(|e| &e.event).collect();
    assert_eq!(events.len(), 5, "{events:?}");
    assert_eq!(events[0], &Observed::Opened);
    assert!(matches!(events[4], Observed::Closed(_)));

    let messages: Vec<(&Payload, &Summary)> = transcript.messages().collect();
    assert_eq!(messages.len(), 3);

    assert_eq!(messages[0].1, &Summary::Text(GREETING.to_string()));

    assert_eq!(
        messages[1].1,
        &Summary::Binary {
            len: 7,
            head: SMALL_BINARY.to_vec(),
            view: false
        }
    );

    let (payload, summary) = messages[2];
    assert_eq!(summary.kind(), Kind::Binary);
    assert_eq!(summary.binary_len(), Some(FILL_LEN));
    let Payload::Binary(data) = payload else {
        panic!("expected binary payload, got {payload:?}");
    };
    assert_eq!(data, &fill_pattern(FILL_LEN));
    for (i, byte) in data.iter().enumerate() {
        assert_eq!(*byte as usize, i % 256, "byte {i}");
    }

    let opened = transcript.opened_at().unwrap();
    let (close, closed) = transcript.close().unwrap();
    assert_eq!(close.code, 1000);
    assert_eq!(close.reason, "bye");
    assert!(closed - opened >= CLOSE_DELAY);
}

#[tokio::test]
async fn server_close_wins_over_scheduled_close() {
    let addr = serve_one(Behaviour::EchoThenClose(3)).await;
    let transcript = wsprobe_client::run(config(addr)).await.unwrap();

    let (close, _) = transcript.close().unwrap();
    assert_eq!(close.code, 1001);
    assert_eq!(close.reason, "shutting down");
    assert_eq!(transcript.errors().count(), 0, "{transcript:?}");

    let closes = transcript
        .entries()
        .iter()
        .filter(|e| matches!(e.event, Observed::Closed(_)))
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test]
async fn nothing_listening() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transcript = wsprobe_client::run(config(addr)).await.unwrap();
    assert_eq!(transcript.opened_at(), None);
    assert_eq!(transcript.messages().count(), 0);
    assert_eq!(transcript.errors().count(), 1);
    assert_eq!(transcript.close().unwrap().0.code, 1006);
}

#[tokio::test]
async fn dropped_handle_closes_the_socket() {
    let addr = serve_one(Behaviour::Echo).await;
    let endpoint = Endpoint::parse(&format!("ws://{addr}")).unwrap();
    let connection = TungsteniteTransport.open(&endpoint);
    let mut events = connection.events;

    assert_eq!(events.recv().await, Some(ConnectionEvent::Open));
    drop(connection.handle);

    assert_eq!(
        events.recv().await,
        Some(ConnectionEvent::Close(CloseEvent::new(NO_STATUS_RECEIVED, "")))
    );
}

#[cfg(not(feature = "tls"))]
#[tokio::test]
async fn wss_without_tls_is_fatal() {
    let config = HarnessConfig::new(Endpoint::parse("wss://127.0.0.1:1").unwrap());
    let err = wsprobe_client::run(config).await.unwrap_err();
    assert!(err.to_string().contains("tls"), "{err}");
}
