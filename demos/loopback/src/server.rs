//! Loopback server implementation.

use crate::protocol::{Images, Mode};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

pub async fn run(addr: SocketAddr, mode: Mode, images: Images) -> anyhow::Result<()> {
    let images = Arc::new(images);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}", addr);

    loop {
        let (stream, client_addr) = listener.accept().await?;
        let images = images.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, mode, &images).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    mode: Mode,
    images: &Images,
) -> anyhow::Result<()> {
    let mut ws = tokio_tungstenite::accept_async(stream).await?;
    tracing::info!("Connection accepted from {}", addr);

    while let Some(msg) = ws.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("WebSocket error: {}", e);
                break;
            }
        };

        match &msg {
            Message::Text(text) => tracing::info!("text frame: {}", text.as_str()),
            Message::Binary(data) => tracing::info!("binary frame: {} bytes", data.len()),
            Message::Close(frame) => tracing::info!("close frame: {:?}", frame),
            _ => {}
        }

        let reply = mode.reply(&msg, images);
        for (i, frame) in reply.frames.into_iter().enumerate() {
            if let Some(pace) = reply.pace.filter(|_| i > 0) {
                tokio::time::sleep(pace).await;
            }
            ws.send(frame).await?;
        }
    }

    tracing::info!("Connection closed: {}", addr);
    Ok(())
}
