//! Loopback server for wsprobe.
//!
//! Accepts WebSocket connections and answers every data frame:
//! - `echo` mode sends each frame back unchanged
//! - `greet` mode answers text with a greeting and binary with `ABCD`;
//!   text starting with `png0`/`png1` also gets an image, and `pngs` gets
//!   a paced burst of twenty
//!
//! Run:
//!   cargo run -p wsprobe-loopback -- --port 7450 --mode greet --png0 img00.png

mod protocol;
mod server;

use anyhow::Context;
use clap::Parser;
use protocol::{Images, Mode};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "loopback", about = "WebSocket loopback server for wsprobe")]
struct Args {
    /// Port to listen on (127.0.0.1 only).
    #[arg(long, default_value_t = 7450)]
    port: u16,
    /// Reply policy.
    #[arg(long, value_enum, default_value_t = Mode::Echo)]
    mode: Mode,
    /// Image served for `png0`; a generated 8 KiB stand-in if omitted.
    #[arg(long)]
    png0: Option<PathBuf>,
    /// Image served for `png1`; a generated 16 KiB stand-in if omitted.
    #[arg(long)]
    png1: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("wsprobe_loopback=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let images = load_images(args.png0.as_deref(), args.png1.as_deref()).await?;
    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();

    tracing::info!("Starting loopback server on {} in {} mode", addr, args.mode);

    server::run(addr, args.mode, images).await
}

async fn load_images(png0: Option<&Path>, png1: Option<&Path>) -> anyhow::Result<Images> {
    let mut images = Images::generated();
    if let Some(path) = png0 {
        images.first = read(path).await?;
    }
    if let Some(path) = png1 {
        images.second = read(path).await?;
    }
    Ok(images)
}

async fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading image {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["loopback"]).unwrap();
        assert_eq!(args.port, 7450);
        assert_eq!(args.mode, Mode::Echo);
        assert!(args.png0.is_none());
    }

    #[test]
    fn greet_with_images() {
        let args = Args::try_parse_from([
            "loopback", "--mode", "greet", "--port", "9000", "--png1", "b.png",
        ])
        .unwrap();
        assert_eq!(args.mode, Mode::Greet);
        assert_eq!(args.port, 9000);
        assert_eq!(args.png1, Some(PathBuf::from("b.png")));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Args::try_parse_from(["loopback", "--mode", "chat"]).is_err());
    }

    #[tokio::test]
    async fn missing_image_file_is_an_error() {
        let err = load_images(Some(Path::new("/nonexistent/img00.png")), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("img00.png"), "{err}");
    }

    #[tokio::test]
    async fn generated_images_without_paths() {
        assert_eq!(load_images(None, None).await.unwrap(), Images::generated());
    }
}
