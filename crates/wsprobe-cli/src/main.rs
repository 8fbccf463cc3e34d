//! WebSocket probe.
//!
//! Connects to one endpoint, sends a text message and two binary messages,
//! logs whatever comes back, and closes normally half a second later.
//!
//!   cargo run -p wsprobe-cli -- ws://127.0.0.1:7450
//!
//! Pair it with the loopback demo server to see the messages echoed:
//!
//!   cargo run -p wsprobe-loopback

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wsprobe_client::{DEFAULT_URL, Endpoint, HarnessConfig};

#[derive(Debug, Parser)]
#[command(name = "wsprobe", version, about)]
struct Cli {
    /// Endpoint to probe (ws:// or wss://).
    #[arg(default_value = DEFAULT_URL)]
    url: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("wsprobe=info".parse()?)
                .add_directive("wsprobe_client=info".parse()?)
                .add_directive("wsprobe_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = HarnessConfig::new(Endpoint::parse(&cli.url)?);

    let transcript = wsprobe_client::run(config).await?;
    tracing::debug!("{} events observed", transcript.entries().len());
    Ok(())
}
