//! logship Daemon
//!
//! Reads lines from stdin and ships them to a remote log stream.
//!
//! # Usage
//!
//! ```bash
//! my-service 2>&1 | LOGSHIP_GROUP=/app/web LOGSHIP_STREAM=i-0abc cargo run -p logshipd
//! ```
//!
//! # Environment Variables
//!
//! - `LOGSHIP_GROUP`: Log group (required)
//! - `LOGSHIP_STREAM`: Log stream (required)
//! - `LOGSHIP_REGION`: Region (default: us-east-1)
//! - `LOGSHIP_ENDPOINT`: Endpoint override (optional)
//! - `LOGSHIP_FLUSH_INTERVAL_MS`: Background flush interval (default: 5000)
//! - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`: Credentials (required)
//! - `AWS_SESSION_TOKEN`: Session token (optional)

use logshipd::{connect, ship_and_close, Config};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing on stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("logshipd=info".parse()?)
                .add_directive("logship_writer=info".parse()?),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        group = %config.group,
        stream = %config.stream,
        region = %config.region,
        flush_every_ms = config.flush_every.as_millis() as u64,
        "logship daemon"
    );

    let writer = connect(&config).await?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    let stats = ship_and_close(BufReader::new(tokio::io::stdin()), &writer, shutdown).await?;

    info!(lines = stats.lines, bytes = stats.bytes, "Done");
    Ok(())
}
