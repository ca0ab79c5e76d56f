//! logship Daemon Library
//!
//! Wiring for the `logshipd` binary: configuration, client construction and
//! the stdin-to-stream copy loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use logshipd::{connect, ship_and_close, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::from_env()?;
//! let writer = connect(&config).await?;
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! let stats = ship_and_close(stdin, &writer, CancellationToken::new()).await?;
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod ship;

use std::sync::Arc;

use logship_connectors::CloudWatchLogsClient;
use logship_writer::{LogGroup, StreamWriter, WriterOptions};

// Re-exports for convenience
pub use config::Config;
pub use error::{ShipError, ShipResult};
pub use ship::{ship, ship_and_close, ShipStats};

/// Build the HTTP client described by `config`.
pub fn client(config: &Config) -> ShipResult<CloudWatchLogsClient> {
    let credentials = config.credentials.clone();
    let client = match &config.endpoint {
        Some(endpoint) => CloudWatchLogsClient::with_endpoint(&config.region, endpoint, credentials)?,
        None => CloudWatchLogsClient::new(&config.region, credentials)?,
    };
    Ok(client)
}

/// Attach the configured group and stream and start a writer.
pub async fn connect(config: &Config) -> ShipResult<StreamWriter> {
    let service = Arc::new(client(config)?);
    let group = LogGroup::attach(config.group.clone(), service).await?;
    let options = WriterOptions::default().with_flush_every(config.flush_every);
    Ok(group.attach_stream_with_options(&config.stream, options).await?)
}
