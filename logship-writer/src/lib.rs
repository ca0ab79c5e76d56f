//! logship Writer
//!
//! Buffered byte-stream writer for a remote, append-only log stream.
//!
//! # Architecture
//!
//! ```text
//! write(bytes) → EventBuffer ─┐
//!                             ├→ FlushController → AppendClient → LogStreamPort
//! FlushScheduler (tick) ──────┘        ↑
//! flush() / close() ───────────────────┘
//! ```
//!
//! # Components
//!
//! - **EventBuffer**: splits bytes into one event per line
//! - **AppendClient**: one remote append, result classified into `AppendOutcome`
//! - **FlushController**: owns the sequence token, retries a stale token once
//! - **FlushScheduler**: background flush every `flush_every`
//! - **StreamWriter**: the public write/flush/close surface
//! - **LogGroup** / **LogReader**: provisioning and paged reads
//!
//! # Example
//!
//! ```rust,ignore
//! use logship_connectors::{CloudWatchLogsClient, Credentials};
//! use logship_writer::LogGroup;
//! use std::sync::Arc;
//!
//! let client = Arc::new(CloudWatchLogsClient::new("us-east-1", credentials)?);
//! let group = LogGroup::attach("/app/web", client).await?;
//! let writer = group.attach_stream("i-0abc").await?;
//!
//! writer.write(b"service started\n")?;
//! writer.close().await?;
//! ```

#![warn(clippy::all)]

pub mod append;
pub mod buffer;
pub mod config;
pub mod error;
pub mod flush;
pub mod group;
pub mod observer;
pub mod reader;
pub mod scheduler;
pub mod writer;

// Re-exports for convenience
pub use append::{AppendClient, AppendOutcome};
pub use buffer::EventBuffer;
pub use config::WriterOptions;
pub use error::{ProvisionError, ProvisionResult, ReadError, ReadResult, WriterError, WriterResult};
pub use flush::{resolve_attempt, Attempt, FlushController, Step};
pub use group::LogGroup;
pub use observer::{NoopObserver, TracingObserver, WriterObserver};
pub use reader::{LogPage, LogReader};
pub use scheduler::FlushScheduler;
pub use writer::{IoWriter, StreamWriter, WriterState};
