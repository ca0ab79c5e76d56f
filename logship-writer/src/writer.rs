//! Stream writer: the public write/flush/close surface.

use std::io;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use logship_connectors::LogStreamPort;
use logship_domain::{SequenceToken, StreamIdentity};

use crate::append::AppendClient;
use crate::buffer::EventBuffer;
use crate::config::WriterOptions;
use crate::error::{WriterError, WriterResult};
use crate::flush::FlushController;
use crate::scheduler::FlushScheduler;

/// Lifecycle of a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting writes
    Open,
    /// Closed by the caller
    Closed,
    /// An append failed; every later call returns this error
    Failed(WriterError),
}

/// Buffered writer for one remote log stream.
///
/// `write` only touches the in-memory buffer. Events reach the service on
/// the background flush interval, on `flush`, and on `close`. Dropping a
/// writer without `close` stops its flush loop and discards what is still
/// buffered.
pub struct StreamWriter {
    identity: StreamIdentity,
    buffer: Arc<EventBuffer>,
    controller: Arc<FlushController>,
    scheduler: Mutex<Option<FlushScheduler>>,
}

impl StreamWriter {
    /// Start a writer for `identity` and its background flush loop.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        identity: StreamIdentity,
        port: Arc<dyn LogStreamPort>,
        options: WriterOptions,
    ) -> Self {
        let buffer = Arc::new(EventBuffer::with_clock(options.clock.clone()));
        let controller = Arc::new(FlushController::new(
            AppendClient::new(port, identity.clone()),
            buffer.clone(),
            options.observer.clone(),
        ));
        let scheduler = FlushScheduler::spawn(controller.clone(), options.flush_every);

        info!(
            stream = %identity,
            flush_every_ms = options.flush_every.as_millis() as u64,
            "Stream writer started"
        );

        Self {
            identity,
            buffer,
            controller,
            scheduler: Mutex::new(Some(scheduler)),
        }
    }

    /// Buffer `bytes` as one event per line.
    ///
    /// Returns `bytes.len()`. Never performs network I/O.
    ///
    /// # Errors
    /// - `ClosedStream` after close
    /// - the stored error once the writer has failed
    pub fn write(&self, bytes: &[u8]) -> WriterResult<usize> {
        match self.controller.state() {
            WriterState::Open => self.buffer.write(bytes),
            WriterState::Closed => Err(WriterError::ClosedStream),
            WriterState::Failed(error) => Err(error),
        }
    }

    /// Send everything buffered now. Waits for an in-flight flush first.
    pub async fn flush(&self) -> WriterResult<()> {
        self.controller.flush().await
    }

    /// Stop the flush loop, send what is left and close.
    ///
    /// See `FlushController::close` for the outcome rules.
    pub async fn close(&self) -> WriterResult<()> {
        // Seal before stopping the loop so no write slips in behind the
        // final drain.
        self.buffer.seal();
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.stop().await;
        }
        self.controller.close().await
    }

    /// Current state
    pub fn state(&self) -> WriterState {
        self.controller.state()
    }

    /// Target stream
    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    /// Token the next append will carry
    pub async fn sequence_token(&self) -> Option<SequenceToken> {
        self.controller.sequence_token().await
    }

    /// `std::io::Write` adapter over this writer.
    pub fn io(&self) -> IoWriter<'_> {
        IoWriter { writer: self }
    }
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .finish()
    }
}

/// Blocking-free `std::io::Write` view of a `StreamWriter`.
///
/// `flush` does nothing: delivery stays with the background loop and
/// `StreamWriter::close`.
pub struct IoWriter<'a> {
    writer: &'a StreamWriter,
}

impl io::Write for IoWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf).map_err(|e| match e {
            WriterError::ClosedStream => io::Error::new(io::ErrorKind::BrokenPipe, e),
            other => io::Error::new(io::ErrorKind::Other, other),
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
