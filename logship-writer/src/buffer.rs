//! Event batching.
//!
//! `EventBuffer` turns written bytes into one `LogEvent` per line and holds
//! them until a flush drains the buffer. It is the only state `write`
//! touches, so writes never wait on network I/O.
//!
//! Framing is best effort: the `\n` terminator (and a preceding `\r`) is
//! stripped, a trailing partial line becomes its own event, and empty lines
//! are dropped. Lines are never reassembled across calls.

use std::sync::{Arc, Mutex, MutexGuard};

use logship_domain::{Clock, LogEvent, SystemClock};

use crate::error::{WriterError, WriterResult};

#[derive(Debug, Default)]
struct BufferInner {
    events: Vec<LogEvent>,
    /// Highest timestamp handed out so far
    last_timestamp: i64,
    /// Set by close; later writes are refused
    sealed: bool,
}

/// Thread-safe buffer of pending log events.
pub struct EventBuffer {
    inner: Mutex<BufferInner>,
    clock: Arc<dyn Clock>,
}

impl EventBuffer {
    /// Buffer stamping events with the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Buffer stamping events with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(BufferInner::default()),
            clock,
        }
    }

    /// Record one event per line of `bytes`.
    ///
    /// Returns the number of bytes consumed, which is always `bytes.len()`.
    /// All lines of one call are added under a single lock acquisition, so
    /// they stay contiguous even with concurrent writers. Timestamps never
    /// go backwards, even if the clock does.
    ///
    /// # Errors
    /// `WriterError::ClosedStream` once the buffer has been sealed.
    pub fn write(&self, bytes: &[u8]) -> WriterResult<usize> {
        let now = self.clock.now_millis();
        let mut inner = self.lock();
        if inner.sealed {
            return Err(WriterError::ClosedStream);
        }

        let timestamp = now.max(inner.last_timestamp);
        inner.last_timestamp = timestamp;

        for line in split_lines(bytes) {
            inner.events.push(LogEvent::from_line(line, timestamp));
        }

        Ok(bytes.len())
    }

    /// Remove and return everything buffered, oldest first.
    pub fn drain(&self) -> Vec<LogEvent> {
        std::mem::take(&mut self.lock().events)
    }

    /// Refuse all further writes. Events already buffered stay drainable.
    pub fn seal(&self) {
        self.lock().sealed = true;
    }

    /// Whether `seal` has been called
    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// True if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BufferInner> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-empty lines of `bytes` with their terminators stripped.
fn split_lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
}

// =============================================================================
// Tests
// =============================================================================
