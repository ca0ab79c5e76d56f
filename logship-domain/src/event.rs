//! Log events
//!
//! A `LogEvent` is one line of output plus the wall-clock time it was
//! written. Events serialize directly into the service's `InputLogEvent`
//! shape.

use serde::{Deserialize, Serialize};

use crate::limits::{MAX_EVENT_MESSAGE_BYTES, PER_EVENT_OVERHEAD_BYTES};

/// One log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Line content, without its terminator
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl LogEvent {
    /// Create an event. Messages longer than `MAX_EVENT_MESSAGE_BYTES` are
    /// truncated at the last character boundary that fits.
    pub fn new(message: impl Into<String>, timestamp: i64) -> Self {
        let mut message = message.into();
        truncate_to_boundary(&mut message, MAX_EVENT_MESSAGE_BYTES);
        Self { message, timestamp }
    }

    /// Build an event from raw line bytes. Invalid UTF-8 is replaced with
    /// U+FFFD before truncation.
    pub fn from_line(line: &[u8], timestamp: i64) -> Self {
        Self::new(String::from_utf8_lossy(line).into_owned(), timestamp)
    }

    /// Size counted against the batch payload limit
    pub fn size(&self) -> usize {
        self.message.len() + PER_EVENT_OVERHEAD_BYTES
    }
}

fn truncate_to_boundary(message: &mut String, max_bytes: usize) {
    if message.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message.truncate(cut);
}
