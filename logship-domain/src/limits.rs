//! Service limits and batch packing.
//!
//! Values follow the PutLogEvents and GetLogEvents quotas of the log
//! service. A drained buffer is split into batches that each stay inside
//! these limits; event order is preserved across batches.

use std::time::Duration;

use crate::event::LogEvent;

/// Bytes the service adds to every event when sizing a batch
pub const PER_EVENT_OVERHEAD_BYTES: usize = 26;

/// Maximum batch payload, counting message bytes plus overhead per event
pub const MAX_BATCH_BYTES: usize = 1_048_576;

/// Maximum number of events in one PutLogEvents call
pub const MAX_BATCH_EVENTS: usize = 10_000;

/// Maximum message length of a single event
pub const MAX_EVENT_MESSAGE_BYTES: usize = 262_144 - PER_EVENT_OVERHEAD_BYTES;

/// A batch may not span more than 24 hours of timestamps
pub const MAX_BATCH_SPAN_MS: i64 = 24 * 60 * 60 * 1000;

/// PutLogEvents is limited to 5 requests/second per stream, so flushing more
/// often than every few seconds buys nothing.
pub const DEFAULT_FLUSH_EVERY: Duration = Duration::from_secs(5);

/// GetLogEvents is limited to 10 requests/second.
pub const READ_THROTTLE: Duration = Duration::from_millis(100);

/// Split `events` into ordered batches that respect the count, byte and time
/// span limits. Never returns an empty batch.
pub fn pack_batches(events: Vec<LogEvent>) -> Vec<Vec<LogEvent>> {
    let mut batches = Vec::new();
    let mut current: Vec<LogEvent> = Vec::new();
    let mut current_bytes = 0usize;

    for event in events {
        let size = event.size();
        let span_exceeded = current
            .first()
            .map(|first| event.timestamp - first.timestamp > MAX_BATCH_SPAN_MS)
            .unwrap_or(false);

        if !current.is_empty()
            && (current.len() == MAX_BATCH_EVENTS
                || current_bytes + size > MAX_BATCH_BYTES
                || span_exceeded)
        {
            batches.push(std::mem::take(&mut current));
            current_bytes = 0;
        }

        current_bytes += size;
        current.push(event);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(count: usize, message_len: usize) -> Vec<LogEvent> {
        (0..count)
            .map(|i| LogEvent::new("m".repeat(message_len), i as i64))
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        assert!(pack_batches(Vec::new()).is_empty());
    }

    #[test]
    fn test_small_input_is_one_batch() {
        let batches = pack_batches(events(3, 10));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn test_splits_on_event_count() {
        let batches = pack_batches(events(MAX_BATCH_EVENTS + 1, 1));

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), MAX_BATCH_EVENTS);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1][0].timestamp, MAX_BATCH_EVENTS as i64);
    }

    #[test]
    fn test_splits_on_payload_bytes() {
        // Five events of ~256 KiB each cannot share one 1 MiB batch.
        let batches = pack_batches(events(5, MAX_EVENT_MESSAGE_BYTES));

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 4);
        for batch in &batches {
            let bytes: usize = batch.iter().map(LogEvent::size).sum();
            assert!(bytes <= MAX_BATCH_BYTES);
        }
    }

    #[test]
    fn test_splits_on_time_span() {
        let input = vec![
            LogEvent::new("a", 0),
            LogEvent::new("b", MAX_BATCH_SPAN_MS),
            LogEvent::new("c", MAX_BATCH_SPAN_MS + 1),
        ];

        let batches = pack_batches(input);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1][0].message, "c");
    }

    #[test]
    fn test_order_is_preserved() {
        let input = events(25_000, 0);
        let flattened: Vec<i64> = pack_batches(input)
            .into_iter()
            .flatten()
            .map(|e| e.timestamp)
            .collect();

        assert_eq!(flattened, (0..25_000).collect::<Vec<i64>>());
    }
}
