//! Flush notifications.
//!
//! The flush controller reports what happened to each batch through a
//! `WriterObserver`. Errors are still returned to callers; the observer only
//! sees them too.

use tracing::{debug, error, warn};

use logship_connectors::ClientError;
use logship_domain::{SequenceToken, StreamIdentity};

use crate::error::WriterError;

/// Receives flush and conflict notifications from a stream writer.
///
/// All methods default to doing nothing.
pub trait WriterObserver: Send + Sync {
    /// A batch was stored and the token advanced
    fn on_flushed(
        &self,
        _stream: &StreamIdentity,
        _events: usize,
        _next_token: Option<&SequenceToken>,
    ) {
    }

    /// The held token was stale; the batch is retried once with `expected`
    fn on_stale_token(&self, _stream: &StreamIdentity, _expected: Option<&SequenceToken>) {}

    /// The service already had this batch; `token` was adopted
    fn on_already_accepted(&self, _stream: &StreamIdentity, _token: Option<&SequenceToken>) {}

    /// The initial token lookup failed; the flush continues without a token
    fn on_token_lookup_failed(&self, _stream: &StreamIdentity, _error: &ClientError) {}

    /// A flush failed and the writer is now failed
    fn on_flush_failed(&self, _stream: &StreamIdentity, _error: &WriterError) {}
}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl WriterObserver for TracingObserver {
    fn on_flushed(&self, stream: &StreamIdentity, events: usize, next_token: Option<&SequenceToken>) {
        debug!(
            stream = %stream,
            events = events,
            next_token = next_token.map(SequenceToken::as_str).unwrap_or("<none>"),
            "Batch flushed"
        );
    }

    fn on_stale_token(&self, stream: &StreamIdentity, expected: Option<&SequenceToken>) {
        warn!(
            stream = %stream,
            expected = expected.map(SequenceToken::as_str).unwrap_or("<none>"),
            "Stale sequence token, retrying once"
        );
    }

    fn on_already_accepted(&self, stream: &StreamIdentity, token: Option<&SequenceToken>) {
        warn!(
            stream = %stream,
            token = token.map(SequenceToken::as_str).unwrap_or("<none>"),
            "Batch was already accepted, adopting token"
        );
    }

    fn on_token_lookup_failed(&self, stream: &StreamIdentity, error: &ClientError) {
        warn!(stream = %stream, error = %error, "Sequence token lookup failed");
    }

    fn on_flush_failed(&self, stream: &StreamIdentity, error: &WriterError) {
        error!(stream = %stream, error = %error, "Flush failed, writer is now failed");
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl WriterObserver for NoopObserver {}
