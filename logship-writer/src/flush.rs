//! Flush controller: the sequence-token protocol.
//!
//! The controller owns the stream's sequence token. A flush drains the
//! buffer, packs the events into batches and appends them in order, each
//! with the current token. Two conflicts are recovered here:
//!
//! - **Stale token**: retried exactly once with the token the service
//!   reported.
//! - **Already accepted**: the reported token is adopted and the batch is
//!   not resent.
//!
//! Anything else fails the writer. The flush lock is held for the whole
//! flush, so scheduled flushes, explicit flushes and close never interleave.

use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, info};

use logship_domain::{pack_batches, LogEvent, SequenceToken, StreamIdentity};

use crate::append::{AppendClient, AppendOutcome};
use crate::buffer::EventBuffer;
use crate::error::{WriterError, WriterResult};
use crate::observer::WriterObserver;
use crate::writer::WriterState;

// =============================================================================
// Attempt Resolution
// =============================================================================

/// Which append of a batch is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// First append, with the held token
    First,
    /// The single retry, with the token a stale-token conflict reported
    Retry(Option<SequenceToken>),
}

/// What to do after an append outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Batch stored; hold this token
    Commit(Option<SequenceToken>),
    /// Batch was stored earlier; hold this token
    Adopt(Option<SequenceToken>),
    /// Append again with this token
    Retry(Option<SequenceToken>),
    /// Batch stored with rejections; hold this token, then fail
    CommitThenFail(Option<SequenceToken>, WriterError),
    /// Fail the writer
    Fail(WriterError),
}

/// Decide the next step for `outcome` of `attempt`.
///
/// A stale token on the retry is not retried again.
pub fn resolve_attempt(attempt: &Attempt, outcome: AppendOutcome) -> Step {
    match outcome {
        AppendOutcome::Accepted { next_token } => Step::Commit(next_token),
        AppendOutcome::AlreadyAccepted(token) => Step::Adopt(token),
        AppendOutcome::StaleToken(expected) => match attempt {
            Attempt::First => Step::Retry(expected),
            Attempt::Retry(_) => Step::Fail(WriterError::Transport(
                logship_connectors::ClientError::InvalidSequenceToken { expected },
            )),
        },
        AppendOutcome::Rejected { next_token, info } => {
            Step::CommitThenFail(next_token, WriterError::BatchRejected { info })
        }
        AppendOutcome::Failed(error) => Step::Fail(WriterError::Transport(error)),
    }
}

// =============================================================================
// Flush Controller
// =============================================================================

/// Token state, guarded by the flush lock.
#[derive(Debug, Default)]
struct FlushState {
    token: Option<SequenceToken>,
    /// Set once the initial token lookup has been made
    token_resolved: bool,
}

/// Drains the buffer and appends it under the sequence-token protocol.
pub struct FlushController {
    client: AppendClient,
    buffer: Arc<EventBuffer>,
    flush_state: Mutex<FlushState>,
    writer_state: RwLock<WriterState>,
    observer: Arc<dyn WriterObserver>,
}

impl FlushController {
    /// Controller flushing `buffer` through `client`.
    pub fn new(
        client: AppendClient,
        buffer: Arc<EventBuffer>,
        observer: Arc<dyn WriterObserver>,
    ) -> Self {
        Self {
            client,
            buffer,
            flush_state: Mutex::new(FlushState::default()),
            writer_state: RwLock::new(WriterState::Open),
            observer,
        }
    }

    /// Target stream
    pub fn stream(&self) -> &StreamIdentity {
        self.client.stream()
    }

    /// Current writer state
    pub fn state(&self) -> WriterState {
        self.writer_state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Token the next append will carry. Waits for an in-flight flush.
    pub async fn sequence_token(&self) -> Option<SequenceToken> {
        self.flush_state.lock().await.token.clone()
    }

    /// Drain the buffer and append everything it held.
    ///
    /// # Errors
    /// - `ClosedStream` after close
    /// - the stored error if the writer already failed
    /// - the error that failed this flush; the writer is failed afterwards
    pub async fn flush(&self) -> WriterResult<()> {
        let mut flush_state = self.flush_state.lock().await;
        match self.state() {
            WriterState::Open => self.flush_locked(&mut flush_state).await,
            WriterState::Closed => Err(WriterError::ClosedStream),
            WriterState::Failed(error) => Err(error),
        }
    }

    /// Refuse further writes, run the final flush and mark the writer
    /// closed.
    ///
    /// Waits behind an in-flight flush. The writer ends `Closed` even if the
    /// final flush fails; that error is returned. Closing again is a no-op.
    /// A failed writer stays failed and returns its stored error.
    pub async fn close(&self) -> WriterResult<()> {
        self.buffer.seal();
        let mut flush_state = self.flush_state.lock().await;

        match self.state() {
            WriterState::Closed => return Ok(()),
            WriterState::Failed(error) => return Err(error),
            WriterState::Open => {}
        }

        let result = self.flush_locked(&mut flush_state).await;
        self.set_state(WriterState::Closed);
        info!(stream = %self.stream(), ok = result.is_ok(), "Stream writer closed");
        result
    }

    async fn flush_locked(&self, flush_state: &mut FlushState) -> WriterResult<()> {
        let events = self.buffer.drain();
        if events.is_empty() {
            return Ok(());
        }

        if flush_state.token.is_none() && !flush_state.token_resolved {
            match self.client.current_token().await {
                Ok(token) => flush_state.token = token,
                Err(error) => self.observer.on_token_lookup_failed(self.stream(), &error),
            }
            flush_state.token_resolved = true;
        }

        let total = events.len();
        for batch in pack_batches(events) {
            if let Err(error) = self.append_batch(flush_state, &batch).await {
                // Unsent batches of this drain are dropped with the writer.
                self.set_state(WriterState::Failed(error.clone()));
                self.observer.on_flush_failed(self.stream(), &error);
                return Err(error);
            }
        }

        debug!(stream = %self.stream(), events = total, "Flush complete");
        Ok(())
    }

    async fn append_batch(
        &self,
        flush_state: &mut FlushState,
        batch: &[LogEvent],
    ) -> WriterResult<()> {
        let mut attempt = Attempt::First;
        loop {
            let token = match &attempt {
                Attempt::First => flush_state.token.clone(),
                Attempt::Retry(token) => token.clone(),
            };
            let outcome = self.client.put_events(batch, token.as_ref()).await;

            match resolve_attempt(&attempt, outcome) {
                Step::Commit(next) => {
                    self.observer.on_flushed(self.stream(), batch.len(), next.as_ref());
                    flush_state.token = next;
                    return Ok(());
                }
                Step::Adopt(token) => {
                    self.observer.on_already_accepted(self.stream(), token.as_ref());
                    flush_state.token = token;
                    return Ok(());
                }
                Step::Retry(expected) => {
                    self.observer.on_stale_token(self.stream(), expected.as_ref());
                    attempt = Attempt::Retry(expected);
                }
                Step::CommitThenFail(next, error) => {
                    flush_state.token = next;
                    return Err(error);
                }
                Step::Fail(error) => return Err(error),
            }
        }
    }

    fn set_state(&self, state: WriterState) {
        *self.writer_state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

// =============================================================================
// Tests
// =============================================================================
