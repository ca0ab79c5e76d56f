//! Append client: one remote append per call, classified.
//!
//! No retries happen here. The flush controller decides what to do with
//! each `AppendOutcome`.

use std::sync::Arc;

use tracing::{debug, error};

use logship_connectors::{ClientError, ClientResult, LogStreamPort, RejectedLogEventsInfo};
use logship_domain::{
    LogEvent, SequenceToken, StreamIdentity, MAX_BATCH_BYTES, MAX_BATCH_EVENTS,
    MAX_BATCH_SPAN_MS,
};

/// Classified result of one append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Batch stored; send `next_token` with the next append
    Accepted { next_token: Option<SequenceToken> },
    /// Supplied token was not current; carries the token the service expects
    StaleToken(Option<SequenceToken>),
    /// Batch was already stored by an earlier ambiguous call; carries the
    /// token that append produced
    AlreadyAccepted(Option<SequenceToken>),
    /// Batch stored but some events were refused
    Rejected {
        next_token: Option<SequenceToken>,
        info: RejectedLogEventsInfo,
    },
    /// Anything else
    Failed(ClientError),
}

/// Appends batches to one stream.
pub struct AppendClient {
    port: Arc<dyn LogStreamPort>,
    stream: StreamIdentity,
}

impl AppendClient {
    /// Client for `stream` over `port`
    pub fn new(port: Arc<dyn LogStreamPort>, stream: StreamIdentity) -> Self {
        Self { port, stream }
    }

    /// Target stream
    pub fn stream(&self) -> &StreamIdentity {
        &self.stream
    }

    /// Submit one batch with `token`.
    ///
    /// Batches outside the service limits are refused locally with
    /// `InvalidParameterException` instead of being sent.
    pub async fn put_events(
        &self,
        events: &[LogEvent],
        token: Option<&SequenceToken>,
    ) -> AppendOutcome {
        if let Err(reason) = check_batch(events) {
            error!(stream = %self.stream, reason = %reason, "Refusing to send oversized batch");
            return AppendOutcome::Failed(ClientError::Api {
                code: "InvalidParameterException".to_string(),
                message: reason,
            });
        }

        let result = self.port.put_log_events(&self.stream, events, token).await;
        let outcome = classify(result);

        debug!(
            stream = %self.stream,
            events = events.len(),
            token = token.map(SequenceToken::as_str).unwrap_or("<none>"),
            outcome = ?outcome_kind(&outcome),
            "Append attempted"
        );

        outcome
    }

    /// The stream's current token, as reported by the service
    pub async fn current_token(&self) -> ClientResult<Option<SequenceToken>> {
        self.port.describe_stream(&self.stream).await
    }
}

/// Map a raw port result onto the outcome taxonomy.
pub fn classify(result: ClientResult<logship_connectors::PutLogEventsOutput>) -> AppendOutcome {
    match result {
        Ok(output) => match output.rejected {
            Some(info) if info.any() => AppendOutcome::Rejected {
                next_token: output.next_sequence_token,
                info,
            },
            _ => AppendOutcome::Accepted {
                next_token: output.next_sequence_token,
            },
        },
        Err(ClientError::InvalidSequenceToken { expected }) => AppendOutcome::StaleToken(expected),
        Err(ClientError::DataAlreadyAccepted { expected }) => {
            AppendOutcome::AlreadyAccepted(expected)
        }
        Err(other) => AppendOutcome::Failed(other),
    }
}

fn outcome_kind(outcome: &AppendOutcome) -> &'static str {
    match outcome {
        AppendOutcome::Accepted { .. } => "accepted",
        AppendOutcome::StaleToken(_) => "stale_token",
        AppendOutcome::AlreadyAccepted(_) => "already_accepted",
        AppendOutcome::Rejected { .. } => "rejected",
        AppendOutcome::Failed(_) => "failed",
    }
}

fn check_batch(events: &[LogEvent]) -> Result<(), String> {
    if events.len() > MAX_BATCH_EVENTS {
        return Err(format!("{} events exceeds {}", events.len(), MAX_BATCH_EVENTS));
    }
    let bytes: usize = events.iter().map(LogEvent::size).sum();
    if bytes > MAX_BATCH_BYTES {
        return Err(format!("{} bytes exceeds {}", bytes, MAX_BATCH_BYTES));
    }
    if let (Some(first), Some(last)) = (events.first(), events.last()) {
        if last.timestamp - first.timestamp > MAX_BATCH_SPAN_MS {
            return Err("batch spans more than 24 hours".to_string());
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use logship_connectors::{PutLogEventsOutput, StubLogService};

    fn stream() -> StreamIdentity {
        StreamIdentity::new("app", "web").unwrap()
    }

    fn token(value: &str) -> SequenceToken {
        SequenceToken::new(value).unwrap()
    }

    #[test]
    fn test_classify_success() {
        let outcome = classify(Ok(PutLogEventsOutput {
            next_sequence_token: Some(token("T1")),
            rejected: None,
        }));
        assert_eq!(outcome, AppendOutcome::Accepted { next_token: Some(token("T1")) });
    }

    #[test]
    fn test_classify_conflicts() {
        assert_eq!(
            classify(Err(ClientError::InvalidSequenceToken { expected: Some(token("T")) })),
            AppendOutcome::StaleToken(Some(token("T")))
        );
        assert_eq!(
            classify(Err(ClientError::DataAlreadyAccepted { expected: Some(token("U")) })),
            AppendOutcome::AlreadyAccepted(Some(token("U")))
        );
    }

    #[test]
    fn test_classify_rejected_and_other() {
        let info = RejectedLogEventsInfo {
            too_old_log_event_end_index: Some(0),
            ..Default::default()
        };
        assert_eq!(
            classify(Ok(PutLogEventsOutput {
                next_sequence_token: Some(token("T2")),
                rejected: Some(info.clone()),
            })),
            AppendOutcome::Rejected { next_token: Some(token("T2")), info }
        );
        assert_eq!(
            classify(Err(ClientError::Timeout)),
            AppendOutcome::Failed(ClientError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_put_events_against_stub() {
        let stub = Arc::new(StubLogService::with_stream(&stream()));
        let client = AppendClient::new(stub.clone(), stream());

        let outcome = client.put_events(&[LogEvent::new("hello", 1)], None).await;

        assert!(matches!(outcome, AppendOutcome::Accepted { next_token: Some(_) }));
        assert_eq!(stub.stored_messages(&stream()), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_not_sent() {
        let stub = Arc::new(StubLogService::with_stream(&stream()));
        let client = AppendClient::new(stub.clone(), stream());
        let events: Vec<LogEvent> =
            (0..MAX_BATCH_EVENTS + 1).map(|i| LogEvent::new("x", i as i64)).collect();

        let outcome = client.put_events(&events, None).await;

        assert!(matches!(outcome, AppendOutcome::Failed(ClientError::Api { .. })));
        assert_eq!(stub.put_count(), 0);
    }
}
