//! Stub implementation for testing.
//!
//! `StubLogService` simulates the log service in memory: it enforces
//! sequence tokens the way the real service does, records every append
//! call, and lets tests script failures for the next calls.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use logship_domain::{LogEvent, SequenceToken, StreamIdentity};

use crate::error::{ClientError, ClientResult};
use crate::ports::{
    LogEventsPage, LogGroupPort, LogReadPort, LogStreamPort, OutputLogEvent, PutLogEventsOutput,
    RejectedLogEventsInfo,
};

// =============================================================================
// Stub Log Service
// =============================================================================

/// Scripted result for the next `put_log_events` call.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    /// Fail without storing anything
    Fail(ClientError),
    /// Store the batch, advance the token, and report rejected indices
    Reject(RejectedLogEventsInfo),
}

/// One recorded `put_log_events` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCall {
    /// Target stream
    pub stream: StreamIdentity,
    /// Events as submitted
    pub events: Vec<LogEvent>,
    /// Token as submitted
    pub token: Option<SequenceToken>,
}

#[derive(Debug, Default)]
struct StubStream {
    events: Vec<OutputLogEvent>,
    token: Option<SequenceToken>,
}

#[derive(Debug, Default)]
struct StubState {
    groups: BTreeSet<String>,
    streams: HashMap<StreamIdentity, StubStream>,
    put_calls: Vec<PutCall>,
    put_outcomes: VecDeque<StubOutcome>,
    describe_failures: VecDeque<ClientError>,
    describe_calls: usize,
    read_calls: usize,
    token_counter: u64,
}

/// In-memory log service.
pub struct StubLogService {
    state: Mutex<StubState>,
    /// Artificial latency for `put_log_events`
    put_delay: Mutex<Option<Duration>>,
    /// Events per page returned by `get_log_events`
    page_size: usize,
}

impl StubLogService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState::default()),
            put_delay: Mutex::new(None),
            page_size: 100,
        }
    }

    /// Create a service whose reads return at most `page_size` events.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::new()
        }
    }

    /// Create a service that already holds `stream` (and its group).
    pub fn with_stream(stream: &StreamIdentity) -> Self {
        let stub = Self::new();
        stub.add_stream(stream);
        stub
    }

    /// Register a group and stream without going through the ports.
    pub fn add_stream(&self, stream: &StreamIdentity) {
        let mut state = self.lock();
        state.groups.insert(stream.group_name().to_string());
        state.streams.entry(stream.clone()).or_default();
    }

    /// Register a group without going through the ports.
    pub fn add_group(&self, group: &str) {
        self.lock().groups.insert(group.to_string());
    }

    /// Queue an outcome for the next append call.
    pub fn push_put_outcome(&self, outcome: StubOutcome) {
        self.lock().put_outcomes.push_back(outcome);
    }

    /// Queue a failure for the next append call.
    pub fn fail_next_put(&self, error: ClientError) {
        self.push_put_outcome(StubOutcome::Fail(error));
    }

    /// Queue a failure for the next token lookup.
    pub fn fail_next_describe(&self, error: ClientError) {
        self.lock().describe_failures.push_back(error);
    }

    /// Make every append wait before completing.
    pub fn set_put_delay(&self, delay: Option<Duration>) {
        *self.put_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Overwrite the stream's current token, as another writer would.
    pub fn set_token(&self, stream: &StreamIdentity, token: Option<SequenceToken>) {
        self.lock().streams.entry(stream.clone()).or_default().token = token;
    }

    /// The stream's current token
    pub fn current_token(&self, stream: &StreamIdentity) -> Option<SequenceToken> {
        self.lock().streams.get(stream).and_then(|s| s.token.clone())
    }

    /// Messages stored in the stream, in order
    pub fn stored_messages(&self, stream: &StreamIdentity) -> Vec<String> {
        self.lock()
            .streams
            .get(stream)
            .map(|s| s.events.iter().map(|e| e.message.clone()).collect())
            .unwrap_or_default()
    }

    /// Every append call so far
    pub fn put_calls(&self) -> Vec<PutCall> {
        self.lock().put_calls.clone()
    }

    /// Number of append calls so far
    pub fn put_count(&self) -> usize {
        self.lock().put_calls.len()
    }

    /// Number of token lookups so far
    pub fn describe_count(&self) -> usize {
        self.lock().describe_calls
    }

    /// Number of read calls so far
    pub fn read_count(&self) -> usize {
        self.lock().read_calls
    }

    /// Whether a group exists
    pub fn has_group(&self, group: &str) -> bool {
        self.lock().groups.contains(group)
    }

    /// Whether a stream exists
    pub fn has_stream(&self, stream: &StreamIdentity) -> bool {
        self.lock().streams.contains_key(stream)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StubState {
    fn next_token(&mut self) -> SequenceToken {
        self.token_counter += 1;
        SequenceToken::new(format!("{:020}", self.token_counter))
            .unwrap_or_else(|_| unreachable!("formatted token is never blank"))
    }
}

impl Default for StubLogService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStreamPort for StubLogService {
    async fn put_log_events(
        &self,
        stream: &StreamIdentity,
        events: &[LogEvent],
        token: Option<&SequenceToken>,
    ) -> ClientResult<PutLogEventsOutput> {
        let delay = *self.put_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.put_calls.push(PutCall {
            stream: stream.clone(),
            events: events.to_vec(),
            token: token.cloned(),
        });

        let rejected = match state.put_outcomes.pop_front() {
            Some(StubOutcome::Fail(err)) => return Err(err),
            Some(StubOutcome::Reject(info)) => Some(info),
            None => None,
        };

        let expected = match state.streams.get(stream) {
            Some(s) => s.token.clone(),
            None => return Err(ClientError::ResourceNotFound(format!("{}", stream))),
        };
        if expected.as_ref() != token {
            return Err(ClientError::InvalidSequenceToken { expected });
        }

        let next = state.next_token();
        if let Some(s) = state.streams.get_mut(stream) {
            s.events.extend(events.iter().map(|e| OutputLogEvent {
                message: e.message.clone(),
                timestamp: e.timestamp,
                ingestion_time: e.timestamp,
            }));
            s.token = Some(next.clone());
        }

        tracing::debug!(stream = %stream, events = events.len(), "Stub: events stored");

        Ok(PutLogEventsOutput {
            next_sequence_token: Some(next),
            rejected,
        })
    }

    async fn create_log_stream(&self, stream: &StreamIdentity) -> ClientResult<()> {
        let mut state = self.lock();
        if !state.groups.contains(stream.group_name()) {
            return Err(ClientError::ResourceNotFound(format!(
                "The specified log group does not exist: {}",
                stream.group_name()
            )));
        }
        if state.streams.contains_key(stream) {
            return Err(ClientError::ResourceAlreadyExists(format!(
                "The specified log stream already exists: {}",
                stream
            )));
        }
        state.streams.insert(stream.clone(), StubStream::default());
        Ok(())
    }

    async fn describe_stream(
        &self,
        stream: &StreamIdentity,
    ) -> ClientResult<Option<SequenceToken>> {
        let mut state = self.lock();
        state.describe_calls += 1;
        if let Some(err) = state.describe_failures.pop_front() {
            return Err(err);
        }
        Ok(state.streams.get(stream).and_then(|s| s.token.clone()))
    }
}

#[async_trait]
impl LogGroupPort for StubLogService {
    async fn describe_log_groups(&self, prefix: &str) -> ClientResult<Vec<String>> {
        Ok(self
            .lock()
            .groups
            .iter()
            .filter(|g| g.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn create_log_group(&self, group: &str) -> ClientResult<()> {
        let mut state = self.lock();
        if !state.groups.insert(group.to_string()) {
            return Err(ClientError::ResourceAlreadyExists(format!(
                "The specified log group already exists: {}",
                group
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LogReadPort for StubLogService {
    async fn get_log_events(
        &self,
        stream: &StreamIdentity,
        page_token: Option<&str>,
    ) -> ClientResult<LogEventsPage> {
        let mut state = self.lock();
        state.read_calls += 1;

        let stored = state
            .streams
            .get(stream)
            .ok_or_else(|| ClientError::ResourceNotFound(format!("{}", stream)))?;

        let start = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("f/")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ClientError::Api {
                    code: "InvalidParameterException".to_string(),
                    message: format!("The specified nextToken is invalid: {}", token),
                })?,
        };
        let start = start.min(stored.events.len());
        let end = (start + self.page_size).min(stored.events.len());

        Ok(LogEventsPage {
            events: stored.events[start..end].to_vec(),
            next_forward_token: Some(format!("f/{}", end)),
            next_backward_token: Some(format!("b/{}", start)),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> StreamIdentity {
        StreamIdentity::new("app", "web").unwrap()
    }

    #[tokio::test]
    async fn test_stub_enforces_sequence_tokens() {
        let stub = StubLogService::with_stream(&stream());

        let first = stub
            .put_log_events(&stream(), &[LogEvent::new("a", 1)], None)
            .await
            .unwrap();
        let token = first.next_sequence_token.unwrap();

        // Replaying with no token is stale and reports the current one.
        let err = stub
            .put_log_events(&stream(), &[LogEvent::new("b", 2)], None)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::InvalidSequenceToken { expected: Some(token.clone()) });

        stub.put_log_events(&stream(), &[LogEvent::new("b", 2)], Some(&token))
            .await
            .unwrap();

        assert_eq!(stub.stored_messages(&stream()), vec!["a", "b"]);
        assert_eq!(stub.put_count(), 3);
    }

    #[tokio::test]
    async fn test_stub_scripted_failure() {
        let stub = StubLogService::with_stream(&stream());
        stub.fail_next_put(ClientError::Throttled("slow down".to_string()));

        let result = stub.put_log_events(&stream(), &[LogEvent::new("a", 1)], None).await;
        assert!(matches!(result, Err(ClientError::Throttled(_))));

        // Next call should succeed
        let result = stub.put_log_events(&stream(), &[LogEvent::new("a", 1)], None).await;
        assert!(result.is_ok());
        assert_eq!(stub.stored_messages(&stream()), vec!["a"]);
    }

    #[tokio::test]
    async fn test_stub_create_stream_requires_group() {
        let stub = StubLogService::new();

        let err = stub.create_log_stream(&stream()).await.unwrap_err();
        assert!(matches!(err, ClientError::ResourceNotFound(_)));

        stub.create_log_group("app").await.unwrap();
        stub.create_log_stream(&stream()).await.unwrap();
        assert!(stub.create_log_stream(&stream()).await.unwrap_err().is_already_exists());
        assert!(stub.create_log_group("app").await.unwrap_err().is_already_exists());
    }

    #[tokio::test]
    async fn test_stub_paginates_reads() {
        let stub = StubLogService::with_page_size(2);
        stub.add_stream(&stream());
        let events: Vec<LogEvent> = (0..3).map(|i| LogEvent::new(format!("m{}", i), i)).collect();
        stub.put_log_events(&stream(), &events, None).await.unwrap();

        let first = stub.get_log_events(&stream(), None).await.unwrap();
        assert_eq!(first.events.len(), 2);

        let token = first.next_forward_token.unwrap();
        let second = stub.get_log_events(&stream(), Some(&token)).await.unwrap();
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.events[0].message, "m2");

        let end_token = second.next_forward_token.unwrap();
        let third = stub.get_log_events(&stream(), Some(&end_token)).await.unwrap();
        assert!(third.events.is_empty());
        assert_eq!(third.next_forward_token.as_deref(), Some(end_token.as_str()));
    }
}
