//! Log service port definitions.
//!
//! Ports define the capabilities logship needs from the remote log service.
//! Adapters implement them for a concrete transport (CloudWatch Logs over
//! HTTP, in-memory stub).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use logship_domain::{LogEvent, SequenceToken, StreamIdentity};

use crate::error::ClientResult;

// =============================================================================
// Stream Port (append side)
// =============================================================================

/// Port for the write side of a log stream.
///
/// Exactly the three operations a stream writer needs.
#[async_trait]
pub trait LogStreamPort: Send + Sync {
    /// Append an ordered batch of events.
    ///
    /// `token` must be the stream's current sequence token (`None` for a
    /// stream that has never been written). Implementations do not retry.
    async fn put_log_events(
        &self,
        stream: &StreamIdentity,
        events: &[LogEvent],
        token: Option<&SequenceToken>,
    ) -> ClientResult<PutLogEventsOutput>;

    /// Create the stream inside its group.
    ///
    /// Returns `ClientError::ResourceAlreadyExists` if it already exists.
    async fn create_log_stream(&self, stream: &StreamIdentity) -> ClientResult<()>;

    /// Look up the stream's current upload sequence token.
    ///
    /// `Ok(None)` if the stream exists but has no token yet, or if no stream
    /// with exactly this name was found.
    async fn describe_stream(&self, stream: &StreamIdentity)
        -> ClientResult<Option<SequenceToken>>;
}

/// Successful append result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutLogEventsOutput {
    /// Token to send with the next append
    pub next_sequence_token: Option<SequenceToken>,
    /// Present if the service dropped some events of the batch
    pub rejected: Option<RejectedLogEventsInfo>,
}

/// Indices of events the service refused to store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLogEventsInfo {
    /// First index of events with timestamps too far in the future
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub too_new_log_event_start_index: Option<i64>,
    /// Last index of events older than the retention window allows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub too_old_log_event_end_index: Option<i64>,
    /// Last index of events that already expired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_log_event_end_index: Option<i64>,
}

impl RejectedLogEventsInfo {
    /// True if any index is set
    pub fn any(&self) -> bool {
        self.too_new_log_event_start_index.is_some()
            || self.too_old_log_event_end_index.is_some()
            || self.expired_log_event_end_index.is_some()
    }
}

// =============================================================================
// Group Port (provisioning)
// =============================================================================

/// Port for log group provisioning.
#[async_trait]
pub trait LogGroupPort: Send + Sync {
    /// Names of groups starting with `prefix`
    async fn describe_log_groups(&self, prefix: &str) -> ClientResult<Vec<String>>;

    /// Create a group. Returns `ClientError::ResourceAlreadyExists` if it
    /// already exists.
    async fn create_log_group(&self, group: &str) -> ClientResult<()>;
}

// =============================================================================
// Read Port
// =============================================================================

/// Port for reading a stream from its head.
#[async_trait]
pub trait LogReadPort: Send + Sync {
    /// Fetch one page. `page_token` is the `next_forward_token` of the
    /// previous page, or `None` for the first page.
    async fn get_log_events(
        &self,
        stream: &StreamIdentity,
        page_token: Option<&str>,
    ) -> ClientResult<LogEventsPage>;
}

/// A stored event as returned by the read API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputLogEvent {
    /// Event message
    pub message: String,
    /// Event time, ms since epoch
    pub timestamp: i64,
    /// Time the service ingested the event, ms since epoch
    #[serde(default)]
    pub ingestion_time: i64,
}

/// One page of read results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventsPage {
    /// Events in this page, oldest first
    #[serde(default)]
    pub events: Vec<OutputLogEvent>,
    /// Token for the next page; repeats when the end is reached
    #[serde(default)]
    pub next_forward_token: Option<String>,
    /// Token for the previous page
    #[serde(default)]
    pub next_backward_token: Option<String>,
}

// =============================================================================
// Combined Service
// =============================================================================

/// Everything a log group needs: append, provisioning and read capabilities.
pub trait LogService: LogStreamPort + LogGroupPort + LogReadPort {}

impl<T: LogStreamPort + LogGroupPort + LogReadPort> LogService for T {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_info_deserialization() {
        let info: RejectedLogEventsInfo =
            serde_json::from_str(r#"{"tooOldLogEventEndIndex": 3}"#).unwrap();

        assert!(info.any());
        assert_eq!(info.too_old_log_event_end_index, Some(3));
        assert_eq!(info.too_new_log_event_start_index, None);
        assert!(!RejectedLogEventsInfo::default().any());
    }

    #[test]
    fn test_log_events_page_deserialization() {
        let page: LogEventsPage = serde_json::from_str(
            r#"{
                "events": [{"timestamp": 1, "message": "hi", "ingestionTime": 2}],
                "nextForwardToken": "f/1",
                "nextBackwardToken": "b/0"
            }"#,
        )
        .unwrap();

        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].message, "hi");
        assert_eq!(page.next_forward_token.as_deref(), Some("f/1"));
    }
}
