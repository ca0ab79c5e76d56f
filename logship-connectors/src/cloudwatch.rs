//! CloudWatch Logs HTTP adapter
//!
//! Speaks the AWS JSON 1.1 protocol directly:
//! - every operation is a `POST /` with an `X-Amz-Target` header
//! - bodies are camelCase JSON
//! - requests are signed with Signature Version 4 (`sigv4`)
//!
//! Errors come back as `{"__type": "...Exception", "message": "..."}` and
//! are classified by `ClientError::from_api`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

use logship_domain::{LogEvent, SequenceToken, StreamIdentity};

use crate::error::{ClientError, ClientResult};
use crate::ports::{
    LogEventsPage, LogGroupPort, LogReadPort, LogStreamPort, PutLogEventsOutput,
    RejectedLogEventsInfo,
};
use crate::sigv4::{SigV4Signer, SignableRequest, SigningCredentials};

// =============================================================================
// Constants
// =============================================================================

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// JSON 1.1 content type
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Target prefix for every operation
const TARGET_PREFIX: &str = "Logs_20140328";

/// SigV4 service name
const SERVICE: &str = "logs";

/// Stop following `nextToken` after this many describe pages
const MAX_DESCRIBE_PAGES: usize = 50;

// =============================================================================
// Credentials
// =============================================================================

/// Static AWS credentials.
#[derive(Clone)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// =============================================================================
// CloudWatch Logs Client
// =============================================================================

/// HTTP client for the CloudWatch Logs API.
pub struct CloudWatchLogsClient {
    /// HTTP client
    client: Client,
    /// Endpoint URL
    endpoint: Url,
    /// `host[:port]` used for the Host header and signature
    host: String,
    /// Credentials
    credentials: Credentials,
    /// Request signer
    signer: SigV4Signer,
    /// Bound on one request, body read included
    request_timeout: Duration,
}

impl CloudWatchLogsClient {
    /// Create a client for the regional endpoint.
    pub fn new(region: &str, credentials: Credentials) -> ClientResult<Self> {
        let endpoint = format!("https://logs.{}.amazonaws.com/", region);
        Self::with_endpoint(region, &endpoint, credentials)
    }

    /// Create a client for a custom endpoint (VPC endpoint, local emulator).
    pub fn with_endpoint(region: &str, endpoint: &str, credentials: Credentials) -> ClientResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ClientError::RequestFailed(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ClientError::RequestFailed(format!(
                    "Endpoint has no host: {}",
                    endpoint
                )))
            }
        };

        Ok(Self {
            client: Client::new(),
            endpoint,
            host,
            credentials,
            signer: SigV4Signer::new(region, SERVICE),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Send one signed operation and decode its response.
    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> ClientResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload =
            serde_json::to_vec(request).map_err(|e| ClientError::ParseError(e.to_string()))?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        let signing = SigningCredentials {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            session_token: self.credentials.session_token.as_deref(),
        };
        let signed = self.signer.sign(
            &signing,
            &SignableRequest {
                host: &self.host,
                path: self.endpoint.path(),
                content_type: CONTENT_TYPE,
                target: &target,
                payload: &payload,
            },
            Utc::now(),
        )?;

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target);
        for (name, value) in signed {
            builder = builder.header(name, value);
        }

        let exchange = async {
            let response = builder
                .body(payload)
                .send()
                .await
                .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ClientError::ParseError(e.to_string()))?;
            Ok::<_, ClientError>((status, body))
        };
        let (status, body) = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout)??;

        if !status.is_success() {
            let err = match serde_json::from_str::<ServiceErrorResponse>(&body) {
                Ok(err) => ClientError::from_api(
                    err.kind.as_deref().unwrap_or("UnknownError"),
                    err.message.as_deref().unwrap_or_default(),
                    err.expected_sequence_token.as_deref(),
                ),
                Err(_) => ClientError::RequestFailed(format!("HTTP {}: {}", status, body)),
            };
            debug!(operation, %status, error = %err, "Log service call failed");
            return Err(err);
        }

        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| ClientError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl LogStreamPort for CloudWatchLogsClient {
    async fn put_log_events(
        &self,
        stream: &StreamIdentity,
        events: &[LogEvent],
        token: Option<&SequenceToken>,
    ) -> ClientResult<PutLogEventsOutput> {
        let request = PutLogEventsRequest {
            log_group_name: stream.group_name(),
            log_stream_name: stream.stream_name(),
            log_events: events,
            sequence_token: token.map(SequenceToken::as_str),
        };

        let response: PutLogEventsResponse = self.call("PutLogEvents", &request).await.map_err(|e| {
            if !matches!(e, ClientError::InvalidSequenceToken { .. }) {
                error!(
                    log_group = %stream.group_name(),
                    log_stream = %stream.stream_name(),
                    events = events.len(),
                    error = %e,
                    "Failed to put log events"
                );
            }
            e
        })?;

        Ok(PutLogEventsOutput {
            next_sequence_token: SequenceToken::parse_optional(
                response.next_sequence_token.as_deref(),
            ),
            rejected: response.rejected_log_events_info.filter(RejectedLogEventsInfo::any),
        })
    }

    async fn create_log_stream(&self, stream: &StreamIdentity) -> ClientResult<()> {
        let request = CreateLogStreamRequest {
            log_group_name: stream.group_name(),
            log_stream_name: stream.stream_name(),
        };
        let _: EmptyResponse = self.call("CreateLogStream", &request).await?;
        Ok(())
    }

    async fn describe_stream(
        &self,
        stream: &StreamIdentity,
    ) -> ClientResult<Option<SequenceToken>> {
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_DESCRIBE_PAGES {
            let request = DescribeLogStreamsRequest {
                log_group_name: stream.group_name(),
                log_stream_name_prefix: stream.stream_name(),
                next_token: next_token.as_deref(),
            };
            let response: DescribeLogStreamsResponse =
                self.call("DescribeLogStreams", &request).await?;

            if let Some(found) = response
                .log_streams
                .iter()
                .find(|s| s.log_stream_name == stream.stream_name())
            {
                return Ok(SequenceToken::parse_optional(found.upload_sequence_token.as_deref()));
            }

            match response.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl LogGroupPort for CloudWatchLogsClient {
    async fn describe_log_groups(&self, prefix: &str) -> ClientResult<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_DESCRIBE_PAGES {
            let request = DescribeLogGroupsRequest {
                log_group_name_prefix: prefix,
                next_token: next_token.as_deref(),
            };
            let response: DescribeLogGroupsResponse =
                self.call("DescribeLogGroups", &request).await?;

            names.extend(response.log_groups.into_iter().map(|g| g.log_group_name));

            match response.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }

    async fn create_log_group(&self, group: &str) -> ClientResult<()> {
        let request = CreateLogGroupRequest { log_group_name: group };
        let _: EmptyResponse = self.call("CreateLogGroup", &request).await?;
        Ok(())
    }
}

#[async_trait]
impl LogReadPort for CloudWatchLogsClient {
    async fn get_log_events(
        &self,
        stream: &StreamIdentity,
        page_token: Option<&str>,
    ) -> ClientResult<LogEventsPage> {
        let request = GetLogEventsRequest {
            log_group_name: stream.group_name(),
            log_stream_name: stream.stream_name(),
            start_from_head: true,
            next_token: page_token,
        };
        self.call("GetLogEvents", &request).await
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Service error body. Some services capitalize `Message`.
#[derive(Debug, Deserialize)]
struct ServiceErrorResponse {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
    #[serde(rename = "expectedSequenceToken")]
    expected_sequence_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    log_events: &'a [LogEvent],
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsResponse {
    next_sequence_token: Option<String>,
    rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogStreamRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStreamDescription>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogStreamDescription {
    log_stream_name: String,
    upload_sequence_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsRequest<'a> {
    log_group_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsResponse {
    #[serde(default)]
    log_groups: Vec<LogGroupDescription>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogGroupDescription {
    log_group_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogGroupRequest<'a> {
    log_group_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    start_from_head: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

// =============================================================================
// Tests
// =============================================================================
