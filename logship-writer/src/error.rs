//! Writer, provisioning and reader error types.

use logship_connectors::{ClientError, RejectedLogEventsInfo};
use logship_domain::DomainError;
use thiserror::Error;

/// Errors surfaced by a `StreamWriter`.
///
/// Sequence token conflicts are resolved inside the flush controller and do
/// not appear here. Every variant except `ClosedStream` becomes the writer's
/// sticky failure, so the type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriterError {
    /// Write or flush after close
    #[error("Stream writer is closed")]
    ClosedStream,

    /// The service stored the batch but refused some of its events
    #[error("Log events were rejected: {info:?}")]
    BatchRejected { info: RejectedLogEventsInfo },

    /// Network, auth, throttling or service failure, including a retry
    /// that did not resolve a stale token
    #[error("Transport failure: {0}")]
    Transport(#[from] ClientError),
}

/// Result type for writer operations.
pub type WriterResult<T> = Result<T, WriterError>;

/// Errors from group and stream provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Invalid group or stream name
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Log service error
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Result type for provisioning.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors from the read side. Kept apart from `WriterError` so read
/// failures never leak into writer state.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    /// Log service error
    #[error("Read failed: {0}")]
    Client(#[from] ClientError),
}

/// Result type for reads.
pub type ReadResult<T> = Result<T, ReadError>;
