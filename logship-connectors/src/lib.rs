//! logship Connectors
//!
//! Ports for the remote log service and the adapters that implement them.
//!
//! # Components
//!
//! - **Ports**: `LogStreamPort` (append side), `LogGroupPort` (provisioning),
//!   `LogReadPort` (pagination)
//! - **CloudWatch Logs**: HTTP adapter speaking the JSON 1.1 protocol,
//!   signed with AWS Signature Version 4
//! - **Stub**: in-memory service for tests, with scriptable failures

#![warn(clippy::all)]

// Public modules
pub mod cloudwatch;
pub mod error;
pub mod ports;
pub mod sigv4;
pub mod stub;

// Re-exports
pub use cloudwatch::{CloudWatchLogsClient, Credentials};
pub use error::{ClientError, ClientResult};
pub use ports::{
    LogEventsPage, LogGroupPort, LogReadPort, LogService, LogStreamPort, OutputLogEvent,
    PutLogEventsOutput, RejectedLogEventsInfo,
};
pub use stub::{PutCall, StubLogService, StubOutcome};
