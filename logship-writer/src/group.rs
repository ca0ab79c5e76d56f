//! Log group provisioning.
//!
//! Attaching is idempotent: an existing group or stream is reused, and a
//! creation race lost to another process (`ResourceAlreadyExists`) counts
//! as success.

use std::sync::Arc;

use tracing::{debug, info};

use logship_connectors::{ClientError, ClientResult, LogService, LogStreamPort};
use logship_domain::{validate_group_name, StreamIdentity};

use crate::config::WriterOptions;
use crate::error::ProvisionResult;
use crate::reader::LogReader;
use crate::writer::StreamWriter;

/// A log group on a log service.
pub struct LogGroup<S: LogService + 'static> {
    name: String,
    service: Arc<S>,
}

impl<S: LogService + 'static> LogGroup<S> {
    /// Refer to `name` without contacting the service.
    pub fn new(name: impl Into<String>, service: Arc<S>) -> ProvisionResult<Self> {
        let name = validate_group_name(name.into())?;
        Ok(Self { name, service })
    }

    /// Find the group named `name`, creating it if it does not exist.
    pub async fn attach(name: impl Into<String>, service: Arc<S>) -> ProvisionResult<Self> {
        let group = Self::new(name, service)?;

        let existing = group.service.describe_log_groups(&group.name).await?;
        if existing.iter().any(|g| *g == group.name) {
            debug!(group = %group.name, "Attached to existing log group");
        } else {
            ignore_already_exists(group.service.create_log_group(&group.name).await)?;
            info!(group = %group.name, "Created log group");
        }

        Ok(group)
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create (or reuse) `stream_name` and start a writer with default
    /// options.
    pub async fn attach_stream(&self, stream_name: &str) -> ProvisionResult<StreamWriter> {
        self.attach_stream_with_options(stream_name, WriterOptions::default())
            .await
    }

    /// Create (or reuse) `stream_name` and start a writer with `options`.
    pub async fn attach_stream_with_options(
        &self,
        stream_name: &str,
        options: WriterOptions,
    ) -> ProvisionResult<StreamWriter> {
        let identity = StreamIdentity::new(self.name.clone(), stream_name)?;
        ignore_already_exists(self.service.create_log_stream(&identity).await)?;
        debug!(stream = %identity, "Log stream ready");

        let port: Arc<dyn LogStreamPort> = self.service.clone();
        Ok(StreamWriter::new(identity, port, options))
    }

    /// Reader for `stream_name`, starting at the head of the stream.
    pub fn open(&self, stream_name: &str) -> ProvisionResult<LogReader> {
        let identity = StreamIdentity::new(self.name.clone(), stream_name)?;
        Ok(LogReader::new(identity, self.service.clone()))
    }
}

fn ignore_already_exists(result: ClientResult<()>) -> ClientResult<()> {
    match result {
        Err(ClientError::ResourceAlreadyExists(_)) => Ok(()),
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================
