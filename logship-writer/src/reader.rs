//! Paced reader over a stream, from its head.
//!
//! GetLogEvents is limited to 10 requests/second, so consecutive requests
//! from one reader are spaced at least `READ_THROTTLE` apart.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use logship_connectors::{LogReadPort, OutputLogEvent};
use logship_domain::{StreamIdentity, READ_THROTTLE};

use crate::error::ReadResult;

/// One page of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    /// Events, oldest first
    pub events: Vec<OutputLogEvent>,
    /// Pass to the next `read`. Equal to the token that was passed in once
    /// the end of the available data is reached.
    pub next_page_token: Option<String>,
}

/// Reads a stream page by page.
pub struct LogReader {
    identity: StreamIdentity,
    port: Arc<dyn LogReadPort>,
    last_request: Mutex<Option<Instant>>,
}

impl LogReader {
    /// Reader for `identity`
    pub fn new(identity: StreamIdentity, port: Arc<dyn LogReadPort>) -> Self {
        Self {
            identity,
            port,
            last_request: Mutex::new(None),
        }
    }

    /// Stream being read
    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    /// Fetch the page at `page_token` (`None` for the head).
    ///
    /// Waits as needed so requests are at least 100 ms apart.
    pub async fn read(&self, page_token: Option<&str>) -> ReadResult<LogPage> {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            sleep_until(last + READ_THROTTLE).await;
        }
        *last_request = Some(Instant::now());

        let page = self.port.get_log_events(&self.identity, page_token).await?;
        debug!(stream = %self.identity, events = page.events.len(), "Read page");

        Ok(LogPage {
            events: page.events,
            next_page_token: page.next_forward_token,
        })
    }

    /// Read from the head until the service stops advancing the page token.
    pub async fn read_available(&self) -> ReadResult<Vec<OutputLogEvent>> {
        let mut events = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.read(token.as_deref()).await?;
            events.extend(page.events);
            if page.next_page_token.is_none() || page.next_page_token == token {
                return Ok(events);
            }
            token = page.next_page_token;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
