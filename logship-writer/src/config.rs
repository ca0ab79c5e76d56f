//! Writer options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use logship_domain::{Clock, SystemClock, DEFAULT_FLUSH_EVERY};

use crate::observer::{TracingObserver, WriterObserver};

/// Options for a `StreamWriter`.
#[derive(Clone)]
pub struct WriterOptions {
    /// Interval between background flushes
    pub flush_every: Duration,
    /// Receives flush notifications
    pub observer: Arc<dyn WriterObserver>,
    /// Source of event timestamps
    pub clock: Arc<dyn Clock>,
}

impl WriterOptions {
    /// Set the background flush interval.
    pub fn with_flush_every(mut self, flush_every: Duration) -> Self {
        self.flush_every = flush_every;
        self
    }

    /// Set the observer.
    pub fn with_observer(mut self, observer: Arc<dyn WriterObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the timestamp clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            flush_every: DEFAULT_FLUSH_EVERY,
            observer: Arc::new(TracingObserver),
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for WriterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterOptions")
            .field("flush_every", &self.flush_every)
            .finish_non_exhaustive()
    }
}
