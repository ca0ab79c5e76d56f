//! Background flush loop.
//!
//! One task per writer flushes on a fixed interval until it is cancelled
//! or the writer leaves `Open`. Dropping the handle cancels it too. Flush
//! errors never end the loop on their own; they are recorded in the writer
//! state by the controller.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::flush::FlushController;
use crate::writer::WriterState;

/// Handle to a running flush loop. Dropping it cancels the loop.
pub struct FlushScheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _guard: DropGuard,
}

impl FlushScheduler {
    /// Start flushing `controller` every `flush_every` (at least 1 ms).
    ///
    /// The first flush happens one full interval after the spawn.
    pub fn spawn(controller: Arc<FlushController>, flush_every: Duration) -> Self {
        let cancel = CancellationToken::new();
        let period = flush_every.max(Duration::from_millis(1));
        let handle = tokio::spawn(run(controller, period, cancel.clone()));
        let _guard = cancel.clone().drop_guard();
        Self { cancel, handle, _guard }
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// A pending tick is abandoned at once; a flush already running
    /// completes first.
    pub async fn stop(self) {
        let Self { cancel, handle, _guard } = self;
        cancel.cancel();
        if let Err(e) = handle.await {
            debug!(error = %e, "Flush task ended abnormally");
        }
    }

    /// True once the loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn run(controller: Arc<FlushController>, period: Duration, cancel: CancellationToken) {
    debug!(stream = %controller.stream(), period_ms = period.as_millis() as u64, "Flush loop started");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // First tick is immediate

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = controller.flush().await {
                    debug!(stream = %controller.stream(), error = %e, "Scheduled flush failed");
                }
                if controller.state() != WriterState::Open {
                    break;
                }
            }
        }
    }

    info!(stream = %controller.stream(), "Flush loop stopped");
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::AppendClient;
    use crate::buffer::EventBuffer;
    use crate::observer::NoopObserver;
    use logship_connectors::{ClientError, StubLogService};
    use logship_domain::StreamIdentity;
    use tokio::time::sleep;

    fn stream() -> StreamIdentity {
        StreamIdentity::new("app", "web").unwrap()
    }

    fn setup() -> (Arc<StubLogService>, Arc<EventBuffer>, Arc<FlushController>) {
        let stub = Arc::new(StubLogService::with_stream(&stream()));
        let buffer = Arc::new(EventBuffer::new());
        let controller = Arc::new(FlushController::new(
            AppendClient::new(stub.clone(), stream()),
            buffer.clone(),
            Arc::new(NoopObserver),
        ));
        (stub, buffer, controller)
    }

    #[tokio::test(start_paused = true)]
    async fn test_flushes_on_each_tick() {
        let (stub, buffer, controller) = setup();
        let scheduler = FlushScheduler::spawn(controller, Duration::from_secs(5));

        buffer.write(b"one\n").unwrap();
        sleep(Duration::from_millis(4_900)).await;
        assert_eq!(stub.put_count(), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(stub.put_count(), 1);

        buffer.write(b"two\n").unwrap();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(stub.stored_messages(&stream()), vec!["one", "two"]);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_ticks_make_no_calls() {
        let (stub, _buffer, controller) = setup();
        let scheduler = FlushScheduler::spawn(controller, Duration::from_secs(1));

        sleep(Duration::from_secs(10)).await;

        assert_eq!(stub.put_count(), 0);
        assert!(!scheduler.is_finished());
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_pending_tick() {
        let (stub, buffer, controller) = setup();
        let scheduler = FlushScheduler::spawn(controller, Duration::from_secs(60));
        buffer.write(b"pending\n").unwrap();

        scheduler.stop().await;
        sleep(Duration::from_secs(120)).await;

        assert_eq!(stub.put_count(), 0);
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_ends_loop() {
        let (stub, buffer, controller) = setup();
        let scheduler = FlushScheduler::spawn(controller.clone(), Duration::from_secs(1));
        assert_eq!(Arc::strong_count(&controller), 2);

        drop(scheduler);
        sleep(Duration::from_millis(10)).await;
        buffer.write(b"unflushed\n").unwrap();
        sleep(Duration::from_secs(60)).await;

        assert_eq!(Arc::strong_count(&controller), 1);
        assert_eq!(stub.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_exits_after_failure() {
        let (stub, buffer, controller) = setup();
        stub.fail_next_put(ClientError::Timeout);
        let scheduler = FlushScheduler::spawn(controller.clone(), Duration::from_secs(1));

        buffer.write(b"x\n").unwrap();
        sleep(Duration::from_millis(1_500)).await;

        assert!(matches!(controller.state(), WriterState::Failed(_)));
        assert!(scheduler.is_finished());
        scheduler.stop().await;
    }
}
