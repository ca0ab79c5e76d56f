//! End-to-end writer behavior against the in-memory log service.
//!
//! Run with: `cargo test -p logship-writer --test writer_flow`

use std::sync::Arc;
use std::time::Duration;

use logship_connectors::{ClientError, LogStreamPort, StubLogService};
use logship_domain::StreamIdentity;
use logship_writer::{LogGroup, NoopObserver, StreamWriter, WriterError, WriterOptions, WriterState};

fn stream() -> StreamIdentity {
    StreamIdentity::new("/app/web", "i-0abc").unwrap()
}

fn options(flush_every: Duration) -> WriterOptions {
    WriterOptions::default()
        .with_flush_every(flush_every)
        .with_observer(Arc::new(NoopObserver))
}

fn open(stub: &Arc<StubLogService>, flush_every: Duration) -> StreamWriter {
    let port: Arc<dyn LogStreamPort> = stub.clone();
    StreamWriter::new(stream(), port, options(flush_every))
}

#[tokio::test]
async fn test_provision_write_and_read_back() -> anyhow::Result<()> {
    let stub = Arc::new(StubLogService::new());
    let group = LogGroup::attach("/app/web", stub.clone()).await?;

    let writer = group
        .attach_stream_with_options("i-0abc", options(Duration::from_secs(60)))
        .await?;
    writer.write(b"booting\nlistening on :8080\n")?;
    writer.close().await?;

    let reader = group.open("i-0abc")?;
    let events = reader.read_available().await?;
    let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["booting", "listening on :8080"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_background_flush_delivers_without_explicit_flush() {
    let stub = Arc::new(StubLogService::with_stream(&stream()));
    let writer = open(&stub, Duration::from_secs(5));

    writer.write(b"tick\n").unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(stub.stored_messages(&stream()), vec!["tick"]);
    writer.close().await.unwrap();
    assert_eq!(stub.put_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_lose_nothing() {
    let stub = Arc::new(StubLogService::with_stream(&stream()));
    let writer = Arc::new(open(&stub, Duration::from_millis(5)));

    let tasks: Vec<_> = (0..8)
        .map(|t| {
            let writer = writer.clone();
            tokio::spawn(async move {
                for i in 0..250 {
                    writer.write(format!("{}:{}\n", t, i).as_bytes()).unwrap();
                    if i % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    writer.close().await.unwrap();

    let stored = stub.stored_messages(&stream());
    assert_eq!(stored.len(), 2000);
    for t in 0..8 {
        let prefix = format!("{}:", t);
        let seq: Vec<usize> = stored
            .iter()
            .filter_map(|m| m.strip_prefix(&prefix))
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(seq, (0..250).collect::<Vec<_>>());
    }
}

#[tokio::test(start_paused = true)]
async fn test_close_waits_for_in_flight_flush() {
    let stub = Arc::new(StubLogService::with_stream(&stream()));
    stub.set_put_delay(Some(Duration::from_secs(2)));
    let writer = Arc::new(open(&stub, Duration::from_secs(60)));

    writer.write(b"first\n").unwrap();
    let flusher = {
        let writer = writer.clone();
        tokio::spawn(async move { writer.flush().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    writer.write(b"second\n").unwrap();
    writer.close().await.unwrap();
    flusher.await.unwrap().unwrap();

    let calls = stub.put_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1].token.as_ref().map(|t| t.as_str()),
        Some("00000000000000000001")
    );
    assert_eq!(stub.stored_messages(&stream()), vec!["first", "second"]);
    assert_eq!(writer.state(), WriterState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_close_waits_for_scheduled_flush() {
    let stub = Arc::new(StubLogService::with_stream(&stream()));
    stub.set_put_delay(Some(Duration::from_secs(2)));
    let writer = open(&stub, Duration::from_secs(1));

    writer.write(b"first\n").unwrap();
    // The tick at 1s starts an append that completes at 3s.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(stub.put_count(), 0);

    writer.write(b"second\n").unwrap();
    let started = tokio::time::Instant::now();
    writer.close().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(3_900));
    let calls = stub.put_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].token, None);
    assert_eq!(
        calls[1].token.as_ref().map(|t| t.as_str()),
        Some("00000000000000000001")
    );
    assert_eq!(stub.stored_messages(&stream()), vec!["first", "second"]);
    assert_eq!(writer.state(), WriterState::Closed);
}

#[tokio::test]
async fn test_two_writers_share_a_stream() {
    let stub = Arc::new(StubLogService::with_stream(&stream()));
    let a = open(&stub, Duration::from_secs(60));
    let b = open(&stub, Duration::from_secs(60));

    for round in 0..3 {
        a.write(format!("a{}\n", round).as_bytes()).unwrap();
        a.flush().await.unwrap();
        b.write(format!("b{}\n", round).as_bytes()).unwrap();
        b.flush().await.unwrap();
    }
    a.close().await.unwrap();
    b.close().await.unwrap();

    assert_eq!(
        stub.stored_messages(&stream()),
        vec!["a0", "b0", "a1", "b1", "a2", "b2"]
    );
    assert_eq!(a.state(), WriterState::Closed);
    assert_eq!(b.state(), WriterState::Closed);
}

#[tokio::test]
async fn test_transport_failure_is_sticky() {
    let stub = Arc::new(StubLogService::with_stream(&stream()));
    let writer = open(&stub, Duration::from_secs(60));
    stub.fail_next_put(ClientError::Api {
        code: "AccessDeniedException".to_string(),
        message: "not allowed".to_string(),
    });

    writer.write(b"x\n").unwrap();
    let err = writer.flush().await.unwrap_err();
    let calls_after_failure = stub.put_count();

    assert!(matches!(err, WriterError::Transport(ClientError::Api { .. })));
    assert_eq!(writer.write(b"y\n"), Err(err.clone()));
    assert_eq!(writer.flush().await, Err(err.clone()));
    assert_eq!(writer.close().await, Err(err.clone()));
    assert_eq!(stub.put_count(), calls_after_failure);
    assert_eq!(writer.state(), WriterState::Failed(err));
}

#[tokio::test]
async fn test_close_failure_still_closes() {
    let stub = Arc::new(StubLogService::with_stream(&stream()));
    let writer = open(&stub, Duration::from_secs(60));
    stub.fail_next_put(ClientError::Timeout);

    writer.write(b"unsent\n").unwrap();

    assert_eq!(
        writer.close().await,
        Err(WriterError::Transport(ClientError::Timeout))
    );
    assert_eq!(writer.state(), WriterState::Closed);
    assert_eq!(writer.write(b"late\n"), Err(WriterError::ClosedStream));
    assert_eq!(writer.close().await, Ok(()));
}
