//! Copies input lines into a stream writer.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use logship_writer::StreamWriter;

use crate::error::ShipResult;

/// Totals for one shipping run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipStats {
    /// Lines handed to the writer
    pub lines: u64,
    /// Bytes handed to the writer
    pub bytes: u64,
}

/// Copy `input` into `writer` line by line until end of input or
/// `shutdown`.
///
/// Does not close the writer. A line is only handed over once it is
/// complete (or at end of input), so events never split mid-line.
pub async fn ship<R>(
    mut input: R,
    writer: &StreamWriter,
    shutdown: CancellationToken,
) -> ShipResult<ShipStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ShipStats::default();
    let mut line = Vec::with_capacity(1024);

    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, stopping input");
                break;
            }
            read = input.read_until(b'\n', &mut line) => read?,
        };
        if read == 0 {
            debug!("End of input");
            break;
        }

        stats.bytes += writer.write(&line)? as u64;
        stats.lines += 1;
    }

    Ok(stats)
}

/// Ship `input`, then close `writer` whatever the outcome.
///
/// A shipping error takes precedence; a close error seen alongside it is
/// logged rather than lost.
pub async fn ship_and_close<R>(
    input: R,
    writer: &StreamWriter,
    shutdown: CancellationToken,
) -> ShipResult<ShipStats>
where
    R: AsyncBufRead + Unpin,
{
    let shipped = ship(input, writer, shutdown).await;
    let closed = writer.close().await;

    if let Err(e) = &closed {
        error!(stream = %writer.identity(), error = %e, "Final flush failed");
    }
    let stats = shipped?;
    closed?;
    Ok(stats)
}

// =============================================================================
// Tests
// =============================================================================
