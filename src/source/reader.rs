use crate::config::types::InputFormat;
use crate::pipeline::backpressure::{offer, Admission};
use crate::pipeline::channel::Sender;
use crate::source::header::parse_header;
use crate::stats::ReaderStats;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

/// One input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Arrival sequence number, assigned by the reader starting at 0.
    pub seq: u64,
    pub arrived_at: DateTime<Utc>,
    /// Line content without its terminator.
    pub raw: Vec<u8>,
    /// Priority parsed from an RFC 5424 header, when the input carries one.
    pub priority: Option<u8>,
    /// Timestamp parsed from an RFC 5424 header, when the input carries one.
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogLine {
    pub fn new(seq: u64, raw: Vec<u8>, format: InputFormat) -> Self {
        let header = match format {
            InputFormat::Raw => None,
            InputFormat::Rfc5424 => parse_header(&raw),
        };

        Self {
            seq,
            arrived_at: Utc::now(),
            raw,
            priority: header.map(|h| h.priority),
            timestamp: header.and_then(|h| h.timestamp),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// What the reader did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub lines: u64,
    pub dropped: u64,
}

/// Turns an input byte stream into [`LogLine`]s on the front channel.
///
/// The reader owns the only sender of the front channel; consuming it in
/// [`Reader::read`] closes the channel once the input is exhausted.
pub struct Reader {
    outbox: Sender<LogLine>,
    stats: ReaderStats,
    format: InputFormat,
    patience: Duration,
    next_seq: u64,
}

impl Reader {
    pub fn new(
        outbox: Sender<LogLine>,
        stats: ReaderStats,
        format: InputFormat,
        patience: Duration,
    ) -> Self {
        Self {
            outbox,
            stats,
            format,
            patience,
            next_seq: 0,
        }
    }

    /// Read lines until end-of-input, then close the front channel.
    ///
    /// Blank lines are skipped. A final line without a terminator still counts.
    /// An I/O error stops reading; the channel is closed all the same.
    pub async fn read<R>(mut self, mut input: R) -> std::io::Result<ReadSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = ReadSummary::default();
        let mut buf = Vec::with_capacity(1024);

        info!("Reader started");

        loop {
            buf.clear();
            let bytes_read = input.read_until(b'\n', &mut buf).await?;
            if bytes_read == 0 {
                break;
            }

            let line = trim_terminator(&buf);
            if line.is_empty() {
                continue;
            }

            let log_line = LogLine::new(self.next_seq, line.to_vec(), self.format);
            self.next_seq += 1;
            summary.lines += 1;
            self.stats.line_read();

            match offer(&self.outbox, log_line, self.patience).await {
                Admission::Accepted => {}
                Admission::Full(dropped) | Admission::Closed(dropped) => {
                    debug!(seq = dropped.seq, "Front channel unavailable, dropping line");
                    summary.dropped += 1;
                    self.stats.line_dropped();
                }
            }
        }

        info!(
            lines = summary.lines,
            dropped = summary.dropped,
            "End of input, closing front channel"
        );

        Ok(summary)
    }
}

fn trim_terminator(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
