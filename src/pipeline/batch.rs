use crate::source::reader::LogLine;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Why a batch stopped accepting lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Reached the configured line count.
    Full,
    /// The idle deadline since its first line elapsed.
    Idle,
    /// Flushed because the front channel closed.
    Drain,
}

#[derive(Debug, Clone)]
pub struct Batch {
    /// Unique batch ID, sent with the delivery request.
    pub batch_id: Uuid,
    /// Index of the batcher that built this batch.
    pub batcher_id: usize,
    /// Arrival time of the first line.
    pub created_at: DateTime<Utc>,
    /// Lines in arrival order.
    pub lines: Vec<LogLine>,
    pub close_reason: CloseReason,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total payload bytes, excluding framing.
    pub fn byte_len(&self) -> usize {
        self.lines.iter().map(LogLine::len).sum()
    }
}

/// A batcher's private in-progress batch.
pub struct BatchBuilder {
    batcher_id: usize,
    max_lines: usize,
    created_at: Option<DateTime<Utc>>,
    lines: Vec<LogLine>,
}

impl BatchBuilder {
    pub fn new(batcher_id: usize, max_lines: usize) -> Self {
        Self {
            batcher_id,
            max_lines,
            created_at: None,
            lines: Vec::with_capacity(max_lines),
        }
    }

    /// Append a line; returns the completed batch when this line filled it.
    pub fn push(&mut self, line: LogLine) -> Option<Batch> {
        if self.lines.is_empty() {
            self.created_at = Some(line.arrived_at);
        }
        self.lines.push(line);

        if self.lines.len() >= self.max_lines {
            self.close(CloseReason::Full)
        } else {
            None
        }
    }

    /// Close the current batch. An empty builder yields nothing.
    pub fn close(&mut self, reason: CloseReason) -> Option<Batch> {
        if self.lines.is_empty() {
            return None;
        }

        let lines = std::mem::replace(&mut self.lines, Vec::with_capacity(self.max_lines));
        let created_at = self.created_at.take().unwrap_or_else(Utc::now);

        Some(Batch {
            batch_id: Uuid::new_v4(),
            batcher_id: self.batcher_id,
            created_at,
            lines,
            close_reason: reason,
        })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
