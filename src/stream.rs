//! Input word stream and its elastic buffer.
//!
//! The engine consumes words through a bounded FIFO that sits between the
//! producer and the bus. Besides pop/push the FIFO exposes its occupancy
//! level, which is what the engine reads to size each burst: committing to
//! `min(level, max_burst_length)` beats means the data for the whole burst is
//! already queued, so a correctly behaving producer can never starve a burst
//! mid-flight.

use std::collections::VecDeque;

use thiserror::Error;

/// One word of the input stream.
///
/// `last` marks the final word of a frame; the engine rotates to the next
/// ring buffer when it transfers a word carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamWord {
    pub value: u32,
    pub last: bool,
}

impl StreamWord {
    pub fn new(value: u32) -> Self {
        Self { value, last: false }
    }

    pub fn last(value: u32) -> Self {
        Self { value, last: true }
    }
}

/// Push attempted on a full FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream fifo full (depth {depth})")]
pub struct FifoFull {
    pub depth: usize,
}

/// Bounded elastic buffer between the stream producer and the write engine.
#[derive(Debug)]
pub struct StreamFifo {
    queue: VecDeque<StreamWord>,
    depth: usize,
}

impl StreamFifo {
    pub fn new(depth: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Configured depth bound.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Occupancy level: words queued and available for immediate consumption.
    pub fn level(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.depth
    }

    /// Queue a word, failing when the buffer is at its depth bound.
    pub fn push(&mut self, word: StreamWord) -> Result<(), FifoFull> {
        if self.is_full() {
            return Err(FifoFull { depth: self.depth });
        }
        self.queue.push_back(word);
        Ok(())
    }

    /// Word currently at the head, if any.
    pub fn front(&self) -> Option<&StreamWord> {
        self.queue.front()
    }

    /// Consume the head word.
    pub fn pop(&mut self) -> Option<StreamWord> {
        self.queue.pop_front()
    }
}
