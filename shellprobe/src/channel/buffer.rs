//! Bounded prompt buffer.
//!
//! Accumulates everything read during one wait. Only the tail is searched
//! after each append: a match further back would already have ended the
//! wait, so a new one must end at the last byte. A target split across
//! reads is still found. The buffer never rotates; instead it refuses to
//! grow past its limit and the caller fails the wait.

/// Buffer for accumulating output while waiting for a prompt.
#[derive(Debug)]
pub struct PromptBuffer {
    /// The accumulated output.
    buffer: Vec<u8>,

    /// Maximum number of bytes the buffer may hold.
    limit: usize,
}

impl PromptBuffer {
    /// Create an empty buffer holding at most `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(limit.min(4096)),
            limit,
        }
    }

    /// Append one byte. Returns `false` if the buffer is already full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buffer.push(byte);
        true
    }

    /// Append as much of `data` as fits. Returns `false` if anything was
    /// left out.
    pub fn extend(&mut self, data: &[u8]) -> bool {
        let room = self.remaining();
        let take = data.len().min(room);
        self.buffer.extend_from_slice(&data[..take]);
        take == data.len()
    }

    /// The last `depth` bytes (or the whole buffer if it is shorter).
    ///
    /// With `depth` set to the longest awaited target, this is the only
    /// window that can hold a match completed by the latest byte.
    pub fn tail(&self, depth: usize) -> &[u8] {
        let start = self.buffer.len().saturating_sub(depth);
        &self.buffer[start..]
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Take the contents as a string (lossy UTF-8) and reset.
    pub fn take_string(&mut self) -> String {
        match String::from_utf8(self.take()) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether the buffer has reached its limit.
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.limit
    }

    /// Bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.buffer.len())
    }

    /// The size limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}
