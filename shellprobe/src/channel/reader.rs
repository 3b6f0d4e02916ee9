//! "Read until any" over a filtered connection.

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite};

use super::buffer::PromptBuffer;
use super::negotiation::{Filtered, StreamFilter};
use super::patterns::Prompts;
use crate::error::{ChannelError, Result};
use crate::transport::{Connection, LineEnding};

/// Waits for prompts on a connection, one byte at a time.
///
/// Each byte read is first offered to the filter. Bytes the filter keeps
/// are appended to the buffer and the tail of the buffer, as long as the
/// longest awaited target, is searched. Replies produced by the filter are
/// written before the next byte is read.
pub struct PromptReader<'a, S, F> {
    /// Connection being read.
    conn: &'a mut Connection<S>,

    /// Negotiation policy.
    filter: F,

    /// Text gathered by the current wait.
    buffer: PromptBuffer,
}

impl<'a, S, F> PromptReader<'a, S, F>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: StreamFilter,
{
    /// Create a reader whose waits hold at most `limit` bytes.
    pub fn new(conn: &'a mut Connection<S>, filter: F, limit: usize) -> Self {
        Self {
            conn,
            filter,
            buffer: PromptBuffer::new(limit),
        }
    }

    /// Block until the text read since the last match contains any of
    /// `prompts`.
    ///
    /// Returns everything read during this wait, up to and including the
    /// first complete target. The buffer starts empty for the next wait.
    /// On failure the error carries the awaited targets and the text read
    /// so far.
    pub async fn read_until_any(
        &mut self,
        prompts: &Prompts,
    ) -> std::result::Result<String, ChannelError> {
        let depth = prompts.longest();

        loop {
            let byte = match self.conn.read_byte().await {
                Ok(byte) => byte,
                Err(e) => {
                    if self.filter.in_sequence() {
                        trace!("read ended inside a control sequence: {}", e);
                    }
                    return Err(ChannelError::from_io(
                        e,
                        prompts.targets().to_vec(),
                        self.buffer.take_string(),
                    ));
                }
            };

            match self.filter.feed(byte) {
                Filtered::Consumed => {}
                Filtered::Reply(reply) => {
                    trace!("negotiation reply: {:02x?}", reply);
                    // A failed reply surfaces on the next read instead.
                    if let Err(e) = self.conn.write_all(&reply).await {
                        debug!("failed to send negotiation reply: {}", e);
                    }
                }
                Filtered::Data(byte) => {
                    self.buffer.push(byte);

                    if let Some(target) = prompts.find_target(self.buffer.tail(depth)) {
                        debug!("matched {:?} after {} bytes", target, self.buffer.len());
                        return Ok(self.buffer.take_string());
                    }

                    if self.buffer.is_full() {
                        return Err(ChannelError::BufferLimit {
                            limit: self.buffer.limit(),
                            targets: prompts.targets().to_vec(),
                            partial: self.buffer.take_string(),
                        });
                    }
                }
            }
        }
    }

    /// Send `text` followed by the line terminator.
    pub async fn send_line(&mut self, text: &str, ending: LineEnding) -> Result<()> {
        self.conn.send_line(text, ending).await
    }
}
