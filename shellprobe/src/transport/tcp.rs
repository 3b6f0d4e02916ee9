//! Deadline-bound connection over TCP (or any async byte stream).

use std::io;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout_at};

use crate::config::join_host_port;
use crate::error::{Result, TransportError};

/// Terminator appended to every line sent to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\r\n`
    CrLf,
    /// `\n`
    Lf,
}

impl LineEnding {
    /// The terminator bytes.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::CrLf => b"\r\n",
            LineEnding::Lf => b"\n",
        }
    }
}

/// A single live connection with one absolute deadline.
///
/// Every blocking read and write is bounded by the deadline. Writes are
/// flushed immediately so replies interleave with reads in the order they
/// were issued.
pub struct Connection<S = TcpStream> {
    /// Buffered stream to the peer.
    stream: BufStream<S>,

    /// Point in time after which every operation fails.
    deadline: Instant,
}

impl Connection<TcpStream> {
    /// Dial `host:port`, giving up at `deadline`.
    pub async fn connect(host: &str, port: u16, deadline: Instant) -> Result<Self> {
        let address = join_host_port(host, port);
        debug!("dialing {}", address);

        let stream = timeout_at(deadline, TcpStream::connect((host, port)))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                address: address.clone(),
            })?
            .map_err(|source| TransportError::ConnectionFailed {
                host: host.to_string(),
                port,
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("failed to set TCP_NODELAY on {}: {}", address, e);
        }

        debug!("connected to {}", address);
        Ok(Self::new(stream, deadline))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already established stream.
    pub fn new(stream: S, deadline: Instant) -> Self {
        Self {
            stream: BufStream::new(stream),
            deadline,
        }
    }

    /// The deadline bounding every operation.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Read a single byte.
    ///
    /// Fails with [`io::ErrorKind::TimedOut`] once the deadline passes and
    /// with [`io::ErrorKind::UnexpectedEof`] when the peer closes.
    pub async fn read_byte(&mut self) -> io::Result<u8> {
        match timeout_at(self.deadline, self.stream.read_u8()).await {
            Ok(result) => result,
            Err(_) => Err(deadline_exceeded()),
        }
    }

    /// Read one `\n`-terminated line, bounded by the earlier of `deadline`
    /// and the connection deadline.
    ///
    /// At most `limit` bytes are read; a line cut at the limit is returned
    /// without its terminator. A line cut short by end of stream is dropped
    /// and reported as [`io::ErrorKind::UnexpectedEof`].
    pub async fn read_line(&mut self, deadline: Instant, limit: usize) -> io::Result<Vec<u8>> {
        let deadline = deadline.min(self.deadline);
        let mut line = Vec::new();

        let outcome = timeout_at(
            deadline,
            (&mut self.stream)
                .take(limit as u64)
                .read_until(b'\n', &mut line),
        )
        .await;

        match outcome {
            Err(_) => Err(deadline_exceeded()),
            Ok(Err(e)) => Err(e),
            Ok(Ok(_)) if line.last() == Some(&b'\n') => Ok(line),
            Ok(Ok(n)) if n > 0 && n == limit => Ok(line),
            Ok(Ok(_)) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-line",
            )),
        }
    }

    /// Write and flush `data`.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(data).await?;
            stream.flush().await?;
            Ok::<(), io::Error>(())
        };

        timeout_at(self.deadline, write)
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(TransportError::Io)?;
        Ok(())
    }

    /// Send `text` followed by the line terminator.
    pub async fn send_line(&mut self, text: &str, ending: LineEnding) -> Result<()> {
        let mut line = Vec::with_capacity(text.len() + 2);
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(ending.as_bytes());
        self.write_all(&line).await
    }

    /// Flush anything pending and shut the connection down.
    pub async fn close(mut self) -> Result<()> {
        timeout_at(self.deadline, self.stream.shutdown())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(TransportError::Io)?;
        Ok(())
    }
}

fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_read_byte_times_out_at_deadline() {
        let (client, _server) = tokio::io::duplex(64);
        let mut conn = Connection::new(client, Instant::now() + Duration::from_millis(50));

        let err = conn.read_byte().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_read_byte_reports_eof() {
        let mock = tokio_test::io::Builder::new().read(b"a").build();
        let mut conn = Connection::new(mock, soon());

        assert_eq!(conn.read_byte().await.unwrap(), b'a');
        let err = conn.read_byte().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_read_line_splits_on_newline() {
        let mock = tokio_test::io::Builder::new()
            .read(b"first\nsecond\n")
            .build();
        let mut conn = Connection::new(mock, soon());

        assert_eq!(conn.read_line(soon(), 1024).await.unwrap(), b"first\n");
        assert_eq!(conn.read_line(soon(), 1024).await.unwrap(), b"second\n");
    }

    #[tokio::test]
    async fn test_read_line_drops_partial_line_at_eof() {
        let mock = tokio_test::io::Builder::new().read(b"no newline").build();
        let mut conn = Connection::new(mock, soon());

        let err = conn.read_line(soon(), 1024).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_read_line_stops_at_limit() {
        let mock = tokio_test::io::Builder::new().read(b"abcdefgh\n").build();
        let mut conn = Connection::new(mock, soon());

        assert_eq!(conn.read_line(soon(), 4).await.unwrap(), b"abcd");
        assert_eq!(conn.read_line(soon(), 1024).await.unwrap(), b"efgh\n");
    }

    #[tokio::test]
    async fn test_read_line_uses_earlier_deadline() {
        let (client, _server) = tokio::io::duplex(64);
        let mut conn = Connection::new(client, soon());

        let started = Instant::now();
        let err = conn
            .read_line(Instant::now() + Duration::from_millis(30), 1024)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_send_line_terminators() {
        let mock = tokio_test::io::Builder::new()
            .write(b"alice\r\n")
            .write(b"whoami\n")
            .build();
        let mut conn = Connection::new(mock, soon());

        conn.send_line("alice", LineEnding::CrLf).await.unwrap();
        conn.send_line("whoami", LineEnding::Lf).await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::connect("127.0.0.1", port, soon())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_gives_up_at_deadline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // The deadline has already passed when the dial starts.
        let err = Connection::connect("127.0.0.1", port, Instant::now())
            .await
            .err()
            .unwrap();
        match err {
            Error::Transport(TransportError::ConnectTimeout { address }) => {
                assert_eq!(address, format!("127.0.0.1:{}", port));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_is_bounded_by_deadline() {
        // The peer never reads, so the one-byte pipe stays full.
        let (client, _server) = tokio::io::duplex(1);
        let conn_deadline = Instant::now() + Duration::from_millis(50);
        let mut conn = Connection::new(client, conn_deadline);

        let err = conn.write_all(b"whoami\r\n").await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Timeout)));

        let err = conn.close().await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Timeout)));
    }
}
