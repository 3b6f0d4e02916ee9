//! Plain-line probe sequence.

use log::debug;
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, sleep_until};

use super::Probe;
use crate::channel::{LOGIN_LINE, PASSWORD_LINE, PromptBuffer, PromptMatcher};
use crate::config::{ProbeConfig, ProbeMode};
use crate::error::{ChannelError, ProbeError, Result, Stage};
use crate::transport::{Connection, LineEnding};

/// Line-oriented exchange with idle-timeout output capture.
///
/// 1. Read lines until one contains `login:`, send the username.
/// 2. Read lines until one contains `Password:`, send the password.
/// 3. Read one more line; another `login:` means the login was rejected.
/// 4. Pause for the settle delay, then send the command.
/// 5. Collect lines until a read takes longer than the idle timeout or
///    fails; that is the output.
///
/// The probe passes if the trimmed output equals the trimmed expected text.
pub struct LineProbe<'a> {
    config: &'a ProbeConfig,
}

impl<'a> LineProbe<'a> {
    /// Create a plain-line probe for `config`.
    pub fn new(config: &'a ProbeConfig) -> Self {
        Self { config }
    }

    /// Read whole lines until one contains `marker`.
    async fn read_lines_until<S>(
        &self,
        conn: &mut Connection<S>,
        marker: &str,
        stage: Stage,
    ) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut seen = PromptBuffer::new(self.config.timings.max_buffer);

        loop {
            let line = self.read_stage_line(conn, &mut seen, marker, stage).await?;
            if marker.is_match(&line) {
                debug!("line: reached {}", stage);
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
        }
    }

    /// Read one line into `seen`, mapping failures onto `stage`.
    async fn read_stage_line<S>(
        &self,
        conn: &mut Connection<S>,
        seen: &mut PromptBuffer,
        marker: &str,
        stage: Stage,
    ) -> Result<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let deadline = conn.deadline();
        let line = conn
            .read_line(deadline, seen.remaining())
            .await
            .map_err(|e| ProbeError::Stage {
                stage,
                source: ChannelError::from_io(e, vec![marker.to_string()], seen.take_string()),
            })?;

        seen.extend(&line);
        if seen.is_full() && !marker.is_match(&line) {
            return Err(ProbeError::Stage {
                stage,
                source: ChannelError::BufferLimit {
                    limit: seen.limit(),
                    targets: vec![marker.to_string()],
                    partial: seen.take_string(),
                },
            }
            .into());
        }

        Ok(line)
    }

    /// Collect output lines until the peer goes quiet.
    async fn capture_output<S>(&self, conn: &mut Connection<S>) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let idle_timeout = self.config.timings.idle_timeout;
        let mut output = PromptBuffer::new(self.config.timings.max_buffer);

        loop {
            let idle = Instant::now() + idle_timeout;
            match conn.read_line(idle, output.remaining()).await {
                Ok(line) => {
                    output.extend(&line);
                    if output.is_full() {
                        return Err(ProbeError::Stage {
                            stage: Stage::Output,
                            source: ChannelError::BufferLimit {
                                limit: output.limit(),
                                targets: Vec::new(),
                                partial: output.take_string(),
                            },
                        }
                        .into());
                    }
                }
                Err(e) => {
                    debug!("line: output capture ended after {} bytes: {}", output.len(), e);
                    return Ok(output.take_string());
                }
            }
        }
    }
}

impl Probe for LineProbe<'_> {
    fn mode(&self) -> ProbeMode {
        ProbeMode::Line
    }

    async fn exchange<S>(&self, conn: &mut Connection<S>) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let config = self.config;

        self.read_lines_until(conn, LOGIN_LINE, Stage::Login).await?;
        conn.send_line(&config.username, LineEnding::Lf).await?;

        self.read_lines_until(conn, PASSWORD_LINE, Stage::Password).await?;
        debug!("line: sending password (hidden)");
        conn.send_line(config.password.expose_secret(), LineEnding::Lf).await?;

        let mut seen = PromptBuffer::new(config.timings.max_buffer);
        let line = self
            .read_stage_line(conn, &mut seen, LOGIN_LINE, Stage::Shell)
            .await?;
        if LOGIN_LINE.is_match(&line) {
            return Err(ProbeError::AuthenticationRejected {
                user: config.username.clone(),
            }
            .into());
        }

        let settle = (Instant::now() + config.timings.settle_delay).min(conn.deadline());
        sleep_until(settle).await;

        debug!("line: sending command {:?}", config.command);
        conn.send_line(&config.command, LineEnding::Lf).await?;

        self.capture_output(conn).await
    }

    fn verify(&self, output: &str) -> Result<()> {
        let output = output.trim();
        let expected = self.config.expected_output.trim();

        if output == expected {
            Ok(())
        } else {
            Err(ProbeError::OutputMismatch {
                expected: expected.to_string(),
                output: output.to_string(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::error::Error;
    use crate::probe::{ProbeBuilder, execute};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn config(expected: &str) -> ProbeConfig {
        ProbeBuilder::new("192.0.2.20")
            .username("alice")
            .password("s3cret")
            .command("whoami")
            .expected_output(expected)
            .mode(ProbeMode::Line)
            .settle_delay(Duration::from_millis(10))
            .idle_timeout(Duration::from_millis(50))
            .build()
            .unwrap()
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        init_logging();
        let config = config("alice");
        let mock = tokio_test::io::Builder::new()
            .read(b"Ubuntu 22.04 LTS\n")
            .read(b"host login:\n")
            .write(b"alice\n")
            .read(b"Password:\n")
            .write(b"s3cret\n")
            .read(b"Welcome to Ubuntu\n")
            .write(b"whoami\n")
            .read(b"  alice  \n")
            .build();

        let report = execute(&LineProbe::new(&config), Connection::new(mock, soon()))
            .await
            .unwrap();
        assert_eq!(report.mode, ProbeMode::Line);
        assert_eq!(report.output, "  alice  \n");
    }

    #[tokio::test]
    async fn test_second_login_prompt_is_rejection() {
        init_logging();
        let config = config("alice");
        let mock = tokio_test::io::Builder::new()
            .read(b"login:\n")
            .write(b"alice\n")
            .read(b"Password:\n")
            .write(b"s3cret\n")
            .read(b"login:\n")
            .build();

        let err = execute(&LineProbe::new(&config), Connection::new(mock, soon()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Probe(ProbeError::AuthenticationRejected { ref user }) if user == "alice"
        ));
    }

    #[tokio::test]
    async fn test_exact_match_not_substring() {
        let config = config("alice");
        let mock = tokio_test::io::Builder::new()
            .read(b"login:\n")
            .write(b"alice\n")
            .read(b"Password:\n")
            .write(b"s3cret\n")
            .read(b"\n")
            .write(b"whoami\n")
            .read(b"alice\n")
            .read(b"$ \n")
            .build();

        let err = execute(&LineProbe::new(&config), Connection::new(mock, soon()))
            .await
            .unwrap_err();
        match err {
            Error::Probe(ProbeError::OutputMismatch { expected, output }) => {
                assert_eq!(expected, "alice");
                assert_eq!(output, "alice\n$");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            ProbeError::OutputMismatch {
                expected: "alice".into(),
                output: "bob".into()
            }
            .to_string(),
            "expected output \"alice\" but got \"bob\""
        );
    }

    #[tokio::test]
    async fn test_empty_output_matches_empty_expectation() {
        init_logging();
        let config = config("");
        let (client, mut server) = tokio::io::duplex(256);

        let peer = tokio::spawn(async move {
            server.write_all(b"login:\n").await.unwrap();
            let mut buf = [0u8; 6];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"alice\n");

            server.write_all(b"Password:\n").await.unwrap();
            let mut buf = [0u8; 7];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"s3cret\n");

            server.write_all(b"Welcome\n").await.unwrap();
            let mut buf = [0u8; 7];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"whoami\n");

            // Say nothing until the probe hangs up.
            let mut rest = Vec::new();
            server.read_to_end(&mut rest).await.unwrap();
        });

        let report = execute(&LineProbe::new(&config), Connection::new(client, soon()))
            .await
            .unwrap();
        assert_eq!(report.output, "");
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_partial_line_is_not_captured() {
        let config = config("one");
        let mock = tokio_test::io::Builder::new()
            .read(b"login:\n")
            .write(b"alice\n")
            .read(b"Password:\n")
            .write(b"s3cret\n")
            .read(b"ok\n")
            .write(b"whoami\n")
            .read(b"one\nuser@host$ ")
            .build();

        let report = execute(&LineProbe::new(&config), Connection::new(mock, soon()))
            .await
            .unwrap();
        assert_eq!(report.output, "one\n");
    }

    #[tokio::test]
    async fn test_login_prompt_never_arrives() {
        let config = config("alice");
        let (client, mut server) = tokio::io::duplex(256);
        server.write_all(b"banner without prompt\n").await.unwrap();

        let conn = Connection::new(client, Instant::now() + Duration::from_millis(100));
        let err = execute(&LineProbe::new(&config), conn).await.unwrap_err();

        match err {
            Error::Probe(err) => {
                assert_eq!(err.stage(), Some(Stage::Login));
                assert_eq!(err.observed(), Some("banner without prompt\n"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        drop(server);
    }

    #[tokio::test]
    async fn test_stage_line_stops_at_buffer_limit() {
        let mut config = config("alice");
        config.timings.max_buffer = 16;
        let mock = tokio_test::io::Builder::new()
            .read(b"a banner far longer than the limit\n")
            .build();

        let err = execute(&LineProbe::new(&config), Connection::new(mock, soon()))
            .await
            .unwrap_err();
        match err {
            Error::Probe(ProbeError::Stage { stage, source }) => {
                assert_eq!(stage, Stage::Login);
                assert!(matches!(source, ChannelError::BufferLimit { limit: 16, .. }));
                assert_eq!(source.partial(), "a banner far lon");
                assert_eq!(source.targets(), ["login:".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_output_capture_stops_at_buffer_limit() {
        init_logging();
        let mut config = config("alice");
        config.timings.max_buffer = 32;
        let mock = tokio_test::io::Builder::new()
            .read(b"login:\n")
            .write(b"alice\n")
            .read(b"Password:\n")
            .write(b"s3cret\n")
            .read(b"Welcome to Ubuntu\n")
            .write(b"whoami\n")
            .read(b"line one of output\nline two of output\n")
            .build();

        let err = execute(&LineProbe::new(&config), Connection::new(mock, soon()))
            .await
            .unwrap_err();
        match err {
            Error::Probe(ProbeError::Stage { stage, source }) => {
                assert_eq!(stage, Stage::Output);
                assert!(matches!(source, ChannelError::BufferLimit { limit: 32, .. }));
                assert_eq!(source.partial(), "line one of output\nline two of o");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
