//! Builder for probe configurations.

use std::time::Duration;

use secrecy::SecretString;

use crate::config::{DEFAULT_PORT, ProbeConfig, ProbeMode, ProbeTimings, check_fields};
use crate::error::Result;

/// Builder for constructing a [`ProbeConfig`] in code.
///
/// # Example
///
/// ```rust
/// use shellprobe::{ProbeBuilder, ProbeMode};
///
/// # fn example() -> Result<(), shellprobe::Error> {
/// let config = ProbeBuilder::new("192.168.1.1")
///     .port(23)
///     .username("admin")
///     .password("secret")
///     .command("uname -s")
///     .expected_output("Linux")
///     .mode(ProbeMode::Telnet)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ProbeBuilder {
    server: String,
    port: u16,
    username: String,
    password: String,
    command: String,
    expected_output: String,
    mode: ProbeMode,
    timings: ProbeTimings,
}

impl ProbeBuilder {
    /// Create a new builder for the specified host.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            command: String::new(),
            expected_output: String::new(),
            mode: ProbeMode::default(),
            timings: ProbeTimings::default(),
        }
    }

    /// Set the port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password. Telnet mode never sends it (see [`TelnetProbe`]).
    ///
    /// [`TelnetProbe`]: crate::TelnetProbe
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the command to run after login.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the output the command must produce.
    pub fn expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = expected.into();
        self
    }

    /// Select the probe sequence (default: line).
    pub fn mode(mut self, mode: ProbeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the pause before the command is sent in line mode.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.timings.settle_delay = delay;
        self
    }

    /// Set the quiet period that ends output capture in line mode.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.timings.idle_timeout = timeout;
        self
    }

    /// Set the most bytes a single wait may accumulate.
    pub fn max_buffer(mut self, bytes: usize) -> Self {
        self.timings.max_buffer = bytes;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<ProbeConfig> {
        let port = check_fields(
            &self.server,
            i64::from(self.port),
            &self.username,
            &self.password,
            &self.command,
        )?;

        Ok(ProbeConfig {
            server: self.server,
            port,
            username: self.username,
            password: SecretString::from(self.password),
            command: self.command,
            expected_output: self.expected_output,
            mode: self.mode,
            timings: self.timings,
        })
    }
}
