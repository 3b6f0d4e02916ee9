//! Probe configuration.
//!
//! The configuration record arrives as JSON from whoever schedules the probe.
//! It is decoded and validated once; the resulting [`ProbeConfig`] is
//! read-only for the lifetime of a probe.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default port when the record does not name one.
pub const DEFAULT_PORT: u16 = 22;

/// Which probe sequence to run against the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Byte-oriented exchange that refuses telnet option negotiation and
    /// matches prompts by substring.
    Telnet,

    /// Line-oriented exchange that captures output until the peer goes idle
    /// and compares it exactly.
    #[default]
    Line,
}

/// Tunables for the probe sequences.
#[derive(Debug, Clone)]
pub struct ProbeTimings {
    /// Pause before sending the command in line mode.
    pub settle_delay: Duration,

    /// Per-read window that marks the end of command output in line mode.
    pub idle_timeout: Duration,

    /// Maximum bytes accumulated by a single wait.
    pub max_buffer: usize,
}

impl Default for ProbeTimings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            idle_timeout: Duration::from_millis(250),
            max_buffer: 1024 * 1024,
        }
    }
}

/// Validated probe configuration.
#[derive(Debug)]
pub struct ProbeConfig {
    /// Target host (hostname or IP address).
    pub server: String,

    /// Target port.
    pub port: u16,

    /// Login name.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Command to run once logged in.
    pub command: String,

    /// Output the command is expected to produce. May be empty.
    pub expected_output: String,

    /// Sequence to run.
    pub mode: ProbeMode,

    /// Sequence tunables.
    pub timings: ProbeTimings,
}

/// The record as it arrives on the wire, before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: String,
    #[serde(default = "default_port")]
    port: i64,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    command: String,
    #[serde(default)]
    expected_output: String,
    #[serde(default)]
    mode: ProbeMode,
}

fn default_port() -> i64 {
    i64::from(DEFAULT_PORT)
}

impl ProbeConfig {
    /// Decode and validate a JSON configuration record.
    pub fn from_json(record: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(record).map_err(ConfigError::Parse)?;
        let port = check_fields(
            &raw.server,
            raw.port,
            &raw.username,
            &raw.password,
            &raw.command,
        )?;

        Ok(Self {
            server: raw.server,
            port,
            username: raw.username,
            password: SecretString::from(raw.password),
            command: raw.command,
            expected_output: raw.expected_output,
            mode: raw.mode,
            timings: ProbeTimings::default(),
        })
    }

    /// Re-run field validation on an already built configuration.
    pub fn validate(&self) -> Result<()> {
        check_fields(
            &self.server,
            i64::from(self.port),
            &self.username,
            self.password.expose_secret(),
            &self.command,
        )?;
        Ok(())
    }

    /// The `host:port` address to dial, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        join_host_port(&self.server, self.port)
    }
}

/// Check a JSON configuration record without keeping the result.
pub fn validate(record: &str) -> Result<()> {
    ProbeConfig::from_json(record).map(|_| ())
}

/// Validate individual fields, returning the port narrowed to `u16`.
pub(crate) fn check_fields(
    server: &str,
    port: i64,
    username: &str,
    password: &str,
    command: &str,
) -> std::result::Result<u16, ConfigError> {
    if server.is_empty() {
        return Err(ConfigError::MissingServer {
            got: server.to_string(),
        });
    }

    let port = match u16::try_from(port) {
        Ok(p) if p != 0 => p,
        _ => return Err(ConfigError::InvalidPort { got: port }),
    };

    if username.is_empty() {
        return Err(ConfigError::MissingUsername {
            got: username.to_string(),
        });
    }

    if password.is_empty() {
        return Err(ConfigError::MissingPassword);
    }

    if command.is_empty() {
        return Err(ConfigError::MissingCommand {
            got: command.to_string(),
        });
    }

    Ok(port)
}

/// Join host and port, wrapping hosts that contain a colon in brackets.
pub(crate) fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_from_json_defaults() {
        let config = ProbeConfig::from_json(
            r#"{"server":"10.0.0.5","username":"alice","password":"pw","command":"whoami"}"#,
        )
        .unwrap();

        assert_eq!(config.port, 22);
        assert_eq!(config.mode, ProbeMode::Line);
        assert_eq!(config.expected_output, "");
        assert_eq!(config.password.expose_secret(), "pw");
        assert_eq!(config.timings.idle_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_json_telnet_mode() {
        let config = ProbeConfig::from_json(
            r#"{"server":"h","port":23,"username":"u","password":"p","command":"id","expected_output":"uid","mode":"telnet"}"#,
        )
        .unwrap();

        assert_eq!(config.port, 23);
        assert_eq!(config.mode, ProbeMode::Telnet);
        assert_eq!(config.expected_output, "uid");
    }

    #[test]
    fn test_missing_server() {
        let err = validate(r#"{"username":"u","password":"p","command":"c"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingServer { .. })));
        assert_eq!(
            err.to_string(),
            "Configuration error: server is required; got \"\""
        );
    }

    #[test]
    fn test_port_out_of_range() {
        for port in [0, -1, 65536] {
            let record = format!(
                r#"{{"server":"h","port":{},"username":"u","password":"p","command":"c"}}"#,
                port
            );
            match validate(&record) {
                Err(Error::Config(ConfigError::InvalidPort { got })) => assert_eq!(got, port),
                other => panic!("unexpected result for port {}: {:?}", port, other),
            }
        }
    }

    #[test]
    fn test_missing_credentials_and_command() {
        let err = validate(r#"{"server":"h","password":"p","command":"c"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingUsername { .. })));

        let err = validate(r#"{"server":"h","username":"u","command":"c"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingPassword)));

        let err = validate(r#"{"server":"h","username":"u","password":"p"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingCommand { .. })));
    }

    #[test]
    fn test_malformed_record() {
        let err = validate("not json").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_address_brackets_ipv6() {
        assert_eq!(join_host_port("example.net", 23), "example.net:23");
        assert_eq!(join_host_port("::1", 2323), "[::1]:2323");
    }
}
