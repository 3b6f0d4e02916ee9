//! Error types for shellprobe.

use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for shellprobe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration was rejected before any network activity
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connection-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Prompt matching errors outside of a probe stage
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Probe sequence failures
    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),
}

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration record could not be decoded
    #[error("Invalid configuration record: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("server is required; got {got:?}")]
    MissingServer { got: String },

    #[error("port must be between 1 and 65535; got {got}")]
    InvalidPort { got: i64 },

    #[error("username is required; got {got:?}")]
    MissingUsername { got: String },

    #[error("password is required; got \"\"")]
    MissingPassword,

    #[error("command is required; got {got:?}")]
    MissingCommand { got: String },
}

/// Transport layer errors (dialing and writing).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The deadline passed before the connection was established
    #[error("Connection to {address} timed out")]
    ConnectTimeout { address: String },

    /// The deadline passed during a write
    #[error("Write deadline exceeded")]
    Timeout,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Prompt wait errors.
///
/// Every variant carries the targets that were being awaited and the text
/// gathered before the wait ended, so callers can log what the peer sent.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The deadline passed before any target appeared
    #[error("Timed out waiting for {targets:?}")]
    Timeout { targets: Vec<String>, partial: String },

    /// The peer closed the stream before any target appeared
    #[error("Connection closed while waiting for {targets:?}")]
    Eof { targets: Vec<String>, partial: String },

    /// Read failed while waiting
    #[error("Read failed while waiting for {targets:?}: {source}")]
    Io {
        targets: Vec<String>,
        partial: String,
        #[source]
        source: io::Error,
    },

    /// The accumulated text reached the buffer bound without a match
    #[error("Buffer limit of {limit} bytes reached while waiting for {targets:?}")]
    BufferLimit {
        limit: usize,
        targets: Vec<String>,
        partial: String,
    },
}

impl ChannelError {
    /// Build the error matching an I/O failure that ended a wait.
    pub(crate) fn from_io(err: io::Error, targets: Vec<String>, partial: String) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Self::Timeout { targets, partial },
            io::ErrorKind::UnexpectedEof => Self::Eof { targets, partial },
            _ => Self::Io {
                targets,
                partial,
                source: err,
            },
        }
    }

    /// Text received before the wait ended.
    pub fn partial(&self) -> &str {
        match self {
            Self::Timeout { partial, .. }
            | Self::Eof { partial, .. }
            | Self::Io { partial, .. }
            | Self::BufferLimit { partial, .. } => partial.as_str(),
        }
    }

    /// Targets that were being awaited.
    pub fn targets(&self) -> &[String] {
        match self {
            Self::Timeout { targets, .. }
            | Self::Eof { targets, .. }
            | Self::Io { targets, .. }
            | Self::BufferLimit { targets, .. } => targets.as_slice(),
        }
    }

    /// Whether the wait ended because the deadline passed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// The step of the probe exchange a wait belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Login,
    Password,
    Shell,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Login => "login prompt",
            Stage::Password => "password prompt",
            Stage::Shell => "shell prompt",
            Stage::Output => "command output",
        };
        f.write_str(name)
    }
}

/// Probe sequence errors.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// A prompt wait failed at the given stage
    #[error("Waiting for {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ChannelError,
    },

    /// The peer asked for a login again after the password was sent
    #[error("Login failed for user '{user}'")]
    AuthenticationRejected { user: String },

    /// The captured output does not contain the expected text
    #[error("expected output {expected:?} not found in {output:?}")]
    OutputNotFound { expected: String, output: String },

    /// The trimmed output differs from the trimmed expected text
    #[error("expected output \"{expected}\" but got \"{output}\"")]
    OutputMismatch { expected: String, output: String },
}

impl ProbeError {
    /// The stage a wait failure belongs to, if this is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Text observed by the probe when it failed, where available.
    pub fn observed(&self) -> Option<&str> {
        match self {
            Self::Stage { source, .. } => Some(source.partial()),
            Self::OutputNotFound { output, .. } | Self::OutputMismatch { output, .. } => {
                Some(output.as_str())
            }
            Self::AuthenticationRejected { .. } => None,
        }
    }
}

/// Result type alias using shellprobe's Error.
pub type Result<T> = std::result::Result<T, Error>;
