//! Report type for a passing probe.

use std::time::Duration;

use crate::config::ProbeMode;

/// Outcome of a probe that passed.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// The sequence that was run.
    pub mode: ProbeMode,

    /// Captured command output. In telnet mode this includes the trailing
    /// prompt marker.
    pub output: String,

    /// Time from the start of the exchange to the verdict.
    pub elapsed: Duration,
}

impl ProbeReport {
    /// Create a report for a probe that passed.
    pub fn new(mode: ProbeMode, output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            mode,
            output: output.into(),
            elapsed,
        }
    }

    /// Get the output lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }

    /// Check if the output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.output.contains(pattern)
    }
}

impl std::fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output)
    }
}
