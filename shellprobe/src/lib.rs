//! # Shellprobe
//!
//! Async probe that checks a remote interactive shell service end to end.
//!
//! A probe dials the target, waits for the login prompt, supplies
//! credentials, waits for a shell, runs one command and checks its output.
//! Two sequences are available:
//!
//! - **telnet**: byte oriented, refuses every telnet option the peer
//!   negotiates, finds prompts by substring and passes if the output
//!   contains the expected text.
//! - **line**: line oriented, ends output capture when the peer goes idle
//!   and passes if the trimmed output equals the trimmed expected text.
//!
//! Every probe is bounded by a single absolute deadline and closes its
//! connection on every path. Retries and concurrency across targets are up
//! to the caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use shellprobe::{ProbeBuilder, ProbeMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shellprobe::Error> {
//!     let config = ProbeBuilder::new("192.168.1.1")
//!         .port(23)
//!         .username("admin")
//!         .password("secret")
//!         .command("whoami")
//!         .expected_output("admin")
//!         .mode(ProbeMode::Telnet)
//!         .build()?;
//!
//!     let report = shellprobe::run_with_timeout(&config, Duration::from_secs(10)).await?;
//!     println!("passed in {:?}", report.elapsed);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod probe;
pub mod transport;

// Re-export main types for convenience
pub use config::{ProbeConfig, ProbeMode, ProbeTimings};
pub use error::{Error, ProbeError, Stage};
pub use probe::{
    LineProbe, Probe, ProbeBuilder, ProbeReport, TelnetProbe, execute, run, run_with_timeout,
};
pub use transport::{Connection, LineEnding};
