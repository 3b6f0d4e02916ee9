//! Probe sequences and the entry points that run them.
//!
//! A probe is one login, command and verify attempt against one target,
//! bounded by one absolute deadline. There are no retries here; every
//! failure ends the attempt and the caller decides what to do next.

mod builder;
mod line;
mod report;
mod telnet;

pub use builder::ProbeBuilder;
pub use line::LineProbe;
pub use report::ProbeReport;
pub use telnet::TelnetProbe;

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

use crate::config::{ProbeConfig, ProbeMode};
use crate::error::Result;
use crate::transport::Connection;

/// Trait for probe sequences.
///
/// `exchange` decides how prompts are found and where the output ends;
/// `verify` decides whether that output passes.
pub trait Probe: Send + Sync {
    /// Which sequence this is.
    fn mode(&self) -> ProbeMode;

    /// Run the login and command exchange, returning the captured output.
    fn exchange<S>(
        &self,
        conn: &mut Connection<S>,
    ) -> impl Future<Output = Result<String>> + Send
    where
        S: AsyncRead + AsyncWrite + Unpin + Send;

    /// Compare captured output against the expectation.
    fn verify(&self, output: &str) -> Result<()>;
}

/// Run `probe` over an established connection.
///
/// The connection is closed whatever the outcome.
pub async fn execute<P, S>(probe: &P, mut conn: Connection<S>) -> Result<ProbeReport>
where
    P: Probe,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let start = Instant::now();
    let outcome = probe.exchange(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!("failed to close connection: {}", e);
    }

    let output = outcome?;
    let verdict = probe.verify(&output);
    let elapsed = start.elapsed();
    debug!(
        "{:?} probe finished in {:?}, passed={}",
        probe.mode(),
        elapsed,
        verdict.is_ok()
    );
    verdict?;

    Ok(ProbeReport::new(probe.mode(), output, elapsed))
}

/// Dial the configured target and run the configured sequence.
///
/// `deadline` bounds the dial and every read and write that follows.
pub async fn run(config: &ProbeConfig, deadline: Instant) -> Result<ProbeReport> {
    let conn = Connection::connect(&config.server, config.port, deadline).await?;

    match config.mode {
        ProbeMode::Telnet => execute(&TelnetProbe::new(config), conn).await,
        ProbeMode::Line => execute(&LineProbe::new(config), conn).await,
    }
}

/// Like [`run`], with the deadline `budget` from now.
pub async fn run_with_timeout(config: &ProbeConfig, budget: Duration) -> Result<ProbeReport> {
    run(config, Instant::now() + budget).await
}
