//! Option-aware probe sequence.

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use super::Probe;
use crate::channel::{LOGIN_PROMPT, OptionRefuser, PASSWORD_PROMPT, PromptReader, Prompts};
use crate::config::{ProbeConfig, ProbeMode};
use crate::error::{ProbeError, Result, Stage};
use crate::transport::{Connection, LineEnding};

/// Byte-oriented exchange with telnet option refusal.
///
/// 1. Wait for `ogin:`, send the username.
/// 2. Wait for `assword:`, send the username again (see below).
/// 3. Wait for a shell prompt (`$ ` or `# `), send the command.
/// 4. Wait for the next shell prompt; everything read is the output.
///
/// The probe passes if the output contains the expected text.
///
/// The line sent at the password prompt is the username, not the password.
/// This is long-standing behavior of the telnet check and is kept until
/// someone confirms whether it is intended.
pub struct TelnetProbe<'a> {
    config: &'a ProbeConfig,
}

impl<'a> TelnetProbe<'a> {
    /// Create an option-aware probe for `config`.
    pub fn new(config: &'a ProbeConfig) -> Self {
        Self { config }
    }
}

async fn wait<S>(
    reader: &mut PromptReader<'_, S, OptionRefuser>,
    prompts: &Prompts,
    stage: Stage,
) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let text = reader
        .read_until_any(prompts)
        .await
        .map_err(|source| ProbeError::Stage { stage, source })?;
    debug!("telnet: reached {}", stage);
    Ok(text)
}

impl Probe for TelnetProbe<'_> {
    fn mode(&self) -> ProbeMode {
        ProbeMode::Telnet
    }

    async fn exchange<S>(&self, conn: &mut Connection<S>) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let config = self.config;
        let shell = Prompts::shell();
        let mut reader = PromptReader::new(conn, OptionRefuser::new(), config.timings.max_buffer);

        wait(&mut reader, &Prompts::new([LOGIN_PROMPT]), Stage::Login).await?;
        reader.send_line(&config.username, LineEnding::CrLf).await?;

        wait(&mut reader, &Prompts::new([PASSWORD_PROMPT]), Stage::Password).await?;
        debug!("telnet: answering password prompt with the login name");
        reader.send_line(&config.username, LineEnding::CrLf).await?;

        wait(&mut reader, &shell, Stage::Shell).await?;
        debug!("telnet: sending command {:?}", config.command);
        reader.send_line(&config.command, LineEnding::CrLf).await?;

        wait(&mut reader, &shell, Stage::Output).await
    }

    fn verify(&self, output: &str) -> Result<()> {
        if output.contains(&self.config.expected_output) {
            Ok(())
        } else {
            Err(ProbeError::OutputNotFound {
                expected: self.config.expected_output.clone(),
                output: output.to_string(),
            }
            .into())
        }
    }
}
