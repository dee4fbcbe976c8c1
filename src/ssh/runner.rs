//! Command execution on an open connection
//!
//! [`SessionRunner`] opens one session per command and picks the execution
//! mode from the command text:
//!
//! - **plain**: run the command, return combined output, fail with
//!   [`RemoteError::CommandFailed`] (output included) on a non-zero exit;
//! - **escalated** (`sudo ...` with a configured password): run the command as
//!   `sudo -S ...`, deliver the password on stdin, and if sudo rejects it,
//!   retry the original command once in plain mode on a new session.

use tracing::{debug, info, warn};

use super::escalation::{has_auth_failure, is_escalated, rewrite_for_stdin};
use super::session::{RemoteSession, SessionOpener};
use crate::error::{RemoteError, Result};

/// Runs single commands on sessions opened from `O`
pub struct SessionRunner<'a, O> {
    opener: &'a O,
    password: Option<&'a str>,
}

impl<'a, O: SessionOpener> SessionRunner<'a, O> {
    /// Runner without an escalation password; every command runs in plain mode
    pub fn new(opener: &'a O) -> Self {
        Self {
            opener,
            password: None,
        }
    }

    /// Password delivered to `sudo` for escalated commands; empty means none
    pub fn with_password(mut self, password: Option<&'a str>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Run `command`, returning its combined output
    pub async fn run(&self, command: &str) -> Result<String> {
        match self.password {
            Some(password) if is_escalated(command) => {
                self.run_escalated(command, password).await
            }
            _ => self.run_plain(command).await,
        }
    }

    /// Run `command` on a fresh session without touching its stdin
    pub async fn run_plain(&self, command: &str) -> Result<String> {
        debug!("Running command: {}", command);
        let session = self.opener.open_session().await?;
        let result = session.exec(command).await?;

        if result.success() {
            Ok(result.output)
        } else {
            let reason = result.failure_reason();
            Err(RemoteError::command_failed(result.output, reason))
        }
    }

    async fn run_escalated(&self, command: &str, password: &str) -> Result<String> {
        let rewritten = rewrite_for_stdin(command);
        debug!("Running escalated command: {}", rewritten);

        let session = self.opener.open_session().await?;
        let result = session.exec_with_secret(&rewritten, password).await?;

        if result.success() {
            return Ok(result.output);
        }

        if has_auth_failure(&result.output) {
            warn!("sudo rejected the configured password, retrying without stdin password");
            let fallback = self.run_plain(command).await;
            if fallback.is_ok() {
                info!("Fallback execution succeeded");
            }
            return fallback;
        }

        let reason = result.failure_reason();
        Err(RemoteError::command_failed(result.output, reason))
    }
}
