//! Single-use command sessions
//!
//! A session runs exactly one command. Both execution methods take the session
//! by value, so a session cannot be reused after its command was started.

use async_trait::async_trait;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::command::CommandOutput;
use super::escalation::{PromptWatch, PROMPT_GRACE};
use crate::error::{RemoteError, Result};

/// One command-execution context on an open connection
#[async_trait]
pub trait RemoteSession: Send {
    /// Run `command` and capture its combined output
    async fn exec(self, command: &str) -> Result<CommandOutput>;

    /// Run `command`, writing `secret` and a newline to its standard input
    /// once it prompts for a password (or after [`PROMPT_GRACE`]), then
    /// closing standard input
    async fn exec_with_secret(self, command: &str, secret: &str) -> Result<CommandOutput>;
}

/// Anything that can open fresh sessions, typically a [`Connection`](super::Connection)
#[async_trait]
pub trait SessionOpener: Sync {
    type Session: RemoteSession;

    /// Open a new session; fails with [`RemoteError::SessionOpen`] when refused
    async fn open_session(&self) -> Result<Self::Session>;
}

/// Session backed by an SSH channel
pub struct ChannelSession {
    channel: Channel<Msg>,
}

impl ChannelSession {
    pub(crate) fn new(channel: Channel<Msg>) -> Self {
        Self { channel }
    }

    async fn start(&self, command: &str) -> Result<()> {
        self.channel
            .exec(true, command)
            .await
            .map_err(|e| RemoteError::session_open(format!("failed to start command: {}", e)))
    }
}

#[async_trait]
impl RemoteSession for ChannelSession {
    async fn exec(mut self, command: &str) -> Result<CommandOutput> {
        self.start(command).await?;
        // Plain commands get an empty stdin
        if let Err(e) = self.channel.eof().await {
            debug!("Failed to close remote stdin: {}", e);
        }
        collect_output(&mut self.channel, None).await
    }

    async fn exec_with_secret(mut self, command: &str, secret: &str) -> Result<CommandOutput> {
        self.start(command).await?;
        collect_output(&mut self.channel, Some(secret)).await
    }
}

/// What the output loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Keep waiting for channel messages
    Continue,
    /// Write the secret line, then close standard input
    SendSecret,
    /// The command is over; stop reading
    Finish,
}

/// Secret delivery progress for one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Secret {
    NotNeeded,
    Pending,
    Sent,
}

/// Channel-independent bookkeeping for one command's output.
///
/// Feeds on channel messages and the grace timer and decides when the secret
/// goes out and when reading stops. The secret is requested at most once: on
/// the first prompt, or when the grace period expires with no prompt. It is
/// never requested once the exit status has arrived.
#[derive(Debug)]
pub(crate) struct OutputCollector {
    output: CommandOutput,
    prompt: PromptWatch,
    secret: Secret,
    got_exit_status: bool,
    got_eof: bool,
}

impl OutputCollector {
    pub(crate) fn new(with_secret: bool) -> Self {
        Self {
            output: CommandOutput::new(),
            prompt: PromptWatch::new(),
            secret: if with_secret {
                Secret::Pending
            } else {
                Secret::NotNeeded
            },
            got_exit_status: false,
            got_eof: false,
        }
    }

    /// Whether the grace timer still matters
    pub(crate) fn grace_armed(&self) -> bool {
        self.secret == Secret::Pending && !self.got_exit_status
    }

    /// Handle one message from the channel (`None` once the channel is gone)
    pub(crate) fn on_message(&mut self, msg: Option<ChannelMsg>) -> Step {
        match msg {
            Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                self.output.push(&data);
                if self.secret != Secret::NotNeeded && self.prompt.observe(&mut self.output.output)
                {
                    debug!("Password prompt detected");
                    return self.release_secret();
                }
                Step::Continue
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                self.output.exit_code = Some(exit_status);
                self.got_exit_status = true;
                self.finish_if_drained()
            }
            Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                self.output.exit_signal = Some(format!("{:?}", signal_name));
                self.got_exit_status = true;
                self.finish_if_drained()
            }
            Some(ChannelMsg::Eof) => {
                self.got_eof = true;
                self.finish_if_drained()
            }
            Some(ChannelMsg::Close) | None => Step::Finish,
            Some(_) => Step::Continue,
        }
    }

    /// Handle expiry of the prompt grace period
    pub(crate) fn on_grace_elapsed(&mut self) -> Step {
        if self.grace_armed() {
            debug!("No password prompt after {:?}", PROMPT_GRACE);
        }
        self.release_secret()
    }

    /// The collected output, with any held-back bytes flushed
    pub(crate) fn into_output(mut self) -> CommandOutput {
        self.output.finish();
        self.output
    }

    fn release_secret(&mut self) -> Step {
        if self.grace_armed() {
            self.secret = Secret::Sent;
            Step::SendSecret
        } else {
            Step::Continue
        }
    }

    fn finish_if_drained(&self) -> Step {
        if self.got_exit_status && self.got_eof {
            Step::Finish
        } else {
            Step::Continue
        }
    }
}

/// Collect combined output until the command exits and the channel drains,
/// delivering `secret` when the collector asks for it.
async fn collect_output(channel: &mut Channel<Msg>, secret: Option<&str>) -> Result<CommandOutput> {
    let mut collector = OutputCollector::new(secret.is_some());

    let grace = sleep(PROMPT_GRACE);
    tokio::pin!(grace);

    loop {
        let step = tokio::select! {
            msg = channel.wait() => collector.on_message(msg),
            _ = &mut grace, if collector.grace_armed() => collector.on_grace_elapsed(),
        };

        match step {
            Step::Continue => {}
            Step::SendSecret => {
                if let Some(secret) = secret {
                    send_secret(channel, secret).await;
                }
            }
            Step::Finish => break,
        }
    }

    let output = collector.into_output();
    debug!(
        "Command completed: exit_code={:?}, exit_signal={:?}, output_len={}",
        output.exit_code,
        output.exit_signal,
        output.output.len()
    );

    Ok(output)
}

/// Write the secret line and close standard input
async fn send_secret(channel: &Channel<Msg>, secret: &str) {
    let line = format!("{}\n", secret);
    if let Err(e) = channel.data(line.as_bytes()).await {
        warn!("Failed to write password to remote stdin: {}", e);
        return;
    }
    if let Err(e) = channel.eof().await {
        warn!("Failed to close remote stdin: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use russh::{CryptoVec, Sig};

    fn data(text: &str) -> Option<ChannelMsg> {
        Some(ChannelMsg::Data {
            data: CryptoVec::from_slice(text.as_bytes()),
        })
    }

    fn stderr(text: &str) -> Option<ChannelMsg> {
        Some(ChannelMsg::ExtendedData {
            data: CryptoVec::from_slice(text.as_bytes()),
            ext: 1,
        })
    }

    fn exit(code: u32) -> Option<ChannelMsg> {
        Some(ChannelMsg::ExitStatus { exit_status: code })
    }

    fn eof() -> Option<ChannelMsg> {
        Some(ChannelMsg::Eof)
    }

    #[test]
    fn test_plain_command_collects_until_exit_and_eof() {
        let mut collector = OutputCollector::new(false);
        assert!(!collector.grace_armed());

        assert_eq!(collector.on_message(data("out\n")), Step::Continue);
        assert_eq!(collector.on_message(stderr("err\n")), Step::Continue);
        assert_eq!(collector.on_message(exit(0)), Step::Continue);
        assert_eq!(collector.on_message(eof()), Step::Finish);

        let output = collector.into_output();
        assert_eq!(output.output, "out\nerr\n");
        assert!(output.success());
    }

    #[test]
    fn test_eof_before_exit_status() {
        let mut collector = OutputCollector::new(false);
        assert_eq!(collector.on_message(eof()), Step::Continue);
        assert_eq!(collector.on_message(exit(2)), Step::Finish);
        assert_eq!(collector.into_output().exit_code, Some(2));
    }

    #[test]
    fn test_plain_command_keeps_prompt_like_output() {
        let mut collector = OutputCollector::new(false);
        collector.on_message(data("Password:"));
        assert_eq!(collector.on_grace_elapsed(), Step::Continue);
        collector.on_message(exit(0));
        collector.on_message(eof());
        assert_eq!(collector.into_output().output, "Password:");
    }

    #[test]
    fn test_prompt_releases_secret_once_and_is_stripped() {
        let mut collector = OutputCollector::new(true);
        assert!(collector.grace_armed());

        assert_eq!(
            collector.on_message(stderr("[sudo] password for admin: ")),
            Step::SendSecret
        );
        assert!(!collector.grace_armed());
        assert_eq!(collector.on_grace_elapsed(), Step::Continue);

        assert_eq!(collector.on_message(data("root\n")), Step::Continue);
        // A second prompt after a rejected password does not resend
        assert_eq!(
            collector.on_message(stderr("Sorry, try again.\n[sudo] password for admin: ")),
            Step::Continue
        );
        collector.on_message(exit(1));
        assert_eq!(collector.on_message(eof()), Step::Finish);

        let output = collector.into_output();
        assert_eq!(
            output.output,
            "root\nSorry, try again.\n[sudo] password for admin: "
        );
    }

    #[test]
    fn test_grace_releases_secret_without_prompt() {
        let mut collector = OutputCollector::new(true);

        assert_eq!(collector.on_grace_elapsed(), Step::SendSecret);
        assert!(!collector.grace_armed());
        assert_eq!(collector.on_grace_elapsed(), Step::Continue);

        // A late prompt is still stripped but not answered again
        assert_eq!(
            collector.on_message(stderr("[sudo] password for admin: ")),
            Step::Continue
        );
        collector.on_message(data("root\n"));
        collector.on_message(exit(0));
        collector.on_message(eof());
        assert_eq!(collector.into_output().output, "root\n");
    }

    #[test]
    fn test_no_secret_after_exit_status() {
        let mut collector = OutputCollector::new(true);

        assert_eq!(collector.on_message(data("root\n")), Step::Continue);
        assert_eq!(collector.on_message(exit(0)), Step::Continue);
        assert!(!collector.grace_armed());
        assert_eq!(collector.on_grace_elapsed(), Step::Continue);
        assert_eq!(collector.on_message(stderr("Password:")), Step::Continue);
        assert_eq!(collector.on_message(eof()), Step::Finish);
    }

    #[test]
    fn test_marker_in_command_output_is_not_a_prompt() {
        let mut collector = OutputCollector::new(true);

        let step = collector.on_message(data("Last password change: Jan 01\nPassword: expires never\n"));
        assert_eq!(step, Step::Continue);
        // Still answered by the grace timer, output untouched
        assert_eq!(collector.on_grace_elapsed(), Step::SendSecret);
        collector.on_message(exit(0));
        collector.on_message(eof());
        assert_eq!(
            collector.into_output().output,
            "Last password change: Jan 01\nPassword: expires never\n"
        );
    }

    #[test]
    fn test_close_finishes_without_exit_status() {
        let mut collector = OutputCollector::new(true);
        collector.on_message(data("partial"));
        assert_eq!(collector.on_message(Some(ChannelMsg::Close)), Step::Finish);

        let output = collector.into_output();
        assert_eq!(output.output, "partial");
        assert!(!output.success());
    }

    #[test]
    fn test_channel_gone_finishes() {
        let mut collector = OutputCollector::new(false);
        assert_eq!(collector.on_message(None), Step::Finish);
    }

    #[test]
    fn test_exit_signal_recorded() {
        let mut collector = OutputCollector::new(false);
        let step = collector.on_message(Some(ChannelMsg::ExitSignal {
            signal_name: Sig::KILL,
            core_dumped: false,
            error_message: String::new(),
            lang_tag: String::new(),
        }));
        assert_eq!(step, Step::Continue);
        assert_eq!(collector.on_message(eof()), Step::Finish);

        let output = collector.into_output();
        assert_eq!(output.exit_signal.as_deref(), Some("KILL"));
        assert!(!output.success());
    }

    #[test]
    fn test_split_character_across_packets() {
        let mut collector = OutputCollector::new(false);
        let bytes = "né\n".as_bytes();
        collector.on_message(Some(ChannelMsg::Data {
            data: CryptoVec::from_slice(&bytes[..2]),
        }));
        collector.on_message(Some(ChannelMsg::Data {
            data: CryptoVec::from_slice(&bytes[2..]),
        }));
        collector.on_message(exit(0));
        collector.on_message(eof());
        assert_eq!(collector.into_output().output, "né\n");
    }
}
