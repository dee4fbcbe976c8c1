//! Scripted in-memory sessions for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::command::CommandOutput;
use super::session::{RemoteSession, SessionOpener};
use crate::error::{RemoteError, Result};

/// One command seen by a scripted session
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub command: String,
    pub secret: Option<String>,
}

/// Opener whose sessions answer from a fixed command → output table.
/// Unknown commands exit with status 127.
#[derive(Default)]
pub(crate) struct ScriptedOpener {
    replies: Arc<HashMap<String, CommandOutput>>,
    calls: Arc<Mutex<Vec<Call>>>,
    opened: AtomicUsize,
    refuse: bool,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, command: &str, output: CommandOutput) -> Self {
        Arc::make_mut(&mut self.replies).insert(command.to_string(), output);
        self
    }

    pub fn refuse_sessions(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionOpener for ScriptedOpener {
    type Session = ScriptedSession;

    async fn open_session(&self) -> Result<ScriptedSession> {
        if self.refuse {
            return Err(RemoteError::session_open("administratively prohibited"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            replies: Arc::clone(&self.replies),
            calls: Arc::clone(&self.calls),
        })
    }
}

pub(crate) struct ScriptedSession {
    replies: Arc<HashMap<String, CommandOutput>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedSession {
    fn answer(self, command: &str, secret: Option<&str>) -> CommandOutput {
        self.calls.lock().unwrap().push(Call {
            command: command.to_string(),
            secret: secret.map(str::to_string),
        });
        self.replies.get(command).cloned().unwrap_or_else(|| {
            CommandOutput::exited(format!("sh: {}: command not found\n", command), 127)
        })
    }
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn exec(self, command: &str) -> Result<CommandOutput> {
        Ok(self.answer(command, None))
    }

    async fn exec_with_secret(self, command: &str, secret: &str) -> Result<CommandOutput> {
        Ok(self.answer(command, Some(secret)))
    }
}
