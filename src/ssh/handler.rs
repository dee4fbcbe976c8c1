//! SSH client handler implementation
//!
//! Implements the `russh::client::Handler` trait. Server key verification is
//! governed by an explicit [`HostKeyPolicy`].

use std::path::PathBuf;

use russh::keys::known_hosts::{check_known_hosts, check_known_hosts_path};
use tracing::{debug, warn};

/// How server host keys are trusted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept any host key without verification
    ///
    /// This is the historical behavior of remotectl. It leaves connections open
    /// to man-in-the-middle attacks and is logged on every connection.
    #[default]
    AcceptAnyHostKey,

    /// Require the key to be present in a known_hosts file
    /// (`~/.ssh/known_hosts` when no path is given)
    KnownHosts { path: Option<PathBuf> },
}

/// SSH client handler for russh
#[derive(Debug, Clone)]
pub struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl SshHandler {
    /// Create a handler verifying keys for `host:port` under `policy`
    pub fn new(host: impl Into<String>, port: u16, policy: HostKeyPolicy) -> Self {
        Self {
            host: host.into(),
            port,
            policy,
        }
    }

    fn verify(&self, server_public_key: &russh::keys::PublicKey) -> bool {
        match &self.policy {
            HostKeyPolicy::AcceptAnyHostKey => {
                warn!(
                    "Host key verification disabled, accepting key for {}:{}",
                    self.host, self.port
                );
                true
            }
            HostKeyPolicy::KnownHosts { path } => {
                let result = match path {
                    Some(path) => {
                        check_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => check_known_hosts(&self.host, self.port, server_public_key),
                };
                match result {
                    Ok(true) => {
                        debug!("Host key verified for {}:{}", self.host, self.port);
                        true
                    }
                    Ok(false) => {
                        warn!("Unknown host key for {}:{}", self.host, self.port);
                        false
                    }
                    Err(e) => {
                        warn!(
                            "Host key verification failed for {}:{}: {}",
                            self.host, self.port, e
                        );
                        false
                    }
                }
            }
        }
    }
}

impl russh::client::Handler for SshHandler {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self.verify(server_public_key))
    }
}
