//! SSH connection establishment
//!
//! A [`Connector`] turns a [`ConnectionConfig`] into one authenticated
//! [`Connection`]. Connections are never pooled: each top-level operation
//! opens its own and closes it when done.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use tokio::time::timeout;
use tracing::{debug, error, info};

use super::auth::AuthResolver;
use super::config::ConnectionConfig;
use super::handler::{HostKeyPolicy, SshHandler};
use super::session::{ChannelSession, SessionOpener};
use crate::error::{RemoteError, Result};

/// Dial plus authentication timeout in seconds
pub const CONNECTION_TIMEOUT_SECS: u64 = 10;

/// Opens authenticated SSH connections
#[derive(Debug, Clone)]
pub struct Connector {
    resolver: AuthResolver,
    host_keys: HostKeyPolicy,
    connect_timeout: Duration,
}

impl Default for Connector {
    fn default() -> Self {
        Self::new(AuthResolver::from_env(), HostKeyPolicy::default())
    }
}

impl Connector {
    /// Create a connector with the default connection timeout
    pub fn new(resolver: AuthResolver, host_keys: HostKeyPolicy) -> Self {
        Self {
            resolver,
            host_keys,
            connect_timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Override the dial timeout
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Validate `config`, pick an authentication method, dial and authenticate.
    ///
    /// Authentication material is resolved before any network activity, so a
    /// config with no usable credential fails with
    /// [`RemoteError::NoAuthAvailable`] without dialing.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<Connection> {
        config.validate()?;
        let port = config.port_number()?;
        let auth = self.resolver.resolve(config).await?;

        info!(
            "Connecting to {}@{}:{} using {} authentication",
            config.username,
            config.host,
            port,
            auth.kind()
        );

        let ssh_config = Arc::new(client::Config::default());
        let handler = SshHandler::new(&config.host, port, self.host_keys.clone());

        let handshake = async move {
            let mut handle = client::connect(ssh_config, (config.host.as_str(), port), handler)
                .await
                .map_err(|e| RemoteError::connect(e.to_string()))?;

            if !auth.authenticate(&mut handle, &config.username).await? {
                return Err(RemoteError::connect(format!(
                    "authentication rejected for user '{}'",
                    config.username
                )));
            }
            Ok(handle)
        };

        let handle = match timeout(self.connect_timeout, handshake).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                error!("SSH connection to {} failed: {}", config.target(), e);
                return Err(e);
            }
            Err(_) => {
                error!(
                    "SSH connection to {} timed out after {}s",
                    config.target(),
                    self.connect_timeout.as_secs()
                );
                return Err(RemoteError::connect(format!(
                    "timeout after {}s",
                    self.connect_timeout.as_secs()
                )));
            }
        };

        info!("Connected to {}", config.target());

        Ok(Connection {
            handle,
            target: config.target(),
        })
    }
}

/// An open, authenticated SSH connection
///
/// Owned by the operation that created it. Call [`Connection::close`] when
/// done; dropping the connection also tears down the transport.
pub struct Connection {
    handle: Handle<SshHandler>,
    target: String,
}

impl Connection {
    /// `user@host:port` of the remote side
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Disconnect from the server
    pub async fn close(&self) {
        if let Err(e) = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
        {
            debug!("Disconnect from {} reported: {}", self.target, e);
        }
        info!("SSH connection to {} closed", self.target);
    }
}

#[async_trait]
impl SessionOpener for Connection {
    type Session = ChannelSession;

    async fn open_session(&self) -> Result<ChannelSession> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| RemoteError::session_open(e.to_string()))?;
        Ok(ChannelSession::new(channel))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
