//! Top-level remote operations
//!
//! Each operation loads the persisted record, opens its own connection, runs
//! under the configured deadline and closes the connection before returning.
//! Nothing is cached between calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{RemoteError, Result};
use crate::ssh::info::collect as collect_info;
use crate::ssh::{
    sanitize_command, tester, AuthResolver, Connection, ConnectionConfig, Connector,
    SessionRunner, SystemInfo,
};
use crate::store::SettingsStore;

/// Remote administration facade used by the CLI and the MCP server
#[derive(Debug, Clone)]
pub struct RemoteControl {
    store: SettingsStore,
    connector: Connector,
    deadline: Duration,
    max_chars: Option<usize>,
}

impl RemoteControl {
    pub fn new(store: SettingsStore, connector: Connector, deadline: Duration) -> Self {
        Self {
            store,
            connector,
            deadline,
            max_chars: None,
        }
    }

    /// Build from validated CLI configuration
    pub fn from_config(config: &Config) -> Self {
        let resolver = if config.use_agent {
            AuthResolver::from_env()
        } else {
            AuthResolver::from_env().with_agent_socket(None)
        };
        Self::new(
            SettingsStore::new(&config.settings_path),
            Connector::new(resolver, config.host_key_policy.clone()),
            Duration::from_millis(config.timeout_ms),
        )
        .with_max_chars(config.max_chars)
    }

    /// Limit accepted command length (None = unlimited)
    pub fn with_max_chars(mut self, max_chars: Option<usize>) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Open a connection for the persisted record
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<Connection> {
        self.connector.connect(config).await
    }

    /// Run `command` on the configured host; sudo commands get the configured
    /// password on stdin
    pub async fn execute(&self, command: &str) -> Result<String> {
        let command = sanitize_command(command, self.max_chars)?;
        let config = self.store.require().await?;
        info!("Executing on {}: {}", config.target(), command);

        let deadline = self.start_clock();
        let connection = self.connect_by(deadline, &config).await?;
        let runner = SessionRunner::new(&connection).with_password(config.password());
        self.finish(deadline, &connection, runner.run(&command)).await
    }

    /// Check that the configured host accepts a connection and runs a command
    pub async fn test_connection(&self) -> Result<String> {
        let config = self.store.require().await?;
        let deadline = self.start_clock();
        let connection = self.connect_by(deadline, &config).await?;
        self.finish(deadline, &connection, tester::test(&connection))
            .await
    }

    /// Hostname, OS, architecture and uptime of the configured host
    pub async fn system_info(&self) -> Result<SystemInfo> {
        let config = self.store.require().await?;
        let deadline = self.start_clock();
        let connection = self.connect_by(deadline, &config).await?;
        self.finish(deadline, &connection, async {
            Ok(collect_info(&connection).await)
        })
        .await
    }

    /// The persisted record, or the default record when none exists
    pub async fn load_config(&self) -> Result<ConnectionConfig> {
        self.store.load_or_default().await
    }

    /// Persist a new record
    pub async fn save_config(&self, config: &ConnectionConfig) -> Result<String> {
        self.store.save(config).await?;
        Ok(format!(
            "SSH configuration saved to {}",
            self.store.path().display()
        ))
    }

    /// Deadline for an operation starting now
    fn start_clock(&self) -> Instant {
        Instant::now() + self.deadline
    }

    fn timed_out(&self) -> RemoteError {
        RemoteError::Timeout(self.deadline.as_millis() as u64)
    }

    /// Connect under the operation deadline; a handshake cut short drops
    /// the half-open transport
    async fn connect_by(&self, deadline: Instant, config: &ConnectionConfig) -> Result<Connection> {
        match timeout_at(deadline, self.connect(config)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Connecting to {} exceeded {}ms",
                    config.target(),
                    self.deadline.as_millis()
                );
                Err(self.timed_out())
            }
        }
    }

    /// Await `operation` under the remaining deadline, then close `connection`
    async fn finish<T>(
        &self,
        deadline: Instant,
        connection: &Connection,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let result = match timeout_at(deadline, operation).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Operation on {} exceeded {}ms, closing connection",
                    connection.target(),
                    self.deadline.as_millis()
                );
                Err(self.timed_out())
            }
        };
        connection.close().await;
        result
    }
}
