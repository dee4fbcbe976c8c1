//! SSH connection record
//!
//! The flat record persisted by the settings store and consumed by every
//! remote operation.

use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, Result};

/// Port used when the record leaves it empty
pub const DEFAULT_PORT: u16 = 22;

/// SSH connection configuration
///
/// All fields are strings, matching the persisted form. An empty password
/// means "no password": authentication falls back to agent and key files.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Remote hostname or IP address
    pub host: String,

    /// SSH port as a decimal string
    pub port: String,

    /// Username for authentication
    pub username: String,

    /// Password for authentication and sudo, may be empty
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT.to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create a new record with the minimal required fields
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// Set the SSH port
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// The password, or None when empty
    pub fn password(&self) -> Option<&str> {
        Some(self.password.as_str()).filter(|p| !p.is_empty())
    }

    /// Parsed port; empty means the default port
    pub fn port_number(&self) -> Result<u16> {
        let port = self.port.trim();
        if port.is_empty() {
            return Ok(DEFAULT_PORT);
        }
        match port.parse::<u16>() {
            Ok(0) | Err(_) => Err(RemoteError::incomplete(format!(
                "invalid port '{}'",
                self.port
            ))),
            Ok(n) => Ok(n),
        }
    }

    /// Check that host and username are present before any connection attempt
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if !missing.is_empty() {
            return Err(RemoteError::incomplete(format!(
                "missing {}",
                missing.join(" and ")
            )));
        }
        self.port_number().map(|_| ())
    }

    /// `user@host:port` for log lines
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password().map(|_| "********"))
            .finish()
    }
}
