//! remotectl - Remote machine administration over SSH
//!
//! Runs shell commands on a single remote host described by a persisted
//! connection record. Commands starting with `sudo ` get the configured
//! password on stdin, with a plain retry when sudo rejects it.
//!
//! # Features
//!
//! - Password, SSH agent and default key file authentication
//! - One connection per operation, closed before returning
//! - Operation deadline for every remote call
//! - Connection test and system probes (hostname, OS, architecture, uptime)
//! - Plain JSON settings file for the connection record
//!
//! # MCP Tools
//!
//! - `exec` - Execute a shell command on the configured host
//! - `test-connection` - Check reachability and authentication
//! - `system-info` - Hostname, OS, architecture and uptime
//! - `load-config` / `save-config` - Read or replace the connection record
//!
//! # Example Usage (CLI)
//!
//! ```bash
//! remotectl config set --host 192.168.1.100 --username admin --password secret
//! remotectl exec sudo apt-get update
//! remotectl serve
//! ```

pub mod config;
pub mod error;
pub mod remote;
pub mod server;
pub mod ssh;
pub mod store;
pub mod tools;

// Re-exports for convenience
pub use config::{Args, Config};
pub use error::{RemoteError, Result};
pub use remote::RemoteControl;
pub use server::RemoteCtlServer;
pub use ssh::{
    sanitize_command, AuthMethod, AuthResolver, CommandOutput, Connection, ConnectionConfig,
    Connector, HostKeyPolicy, SessionRunner, SystemInfo,
};
pub use store::SettingsStore;
pub use tools::{ExecParams, SaveConfigParams};
