//! Remote command execution over SSH
//!
//! Layering, leaf to root: [`AuthResolver`] picks a credential, [`Connector`]
//! opens a [`Connection`], [`SessionRunner`] runs one command per session, and
//! [`info`] / [`tester`] drive the runner for probes and connection tests.

pub mod auth;
pub mod command;
pub mod config;
pub mod connection;
pub mod escalation;
pub mod handler;
pub mod info;
pub mod runner;
pub mod sanitize;
pub mod session;
pub mod tester;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use auth::{AuthMethod, AuthResolver};
pub use command::CommandOutput;
pub use config::ConnectionConfig;
pub use connection::{Connection, Connector};
pub use handler::{HostKeyPolicy, SshHandler};
pub use info::{Probe, SystemInfo};
pub use runner::SessionRunner;
pub use sanitize::sanitize_command;
pub use session::{ChannelSession, RemoteSession, SessionOpener};
