//! MCP tool parameters
//!
//! Argument types for the tools served by [`RemoteCtlServer`](crate::server::RemoteCtlServer).
//! Input schemas are derived from these types.
//!
//! Available tools:
//! - `exec` - Execute a command on the configured remote host
//! - `test-connection` - Check reachability and authentication
//! - `system-info` - Hostname, OS, architecture and uptime
//! - `load-config` / `save-config` - Read or replace the connection record

use std::sync::Arc;

use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ssh::ConnectionConfig;

/// Parameters for the exec tool
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ExecParams {
    /// Shell command to execute on the remote host. Commands starting with
    /// `sudo ` receive the configured password on stdin.
    pub command: String,
}

/// Parameters for the save-config tool
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SaveConfigParams {
    /// Remote hostname or IP address
    pub host: String,

    /// SSH port
    #[serde(default = "default_port")]
    pub port: String,

    /// SSH username
    pub username: String,

    /// Password; leave empty to use the SSH agent or a key file
    #[serde(default)]
    pub password: String,
}

/// Parameters for tools taking no arguments
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct NoParams {}

fn default_port() -> String {
    ConnectionConfig::default().port
}

impl From<SaveConfigParams> for ConnectionConfig {
    fn from(params: SaveConfigParams) -> Self {
        ConnectionConfig {
            host: params.host.trim().to_string(),
            port: params.port.trim().to_string(),
            username: params.username.trim().to_string(),
            password: params.password,
        }
    }
}

/// JSON schema object for tool input type `T`
pub fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    let object = serde_json::to_value(schema)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default();
    Arc::new(object)
}
