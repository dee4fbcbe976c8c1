//! MCP Server implementation
//!
//! Exposes the remote operations of [`RemoteControl`] as MCP tools. Every tool
//! answers with human-readable text; failures are tool errors carrying the
//! message and any captured remote output.

use std::sync::Arc;

use rmcp::{
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData as McpError,
};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::RemoteError;
use crate::remote::RemoteControl;
use crate::ssh::ConnectionConfig;
use crate::tools::{input_schema, ExecParams, NoParams, SaveConfigParams};

/// remotectl MCP Server
#[derive(Clone)]
pub struct RemoteCtlServer {
    remote: Arc<RemoteControl>,
}

impl RemoteCtlServer {
    pub fn new(remote: RemoteControl) -> Self {
        Self {
            remote: Arc::new(remote),
        }
    }

    fn tools() -> Vec<Tool> {
        vec![
            Tool::new(
                "exec",
                "Execute a shell command on the configured remote host and return its combined output. \
                 Commands starting with `sudo ` receive the configured password on stdin.",
                input_schema::<ExecParams>(),
            ),
            Tool::new(
                "test-connection",
                "Check that the configured remote host is reachable and accepts the configured credentials.",
                input_schema::<NoParams>(),
            ),
            Tool::new(
                "system-info",
                "Return hostname, OS, architecture and uptime of the configured remote host.",
                input_schema::<NoParams>(),
            ),
            Tool::new(
                "load-config",
                "Return the saved SSH connection record (password masked).",
                input_schema::<NoParams>(),
            ),
            Tool::new(
                "save-config",
                "Replace the saved SSH connection record.",
                input_schema::<SaveConfigParams>(),
            ),
        ]
    }

    async fn exec(&self, params: ExecParams) -> CallToolResult {
        match self.remote.execute(&params.command).await {
            Ok(output) => CallToolResult::success(vec![Content::text(output)]),
            Err(e) => {
                error!("Command execution failed: {}", e);
                failure(&e)
            }
        }
    }

    async fn test_connection(&self) -> CallToolResult {
        match self.remote.test_connection().await {
            Ok(message) => CallToolResult::success(vec![Content::text(message)]),
            Err(e) => failure(&e),
        }
    }

    async fn system_info(&self) -> CallToolResult {
        let info = match self.remote.system_info().await {
            Ok(info) => info,
            Err(e) => return failure(&e),
        };
        match serde_json::to_string_pretty(&info) {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => failure(&RemoteError::from(e)),
        }
    }

    async fn load_config(&self) -> CallToolResult {
        let config = match self.remote.load_config().await {
            Ok(config) => config,
            Err(e) => return failure(&e),
        };
        match serde_json::to_string_pretty(&masked(config)) {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => failure(&RemoteError::from(e)),
        }
    }

    async fn save_config(&self, params: SaveConfigParams) -> CallToolResult {
        let config = ConnectionConfig::from(params);
        if let Err(e) = config.validate() {
            return failure(&e);
        }
        match self.remote.save_config(&config).await {
            Ok(message) => CallToolResult::success(vec![Content::text(message)]),
            Err(e) => failure(&e),
        }
    }
}

/// Tool error text: the message, then captured remote output when there is any
fn failure(e: &RemoteError) -> CallToolResult {
    let mut text = format!("Error: {}", e);
    if let RemoteError::CommandFailed { output, .. } = e {
        if !output.is_empty() {
            text.push_str("\n--- output ---\n");
            text.push_str(output);
        }
    }
    CallToolResult::error(vec![Content::text(text)])
}

fn masked(mut config: ConnectionConfig) -> ConnectionConfig {
    if !config.password.is_empty() {
        config.password = "********".to_string();
    }
    config
}

fn parse_args<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> std::result::Result<T, McpError> {
    let value = serde_json::Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments: {}", e), None))
}

impl ServerHandler for RemoteCtlServer {
    /// Return server information
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "remotectl v{} - Run commands on the SSH host saved in {}",
                env!("CARGO_PKG_VERSION"),
                self.remote.store().path().display(),
            )),
        }
    }

    /// List available tools
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        debug!("list_tools called");

        Ok(ListToolsResult {
            tools: Self::tools(),
            next_cursor: None,
            meta: Default::default(),
        })
    }

    /// Call a tool
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let tool_name: &str = request.name.as_ref();
        debug!("call_tool called: {:?}", tool_name);

        match tool_name {
            "exec" => Ok(self.exec(parse_args(request.arguments)?).await),
            "test-connection" => Ok(self.test_connection().await),
            "system-info" => Ok(self.system_info().await),
            "load-config" => Ok(self.load_config().await),
            "save-config" => Ok(self.save_config(parse_args(request.arguments)?).await),
            _ => Err(McpError::invalid_params(
                format!("Unknown tool: {}", tool_name),
                None,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        let names: Vec<String> = RemoteCtlServer::tools()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        assert_eq!(
            names,
            ["exec", "test-connection", "system-info", "load-config", "save-config"]
        );
    }

    #[test]
    fn test_failure_includes_output() {
        let result = failure(&RemoteError::command_failed(
            "E: Unable to locate package nope\n",
            "process exited with status 100",
        ));
        assert_eq!(result.is_error, Some(true));
        let text = serde_json::to_string(&result.content).unwrap();
        assert!(text.contains("status 100"));
        assert!(text.contains("Unable to locate package nope"));
    }

    #[test]
    fn test_masked_config() {
        let config = masked(ConnectionConfig::new("h", "u").with_password("secret"));
        assert_eq!(config.password, "********");
        assert_eq!(masked(ConnectionConfig::new("h", "u")).password, "");
    }

    #[test]
    fn test_parse_args_rejects_missing_command() {
        let result = parse_args::<ExecParams>(None);
        assert!(result.is_err());
    }
}
