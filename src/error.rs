//! Error types for remotectl

use thiserror::Error;

/// Main error type for remote operations
///
/// Every variant renders as a human-readable message; front ends never see
/// structured codes. Variants that carry remote output keep it so callers can
/// show what the command printed before it failed.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No persisted connection record
    #[error("No SSH configuration found, configure the connection first")]
    ConfigMissing,

    /// Persisted record lacks required fields or has an invalid port
    #[error("SSH configuration is incomplete: {0}")]
    ConfigIncomplete(String),

    /// Password empty, no agent identity and no usable key file
    #[error(
        "No authentication method available: configure a password or set up an SSH key (~/.ssh/id_ed25519, id_rsa or id_ecdsa)"
    )]
    NoAuthAvailable,

    /// Dial, handshake or authentication failure
    #[error("connection failed: {0}")]
    Connect(String),

    /// Remote side refused a new session on an established connection
    #[error("Failed to open SSH session: {0}")]
    SessionOpen(String),

    /// Remote command exited unsuccessfully
    #[error("Command failed: {reason}")]
    CommandFailed { output: String, reason: String },

    /// Connection test command failed
    #[error("SSH connection test failed: {reason}\nOutput: {output}")]
    TestFailed { output: String, reason: String },

    /// Operation exceeded its deadline
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid parameters provided
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Settings file could not be parsed or serialized
    #[error("Settings error: {0}")]
    Settings(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using RemoteError
pub type Result<T> = std::result::Result<T, RemoteError>;

impl RemoteError {
    /// Create a connection error from a string
    pub fn connect(msg: impl Into<String>) -> Self {
        RemoteError::Connect(msg.into())
    }

    /// Create a session open error from a string
    pub fn session_open(msg: impl Into<String>) -> Self {
        RemoteError::SessionOpen(msg.into())
    }

    /// Create an incomplete config error from a string
    pub fn incomplete(msg: impl Into<String>) -> Self {
        RemoteError::ConfigIncomplete(msg.into())
    }

    /// Create an invalid params error from a string
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        RemoteError::InvalidParams(msg.into())
    }

    /// Create a command failure carrying the captured output
    pub fn command_failed(output: impl Into<String>, reason: impl Into<String>) -> Self {
        RemoteError::CommandFailed {
            output: output.into(),
            reason: reason.into(),
        }
    }

    /// Remote output captured before the failure, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            RemoteError::CommandFailed { output, .. } | RemoteError::TestFailed { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Settings(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RemoteError::connect("host unreachable");
        assert_eq!(err.to_string(), "connection failed: host unreachable");

        let err = RemoteError::Timeout(5000);
        assert_eq!(err.to_string(), "Operation timed out after 5000ms");
    }

    #[test]
    fn test_command_failed_keeps_output() {
        let err = RemoteError::command_failed("ls: cannot access 'x'\n", "exit status 2");
        assert_eq!(err.output(), Some("ls: cannot access 'x'\n"));
        assert_eq!(err.to_string(), "Command failed: exit status 2");
    }

    #[test]
    fn test_no_output_for_connect_errors() {
        assert!(RemoteError::NoAuthAvailable.output().is_none());
        assert!(RemoteError::session_open("refused").output().is_none());
    }
}
