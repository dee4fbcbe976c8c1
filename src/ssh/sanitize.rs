//! Command validation
//!
//! Commands are checked before any connection is opened, so a bad request
//! never costs a dial.

use crate::error::{RemoteError, Result};

/// Trim `command` and check it is runnable.
///
/// Rejects commands that are empty after trimming, contain NUL bytes, or are
/// longer than `max_chars` characters (`None` disables the limit).
///
/// # Examples
/// ```
/// use remotectl::ssh::sanitize::sanitize_command;
///
/// assert_eq!(sanitize_command("  uname -a \n", Some(100)).unwrap(), "uname -a");
/// assert!(sanitize_command("   ", None).is_err());
/// ```
pub fn sanitize_command(command: &str, max_chars: Option<usize>) -> Result<String> {
    let trimmed = command.trim();

    if trimmed.is_empty() {
        return Err(RemoteError::invalid_params("Command cannot be empty"));
    }

    if trimmed.contains('\0') {
        return Err(RemoteError::invalid_params("Command contains a NUL byte"));
    }

    let length = trimmed.chars().count();
    match max_chars {
        Some(max) if length > max => Err(RemoteError::invalid_params(format!(
            "Command is too long (max {} characters, got {})",
            max, length
        ))),
        _ => Ok(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            sanitize_command("\t sudo apt update  ", Some(1000)).unwrap(),
            "sudo apt update"
        );
    }

    #[test]
    fn test_rejects_blank() {
        for blank in ["", "   ", "\n\t"] {
            let err = sanitize_command(blank, Some(1000)).unwrap_err();
            assert!(err.to_string().contains("cannot be empty"));
        }
    }

    #[test]
    fn test_rejects_nul() {
        let err = sanitize_command("echo a\0b", None).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidParams(_)));
    }

    #[test]
    fn test_length_limit_counts_characters() {
        // 4 characters, 8 bytes
        assert!(sanitize_command("éééé", Some(4)).is_ok());
        let err = sanitize_command("ééééé", Some(4)).unwrap_err();
        assert!(err.to_string().contains("max 4 characters, got 5"));
    }

    #[test]
    fn test_unlimited() {
        assert!(sanitize_command(&"x".repeat(10_000), None).is_ok());
    }
}
