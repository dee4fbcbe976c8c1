//! Privilege escalation helpers for sudo commands
//!
//! sudo reads its password from a terminal by default. remotectl has no
//! terminal, so escalated commands are rewritten to `sudo -S` and the password
//! is delivered on standard input once sudo has asked for it.
//!
//! Execution of the rewritten command lives in
//! [`ChannelSession`](super::session::ChannelSession); fallback handling lives
//! in [`SessionRunner`](super::runner::SessionRunner).

use std::time::Duration;

/// Commands starting with this prefix are privilege-escalated
pub const ESCALATION_PREFIX: &str = "sudo ";

/// sudo flag making it read the password from standard input
pub const STDIN_FLAG: &str = "-S";

/// Output fragments meaning sudo rejected the password (case-sensitive)
pub const AUTH_FAILURE_MARKERS: [&str; 2] = ["incorrect password", "Sorry, try again"];

/// Output fragments that begin a password prompt
pub const PROMPT_MARKERS: [&str; 2] = ["[sudo] password for ", "Password:"];

/// How long to wait for a prompt before sending the password anyway
pub const PROMPT_GRACE: Duration = Duration::from_millis(500);

/// Whether `command` requests privilege escalation
///
/// # Examples
///
/// ```
/// use remotectl::ssh::escalation::is_escalated;
///
/// assert!(is_escalated("sudo apt update"));
/// assert!(!is_escalated("sudoedit /etc/hosts"));
/// assert!(!is_escalated("echo sudo "));
/// ```
pub fn is_escalated(command: &str) -> bool {
    command.starts_with(ESCALATION_PREFIX)
}

/// Rewrites an escalated command so sudo reads the password from stdin.
///
/// The flag is inserted right after the first `sudo` keyword; the rest of the
/// command is untouched.
///
/// # Examples
///
/// ```
/// use remotectl::ssh::escalation::rewrite_for_stdin;
///
/// assert_eq!(rewrite_for_stdin("sudo apt update"), "sudo -S apt update");
/// ```
pub fn rewrite_for_stdin(command: &str) -> String {
    command.replacen(
        ESCALATION_PREFIX,
        &format!("{}{} ", ESCALATION_PREFIX, STDIN_FLAG),
        1,
    )
}

/// Whether the captured output shows sudo rejecting the password
pub fn has_auth_failure(output: &str) -> bool {
    AUTH_FAILURE_MARKERS
        .iter()
        .any(|marker| output.contains(marker))
}

/// Where the output stands relative to the password prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PromptState {
    /// Nothing but (a possible beginning of) a prompt has been printed
    #[default]
    Waiting,
    /// The prompt was detected and stripped
    Seen,
    /// Other output came first; nothing is treated as a prompt anymore
    Passed,
}

/// Tracks whether the password prompt has shown up in the output buffer
///
/// A prompt is recognized only as the first thing the command prints, and
/// only while its line is still unterminated: sudo leaves the cursor after
/// the prompt and waits. Output that merely contains a marker (`Password:
/// expires never`) is the command's own and is left alone.
///
/// The prompt is removed from the buffer when detected so successful
/// commands return only what they printed themselves. Only the first prompt is
/// handled; a repeated prompt after a rejected password stays in the output.
#[derive(Debug, Default)]
pub struct PromptWatch {
    state: PromptState,
}

impl PromptWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a prompt has been detected
    pub fn seen(&self) -> bool {
        self.state == PromptState::Seen
    }

    /// Inspect `buffer` after new output arrived; true when the prompt has
    /// just been detected (and stripped)
    pub fn observe(&mut self, buffer: &mut String) -> bool {
        if self.state != PromptState::Waiting {
            return false;
        }

        let text = buffer.trim_start();
        if text.is_empty() {
            return false;
        }

        let is_prompt = PROMPT_MARKERS
            .iter()
            .any(|marker| text.starts_with(marker) && !text.contains('\n'));
        if is_prompt {
            buffer.clear();
            self.state = PromptState::Seen;
            return true;
        }

        // A marker still arriving in pieces keeps the watch open
        let partial_marker = !text.contains('\n')
            && PROMPT_MARKERS.iter().any(|marker| marker.starts_with(text));
        if !partial_marker {
            self.state = PromptState::Passed;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_escalated() {
        assert!(is_escalated("sudo ls /root"));
        assert!(!is_escalated("ls /root"));
        assert!(!is_escalated("sudo"));
        assert!(!is_escalated("  sudo ls"));
    }

    #[test]
    fn test_rewrite_inserts_flag_once() {
        assert_eq!(
            rewrite_for_stdin("sudo systemctl restart nginx"),
            "sudo -S systemctl restart nginx"
        );
        assert_eq!(
            rewrite_for_stdin("sudo sh -c 'sudo -n true'"),
            "sudo -S sh -c 'sudo -n true'"
        );
    }

    #[test]
    fn test_auth_failure_markers() {
        assert!(has_auth_failure(
            "Sorry, try again.\nsudo: 1 incorrect password attempt\n"
        ));
        assert!(has_auth_failure("sudo: 3 incorrect password attempts"));
        assert!(!has_auth_failure("sorry, TRY AGAIN"));
        assert!(!has_auth_failure("E: Could not open lock file"));
    }

    #[test]
    fn test_prompt_watch_strips_prompt() {
        let mut watch = PromptWatch::new();
        let mut buffer = "[sudo] password for admin: ".to_string();

        assert!(watch.observe(&mut buffer));
        assert!(watch.seen());
        assert_eq!(buffer, "");

        buffer.push_str("root\n");
        assert!(!watch.observe(&mut buffer));
        assert_eq!(buffer, "root\n");
    }

    #[test]
    fn test_prompt_watch_prompt_in_pieces() {
        let mut watch = PromptWatch::new();
        let mut buffer = "[sudo] pass".to_string();
        assert!(!watch.observe(&mut buffer));
        assert_eq!(buffer, "[sudo] pass");

        buffer.push_str("word for admin: ");
        assert!(watch.observe(&mut buffer));
        assert_eq!(buffer, "");
    }

    #[test]
    fn test_prompt_watch_keeps_command_output_with_marker() {
        let mut watch = PromptWatch::new();
        let mut buffer = "Last password change: Jan 01\nPassword: expires never\n".to_string();

        assert!(!watch.observe(&mut buffer));
        assert_eq!(buffer, "Last password change: Jan 01\nPassword: expires never\n");
        assert!(!watch.seen());
    }

    #[test]
    fn test_prompt_watch_terminated_marker_line_is_output() {
        let mut watch = PromptWatch::new();
        let mut buffer = "Password: expires never\n".to_string();

        assert!(!watch.observe(&mut buffer));
        assert_eq!(buffer, "Password: expires never\n");

        // Once real output came first, later markers are output too
        buffer.push_str("Password:");
        assert!(!watch.observe(&mut buffer));
        assert!(buffer.ends_with("Password:"));
    }

    #[test]
    fn test_prompt_watch_only_first_prompt() {
        let mut watch = PromptWatch::new();
        let mut buffer = "Password:".to_string();
        assert!(watch.observe(&mut buffer));

        buffer.push_str("Sorry, try again.\n[sudo] password for admin: ");
        assert!(!watch.observe(&mut buffer));
        assert!(has_auth_failure(&buffer));
        assert!(buffer.contains("[sudo] password for admin: "));
    }

    #[test]
    fn test_prompt_watch_ignores_plain_output() {
        let mut watch = PromptWatch::new();
        let mut buffer = "password policy updated\n".to_string();
        assert!(!watch.observe(&mut buffer));
        assert!(!watch.seen());
    }
}
