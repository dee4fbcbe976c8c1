//! Configuration and CLI argument parsing for remotectl

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{RemoteError, Result};
use crate::ssh::HostKeyPolicy;
use crate::store::DEFAULT_SETTINGS_FILE;

/// Default deadline for one remote operation in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000; // 60 seconds

/// Default max characters for a command (None = unlimited)
pub const DEFAULT_MAX_CHARS: Option<usize> = Some(1000);

/// remotectl CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "remotectl")]
#[command(version)]
#[command(about = "Remote machine administration over SSH")]
pub struct Args {
    /// Settings file holding the connection record
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE, env = "REMOTECTL_SETTINGS")]
    pub settings: PathBuf,

    /// Deadline for one remote operation in milliseconds
    #[arg(long, global = true, default_value = "60000", env = "REMOTECTL_TIMEOUT")]
    pub timeout: u64,

    /// Maximum characters for a command.
    /// Use "none", "0", or negative value to disable limit.
    /// Default: 1000
    #[arg(long = "max-chars", global = true, env = "REMOTECTL_MAX_CHARS", allow_hyphen_values = true)]
    pub max_chars: Option<String>,

    /// Verify host keys against ~/.ssh/known_hosts instead of accepting any key
    #[arg(long, global = true, env = "REMOTECTL_STRICT_HOST_KEYS")]
    pub strict_host_keys: bool,

    /// known_hosts file to verify against (implies --strict-host-keys)
    #[arg(long, global = true, env = "REMOTECTL_KNOWN_HOSTS")]
    pub known_hosts: Option<PathBuf>,

    /// Do not try the SSH agent when no password is configured
    #[arg(long, global = true, env = "REMOTECTL_NO_AGENT")]
    pub no_agent: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// remotectl subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the MCP tools on stdio
    Serve,

    /// Run a command on the configured host
    Exec {
        /// Command and arguments, joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Check that the configured host accepts connections and runs commands
    Test,

    /// Print hostname, OS, architecture and uptime of the configured host
    Info,

    /// Show or change the connection record
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// `remotectl config ...`
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the connection record (password masked)
    Show,

    /// Replace the connection record
    Set {
        #[arg(long)]
        host: String,

        #[arg(long, default_value = "22")]
        port: String,

        #[arg(long)]
        username: String,

        /// Leave empty to authenticate with the SSH agent or a key file
        #[arg(long, default_value = "", env = "REMOTECTL_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Parsed and validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings file path
    pub settings_path: PathBuf,

    /// Operation deadline in milliseconds
    pub timeout_ms: u64,

    /// Maximum command length (None = unlimited)
    pub max_chars: Option<usize>,

    /// Host key trust policy
    pub host_key_policy: HostKeyPolicy,

    /// Whether the SSH agent is consulted
    pub use_agent: bool,
}

impl Config {
    /// Create Config from CLI Args
    pub fn from_args(args: &Args) -> Result<Self> {
        validate_args(args)?;

        let host_key_policy = match (&args.known_hosts, args.strict_host_keys) {
            (Some(path), _) => HostKeyPolicy::KnownHosts {
                path: Some(path.clone()),
            },
            (None, true) => HostKeyPolicy::KnownHosts { path: None },
            (None, false) => HostKeyPolicy::AcceptAnyHostKey,
        };

        Ok(Config {
            settings_path: args.settings.clone(),
            timeout_ms: args.timeout,
            max_chars: parse_max_chars(args.max_chars.as_deref()),
            host_key_policy,
            use_agent: !args.no_agent,
        })
    }
}

/// Validate CLI arguments
fn validate_args(args: &Args) -> Result<()> {
    let mut errors = Vec::new();

    if args.timeout == 0 {
        errors.push("--timeout must be greater than 0".to_string());
    }

    if args.settings.as_os_str().is_empty() {
        errors.push("--settings cannot be empty".to_string());
    }

    if let Some(ref path) = args.known_hosts {
        if !path.exists() {
            errors.push(format!("known_hosts file not found: {}", path.display()));
        }
    }

    if !errors.is_empty() {
        return Err(RemoteError::invalid_params(format!(
            "Configuration error:\n{}",
            errors.join("\n")
        )));
    }

    Ok(())
}

/// Parse max_chars argument
///
/// - "none" (case-insensitive) → None (unlimited)
/// - "0" or negative → None (unlimited)
/// - positive integer → Some(value)
/// - None (not provided) or unparseable → DEFAULT_MAX_CHARS
pub fn parse_max_chars(value: Option<&str>) -> Option<usize> {
    let Some(s) = value else {
        return DEFAULT_MAX_CHARS;
    };
    if s.eq_ignore_ascii_case("none") {
        return None;
    }
    match s.trim().parse::<i64>() {
        Ok(n) if n <= 0 => None,
        Ok(n) => usize::try_from(n).ok(),
        Err(_) => DEFAULT_MAX_CHARS,
    }
}
