//! remotectl - Entry point
//!
//! Parses CLI arguments, builds the remote facade and dispatches the
//! subcommand. `serve` runs the MCP server on stdio until the transport
//! closes or a shutdown signal arrives.

use std::process::ExitCode;

use clap::Parser;
use rmcp::service::ServiceExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use remotectl::config::{Args, Command, Config, ConfigCommand};
use remotectl::error::{RemoteError, Result};
use remotectl::remote::RemoteControl;
use remotectl::server::RemoteCtlServer;
use remotectl::ssh::ConnectionConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output and MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(output) = e.output().filter(|o| !o.is_empty()) {
                if !matches!(e, RemoteError::TestFailed { .. }) {
                    print!("{}", output);
                }
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_args(&args)?;
    let remote = RemoteControl::from_config(&config);

    match args.command {
        Command::Serve => serve(remote, &config).await,
        Command::Exec { command } => {
            let output = remote.execute(&command.join(" ")).await?;
            print!("{}", output);
            Ok(())
        }
        Command::Test => {
            println!("{}", remote.test_connection().await?);
            Ok(())
        }
        Command::Info => {
            let info = remote.system_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let mut record = remote.load_config().await?;
            if !record.password.is_empty() {
                record.password = "********".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Config(ConfigCommand::Set {
            host,
            port,
            username,
            password,
        }) => {
            let record = ConnectionConfig::new(host.trim(), username.trim())
                .with_port(port.trim())
                .with_password(password);
            record.validate()?;
            println!("{}", remote.save_config(&record).await?);
            Ok(())
        }
    }
}

async fn serve(remote: RemoteControl, config: &Config) -> Result<()> {
    info!("remotectl v{} starting MCP server", env!("CARGO_PKG_VERSION"));
    info!(
        "Settings: {}, timeout: {}ms, max chars: {}",
        config.settings_path.display(),
        config.timeout_ms,
        config
            .max_chars
            .map_or("unlimited".to_string(), |n| n.to_string())
    );

    let server = RemoteCtlServer::new(remote);

    let running_server = match server.serve(rmcp::transport::io::stdio()).await {
        Ok(running_server) => running_server,
        Err(e) => {
            error!("Failed to start MCP server: {}", e);
            return Err(RemoteError::Io(std::io::Error::other(e.to_string())));
        }
    };
    info!("MCP server running on stdio");

    tokio::select! {
        result = running_server.waiting() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    info!("remotectl stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
