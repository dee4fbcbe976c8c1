//! Connection test: one trivial command on a fresh session

use tracing::info;

use super::runner::SessionRunner;
use super::session::SessionOpener;
use crate::error::{RemoteError, Result};

/// Command used to check that sessions can run commands
pub const TEST_COMMAND: &str = "echo 'Connection successful'";

/// Message returned when the test passes
pub const TEST_SUCCESS_MESSAGE: &str = "SSH connection test succeeded";

/// Run [`TEST_COMMAND`]; any failure is reported with its captured output
pub async fn test<O: SessionOpener>(opener: &O) -> Result<String> {
    match SessionRunner::new(opener).run_plain(TEST_COMMAND).await {
        Ok(_) => {
            info!("{}", TEST_SUCCESS_MESSAGE);
            Ok(TEST_SUCCESS_MESSAGE.to_string())
        }
        Err(e) => Err(RemoteError::TestFailed {
            output: e.output().unwrap_or_default().to_string(),
            reason: e.to_string(),
        }),
    }
}
