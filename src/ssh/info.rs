//! Best-effort system information collection
//!
//! Each probe is a plain command on its own session. Probes run concurrently
//! and fail independently: a failed probe is left out of the snapshot.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::debug;

use super::runner::SessionRunner;
use super::session::SessionOpener;

/// Snapshot of probe name → trimmed output
pub type SystemInfo = BTreeMap<String, String>;

/// A named informational command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub name: &'static str,
    pub command: &'static str,
}

/// Probes used by [`collect`]
pub const SYSTEM_PROBES: [Probe; 4] = [
    Probe {
        name: "hostname",
        command: "hostname",
    },
    Probe {
        name: "os",
        command: "uname -s",
    },
    Probe {
        name: "arch",
        command: "uname -m",
    },
    Probe {
        name: "uptime",
        command: "uptime -p 2>/dev/null || uptime",
    },
];

/// Collect hostname, kernel name, architecture and uptime
pub async fn collect<O: SessionOpener>(opener: &O) -> SystemInfo {
    collect_with(opener, &SYSTEM_PROBES).await
}

/// Run `probes` concurrently and keep the ones that succeeded
pub async fn collect_with<O: SessionOpener>(opener: &O, probes: &[Probe]) -> SystemInfo {
    let runner = SessionRunner::new(opener);

    let results = join_all(probes.iter().map(|probe| {
        let runner = &runner;
        async move { (probe, runner.run_plain(probe.command).await) }
    }))
    .await;

    results
        .into_iter()
        .filter_map(|(probe, result)| match result {
            Ok(output) => Some((probe.name.to_string(), output.trim().to_string())),
            Err(e) => {
                debug!("Probe '{}' failed: {}", probe.name, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::command::CommandOutput;
    use crate::ssh::testing::ScriptedOpener;

    fn linux_host() -> ScriptedOpener {
        ScriptedOpener::new()
            .reply("hostname", CommandOutput::succeeded("web-01\n"))
            .reply("uname -s", CommandOutput::succeeded("Linux\n"))
            .reply("uname -m", CommandOutput::succeeded("x86_64\n"))
            .reply(
                "uptime -p 2>/dev/null || uptime",
                CommandOutput::succeeded("up 3 days, 2 hours\n"),
            )
    }

    #[tokio::test]
    async fn test_collect_all_probes() {
        let opener = linux_host();
        let info = collect(&opener).await;

        assert_eq!(info.len(), 4);
        assert_eq!(info["hostname"], "web-01");
        assert_eq!(info["os"], "Linux");
        assert_eq!(info["arch"], "x86_64");
        assert_eq!(info["uptime"], "up 3 days, 2 hours");
        // One session per probe
        assert_eq!(opener.sessions_opened(), 4);
    }

    #[tokio::test]
    async fn test_single_failed_probe_is_omitted() {
        let opener = linux_host().reply("uname -m", CommandOutput::exited("uname: illegal option\n", 1));
        let info = collect(&opener).await;

        assert_eq!(info.len(), 3);
        assert!(!info.contains_key("arch"));
        assert_eq!(info["hostname"], "web-01");
    }

    #[tokio::test]
    async fn test_refused_sessions_yield_empty_snapshot() {
        let opener = ScriptedOpener::new().refuse_sessions();
        let info = collect(&opener).await;
        assert!(info.is_empty());
    }

    #[tokio::test]
    async fn test_custom_probes() {
        let opener = ScriptedOpener::new().reply("nproc", CommandOutput::succeeded("8\n"));
        let probes = [
            Probe {
                name: "cpus",
                command: "nproc",
            },
            Probe {
                name: "memory",
                command: "free -b",
            },
        ];

        let info = collect_with(&opener, &probes).await;
        assert_eq!(info.len(), 1);
        assert_eq!(info["cpus"], "8");
    }
}
