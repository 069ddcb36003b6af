//! Dev-server child process supervision.

#[cfg(unix)]
use crate::command::signal_group;
use crate::{SandboxError, SandboxResult};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// The running dev server.
///
/// On unix the child leads its own process group, so package-manager wrappers
/// and the servers they start are signalled together.
#[derive(Debug)]
pub struct DevServer {
    child: Child,
    pid: Option<u32>,
}

impl DevServer {
    /// Spawn `argv` in `workdir` with output discarded.
    pub fn spawn(argv: &[String], workdir: &Path) -> SandboxResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SandboxError::exec_failed("dev command is empty"))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| SandboxError::exec_failed(format!("failed to start {program}: {e}")))?;

        let pid = child.id();
        info!(pid = ?pid, command = %argv.join(" "), "Started dev server");
        Ok(Self { child, pid })
    }

    /// Whether the process has not exited yet.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// SIGTERM the process group, wait up to `grace` for the leader, then
    /// SIGKILL whatever is left of the group.
    pub async fn terminate(mut self, grace: Duration) {
        if !self.is_alive() {
            return;
        }

        #[cfg(unix)]
        signal_group(self.pid, libc::SIGTERM);

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => {
                debug!(status = ?status.ok(), "Dev server exited");
            }
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "Dev server ignored SIGTERM, killing");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "Failed to kill dev server");
                }
            }
        }

        // Descendants that outlived the leader.
        #[cfg(unix)]
        signal_group(self.pid, libc::SIGKILL);
    }
}

/// Run the install step in `workdir`, ignoring its exit status.
pub async fn run_install(argv: &[String], workdir: &Path) {
    let Some((program, args)) = argv.split_first() else {
        return;
    };

    match Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) => debug!(code = ?status.code(), command = %argv.join(" "), "Install step finished"),
        Err(e) => warn!(command = %argv.join(" "), error = %e, "Install step could not be started"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_spawn_and_terminate() {
        let dir = tempdir().unwrap();
        let mut server = DevServer::spawn(&argv(&["sleep", "30"]), dir.path()).unwrap();
        assert!(server.is_alive());

        server.terminate(Duration::from_secs(5)).await;
    }

    /// Zombies awaiting reaping count as gone.
    fn is_running(pid: &str) -> bool {
        if Path::new("/proc").exists() {
            return std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .map(|stat| {
                    let state = stat.rsplit(')').next().unwrap_or("").trim_start();
                    !state.starts_with('Z')
                })
                .unwrap_or(false);
        }
        std::process::Command::new("kill")
            .args(["-0", pid])
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn spawn_with_grandchild(dir: &Path, script: &str) -> (DevServer, String) {
        let server = DevServer::spawn(&argv(&["sh", "-c", script]), dir).unwrap();
        let pid_file = dir.join("pid");
        for _ in 0..50 {
            if let Ok(pid) = std::fs::read_to_string(&pid_file) {
                if !pid.trim().is_empty() {
                    return (server, pid.trim().to_string());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("grandchild pid was never written");
    }

    async fn wait_until_gone(pid: &str) -> bool {
        for _ in 0..30 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_terminate_kills_grandchild_ignoring_sigterm() {
        let dir = tempdir().unwrap();
        let (server, pid) = spawn_with_grandchild(
            dir.path(),
            "trap '' TERM; sleep 300 & echo $! > pid; wait",
        )
        .await;
        assert!(is_running(&pid));

        server.terminate(Duration::from_secs(1)).await;
        assert!(wait_until_gone(&pid).await);
    }

    #[tokio::test]
    async fn test_terminate_kills_grandchild_after_leader_exits() {
        let dir = tempdir().unwrap();
        let (server, pid) = spawn_with_grandchild(
            dir.path(),
            "(trap '' TERM; sleep 300) & echo $! > pid; wait",
        )
        .await;

        server.terminate(Duration::from_secs(5)).await;
        assert!(wait_until_gone(&pid).await);
    }

    #[tokio::test]
    async fn test_exited_process_is_not_alive() {
        let dir = tempdir().unwrap();
        let mut server = DevServer::spawn(&argv(&["true"]), dir.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!server.is_alive());
    }

    #[tokio::test]
    async fn test_spawn_failures() {
        let dir = tempdir().unwrap();
        assert!(DevServer::spawn(&[], dir.path()).is_err());
        assert!(DevServer::spawn(&argv(&["no-such-dev-server-binary"]), dir.path()).is_err());

        // Missing install command is tolerated.
        run_install(&argv(&["no-such-installer"]), dir.path()).await;
    }
}
