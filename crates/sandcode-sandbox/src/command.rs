//! Shell command execution inside a sandbox directory.

use crate::{CommandOutput, SandboxError, SandboxResult};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to keep draining pipes after the shell exits. Background jobs
/// started by the command may hold them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

type Buffer = Arc<Mutex<Vec<u8>>>;

/// Run `sh -c cmd` in `workdir`.
///
/// `venv_bin`, when given, is prepended to `PATH`. On timeout the process
/// group is killed and whatever output was captured so far is returned with
/// an `error` message instead of an exit code.
pub async fn run_shell(
    workdir: &Path,
    cmd: &str,
    timeout: Duration,
    venv_bin: Option<&Path>,
) -> SandboxResult<CommandOutput> {
    debug!(command = %cmd, workdir = %workdir.display(), "Executing command");

    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(cmd)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(bin) = venv_bin {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let paths = std::iter::once(bin.to_path_buf()).chain(std::env::split_paths(&current));
        if let Ok(joined) = std::env::join_paths(paths) {
            command.env("PATH", joined);
        }
    }

    #[cfg(unix)]
    command.process_group(0);

    let mut child = command
        .spawn()
        .map_err(|e| SandboxError::exec_failed(format!("failed to spawn shell: {e}")))?;

    let stdout_buf = Buffer::default();
    let stderr_buf = Buffer::default();
    let readers = [
        child.stdout.take().map(|pipe| spawn_drain(pipe, stdout_buf.clone())),
        child.stderr.take().map(|pipe| spawn_drain(pipe, stderr_buf.clone())),
    ];

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => {
            let status = status?;
            let _ = tokio::time::timeout(DRAIN_GRACE, async {
                for reader in readers.into_iter().flatten() {
                    let _ = reader.await;
                }
            })
            .await;

            Ok(CommandOutput {
                error: None,
                stdout: take_string(&stdout_buf).await,
                stderr: take_string(&stderr_buf).await,
                code: Some(status.code().unwrap_or(-1)),
            })
        }
        Err(_) => {
            let secs = timeout.as_secs();
            warn!(command = %cmd, timeout_secs = secs, "Command timed out");

            #[cfg(unix)]
            signal_group(child.id(), libc::SIGKILL);
            let _ = child.kill().await;
            for reader in readers.into_iter().flatten() {
                reader.abort();
            }

            Ok(CommandOutput {
                error: Some(format!("Command timed out after {secs}s")),
                stdout: take_string(&stdout_buf).await,
                stderr: take_string(&stderr_buf).await,
                code: None,
            })
        }
    }
}

fn spawn_drain<R>(mut reader: R, buffer: Buffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.lock().await.extend_from_slice(&chunk[..n]),
            }
        }
    })
}

async fn take_string(buffer: &Buffer) -> String {
    let bytes = std::mem::take(&mut *buffer.lock().await);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(unix)]
#[allow(unsafe_code)]
pub(crate) fn signal_group(pid: Option<u32>, signal: libc::c_int) {
    if let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) {
        // SAFETY: kill(2) with a negative pid signals the process group the
        // child leads; it has no memory-safety preconditions.
        unsafe {
            libc::kill(-pid, signal);
        }
    }
}
