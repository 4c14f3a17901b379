//! Process runner: one OS process per submitted command.
//!
//! [`ProcessRunner::run`] returns immediately with a set of [`RunSignals`];
//! a spawned driver task materializes the command as a temporary script
//! file, starts it under the configured shell, and then
//!
//! 1. sends the PID on `started` (or the start failure),
//! 2. sends a [`ProcessHandle`] on `handle`,
//! 3. streams stdout and stderr lines into `lines` until both close,
//! 4. reaps the child, removes the script file and publishes the
//!    [`ExitOutcome`] through the handle.
//!
//! On Unix the child leads its own process group, so cancellation kills
//! everything the script forked, not just the shell.

use std::io::Write;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use super::config::ExecutionConfig;
use super::error::ScriptError;
use super::handle::{ExitOutcome, ProcessHandle};

/// Side-channel signals and output of a single run.
///
/// `started` and `handle` each fire at most once. If `started` carries an
/// error, `handle` is dropped unsent and `lines` ends immediately.
#[derive(Debug)]
pub struct RunSignals {
    pub started: oneshot::Receiver<Result<u32, ScriptError>>,
    pub handle: oneshot::Receiver<ProcessHandle>,
    /// Finite, non-restartable sequence of output lines (without `\n`).
    pub lines: mpsc::UnboundedReceiver<String>,
}

/// Spawns script processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shell: PathBuf,
    script_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(shell: impl Into<PathBuf>, script_dir: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            script_dir: script_dir.into(),
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(&config.shell, &config.script_dir)
    }

    /// Start `command` in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, command: &str, cancel: CancellationToken) -> RunSignals {
        let (started_tx, started) = oneshot::channel();
        let (handle_tx, handle) = oneshot::channel();
        let (lines_tx, lines) = mpsc::unbounded_channel();

        let driver = Driver {
            shell: self.shell.clone(),
            script_dir: self.script_dir.clone(),
            command: command.to_string(),
            cancel,
        };
        tokio::spawn(driver.run(started_tx, handle_tx, lines_tx));

        RunSignals {
            started,
            handle,
            lines,
        }
    }
}

/// Everything the driver task owns for one run.
struct Driver {
    shell: PathBuf,
    script_dir: PathBuf,
    command: String,
    cancel: CancellationToken,
}

/// A successfully spawned child with its pipes detached.
struct Spawned {
    child: Child,
    pid: u32,
    stdout: ChildStdout,
    stderr: ChildStderr,
    /// Kept alive until the child is reaped; removed on drop.
    script_file: NamedTempFile,
}

impl Driver {
    async fn run(
        self,
        started_tx: oneshot::Sender<Result<u32, ScriptError>>,
        handle_tx: oneshot::Sender<ProcessHandle>,
        lines_tx: mpsc::UnboundedSender<String>,
    ) {
        let spawned = match self.spawn() {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::warn!(shell = %self.shell.display(), error = %e, "Script failed to start");
                let _ = started_tx.send(Err(e));
                return;
            }
        };

        let Spawned {
            mut child,
            pid,
            stdout,
            stderr,
            script_file,
        } = spawned;

        let (exit_tx, exit_rx) = watch::channel(None);
        let _ = started_tx.send(Ok(pid));
        let _ = handle_tx.send(ProcessHandle::new(pid, self.cancel.clone(), exit_rx));
        tracing::debug!(pid, "Script process started");

        // The channel closes once both forwarders are done.
        let stdout_task = tokio::spawn(forward_lines(stdout, lines_tx.clone()));
        let stderr_task = tokio::spawn(forward_lines(stderr, lines_tx));

        let status = tokio::select! {
            status = child.wait() => status,
            _ = self.cancel.cancelled() => {
                tracing::info!(pid, "Cancellation requested; killing script process group");
                terminate(&mut child, pid);
                child.wait().await
            }
        };
        let outcome = classify(status, self.cancel.is_cancelled());

        // Background children may still hold the pipes open after the shell
        // exits; a later cancellation must still be able to end the drain.
        let drain = async {
            let _ = stdout_task.await;
            let _ = stderr_task.await;
        };
        tokio::pin!(drain);
        tokio::select! {
            biased;
            _ = &mut drain => {}
            _ = self.cancel.cancelled() => {
                signal_group(pid);
                drain.await;
            }
        }

        if let Err(e) = script_file.close() {
            tracing::warn!(pid, error = %e, "Failed to remove temporary script file");
        }

        tracing::debug!(pid, ?outcome, "Script process reaped");
        exit_tx.send_replace(Some(outcome));
    }

    /// Write the script file and start the child process.
    fn spawn(&self) -> Result<Spawned, ScriptError> {
        let mut script_file = tempfile::Builder::new()
            .prefix("scriptd-")
            .suffix(".sh")
            .tempfile_in(&self.script_dir)
            .map_err(|e| {
                ScriptError::StartFailure(format!(
                    "creating script file in {}: {e}",
                    self.script_dir.display()
                ))
            })?;

        writeln!(script_file, "{}", self.command)
            .and_then(|()| script_file.flush())
            .map_err(|e| ScriptError::StartFailure(format!("writing script file: {e}")))?;

        let mut cmd = Command::new(&self.shell);
        cmd.arg(script_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            ScriptError::StartFailure(format!("spawning {}: {e}", self.shell.display()))
        })?;

        // Early returns below drop `child`, which kills it.
        let pid = child.id().ok_or_else(|| {
            ScriptError::StartFailure("process exited before its PID was read".to_string())
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScriptError::StartFailure("stdout pipe unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScriptError::StartFailure("stderr pipe unavailable".to_string()))?;

        Ok(Spawned {
            child,
            pid,
            stdout,
            stderr,
            script_file,
        })
    }
}

/// Forward every line of `reader` to `tx` until EOF.
///
/// Keeps reading after the receiver is gone so the child never blocks on a
/// full pipe.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
            }
            Err(e) => {
                tracing::debug!(error = %e, "Script output stream closed with error");
                break;
            }
        }
    }
}

/// Kill the child and everything in its process group.
fn terminate(child: &mut Child, pid: u32) {
    if signal_group(pid) {
        return;
    }
    if let Err(e) = child.start_kill() {
        tracing::warn!(pid, error = %e, "Failed to kill script process");
    }
}

/// Send SIGKILL to the process group led by `pid`. Returns `false` when the
/// signal could not be delivered (or on platforms without process groups).
#[cfg(unix)]
fn signal_group(pid: u32) -> bool {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: killpg only sends a signal; `pgid` is the group we created
    // with `process_group(0)` for this child.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            pid,
            error = %std::io::Error::last_os_error(),
            "killpg failed"
        );
    }
    rc == 0
}

#[cfg(not(unix))]
fn signal_group(_pid: u32) -> bool {
    false
}

/// Map a wait result to an [`ExitOutcome`].
fn classify(status: std::io::Result<ExitStatus>, cancelled: bool) -> ExitOutcome {
    let status = match status {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to collect script exit status");
            return ExitOutcome::Unknown;
        }
    };

    if let Some(code) = status.code() {
        return ExitOutcome::Exited { code };
    }
    if cancelled {
        return ExitOutcome::Killed;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitOutcome::Signaled { signal };
        }
    }

    ExitOutcome::Unknown
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
