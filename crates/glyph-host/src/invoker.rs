//! Subprocess-based extension invocation.
//!
//! Every exchange runs in a fresh process: the serialized request is written
//! to stdin, stdin is closed to signal the end of the request, and stdout is
//! read until the process exits. The process is always reaped, whichever way
//! the exchange ends. On unix each extension runs in its own process group,
//! and a timed-out or cancelled extension is killed together with its
//! children.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::error::InvokeError;

/// Everything captured from a finished extension process.
#[derive(Debug, Clone)]
pub struct InvocationOutput {
    /// Raw stdout. Not assumed to be well-formed.
    pub stdout: Vec<u8>,
    /// Stderr, lossily decoded.
    pub stderr: String,
    /// Exit status of the process.
    pub status: ExitStatus,
    /// Wall-clock duration of the exchange.
    pub duration: Duration,
}

/// Runs extension processes under a shared worker pool.
///
/// Cloning is cheap; clones share the pool and the cancellation signal.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    permits: Arc<Semaphore>,
    cancel: CancelSignal,
}

impl ProcessInvoker {
    /// Creates an invoker allowing at most `max_concurrency` live processes.
    pub fn new(max_concurrency: usize, cancel: CancelSignal) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            cancel,
        }
    }

    /// Returns the cancellation signal observed by this invoker.
    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Runs one request/response exchange.
    ///
    /// # Arguments
    /// * `command` - Program followed by its arguments
    /// * `request` - Bytes written to the process's stdin
    /// * `timeout` - Limit on the exchange, not counting the wait for a worker slot
    ///
    /// A non-zero exit is an error, but the captured output is carried in
    /// [`InvokeError::Failed`] for diagnostics.
    pub async fn invoke(
        &self,
        command: &[String],
        request: &[u8],
        timeout: Duration,
    ) -> Result<InvocationOutput, InvokeError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| InvokeError::Spawn("empty command".to_string()))?;

        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(InvokeError::Cancelled),
            permit = self.permits.acquire() => {
                permit.map_err(|_| InvokeError::Cancelled)?
            }
        };
        if self.cancel.is_cancelled() {
            return Err(InvokeError::Cancelled);
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // A group of its own, so shell children die with the extension.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| InvokeError::Spawn(format!("'{}': {}", program, e)))?;

        let start = Instant::now();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, exchange(&mut child, stdin, stdout, stderr, request)) => {
                Some(result)
            }
            _ = self.cancel.cancelled() => None,
        };
        let duration = start.elapsed();

        match outcome {
            Some(Ok(Ok((status, stdout, stderr)))) => {
                debug!(
                    program = %program,
                    duration_ms = duration.as_millis() as u64,
                    status = %status,
                    "extension exchange finished"
                );

                if !status.success() {
                    return Err(InvokeError::Failed {
                        code: status.code(),
                        output: captured_output(&stdout, &stderr),
                    });
                }

                Ok(InvocationOutput {
                    stdout,
                    stderr,
                    status,
                    duration,
                })
            }
            Some(Ok(Err(e))) => {
                reap(&mut child, program).await;
                Err(InvokeError::Io(e.to_string()))
            }
            Some(Err(_elapsed)) => {
                warn!(program = %program, timeout_ms = timeout.as_millis() as u64, "extension timed out");
                reap(&mut child, program).await;
                Err(InvokeError::Timeout { timeout })
            }
            None => {
                debug!(program = %program, "cancelling extension");
                reap(&mut child, program).await;
                Err(InvokeError::Cancelled)
            }
        }
    }
}

/// Writes the request, closes stdin, drains both output pipes and waits.
async fn exchange(
    child: &mut Child,
    stdin: Option<ChildStdin>,
    stdout: Option<impl AsyncRead + Unpin>,
    stderr: Option<impl AsyncRead + Unpin>,
    request: &[u8],
) -> std::io::Result<(ExitStatus, Vec<u8>, String)> {
    let write = async move {
        if let Some(mut stdin) = stdin {
            match stdin.write_all(request).await {
                // The extension may answer without reading its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e),
                Ok(()) => {}
            }
            // Dropping stdin closes it and signals the end of the request.
            drop(stdin);
        }
        Ok(())
    };

    let (written, stdout, stderr) = tokio::join!(write, read_all(stdout), read_all(stderr));
    written?;
    let stdout = stdout?;
    let stderr = String::from_utf8_lossy(&stderr?).into_owned();

    let status = child.wait().await?;
    Ok((status, stdout, stderr))
}

async fn read_all(pipe: Option<impl AsyncRead + Unpin>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kills the process and everything it started, then waits for it to exit.
async fn reap(child: &mut Child, program: &str) {
    kill_process_group(child, program);
    if let Err(e) = child.kill().await {
        warn!(program = %program, error = %e, "failed to kill extension process");
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child, program: &str) {
    // Unset once the process has been waited for.
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };

    // SAFETY: killpg has no memory-safety preconditions. The child leads
    // its own group and has not been reaped, so `pgid` names that group.
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result != 0 {
        let e = std::io::Error::last_os_error();
        if e.raw_os_error() != Some(libc::ESRCH) {
            warn!(program = %program, error = %e, "failed to kill extension process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child, _program: &str) {}

fn captured_output(stdout: &[u8], stderr: &str) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let parts: Vec<&str> = [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    parts.join("\n")
}
