//! Launch, drain, wait, kill.

use serde::Serialize;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::ProcessError;
use super::template::RenderedCommand;
use crate::metrics::EXTERNAL_PROCESS_TOTAL;

/// Bytes retained per stream; older output is dropped first.
pub const MAX_CAPTURED_BYTES: usize = 64 * 1024;

/// How long to wait for the output pipes to close after the process exits.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

const TRUNCATION_MARKER: &str = "[...truncated...]\n";

/// Captured stdout/stderr of a process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A process that ran to exit.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub output: CapturedOutput,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, `None` when terminated by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Keeps the most recent `cap` bytes written to it.
#[derive(Debug)]
struct TailBuffer {
    buf: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl TailBuffer {
    fn new(cap: usize) -> Self {
        Self {
            buf: Vec::new(),
            cap,
            truncated: false,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > self.cap {
            let excess = self.buf.len() - self.cap;
            self.buf.drain(..excess);
            self.truncated = true;
        }
    }

    fn snapshot(&self) -> String {
        let text = String::from_utf8_lossy(&self.buf);
        if self.truncated {
            format!("{}{}", TRUNCATION_MARKER, text)
        } else {
            text.into_owned()
        }
    }
}

type SharedTail = Arc<Mutex<TailBuffer>>;

fn spawn_drain<R>(reader: R, label: &'static str, stream: &'static str) -> (SharedTail, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let tail = Arc::new(Mutex::new(TailBuffer::new(MAX_CAPTURED_BYTES)));
    let sink = Arc::clone(&tail);

    let handle = tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    debug!(
                        tool = label,
                        stream,
                        "{}",
                        String::from_utf8_lossy(&line).trim_end()
                    );
                    if let Ok(mut tail) = sink.lock() {
                        tail.push(&line);
                    }
                }
                Err(e) => {
                    warn!(tool = label, stream, error = %e, "Failed reading process output");
                    break;
                }
            }
        }
    });

    (tail, handle)
}

fn snapshot(tail: &SharedTail) -> String {
    tail.lock().map(|t| t.snapshot()).unwrap_or_default()
}

/// Waits briefly for a drain task; a grandchild holding the pipe open must not
/// stall the caller.
async fn settle(handle: JoinHandle<()>) {
    if tokio::time::timeout(DRAIN_GRACE, handle).await.is_err() {
        debug!("Output drain did not finish within grace period");
    }
}

/// SIGKILLs a child's whole process group when dropped while armed.
///
/// The child is spawned as the leader of its own group, so wrapper scripts and
/// anything they start die with it.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    /// Kills the group now. Must run before the leader is reaped so the id
    /// cannot have been reused.
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // SAFETY: killpg only sends a signal and touches no memory.
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
                let e = std::io::Error::last_os_error();
                if e.raw_os_error() != Some(libc::ESRCH) {
                    warn!(pgid, error = %e, "Failed to kill process group");
                }
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Runs a command to completion.
///
/// stdout and stderr are drained on their own tasks while the process runs so
/// a full pipe can never block it. With a `deadline`, an overrunning process is
/// killed together with its process group and reaped before
/// [`ProcessError::Timeout`] is returned. Dropping the returned future kills
/// the group as well. A non-zero exit is returned as a normal
/// [`ProcessOutput`].
pub async fn run_command(
    label: &'static str,
    command: &RenderedCommand,
    deadline: Option<Duration>,
) -> Result<ProcessOutput, ProcessError> {
    let start = Instant::now();

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &command.current_dir {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| {
        EXTERNAL_PROCESS_TOTAL
            .with_label_values(&[label, "launch_failed"])
            .inc();
        ProcessError::Launch {
            program: command.program.clone(),
            source,
        }
    })?;

    let pid = child.id();
    let mut group = ProcessGroup::new(pid);
    info!(tool = label, pid = ?pid, command = %command, "Launched external process");

    let stdout = child.stdout.take().map(|out| spawn_drain(out, label, "stdout"));
    let stderr = child.stderr.take().map(|err| spawn_drain(err, label, "stderr"));

    let waited = match deadline {
        Some(limit) => tokio::time::timeout(limit, child.wait()).await,
        None => Ok(child.wait().await),
    };

    let status = match waited {
        Ok(Ok(status)) => {
            group.disarm();
            status
        }
        Ok(Err(source)) => {
            EXTERNAL_PROCESS_TOTAL
                .with_label_values(&[label, "error"])
                .inc();
            return Err(ProcessError::Io {
                program: command.program.clone(),
                source,
            });
        }
        Err(_) => {
            group.kill();
            if let Err(e) = child.kill().await {
                warn!(tool = label, pid = ?pid, error = %e, "Failed to kill timed out process");
            }
            let output = collect(stdout, stderr).await;
            EXTERNAL_PROCESS_TOTAL
                .with_label_values(&[label, "timeout"])
                .inc();
            warn!(tool = label, pid = ?pid, elapsed_ms = start.elapsed().as_millis() as u64, "External process timed out and was killed");
            return Err(ProcessError::Timeout {
                program: command.program.clone(),
                // `deadline` is always set on this branch
                timeout: deadline.unwrap_or_default(),
                pid,
                output,
            });
        }
    };

    let output = collect(stdout, stderr).await;
    let duration = start.elapsed();

    EXTERNAL_PROCESS_TOTAL
        .with_label_values(&[label, if status.success() { "success" } else { "failed" }])
        .inc();
    info!(
        tool = label,
        pid = ?pid,
        exit_code = ?status.code(),
        duration_ms = duration.as_millis() as u64,
        "External process exited"
    );

    Ok(ProcessOutput {
        status,
        output,
        duration,
    })
}

async fn collect(
    stdout: Option<(SharedTail, JoinHandle<()>)>,
    stderr: Option<(SharedTail, JoinHandle<()>)>,
) -> CapturedOutput {
    let (stdout, stderr) = tokio::join!(finish_drain(stdout), finish_drain(stderr));
    CapturedOutput { stdout, stderr }
}

async fn finish_drain(drain: Option<(SharedTail, JoinHandle<()>)>) -> String {
    match drain {
        Some((tail, handle)) => {
            settle(handle).await;
            snapshot(&tail)
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_buffer_keeps_recent_bytes() {
        let mut tail = TailBuffer::new(8);
        tail.push(b"0123");
        assert_eq!(tail.snapshot(), "0123");
        tail.push(b"456789");
        assert_eq!(tail.snapshot(), format!("{}23456789", TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let command = RenderedCommand {
            program: "/definitely/not/a/real/program".to_string(),
            args: vec![],
            env: vec![],
            current_dir: None,
        };
        let err = run_command("test", &command, None).await.unwrap_err();
        assert!(matches!(err, ProcessError::Launch { .. }));
        assert!(err.to_string().contains("/definitely/not/a/real/program"));
    }
}
