//! Running external tools (downloader, ffmpeg, ffprobe) with captured output.
//!
//! Every invocation captures exit status, stdout and stderr, and can be
//! stopped by a timeout or by the run's cancellation token. The child is
//! killed in both cases and also when the returned future is dropped.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How long output pipes may stay open after the tool itself has exited.
/// A background process started by the tool can hold them indefinitely.
const PIPE_DRAIN_LIMIT: Duration = Duration::from_secs(2);

/// Captured result of a finished tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut s = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        s.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            s.push('\n');
        }
        s.push_str(&self.stderr);
        s
    }

    /// Last `n` non-empty lines of combined output, joined with " | ".
    pub fn tail(&self, n: usize) -> String {
        tail_lines(&self.combined(), n)
    }
}

/// Last `n` non-empty lines of `text`, joined with " | ".
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join(" | ")
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
    #[error("{program} cancelled")]
    Cancelled { program: String },
    #[error("waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build a `tokio::process::Command` that never opens a console window on Windows.
pub fn tool_command(program: impl AsRef<OsStr>) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

type Captured = Arc<Mutex<Vec<u8>>>;

/// Copies `pipe` into a shared buffer so output read so far survives an abort.
fn spawn_capture<R>(pipe: Option<R>) -> (JoinHandle<()>, Captured)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let sink: Captured = Arc::default();
    let buf = Arc::clone(&sink);
    let handle = tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut b) = buf.lock() {
                        b.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    });
    (handle, sink)
}

fn captured_text(c: &Captured) -> String {
    c.lock()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

enum Drain {
    Complete,
    Stalled,
    Cancelled,
    TimedOut,
}

/// Runs `program args...` to completion and captures its output.
///
/// `timeout` of None means no limit. When `cancel` fires or the timeout
/// elapses the child is killed and the matching `ToolError` is returned.
/// After the child exits its pipes are drained for at most a couple of
/// seconds; a background process still holding them does not keep the
/// call waiting, and cancellation still applies while draining.
pub async fn run_tool<I, S>(
    program: &Path,
    args: I,
    cwd: Option<&Path>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<ToolOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();
    let mut cmd = tool_command(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| ToolError::Spawn {
        program: name.clone(),
        source,
    })?;
    tracing::trace!(program = %name, pid = ?child.id(), "tool started");

    let (mut stdout_task, stdout_buf) = spawn_capture(child.stdout.take());
    let (mut stderr_task, stderr_buf) = spawn_capture(child.stderr.take());

    let deadline = async {
        match timeout {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let timed_out = |program: String| ToolError::TimedOut {
        program,
        timeout: timeout.unwrap_or_default(),
    };

    let status = tokio::select! {
        res = child.wait() => res.map_err(|source| ToolError::Wait { program: name.clone(), source }),
        _ = cancel.cancelled() => {
            let _ = child.kill().await;
            Err(ToolError::Cancelled { program: name.clone() })
        }
        _ = &mut deadline => {
            let _ = child.kill().await;
            Err(timed_out(name.clone()))
        }
    };
    let status = match status {
        Ok(status) => status,
        Err(e) => {
            stdout_task.abort();
            stderr_task.abort();
            return Err(e);
        }
    };

    let drain = tokio::select! {
        _ = async {
            let _ = (&mut stdout_task).await;
            let _ = (&mut stderr_task).await;
        } => Drain::Complete,
        _ = cancel.cancelled() => Drain::Cancelled,
        _ = &mut deadline => Drain::TimedOut,
        _ = tokio::time::sleep(PIPE_DRAIN_LIMIT) => Drain::Stalled,
    };
    stdout_task.abort();
    stderr_task.abort();
    match drain {
        Drain::Complete => {}
        Drain::Stalled => {
            tracing::debug!(program = %name, "output pipes still open after exit, keeping what was read")
        }
        Drain::Cancelled => return Err(ToolError::Cancelled { program: name }),
        Drain::TimedOut => return Err(timed_out(name)),
    }

    let stdout = captured_text(&stdout_buf);
    let stderr = captured_text(&stderr_buf);
    tracing::trace!(program = %name, code = ?status.code(), "tool exited");

    Ok(ToolOutput {
        status,
        stdout,
        stderr,
    })
}
