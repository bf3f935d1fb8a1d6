//! Subprocess plumbing: spawn in a fresh process group, capture output
//! incrementally, and kill the whole group on timeout or cancellation.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;

/// How long to wait for a killed process to be reaped.
const REAP_GRACE: Duration = Duration::from_secs(2);
/// How long to wait for pipe readers once the process has gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

pub(crate) struct ProcessRequest<'a> {
    pub program: &'a str,
    pub args: Vec<&'a str>,
    pub env: Vec<(&'static str, &'static str)>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ending {
    Exited,
    TimedOut,
    Cancelled,
}

enum Waited {
    Status(std::io::Result<ExitStatus>),
    Forced(Ending),
}

#[derive(Debug)]
pub(crate) struct ProcessOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub ending: Ending,
}

/// Run a process to completion, timeout, or cancellation.
///
/// Errors only when the process cannot be spawned.
pub(crate) async fn run_process(
    request: ProcessRequest<'_>,
    cancel: &CancellationToken,
) -> std::io::Result<ProcessOutcome> {
    let mut cmd = Command::new(request.program);
    cmd.args(&request.args)
        .envs(request.env.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    let mut child = cmd.spawn()?;
    let pid = child.id();

    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let stdout_reader = spawn_reader(child.stdout.take(), stdout_buf.clone());
    let stderr_reader = spawn_reader(child.stderr.take(), stderr_buf.clone());

    let waited = tokio::select! {
        status = child.wait() => Waited::Status(status),
        _ = sleep(request.timeout) => Waited::Forced(Ending::TimedOut),
        _ = cancel.cancelled() => Waited::Forced(Ending::Cancelled),
    };

    let (exit_code, ending) = match waited {
        Waited::Status(status) => (exit_code_of(status?), Ending::Exited),
        Waited::Forced(ending) => {
            tracing::warn!(
                category = "code_execution",
                program = request.program,
                ?ending,
                "terminating process group"
            );
            (force_kill(&mut child, pid).await, ending)
        }
    };

    let stdout = drain(stdout_reader, &stdout_buf, request.max_output_bytes).await;
    let stderr = drain(stderr_reader, &stderr_buf, request.max_output_bytes).await;

    Ok(ProcessOutcome {
        stdout,
        stderr,
        exit_code,
        ending,
    })
}

fn spawn_reader<R>(pipe: Option<R>, buffer: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.lock().extend_from_slice(&chunk[..n]),
            }
        }
    })
}

/// Wait briefly for a reader to hit EOF, then take whatever was captured.
///
/// Grandchildren that inherited the pipe can keep it open after the group is
/// killed, so readers are not awaited indefinitely.
async fn drain(mut reader: JoinHandle<()>, buffer: &Mutex<Vec<u8>>, max_bytes: usize) -> String {
    if timeout(DRAIN_GRACE, &mut reader).await.is_err() {
        reader.abort();
    }
    let bytes = std::mem::take(&mut *buffer.lock());
    truncate_output(&bytes, max_bytes)
}

async fn force_kill(child: &mut Child, pid: Option<u32>) -> i32 {
    #[cfg(unix)]
    if let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) {
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
    #[cfg(not(unix))]
    let _ = pid;

    let _ = child.start_kill();
    match timeout(REAP_GRACE, child.wait()).await {
        Ok(Ok(status)) => exit_code_of(status),
        Ok(Err(error)) => {
            tracing::warn!(category = "code_execution", %error, "failed to reap killed process");
            -1
        }
        Err(_) => -1,
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn truncate_output(bytes: &[u8], max_bytes: usize) -> String {
    if bytes.len() <= max_bytes {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut end = max_bytes;
    while end > 0 && (bytes[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    format!(
        "{}...\n[Output truncated, {} bytes total]",
        String::from_utf8_lossy(&bytes[..end]),
        bytes.len()
    )
}
