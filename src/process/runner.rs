// ABOUTME: Spawns the CLI binary, drains both pipes concurrently, and enforces timeouts.
// ABOUTME: Timeout and cancellation share one terminate path that kills the whole process group.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{CancelToken, ExecResult, Invocation};
use crate::error::{Error, Result};

/// Binary used when no other is configured.
pub const DEFAULT_PROGRAM: &str = "docker";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a terminated child gets to exit after SIGTERM before SIGKILL.
const TERM_GRACE: Duration = Duration::from_millis(500);

// conventional shell: 128 + signal
const EXIT_CODE_SIGNAL_BASE: i32 = 128;

/// Runs the container CLI as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    envs: Vec<(String, String)>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::docker()
    }
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            envs: Vec::new(),
        }
    }

    pub fn docker() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }

    /// Set an environment variable on every child this runner spawns.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.envs.retain(|(k, _)| *k != key);
        self.envs.push((key, value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Human-readable command line, used in logs and failure messages.
    pub fn command_line(&self, invocation: &Invocation) -> String {
        std::iter::once(self.program.as_str())
            .chain(invocation.args().iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion on the calling thread.
    pub fn run_blocking(&self, invocation: &Invocation) -> Result<ExecResult> {
        self.execute(invocation, &CancelToken::new())
    }

    /// Run on the calling thread, terminating the child if `cancel` trips.
    pub fn run_with_cancel(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<ExecResult> {
        self.execute(invocation, cancel)
    }

    /// Run on the blocking pool without stalling the async scheduler.
    ///
    /// Dropping the returned future before it resolves terminates the
    /// child the same way a timeout does.
    pub async fn run(&self, invocation: &Invocation) -> Result<ExecResult> {
        let cancel = CancelToken::new();
        let _guard = cancel.drop_guard();

        let runner = self.clone();
        let invocation = invocation.clone();
        let task_cancel = cancel.clone();
        let handle =
            tokio::task::spawn_blocking(move || runner.execute(&invocation, &task_cancel));

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Io(io::Error::other(format!(
                "process task failed: {e}"
            )))),
        }
    }

    fn execute(&self, invocation: &Invocation, cancel: &CancelToken) -> Result<ExecResult> {
        let mut command = Command::new(&self.program);
        command
            .args(invocation.args())
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so termination also reaches grandchildren
        // holding our pipes open.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::debug!(command = %self.command_line(invocation), "spawning");

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout pipe was unexpectedly not available"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr pipe was unexpectedly not available"))?;

        // Both pipes drain in parallel; reading one to completion first
        // deadlocks once the other fills its OS buffer.
        let stdout_reader = drain(stdout);
        let stderr_reader = drain(stderr);

        let outcome = supervise(
            &mut child,
            [&stdout_reader, &stderr_reader],
            invocation.timeout(),
            cancel,
        );

        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;

        match outcome? {
            Outcome::Exited(status) => {
                let result = ExecResult {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code: exit_code(status),
                };
                tracing::debug!(exit_code = result.exit_code, "process exited");
                Ok(result)
            }
            Outcome::TimedOut(elapsed) => {
                tracing::warn!(
                    command = %self.command_line(invocation),
                    ?elapsed,
                    "process timed out and was killed"
                );
                Err(Error::Timeout(elapsed))
            }
            Outcome::Cancelled => Err(Error::Io(io::Error::new(
                io::ErrorKind::Interrupted,
                "execution cancelled",
            ))),
        }
    }

    fn spawn_error(&self, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::NotFound {
            Error::ToolNotFound(self.program.clone())
        } else {
            Error::Io(err)
        }
    }
}

enum Outcome {
    Exited(ExitStatus),
    TimedOut(Duration),
    Cancelled,
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}

/// Wait until the child has exited and both pipes are drained.
///
/// A grandchild left in the group can hold the pipes open after the child
/// exits, so the deadline and cancellation stay armed until the readers
/// finish. Terminating the group closes the pipes.
fn supervise(
    child: &mut Child,
    readers: [&JoinHandle<io::Result<Vec<u8>>>; 2],
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<Outcome> {
    let started = Instant::now();
    let mut status = None;
    loop {
        if status.is_none() {
            match child.try_wait() {
                Ok(exited) => status = exited,
                Err(e) => {
                    terminate(child);
                    return Err(Error::Io(e));
                }
            }
        }

        if let Some(status) = status {
            if readers.iter().all(|r| r.is_finished()) {
                return Ok(Outcome::Exited(status));
            }
        }

        if cancel.is_cancelled() {
            terminate(child);
            return Ok(Outcome::Cancelled);
        }

        if let Some(limit) = timeout {
            let elapsed = started.elapsed();
            if elapsed >= limit {
                terminate(child);
                return Ok(Outcome::TimedOut(elapsed));
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGTERM the group, give it a short grace period, then SIGKILL and reap.
///
/// The group ID stays valid after the child is reaped while any member of
/// the group is still alive.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    signal_group(child.id(), nix::sys::signal::Signal::SIGTERM);

    let deadline = Instant::now() + TERM_GRACE;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Ok(Some(_)) | Err(_) => break,
        }
    }

    #[cfg(unix)]
    signal_group(child.id(), nix::sys::signal::Signal::SIGKILL);

    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match nix::sys::signal::killpg(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!(pid, ?signal, "failed to signal process group: {}", e),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return EXIT_CODE_SIGNAL_BASE + signal;
        }
    }
    -1
}
