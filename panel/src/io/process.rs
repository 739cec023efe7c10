//! Helpers for running external tools with timeouts and bounded output.
//!
//! Every subprocess the panel spawns goes through a [`CommandRunner`]. The
//! production implementation ([`ProcessRunner`]) starts each tool in its own
//! process group and kills the whole group once the configured timeout is
//! spent; tests substitute a scripted runner.

use std::fmt;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::error::{PanelError, PanelResult};

/// A fully specified external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl ToolCommand {
    pub fn new<I, S>(program: &str, args: I, workdir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            workdir: workdir.into(),
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Decoded output of a finished (or killed) tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    /// Exit code; `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }
}

/// Runs external tools. Implementations must be shareable across request threads.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion. Returns `Err` only when the tool could not
    /// be run at all; non-zero exits and timeouts are reported in [`ToolOutput`].
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;

    /// Time budget applied to each command, reported on timeout.
    fn timeout(&self) -> Duration;
}

/// Runner that spawns real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    output_limit_bytes: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(program = %command.program))]
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).current_dir(&command.workdir);
        let finished = spawn_bounded(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {command}"))?;

        Ok(ToolOutput {
            code: finished.status.code(),
            stdout: finished.stdout.into_text(&command.program, "stdout"),
            stderr: finished.stderr.into_text(&command.program, "stderr"),
            timed_out: finished.timed_out,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Run `command`, mapping a timeout to [`PanelError::Timeout`].
///
/// Non-zero exits are returned as-is for callers that branch on the exit code.
pub fn run_tool(runner: &dyn CommandRunner, command: &ToolCommand) -> PanelResult<ToolOutput> {
    let output = runner.run(command)?;
    if output.timed_out {
        return Err(PanelError::Timeout {
            step: command.to_string(),
            secs: runner.timeout().as_secs(),
        });
    }
    Ok(output)
}

/// Run `command` and require a zero exit status.
pub fn run_tool_checked(
    runner: &dyn CommandRunner,
    command: &ToolCommand,
) -> PanelResult<ToolOutput> {
    let output = run_tool(runner, command)?;
    if !output.success() {
        warn!(command = %command, exit_code = ?output.code, "tool failed");
        return Err(tool_failure(command, output));
    }
    Ok(output)
}

/// Build the verbatim failure for a finished tool.
pub fn tool_failure(command: &ToolCommand, output: ToolOutput) -> PanelError {
    PanelError::Tool {
        step: command.to_string(),
        code: output.code,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}

/// How long pipes are drained after the time budget is spent.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Bytes kept from one output pipe and the count dropped past the limit.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    dropped: usize,
}

impl Captured {
    fn into_text(self, program: &str, stream: &str) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.dropped > 0 {
            text.push_str(&format!(
                "\n[{program} {stream} truncated {} bytes]\n",
                self.dropped
            ));
        }
        text
    }
}

struct Finished {
    status: ExitStatus,
    stdout: Captured,
    stderr: Captured,
    timed_out: bool,
}

/// Reader thread for one pipe. The result comes back over a channel so the
/// caller can stop waiting without joining the thread.
struct Drain(mpsc::Receiver<Result<Captured>>);

impl Drain {
    fn start<R: Read + Send + 'static>(pipe: Option<R>, limit: usize) -> Result<Self> {
        let pipe = pipe.ok_or_else(|| anyhow!("output was not piped"))?;
        let (tx, rx) = mpsc::sync_channel(1);
        thread::spawn(move || {
            // The receiver is gone when the caller gave up on this pipe.
            let _ = tx.send(read_limited(pipe, limit));
        });
        Ok(Self(rx))
    }

    /// `None` when the pipe is still open at `deadline`.
    fn finish_by(self, deadline: Instant) -> Result<Option<Captured>> {
        match self.0.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(captured) => captured.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("output reader thread panicked")),
        }
    }
}

/// Run `cmd` in a fresh process group, bounded by `timeout`.
///
/// The bound covers the output pipes as well as the direct child: `go run`
/// and `git fetch` over ssh leave grandchildren holding the pipes. When the
/// budget runs out the whole group is killed, and pipes still open after
/// [`DRAIN_GRACE`] are abandoned. Stdin is closed.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
fn spawn_bounded(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<Finished> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .inspect_err(|e| error!(err = %e, "failed to spawn command"))
        .context("spawn command")?;
    debug!(pid = child.id(), "spawned child process");

    let stdout = Drain::start(child.stdout.take(), output_limit_bytes)?;
    let stderr = Drain::start(child.stderr.take(), output_limit_bytes)?;

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing process group");
            timed_out = true;
            kill_group(&mut child)?;
            child.wait().context("wait command after kill")?
        }
    };

    let drain_for = if timed_out {
        DRAIN_GRACE
    } else {
        timeout.saturating_sub(started.elapsed()).max(DRAIN_GRACE)
    };
    let deadline = Instant::now() + drain_for;
    let stdout = stdout.finish_by(deadline)?;
    let stderr = stderr.finish_by(deadline)?;
    if !timed_out && (stdout.is_none() || stderr.is_none()) {
        warn!("output still open after the command exited, killing process group");
        timed_out = true;
        kill_group(&mut child)?;
    }

    let (stdout, stderr) = (stdout.unwrap_or_default(), stderr.unwrap_or_default());
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "output truncated"
        );
    }
    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(Finished {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

/// SIGKILL every process in the child's group. The group id is the child's
/// pid and outlives the child while any member is still running.
#[cfg(unix)]
fn kill_group(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).context("child pid out of range")?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(err).context("kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> Result<()> {
    if child.try_wait().context("poll command")?.is_some() {
        return Ok(());
    }
    child.kill().context("kill command")
}

fn read_limited<R: Read>(mut pipe: R, limit: usize) -> Result<Captured> {
    let mut captured = Captured::default();
    let mut chunk = [0u8; 8192];
    loop {
        let n = match pipe.read(&mut chunk) {
            Ok(0) => return Ok(captured),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("read output"),
        };
        let keep = n.min(limit.saturating_sub(captured.bytes.len()));
        captured.bytes.extend_from_slice(&chunk[..keep]);
        captured.dropped += n - keep;
    }
}
