//! Process runner.
//!
//! Spawns one external program per call with stdin closed and both output
//! streams piped. The streams are drained on scoped threads while the calling
//! thread polls for exit, so a chatty child never blocks on a full pipe. A
//! timeout or a raised [`CancelFlag`] terminates the child's process group:
//! SIGTERM, a grace period, then SIGKILL.
//!
//! The runner never returns an error. Spawn failures, non-zero exits and
//! forced terminations are all reported through [`ExecutionResult`].

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::truncate::{truncate_output, MAX_OUTPUT_CHARS};

/// Exit code reported when the program could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

/// Shared cancellation flag.
///
/// Raising the flag while a process is running terminates it the same way a
/// timeout does.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory for the child (inherits ours when absent).
    pub cwd: Option<PathBuf>,
    /// Wall-clock limit after which the child is terminated.
    pub timeout: Option<Duration>,
    /// External cancellation.
    pub cancel: Option<CancelFlag>,
}

impl ExecOptions {
    /// Options with only a timeout set.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn cancel_on(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }
}

/// Outcome of a single process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Captured standard output (truncated).
    pub stdout: String,
    /// Captured standard error (truncated).
    pub stderr: String,
    /// Exit code; `128 + N` when the child was killed by signal N.
    pub exit_code: i32,
    /// True iff the process exited on its own with code 0.
    pub success: bool,
    /// The process was terminated because the timeout elapsed.
    pub timed_out: bool,
    /// The process was terminated because the cancel flag was raised.
    pub cancelled: bool,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Result for a program that could not be started.
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            success: false,
            timed_out: false,
            cancelled: false,
            duration_ms: 0,
        }
    }
}

/// Something that can execute a command line.
///
/// [`ProcessRunner`] is the OS-backed implementation.
pub trait Runner: Send + Sync {
    fn execute(&self, command: &[String], options: &ExecOptions) -> ExecutionResult;
}

/// Process runner tuning.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Per-stream character cap.
    pub max_output_chars: usize,
    /// Time between SIGTERM and SIGKILL.
    pub termination_grace: Duration,
    /// Exit polling interval.
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_output_chars: MAX_OUTPUT_CHARS,
            termination_grace: Duration::from_secs(2),
            poll_interval: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    TimedOut,
    Cancelled,
}

struct WaitOutcome {
    status: ExitStatus,
    termination: Option<Termination>,
}

/// OS process runner.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `command` (program followed by its arguments) to completion.
    ///
    /// Arguments are passed to the program as-is; nothing is shell-interpreted.
    pub fn execute(&self, command: &[String], options: &ExecOptions) -> ExecutionResult {
        let start = Instant::now();

        let Some((program, args)) = command.split_first() else {
            return ExecutionResult::spawn_failure("cannot execute an empty command");
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &options.cwd {
            cmd.current_dir(dir);
        }
        // Own process group so termination also reaches grandchildren
        // holding our pipes.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, error = %e, "failed to spawn process");
                return ExecutionResult::spawn_failure(format!(
                    "failed to spawn '{}': {}",
                    program, e
                ));
            }
        };
        debug!(program = %program, pid = child.id(), args = args.len(), "spawned process");

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let (wait, stdout, stderr) = thread::scope(|scope| {
            let (done_tx, done_rx) = mpsc::channel();
            let stdout_done = done_tx.clone();
            let stdout_handle = scope.spawn(move || {
                let out = drain(stdout_pipe);
                let _ = stdout_done.send(());
                out
            });
            let stderr_handle = scope.spawn(move || {
                let out = drain(stderr_pipe);
                let _ = done_tx.send(());
                out
            });

            let mut wait = self.wait_for_exit(&mut child, options, start);
            match &mut wait {
                // Leftover group members may still hold the pipes.
                Ok(outcome) if outcome.termination.is_none() => {
                    outcome.termination = self.wait_for_drains(&child, &done_rx, options, start);
                }
                Ok(_) => {}
                Err(_) => force_kill(&mut child),
            }

            let stdout = stdout_handle.join().unwrap_or_default();
            let stderr = stderr_handle.join().unwrap_or_default();
            (wait, stdout, stderr)
        });

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let max = self.config.max_output_chars;
        let stdout = truncate_output(String::from_utf8_lossy(&stdout).into_owned(), max);
        let mut stderr = truncate_output(String::from_utf8_lossy(&stderr).into_owned(), max);

        match wait {
            Ok(outcome) => {
                let exit_code = exit_code_of(outcome.status);
                let timed_out = outcome.termination == Some(Termination::TimedOut);
                let cancelled = outcome.termination == Some(Termination::Cancelled);
                debug!(program = %program, exit_code, timed_out, cancelled, duration_ms, "process finished");
                ExecutionResult {
                    stdout,
                    stderr,
                    exit_code,
                    success: exit_code == 0 && outcome.termination.is_none(),
                    timed_out,
                    cancelled,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!(program = %program, error = %e, "failed waiting for process");
                if !stderr.is_empty() {
                    stderr.push('\n');
                }
                stderr.push_str(&format!("failed waiting for '{}': {}", program, e));
                ExecutionResult {
                    stdout,
                    stderr,
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                    success: false,
                    timed_out: false,
                    cancelled: false,
                    duration_ms,
                }
            }
        }
    }

    /// Poll for exit until the child finishes, the deadline passes or the
    /// cancel flag is raised.
    fn wait_for_exit(
        &self,
        child: &mut Child,
        options: &ExecOptions,
        start: Instant,
    ) -> io::Result<WaitOutcome> {
        let deadline = options.timeout.map(|timeout| start + timeout);

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(WaitOutcome {
                    status,
                    termination: None,
                });
            }

            if let Some(termination) = pending_termination(options, deadline) {
                warn!(pid = child.id(), ?termination, "terminating process");
                let status = self.terminate(child)?;
                return Ok(WaitOutcome {
                    status,
                    termination: Some(termination),
                });
            }

            let mut nap = self.config.poll_interval;
            if let Some(d) = deadline {
                nap = nap.min(d.saturating_duration_since(Instant::now()));
            }
            thread::sleep(nap);
        }
    }

    /// Wait for both output streams to close after the child exited.
    ///
    /// Background processes left in the group can keep the pipes open past
    /// the child's exit. The deadline and cancel flag still apply; when
    /// either fires, the whole group is killed so the drains finish.
    fn wait_for_drains(
        &self,
        child: &Child,
        done: &mpsc::Receiver<()>,
        options: &ExecOptions,
        start: Instant,
    ) -> Option<Termination> {
        let deadline = options.timeout.map(|timeout| start + timeout);
        let mut open_streams = 2;

        while open_streams > 0 {
            if let Some(termination) = pending_termination(options, deadline) {
                warn!(pgid = child.id(), ?termination, "output still open after exit, killing process group");
                #[cfg(unix)]
                signal_group(child, nix::sys::signal::Signal::SIGKILL);
                return Some(termination);
            }

            let mut nap = self.config.poll_interval;
            if let Some(d) = deadline {
                nap = nap.min(d.saturating_duration_since(Instant::now()));
            }
            match done.recv_timeout(nap) {
                Ok(()) => open_streams -= 1,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        None
    }

    /// Terminate the child gracefully then forcefully.
    fn terminate(&self, child: &mut Child) -> io::Result<ExitStatus> {
        #[cfg(unix)]
        signal_group(child, nix::sys::signal::Signal::SIGTERM);
        #[cfg(not(unix))]
        let _ = child.kill();

        let grace_start = Instant::now();
        while grace_start.elapsed() < self.config.termination_grace {
            if let Some(status) = child.try_wait()? {
                // Stragglers in the group may still hold the pipes.
                #[cfg(unix)]
                signal_group(child, nix::sys::signal::Signal::SIGKILL);
                return Ok(status);
            }
            thread::sleep(self.config.poll_interval);
        }

        debug!(pid = child.id(), "grace period elapsed, killing process");
        force_kill(child);
        child.wait()
    }
}

impl Runner for ProcessRunner {
    fn execute(&self, command: &[String], options: &ExecOptions) -> ExecutionResult {
        ProcessRunner::execute(self, command, options)
    }
}

fn pending_termination(options: &ExecOptions, deadline: Option<Instant>) -> Option<Termination> {
    if options
        .cancel
        .as_ref()
        .is_some_and(CancelFlag::is_cancelled)
    {
        Some(Termination::Cancelled)
    } else if deadline.is_some_and(|d| Instant::now() >= d) {
        Some(Termination::TimedOut)
    } else {
        None
    }
}

fn drain<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf) {
            debug!(error = %e, "output stream read failed");
        }
    }
    buf
}

fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    signal_group(child, nix::sys::signal::Signal::SIGKILL);
    let _ = child.kill();
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, signal) {
        debug!(pgid = child.id(), ?signal, error = %e, "killpg failed");
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
    SPAWN_FAILURE_EXIT_CODE
}
