//! Process launching and supervision.
//!
//! [`launch`] starts the OS process synchronously and hands back an
//! [`Execution`]: a [`ProcessHandle`] for the caller plus a [`Completion`]
//! future. A spawned supervisor task owns the child; it waits for
//! termination while the capture tasks, attached right after spawn, drain
//! the piped streams.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::capture;
use super::command::Invocation;
use super::result::{Captured, Outcome, Termination};
use crate::env::EnvVars;
use crate::error::{Result, ShellSpawnError, StreamName};
use crate::options::{Echo, Options, StdioKind};
use crate::platform::Platform;

type CaptureTask = JoinHandle<Result<Option<Captured>>>;

/// Caller-side handle to a running process.
///
/// Streams are only present when raw stdio wiring piped them; managed
/// captures and input are never exposed here.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    kill_tx: mpsc::Sender<()>,
    /// Child stdin under raw `Piped` wiring.
    pub stdin: Option<ChildStdin>,
    /// Child stdout under raw `Piped` wiring.
    pub stdout: Option<ChildStdout>,
    /// Child stderr under raw `Piped` wiring.
    pub stderr: Option<ChildStderr>,
}

impl ProcessHandle {
    /// OS process id.
    pub fn id(&self) -> u32 {
        self.pid
    }

    /// Ask the supervisor to kill the process.
    ///
    /// Returns `false` if the process has already been reaped.
    pub fn kill(&self) -> bool {
        match self.kill_tx.try_send(()) {
            Ok(()) => true,
            // A kill request is already queued.
            Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

enum CompletionState {
    Skipped,
    Running(JoinHandle<Result<Outcome>>),
}

/// Future resolving once the process has terminated and every requested
/// capture has settled.
///
/// Resolves to `Ok(None)` when an echo filter vetoed the launch.
pub struct Completion {
    state: CompletionState,
}

impl Completion {
    fn skipped() -> Self {
        Self {
            state: CompletionState::Skipped,
        }
    }

    fn running(task: JoinHandle<Result<Outcome>>) -> Self {
        Self {
            state: CompletionState::Running(task),
        }
    }
}

impl Future for Completion {
    type Output = Result<Option<Outcome>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            CompletionState::Skipped => Poll::Ready(Ok(None)),
            CompletionState::Running(task) => Pin::new(task).poll(cx).map(|joined| match joined {
                Ok(result) => result.map(Some),
                Err(e) => Err(e.into()),
            }),
        }
    }
}

/// A launched (or vetoed) invocation.
pub struct Execution {
    /// Handle to the running process; `None` if the launch was vetoed.
    pub process: Option<ProcessHandle>,
    /// Completion of the invocation.
    pub completion: Completion,
}

impl Execution {
    fn skipped() -> Self {
        Self {
            process: None,
            completion: Completion::skipped(),
        }
    }

    /// Wait for completion, discarding the process handle.
    pub async fn wait(self) -> Result<Option<Outcome>> {
        self.completion.await
    }
}

/// Start `invocation`.
///
/// Must be called from within a tokio runtime. Spawn failures are returned
/// immediately; everything after spawn is reported through the completion.
pub fn launch(invocation: Invocation) -> Result<Execution> {
    match &invocation.options.echo_command {
        Some(Echo::Print) => println!("{}", invocation.display_line()),
        Some(Echo::Filter(filter)) => {
            if !filter(&invocation.program, &invocation.args) {
                debug!(program = %invocation.program, "launch vetoed by echo filter");
                return Ok(Execution::skipped());
            }
        }
        Some(Echo::Off) | None => {}
    }

    let Invocation {
        program,
        args,
        options,
        verbatim_args,
    } = invocation;

    let mut cmd = build_command(&program, &args, &options, verbatim_args);

    let stdout_capture = options.stdout_capture();
    let stderr_capture = options.stderr_capture();
    let managed = options.stdio.is_none();

    match options.stdio {
        Some(raw) => {
            cmd.stdin(raw.stdin.to_stdio())
                .stdout(raw.stdout.to_stdio())
                .stderr(raw.stderr.to_stdio());
        }
        None => {
            cmd.stdin(piped_if(options.input_content.is_some()))
                .stdout(piped_if(stdout_capture.is_enabled()))
                .stderr(piped_if(stderr_capture.is_enabled()));
        }
    }

    if let Some(hook) = &options.command_hook {
        hook(&mut cmd);
    }

    let mut child = cmd.spawn().map_err(|source| ShellSpawnError::Spawn {
        program: program.clone(),
        source,
    })?;
    let pid = child.id().unwrap_or(0);
    debug!(pid, program = %program, args = ?args, "process started");

    let (kill_tx, kill_rx) = mpsc::channel(1);
    let mut handle = ProcessHandle {
        pid,
        kill_tx,
        stdin: None,
        stdout: None,
        stderr: None,
    };

    let (stdout_task, stderr_task) = if managed {
        let normalize = options.normalization();

        // Attach captures before anything else so no output is missed.
        let stdout_task = match child.stdout.take() {
            Some(out) if stdout_capture.is_enabled() => Some(tokio::spawn(capture::capture(
                StreamName::Stdout,
                out,
                stdout_capture,
                normalize.clone(),
            ))),
            _ => None,
        };
        let stderr_task = match child.stderr.take() {
            Some(err) if stderr_capture.is_enabled() => Some(tokio::spawn(capture::capture(
                StreamName::Stderr,
                err,
                stderr_capture,
                normalize,
            ))),
            _ => None,
        };

        if let (Some(input), Some(stdin)) = (options.input_content.clone(), child.stdin.take()) {
            tokio::spawn(write_input(pid, stdin, input));
        }

        (stdout_task, stderr_task)
    } else {
        handle.stdin = child.stdin.take();
        handle.stdout = child.stdout.take();
        handle.stderr = child.stderr.take();
        (None, None)
    };

    let ignore_error = options.ignore_error.unwrap_or(false);
    let task = tokio::spawn(supervise(
        child,
        pid,
        kill_rx,
        stdout_task,
        stderr_task,
        ignore_error,
    ));

    Ok(Execution {
        process: Some(handle),
        completion: Completion::running(task),
    })
}

fn piped_if(piped: bool) -> std::process::Stdio {
    if piped {
        StdioKind::Piped.to_stdio()
    } else {
        StdioKind::Inherit.to_stdio()
    }
}

fn build_command(program: &str, args: &[String], options: &Options, verbatim: bool) -> Command {
    let mut cmd = Command::new(program);
    push_args(&mut cmd, args, verbatim);

    if let Some(dir) = &options.cwd {
        cmd.current_dir(dir);
    }

    if let Some(raw) = &options.raw_env {
        cmd.env_clear();
        cmd.envs(raw);
    } else if let Some(overrides) = &options.env {
        apply_env(&mut cmd, overrides, Platform::current());
    }

    #[cfg(unix)]
    {
        if let Some(arg0) = &options.arg0 {
            cmd.arg0(arg0);
        }
        if let Some(uid) = options.uid {
            cmd.uid(uid);
        }
        if let Some(gid) = options.gid {
            cmd.gid(gid);
        }
        if let Some(pgroup) = options.process_group {
            cmd.process_group(pgroup);
        }
    }

    cmd
}

/// Layer `overrides` onto the environment the child inherits.
///
/// Inherited entries are left to the OS untouched so values that are not
/// valid Unicode reach the child byte for byte.
fn apply_env(cmd: &mut Command, overrides: &EnvVars, platform: Platform) {
    if platform.env_case_insensitive() {
        for (name, _) in std::env::vars_os() {
            let Some(name) = name.to_str() else { continue };
            let shadowed = overrides
                .iter()
                .any(|(key, _)| key != name && key.eq_ignore_ascii_case(name));
            if shadowed {
                cmd.env_remove(name);
            }
        }
    }
    cmd.envs(overrides.iter());
}

#[cfg(windows)]
fn push_args(cmd: &mut Command, args: &[String], verbatim: bool) {
    if verbatim {
        for arg in args {
            cmd.raw_arg(arg);
        }
    } else {
        cmd.args(args);
    }
}

#[cfg(not(windows))]
fn push_args(cmd: &mut Command, args: &[String], _verbatim: bool) {
    cmd.args(args);
}

async fn write_input(pid: u32, mut stdin: ChildStdin, input: Vec<u8>) {
    match stdin.write_all(&input).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!(pid, "stdin closed before input was fully written");
        }
        Err(e) => warn!(pid, "failed to write stdin: {}", e),
    }
    // Dropping stdin closes the pipe and signals EOF to the child.
}

async fn supervise(
    mut child: Child,
    pid: u32,
    mut kill_rx: mpsc::Receiver<()>,
    stdout_task: Option<CaptureTask>,
    stderr_task: Option<CaptureTask>,
    ignore_error: bool,
) -> Result<Outcome> {
    let status = loop {
        tokio::select! {
            status = child.wait() => break status?,
            Some(()) = kill_rx.recv() => {
                debug!(pid, "kill requested");
                if let Err(e) = child.start_kill() {
                    debug!(pid, "kill failed: {}", e);
                }
            }
        }
    };

    let termination = Termination::from_status(status);
    assemble(
        pid,
        termination,
        ignore_error,
        join_capture(stdout_task),
        join_capture(stderr_task),
    )
    .await
}

async fn join_capture(task: Option<CaptureTask>) -> Option<Result<Captured>> {
    match task {
        Some(task) => task
            .await
            .map_err(ShellSpawnError::from)
            .and_then(|r| r)
            .transpose(),
        None => None,
    }
}

/// Combine termination with capture results.
///
/// Abnormal termination is reported without waiting for captures unless
/// errors are ignored. Otherwise every capture is awaited, and a failed
/// capture fails the invocation even after a clean exit.
pub(crate) async fn assemble<O, E>(
    pid: u32,
    termination: Termination,
    ignore_error: bool,
    stdout: O,
    stderr: E,
) -> Result<Outcome>
where
    O: Future<Output = Option<Result<Captured>>>,
    E: Future<Output = Option<Result<Captured>>>,
{
    if !ignore_error {
        if let Some(err) = termination.failure(pid) {
            debug!(pid, "process failed: {}", err);
            return Err(err);
        }
    }

    let (stdout, stderr) = tokio::join!(stdout, stderr);

    let mut outcome = Outcome::new(pid, termination);
    outcome.stdout = stdout.transpose()?;
    outcome.stderr = stderr.transpose()?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;

    fn stream_error(stream: StreamName) -> ShellSpawnError {
        ShellSpawnError::Stream {
            stream,
            source: io::Error::other("read failed"),
        }
    }

    #[tokio::test]
    async fn test_assemble_clean_exit() {
        let outcome = assemble(
            1,
            Termination::Exited(0),
            false,
            async { Some(Ok(Captured::Text("out".into()))) },
            async { None },
        )
        .await
        .unwrap();

        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout_text(), Some("out"));
        assert!(outcome.stderr.is_none());
    }

    #[tokio::test]
    async fn test_stderr_failure_overrides_clean_exit() {
        let err = assemble(
            1,
            Termination::Exited(0),
            false,
            async { Some(Ok(Captured::Text("fine".into()))) },
            async { Some(Err(stream_error(StreamName::Stderr))) },
        )
        .await
        .unwrap_err();

        assert_eq!(err.reason(), Some(FailureReason::StreamError));
    }

    #[tokio::test]
    async fn test_stream_failure_not_suppressed_by_ignore_error() {
        let err = assemble(
            1,
            Termination::Exited(5),
            true,
            async { Some(Err(stream_error(StreamName::Stdout))) },
            async { None },
        )
        .await
        .unwrap_err();

        assert_eq!(err.reason(), Some(FailureReason::StreamError));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reported_before_captures() {
        let err = assemble(
            9,
            Termination::Exited(3),
            false,
            std::future::pending::<Option<Result<Captured>>>(),
            async { None },
        )
        .await
        .unwrap_err();

        assert_eq!(err.reason(), Some(FailureReason::NonZeroExit));
        assert_eq!(err.exit_code(), Some(3));
        assert!(err.to_string().contains("process 9"));
    }

    #[tokio::test]
    async fn test_ignore_error_records_signal() {
        let outcome = assemble(
            1,
            Termination::Signaled("SIGTERM".into()),
            true,
            async { None },
            async { None },
        )
        .await
        .unwrap();

        assert!(outcome.exit_code.is_none());
        assert_eq!(outcome.signal.as_deref(), Some("SIGTERM"));
    }

    #[test]
    #[cfg(unix)]
    fn test_apply_env_keeps_inherited_entries() {
        let mut overrides = EnvVars::new();
        overrides.set("SHELL_SPAWN_APPLY", "1", Platform::Posix);

        let mut cmd = Command::new("true");
        apply_env(&mut cmd, &overrides, Platform::Posix);

        let changes: Vec<_> = cmd.as_std().get_envs().collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "SHELL_SPAWN_APPLY");
        assert_eq!(changes[0].1.and_then(|v| v.to_str()), Some("1"));
    }

    #[test]
    #[cfg(unix)]
    fn test_apply_env_removes_case_variants() {
        std::env::set_var("SHELL_SPAWN_CASED", "inherited");
        let mut overrides = EnvVars::new();
        overrides.set("shell_spawn_cased", "override", Platform::Windows);

        let mut cmd = Command::new("true");
        apply_env(&mut cmd, &overrides, Platform::Windows);

        let changes: Vec<_> = cmd
            .as_std()
            .get_envs()
            .map(|(k, v)| (k.to_owned(), v.map(|v| v.to_owned())))
            .collect();
        assert!(changes.contains(&("SHELL_SPAWN_CASED".into(), None)));
        assert!(changes.contains(&("shell_spawn_cased".into(), Some("override".into()))));
    }

    #[tokio::test]
    async fn test_vetoed_launch() {
        let options = Options::new().echo_command(Echo::filter(|_, _| false));
        let execution = launch(Invocation::new("definitely-not-run", ["x"], options)).unwrap();
        assert!(execution.process.is_none());
        assert!(execution.wait().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_spawn_error() {
        let options = Options::new().echo_command(false);
        let result = launch(Invocation::new(
            "shell-spawn-no-such-program-xyz",
            Vec::<String>::new(),
            options,
        ));
        let err = result.err().unwrap();
        assert_eq!(err.reason(), Some(FailureReason::SpawnError));
    }
}
