//! Execution result types.

use std::any::Any;
use std::fmt;
use std::process::ExitStatus;

use crate::error::ShellSpawnError;

/// Final value of one captured stream.
pub enum Captured {
    /// Decoded (and possibly normalized) text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Result of a caller-supplied transform.
    Custom(Box<dyn Any + Send>),
}

impl Captured {
    /// The captured text, if captured as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Captured::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// The captured bytes, if captured raw.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Captured::Bytes(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    /// The transform result, if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Captured::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Consume into the transform result, if it has type `T`.
    pub fn downcast<T: Any>(self) -> Option<T> {
        match self {
            Captured::Custom(value) => value.downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Captured::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Captured::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Captured::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How a process ended: with an exit code or by a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(String),
}

impl Termination {
    /// Classify an OS exit status.
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signaled(signal_name(signal));
            }
        }
        // Neither code nor signal is only possible on exotic platforms.
        Termination::Exited(-1)
    }

    /// The failure this termination represents, if abnormal.
    pub fn failure(&self, pid: u32) -> Option<ShellSpawnError> {
        match self {
            Termination::Exited(0) => None,
            Termination::Exited(code) => Some(ShellSpawnError::NonZeroExit { pid, code: *code }),
            Termination::Signaled(signal) => Some(ShellSpawnError::KilledBySignal {
                pid,
                signal: signal.clone(),
            }),
        }
    }
}

/// Conventional name of a POSIX signal number.
#[cfg(unix)]
pub fn signal_name(signal: i32) -> String {
    let name = match signal {
        libc::SIGHUP => "SIGHUP",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGILL => "SIGILL",
        libc::SIGTRAP => "SIGTRAP",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGFPE => "SIGFPE",
        libc::SIGKILL => "SIGKILL",
        libc::SIGUSR1 => "SIGUSR1",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGUSR2 => "SIGUSR2",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGALRM => "SIGALRM",
        libc::SIGTERM => "SIGTERM",
        libc::SIGCHLD => "SIGCHLD",
        libc::SIGCONT => "SIGCONT",
        libc::SIGSTOP => "SIGSTOP",
        libc::SIGTSTP => "SIGTSTP",
        libc::SIGTTIN => "SIGTTIN",
        libc::SIGTTOU => "SIGTTOU",
        libc::SIGXCPU => "SIGXCPU",
        libc::SIGXFSZ => "SIGXFSZ",
        libc::SIGVTALRM => "SIGVTALRM",
        libc::SIGPROF => "SIGPROF",
        libc::SIGWINCH => "SIGWINCH",
        libc::SIGSYS => "SIGSYS",
        other => return format!("SIG{}", other),
    };
    name.to_string()
}

/// Successful completion of an invocation.
#[derive(Debug)]
pub struct Outcome {
    /// OS process id.
    pub pid: u32,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Signal name, if the process was killed by a signal.
    pub signal: Option<String>,
    /// Captured stdout, present only when stdout capture was requested.
    pub stdout: Option<Captured>,
    /// Captured stderr, present only when stderr capture was requested.
    pub stderr: Option<Captured>,
}

impl Outcome {
    /// Build an outcome without captures.
    pub fn new(pid: u32, termination: Termination) -> Self {
        let (exit_code, signal) = match termination {
            Termination::Exited(code) => (Some(code), None),
            Termination::Signaled(signal) => (None, Some(signal)),
        };
        Self {
            pid,
            exit_code,
            signal,
            stdout: None,
            stderr: None,
        }
    }

    /// Check if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Captured stdout as text.
    pub fn stdout_text(&self) -> Option<&str> {
        self.stdout.as_ref().and_then(Captured::as_text)
    }

    /// Captured stderr as text.
    pub fn stderr_text(&self) -> Option<&str> {
        self.stderr.as_ref().and_then(Captured::as_text)
    }
}
