//! Error types for shell-spawn.

use std::fmt;

use thiserror::Error;

/// Which child stream a capture error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamName::Stdout => f.write_str("stdout"),
            StreamName::Stderr => f.write_str("stderr"),
        }
    }
}

/// Classification of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The process exited with a nonzero code.
    NonZeroExit,
    /// The process was terminated by a signal.
    KilledBySignal,
    /// A captured stream could not be read.
    StreamError,
    /// The OS could not create the process.
    SpawnError,
}

/// Main error type for shell-spawn operations.
#[derive(Error, Debug)]
pub enum ShellSpawnError {
    /// The OS refused to start the process.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a nonzero code.
    #[error("process {pid} exited with code {code}")]
    NonZeroExit { pid: u32, code: i32 },

    /// The process was terminated by a signal.
    #[error("process {pid} was terminated by signal {signal}")]
    KilledBySignal { pid: u32, signal: String },

    /// Reading a captured stream failed.
    #[error("failed to read {stream}: {source}")]
    Stream {
        stream: StreamName,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for process termination failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The supervising task panicked or was cancelled.
    #[error("supervisor task failed: {0}")]
    Join(String),
}

impl ShellSpawnError {
    /// Map onto the failure taxonomy, if this is one of its members.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Spawn { .. } => Some(FailureReason::SpawnError),
            Self::NonZeroExit { .. } => Some(FailureReason::NonZeroExit),
            Self::KilledBySignal { .. } => Some(FailureReason::KilledBySignal),
            Self::Stream { .. } => Some(FailureReason::StreamError),
            Self::Io(_) | Self::Join(_) => None,
        }
    }

    /// Exit code carried by a `NonZeroExit` failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Signal name carried by a `KilledBySignal` failure.
    pub fn signal(&self) -> Option<&str> {
        match self {
            Self::KilledBySignal { signal, .. } => Some(signal.as_str()),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for ShellSpawnError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

/// Convenience Result type for shell-spawn operations.
pub type Result<T> = std::result::Result<T, ShellSpawnError>;
