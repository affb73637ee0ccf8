//! # shell-spawn
//!
//! Launch child processes, feed them input and capture their output,
//! resolving to a single result once the process terminates.
//!
//! Commands run either directly (program plus arguments) or through the
//! host's system shell. Behavior is controlled by layered [`Options`]; a
//! [`Context`] binds a baseline of options to the entry points so
//! hierarchies of defaults can be built without mutating ancestors.
//!
//! ## Features
//!
//! - **Shell and direct mode**: `/bin/sh -c` on POSIX, `cmd.exe /s /c` on Windows
//! - **Concurrent capture**: stdout and stderr drained independently, no deadlocks
//! - **Typed failures**: nonzero exit, signal, stream and spawn errors
//! - **Layered options**: per-call overrides deep-merge environment additions
//!
//! ## Quick Start
//!
//! ```no_run
//! use shell_spawn::{Context, Options};
//!
//! #[tokio::main]
//! async fn main() -> shell_spawn::Result<()> {
//!     shell_spawn::logging::try_init().ok();
//!
//!     let ctx = Context::default().context(Options::new().echo_command(false));
//!
//!     let outcome = ctx
//!         .shell("echo hello", Options::new().capture_output(true))
//!         .await?
//!         .expect("no echo filter installed");
//!
//!     println!("stdout: {:?}", outcome.stdout_text());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod execution;
pub mod logging;
pub mod options;
pub mod platform;
pub mod shell;

// Re-export commonly used types
pub use context::Context;
pub use env::{EnvValue, EnvVars};
pub use error::{FailureReason, Result, ShellSpawnError, StreamName};
pub use execution::{Captured, Completion, Execution, Invocation, Outcome, ProcessHandle};
pub use options::{Capture, Echo, Normalize, Options, RawStdio, StdioKind};
pub use platform::Platform;
pub use shell::ShellCommand;

/// Run `command` through the system shell with the root defaults and wait
/// for it.
pub async fn shell(command: &str, options: Options) -> Result<Option<Outcome>> {
    Context::default().shell(command, options).await
}

/// Run `command` through the system shell with the root defaults.
pub fn exec(command: &str, options: Options) -> Result<Execution> {
    Context::default().exec(command, options)
}

/// Run `program` directly with the root defaults.
pub fn spawn<I, S>(program: &str, args: I, options: Options) -> Result<Execution>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Context::default().spawn(program, args, options)
}

/// Derive a context from the root defaults.
pub fn context(options: Options) -> Context {
    Context::default().context(options)
}
