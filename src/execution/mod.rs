//! Process launch and capture engine.
//!
//! This module provides:
//! - Invocation requests for direct and shell-mode launches
//! - Stdio wiring derived from input and capture options
//! - Concurrent capture of stdout and stderr
//! - Translation of exit codes and signals into one completion
//!
//! # Example
//!
//! ```no_run
//! use shell_spawn::execution::{launch, Invocation};
//! use shell_spawn::Options;
//!
//! # async fn run() -> shell_spawn::Result<()> {
//! let options = Options::new().capture_output(true).echo_command(false);
//! let execution = launch(Invocation::shell("echo hello", options))?;
//! if let Some(outcome) = execution.wait().await? {
//!     println!("Output: {}", outcome.stdout_text().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
mod command;
mod launcher;
mod result;

pub use command::Invocation;
pub use launcher::{launch, Completion, Execution, ProcessHandle};
pub use result::{Captured, Outcome, Termination};

#[cfg(unix)]
pub use result::signal_name;
