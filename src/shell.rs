//! Translation of a shell command line into a direct invocation.
//!
//! No shell syntax is interpreted here; the host shell does that.

use crate::options::Options;
use crate::platform::Platform;

/// Shell used on POSIX hosts when none is configured.
pub const POSIX_SHELL: &str = "/bin/sh";

/// Shell used on Windows hosts when neither a shell nor `COMSPEC` is set.
pub const WINDOWS_SHELL: &str = "cmd.exe";

/// A shell command resolved into a program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// The shell executable.
    pub program: String,
    /// Shell switches followed by the command string.
    pub args: Vec<String>,
    /// Arguments must reach the OS without re-quoting.
    pub verbatim: bool,
}

impl ShellCommand {
    /// Resolve `command` for the current platform.
    pub fn resolve(command: &str, options: &Options) -> Self {
        Self::resolve_for(command, options, Platform::current())
    }

    /// Resolve `command` for an explicit platform.
    pub fn resolve_for(command: &str, options: &Options, platform: Platform) -> Self {
        match platform {
            Platform::Windows => {
                let program = options
                    .shell_name
                    .clone()
                    .or_else(comspec)
                    .unwrap_or_else(|| WINDOWS_SHELL.to_string());
                let mut args = switches(options, &["/s", "/c"]);
                args.push(format!("\"{}\"", command));
                Self {
                    program,
                    args,
                    verbatim: true,
                }
            }
            Platform::Posix => {
                let program = options
                    .shell_name
                    .clone()
                    .unwrap_or_else(|| POSIX_SHELL.to_string());
                let mut args = switches(options, &["-c"]);
                args.push(command.to_string());
                Self {
                    program,
                    args,
                    verbatim: false,
                }
            }
        }
    }
}

fn switches(options: &Options, default: &[&str]) -> Vec<String> {
    options
        .shell_switch
        .clone()
        .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
}

fn comspec() -> Option<String> {
    // Windows env names are case-insensitive; on other hosts try both spellings.
    std::env::var("COMSPEC")
        .or_else(|_| std::env::var("ComSpec"))
        .ok()
        .filter(|s| !s.is_empty())
}
