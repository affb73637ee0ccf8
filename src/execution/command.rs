//! Invocation building and representation.

use crate::options::Options;
use crate::shell::ShellCommand;

/// A fully resolved request to run one program.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Program to execute.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Effective options after layering.
    pub options: Options,
    /// Pass arguments to the OS without re-quoting (Windows shell mode).
    pub verbatim_args: bool,
}

impl Invocation {
    /// Create a direct invocation of `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I, options: Options) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let verbatim_args = options.verbatim_arguments.unwrap_or(false);
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            options,
            verbatim_args,
        }
    }

    /// Create an invocation that runs `command` through the system shell.
    pub fn shell(command: &str, options: Options) -> Self {
        let ShellCommand {
            program,
            args,
            verbatim,
        } = ShellCommand::resolve(command, &options);
        let verbatim_args = verbatim || options.verbatim_arguments.unwrap_or(false);
        Self {
            program,
            args,
            options,
            verbatim_args,
        }
    }

    /// Human-readable form used for echoing: program followed by arguments.
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}
