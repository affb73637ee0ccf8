//! Command-line interface for shell-spawn.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

use crate::options::Options;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Command words: a shell command line, or program and arguments with `--direct`.
    pub command: Vec<String>,
    /// Run the first command word directly instead of through a shell.
    pub direct: bool,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Shell executable override.
    pub shell: Option<String>,
    /// Shell switches (repeatable).
    pub switch: Vec<String>,
    /// Environment overrides as `KEY=VALUE` pairs.
    pub env: Vec<(String, String)>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Text written to the child's stdin.
    pub input: Option<String>,
    /// Capture stdout and print it after the child exits.
    pub capture: bool,
    /// Capture stderr and print it after the child exits.
    pub capture_error: bool,
    /// Treat nonzero exits and signals as success.
    pub ignore_error: bool,
    /// Do not echo the command before running it.
    pub quiet: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Args {
    /// Per-call options derived from the arguments.
    pub fn overrides(&self) -> Options {
        let mut options = Options::new();
        if self.capture {
            options = options.capture_output(true);
        }
        if self.capture_error {
            options = options.capture_error(true);
        }
        if let Some(ref input) = self.input {
            options = options.input_content(input.clone());
        }
        if !self.env.is_empty() {
            options = options.envs(self.env.clone());
        }
        options
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("shell") => {
                result.shell = Some(parser.value()?.parse()?);
            }
            Long("switch") => {
                result.switch.push(parser.value()?.parse()?);
            }
            Short('e') | Long("env") => {
                let value: String = parser.value()?.parse()?;
                let (key, val) = value
                    .split_once('=')
                    .filter(|(key, _)| !key.is_empty())
                    .ok_or_else(|| ArgsError::InvalidValue("env", value.clone()))?;
                result.env.push((key.to_string(), val.to_string()));
            }
            Short('C') | Long("cwd") => {
                result.cwd = Some(parser.value()?.parse()?);
            }
            Short('i') | Long("input") => {
                result.input = Some(parser.value()?.parse()?);
            }
            Long("capture") => {
                result.capture = true;
            }
            Long("capture-error") => {
                result.capture_error = true;
            }
            Long("ignore-error") => {
                result.ignore_error = true;
            }
            Short('q') | Long("quiet") => {
                result.quiet = true;
            }
            Long("direct") => {
                result.direct = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                // The first command word ends option parsing; the rest belongs to the child.
                result.command.push(into_word(val)?);
                for raw in parser.raw_args()? {
                    result.command.push(into_word(raw)?);
                }
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

fn into_word(value: OsString) -> Result<String, ArgsError> {
    value
        .into_string()
        .map_err(|v| ArgsError::InvalidValue("command", v.to_string_lossy().into_owned()))
}

/// Print help message.
pub fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"shell-spawn {version}
Run a command, feed its input and capture its output

USAGE:
    shell-spawn [OPTIONS] [--] <COMMAND>...

OPTIONS:
    -c, --config <FILE>     Path to configuration file (JSON)
    -s, --shell <SHELL>     Shell executable [default: /bin/sh or %COMSPEC%]
        --switch <ARG>      Shell switch, repeatable [default: -c or /s /c]
    -e, --env <KEY=VALUE>   Environment override, repeatable
    -C, --cwd <DIR>         Working directory
    -i, --input <TEXT>      Text written to the command's stdin
        --capture           Capture stdout and print it after exit
        --capture-error     Capture stderr and print it after exit
        --ignore-error      Report failed runs as success; the exit code is still mirrored
        --direct            Run the first word as a program, without a shell
    -q, --quiet             Do not echo the command before running it
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SHELL_SPAWN_SHELL       Shell executable (overrides config)
    SHELL_SPAWN_LOG_LEVEL   Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Run through the shell
    shell-spawn 'ls -la | wc -l'

    # Run a program directly with captured output
    shell-spawn --direct --capture -- git status --short

    # Pipe input into a command
    shell-spawn -q -i 'hello' cat
"#
    )
}

/// Print version.
pub fn print_version() {
    println!("shell-spawn {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
