//! Launch options and their layering.
//!
//! Every option is optional so that a layer only overrides what it sets.
//! Layers are combined left to right with [`Options::merge`]; the later
//! layer wins field by field, except `env`, where both mappings are merged
//! so a context's baseline additions survive a per-call override.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::env::{EnvValue, EnvVars};
use crate::platform::Platform;

/// Predicate consulted before launch. Returning `false` vetoes the launch.
pub type EchoFilter = Arc<dyn Fn(&str, &[String]) -> bool + Send + Sync>;

/// Transform applied to the raw bytes of a captured stream.
pub type CaptureTransform = Arc<dyn Fn(Vec<u8>) -> Box<dyn Any + Send> + Send + Sync>;

/// Custom text normalization applied to decoded captures.
pub type TextNormalizer = Arc<dyn Fn(String) -> String + Send + Sync>;

/// Hook applied to the OS command right before it is spawned.
pub type CommandHook = Arc<dyn Fn(&mut tokio::process::Command) + Send + Sync>;

/// Pre-flight display of the invocation.
#[derive(Clone)]
pub enum Echo {
    /// Launch silently.
    Off,
    /// Print `<program> <args...>` to stdout.
    Print,
    /// Ask a predicate; `false` aborts the launch.
    Filter(EchoFilter),
}

impl Echo {
    /// Build a filtering echo from a closure.
    pub fn filter<F>(f: F) -> Self
    where
        F: Fn(&str, &[String]) -> bool + Send + Sync + 'static,
    {
        Echo::Filter(Arc::new(f))
    }
}

impl fmt::Debug for Echo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Echo::Off => f.write_str("Off"),
            Echo::Print => f.write_str("Print"),
            Echo::Filter(_) => f.write_str("Filter(..)"),
        }
    }
}

impl From<bool> for Echo {
    fn from(on: bool) -> Self {
        if on {
            Echo::Print
        } else {
            Echo::Off
        }
    }
}

/// How a child stream is captured.
#[derive(Clone)]
pub enum Capture {
    /// Do not capture; the stream is inherited.
    Off,
    /// Capture as decoded, normalized text.
    Text,
    /// Capture the raw bytes.
    Bytes,
    /// Capture the raw bytes and hand them to a transform.
    Transform(CaptureTransform),
}

impl Capture {
    /// Build a transforming capture from a closure.
    pub fn transform<T, F>(f: F) -> Self
    where
        T: Any + Send,
        F: Fn(Vec<u8>) -> T + Send + Sync + 'static,
    {
        Capture::Transform(Arc::new(move |bytes| Box::new(f(bytes)) as Box<dyn Any + Send>))
    }

    /// Whether the stream should be piped.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Capture::Off)
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capture::Off => f.write_str("Off"),
            Capture::Text => f.write_str("Text"),
            Capture::Bytes => f.write_str("Bytes"),
            Capture::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl From<bool> for Capture {
    fn from(on: bool) -> Self {
        if on {
            Capture::Text
        } else {
            Capture::Off
        }
    }
}

/// Line-ending normalization for text captures.
#[derive(Clone)]
pub enum Normalize {
    /// Keep the decoded text as is.
    Off,
    /// Rewrite `\r\n` and bare `\r` to `\n`.
    Newlines,
    /// Apply a caller-supplied function.
    Custom(TextNormalizer),
}

impl Normalize {
    /// Build a custom normalizer from a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        Normalize::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Normalize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalize::Off => f.write_str("Off"),
            Normalize::Newlines => f.write_str("Newlines"),
            Normalize::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<bool> for Normalize {
    fn from(on: bool) -> Self {
        if on {
            Normalize::Newlines
        } else {
            Normalize::Off
        }
    }
}

/// Wiring of a single stdio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioKind {
    /// Share the parent's stream.
    Inherit,
    /// Create a pipe.
    Piped,
    /// Connect to the null device.
    Null,
}

impl StdioKind {
    pub(crate) fn to_stdio(self) -> std::process::Stdio {
        match self {
            StdioKind::Inherit => std::process::Stdio::inherit(),
            StdioKind::Piped => std::process::Stdio::piped(),
            StdioKind::Null => std::process::Stdio::null(),
        }
    }
}

/// Raw stdio configuration, passed to the OS uninterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStdio {
    pub stdin: StdioKind,
    pub stdout: StdioKind,
    pub stderr: StdioKind,
}

impl RawStdio {
    /// Same wiring for all three streams.
    pub fn all(kind: StdioKind) -> Self {
        Self {
            stdin: kind,
            stdout: kind,
            stderr: kind,
        }
    }
}

/// Options controlling a launch.
///
/// Fields left as `None` fall through to earlier layers and finally to the
/// built-in defaults.
#[derive(Clone, Default)]
pub struct Options {
    /// Display or filter the invocation before launch.
    pub echo_command: Option<Echo>,
    /// Resolve successfully even on nonzero exit or signal.
    pub ignore_error: Option<bool>,
    /// Shell executable for shell-mode invocations.
    pub shell_name: Option<String>,
    /// Arguments placed before the command string in shell mode.
    pub shell_switch: Option<Vec<String>>,
    /// Bytes written to the child's stdin, which is then closed.
    pub input_content: Option<Vec<u8>>,
    /// Capture of the child's stdout.
    pub capture_output: Option<Capture>,
    /// Capture of the child's stderr.
    pub capture_error: Option<Capture>,
    /// Line-ending normalization of text captures.
    pub normalize_text: Option<Normalize>,
    /// Environment used verbatim, bypassing composition.
    pub raw_env: Option<BTreeMap<String, String>>,
    /// Environment overrides composed onto the inherited environment.
    pub env: Option<EnvVars>,

    // Host pass-through.
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Raw stdio wiring; disables input and capture handling.
    pub stdio: Option<RawStdio>,
    /// `argv[0]` override (POSIX).
    pub arg0: Option<String>,
    /// User id of the child (POSIX).
    pub uid: Option<u32>,
    /// Group id of the child (POSIX).
    pub gid: Option<u32>,
    /// Process group of the child, `0` for a new group (POSIX).
    pub process_group: Option<i32>,
    /// Pass arguments without re-quoting (Windows).
    pub verbatim_arguments: Option<bool>,
    /// Arbitrary adjustment of the OS command, applied last.
    pub command_hook: Option<CommandHook>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("echo_command", &self.echo_command)
            .field("ignore_error", &self.ignore_error)
            .field("shell_name", &self.shell_name)
            .field("shell_switch", &self.shell_switch)
            .field("input_content", &self.input_content.as_ref().map(Vec::len))
            .field("capture_output", &self.capture_output)
            .field("capture_error", &self.capture_error)
            .field("normalize_text", &self.normalize_text)
            .field("raw_env", &self.raw_env.as_ref().map(BTreeMap::len))
            .field("env", &self.env)
            .field("cwd", &self.cwd)
            .field("stdio", &self.stdio)
            .field("arg0", &self.arg0)
            .field("uid", &self.uid)
            .field("gid", &self.gid)
            .field("process_group", &self.process_group)
            .field("verbatim_arguments", &self.verbatim_arguments)
            .field("command_hook", &self.command_hook.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Options {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults of the root context.
    pub fn defaults() -> Self {
        Self {
            echo_command: Some(Echo::Print),
            ignore_error: Some(false),
            capture_output: Some(Capture::Off),
            capture_error: Some(Capture::Off),
            normalize_text: Some(Normalize::Newlines),
            ..Self::default()
        }
    }

    /// Set the echo behavior.
    pub fn echo_command(mut self, echo: impl Into<Echo>) -> Self {
        self.echo_command = Some(echo.into());
        self
    }

    /// Set whether abnormal termination is ignored.
    pub fn ignore_error(mut self, ignore: bool) -> Self {
        self.ignore_error = Some(ignore);
        self
    }

    /// Set the shell executable.
    pub fn shell_name(mut self, shell: impl Into<String>) -> Self {
        self.shell_name = Some(shell.into());
        self
    }

    /// Set the shell switch arguments.
    pub fn shell_switch<I, S>(mut self, switch: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shell_switch = Some(switch.into_iter().map(Into::into).collect());
        self
    }

    /// Set the stdin content.
    pub fn input_content(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input_content = Some(input.into());
        self
    }

    /// Set stdout capture.
    pub fn capture_output(mut self, capture: impl Into<Capture>) -> Self {
        self.capture_output = Some(capture.into());
        self
    }

    /// Set stderr capture.
    pub fn capture_error(mut self, capture: impl Into<Capture>) -> Self {
        self.capture_error = Some(capture.into());
        self
    }

    /// Set text normalization.
    pub fn normalize_text(mut self, normalize: impl Into<Normalize>) -> Self {
        self.normalize_text = Some(normalize.into());
        self
    }

    /// Use `vars` as the complete child environment.
    pub fn raw_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.raw_env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Add an environment override.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<EnvValue>) -> Self {
        self.env
            .get_or_insert_with(EnvVars::new)
            .set(key, value, Platform::current());
        self
    }

    /// Add multiple environment overrides.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<EnvValue>,
    {
        let env = self.env.get_or_insert_with(EnvVars::new);
        for (k, v) in vars {
            env.set(k, v, Platform::current());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set raw stdio wiring.
    pub fn stdio(mut self, stdio: RawStdio) -> Self {
        self.stdio = Some(stdio);
        self
    }

    /// Set `argv[0]`.
    pub fn arg0(mut self, arg0: impl Into<String>) -> Self {
        self.arg0 = Some(arg0.into());
        self
    }

    /// Set the child's user id.
    pub fn uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Set the child's group id.
    pub fn gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    /// Set the child's process group.
    pub fn process_group(mut self, pgroup: i32) -> Self {
        self.process_group = Some(pgroup);
        self
    }

    /// Set verbatim argument passing.
    pub fn verbatim_arguments(mut self, verbatim: bool) -> Self {
        self.verbatim_arguments = Some(verbatim);
        self
    }

    /// Set a hook run on the OS command before spawning.
    pub fn command_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut tokio::process::Command) + Send + Sync + 'static,
    {
        self.command_hook = Some(Arc::new(hook));
        self
    }

    /// Layer `other` on top of `self`, producing a new value.
    pub fn merge(&self, other: &Options) -> Options {
        fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
            over.clone().or_else(|| base.clone())
        }

        let env = match (&self.env, &other.env) {
            (Some(base), Some(over)) => {
                let mut merged = base.clone();
                merged.extend_from(over, Platform::current());
                Some(merged)
            }
            (base, over) => pick(base, over),
        };

        Options {
            echo_command: pick(&self.echo_command, &other.echo_command),
            ignore_error: pick(&self.ignore_error, &other.ignore_error),
            shell_name: pick(&self.shell_name, &other.shell_name),
            shell_switch: pick(&self.shell_switch, &other.shell_switch),
            input_content: pick(&self.input_content, &other.input_content),
            capture_output: pick(&self.capture_output, &other.capture_output),
            capture_error: pick(&self.capture_error, &other.capture_error),
            normalize_text: pick(&self.normalize_text, &other.normalize_text),
            raw_env: pick(&self.raw_env, &other.raw_env),
            env,
            cwd: pick(&self.cwd, &other.cwd),
            stdio: pick(&self.stdio, &other.stdio),
            arg0: pick(&self.arg0, &other.arg0),
            uid: pick(&self.uid, &other.uid),
            gid: pick(&self.gid, &other.gid),
            process_group: pick(&self.process_group, &other.process_group),
            verbatim_arguments: pick(&self.verbatim_arguments, &other.verbatim_arguments),
            command_hook: pick(&self.command_hook, &other.command_hook),
        }
    }

    /// Layer any number of option sets, left to right.
    pub fn layer<'a, I>(layers: I) -> Options
    where
        I: IntoIterator<Item = &'a Options>,
    {
        layers
            .into_iter()
            .fold(Options::new(), |acc, layer| acc.merge(layer))
    }

    pub(crate) fn stdout_capture(&self) -> Capture {
        self.capture_output.clone().unwrap_or(Capture::Off)
    }

    pub(crate) fn stderr_capture(&self) -> Capture {
        self.capture_error.clone().unwrap_or(Capture::Off)
    }

    pub(crate) fn normalization(&self) -> Normalize {
        self.normalize_text.clone().unwrap_or(Normalize::Newlines)
    }
}
