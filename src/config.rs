//! Configuration management for the shell-spawn binary.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::env::EnvValue;
use crate::options::Options;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Baseline launch options.
    pub defaults: DefaultsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Baseline launch options section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    /// Print each invocation before running it.
    pub echo_command: bool,
    /// Treat nonzero exits and signals as success.
    pub ignore_error: bool,
    /// Shell executable for shell-mode commands.
    pub shell_name: Option<String>,
    /// Switches placed before the command string.
    pub shell_switch: Option<Vec<String>>,
    /// Normalize line endings of captured text.
    pub normalize_text: bool,
    /// Environment overrides; list values are joined as path lists.
    pub env: BTreeMap<String, EnvValue>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            echo_command: true,
            ignore_error: false,
            shell_name: None,
            shell_switch: None,
            normalize_text: true,
            env: BTreeMap::new(),
            cwd: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(shell) = std::env::var("SHELL_SPAWN_SHELL") {
            if !shell.is_empty() {
                self.defaults.shell_name = Some(shell);
            }
        }

        if let Ok(level) = std::env::var("SHELL_SPAWN_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref shell) = args.shell {
            self.defaults.shell_name = Some(shell.clone());
        }

        if !args.switch.is_empty() {
            self.defaults.shell_switch = Some(args.switch.clone());
        }

        if args.quiet {
            self.defaults.echo_command = false;
        }

        if args.ignore_error {
            self.defaults.ignore_error = true;
        }

        if let Some(ref dir) = args.cwd {
            self.defaults.cwd = Some(dir.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert the defaults section into baseline launch options.
    pub fn to_options(&self) -> Options {
        let d = &self.defaults;
        let mut options = Options::new()
            .echo_command(d.echo_command)
            .ignore_error(d.ignore_error)
            .normalize_text(d.normalize_text);

        if let Some(ref shell) = d.shell_name {
            options = options.shell_name(shell.clone());
        }
        if let Some(ref switch) = d.shell_switch {
            options = options.shell_switch(switch.clone());
        }
        if !d.env.is_empty() {
            options = options.envs(d.env.clone());
        }
        if let Some(ref dir) = d.cwd {
            options = options.cwd(dir.clone());
        }

        options
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
