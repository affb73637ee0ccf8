//! Reusable launch contexts.
//!
//! A [`Context`] bundles a baseline [`Options`] with the three entry points
//! ([`Context::shell`], [`Context::spawn`], [`Context::exec`]). Deriving a
//! context layers overrides onto a copy of the baseline; the parent is
//! never modified.

use std::sync::Arc;

use crate::env::{self, EnvVars};
use crate::error::Result;
use crate::execution::{launch, Execution, Invocation, Outcome};
use crate::options::Options;
use crate::platform::Platform;

/// Baseline options plus the entry points bound to them.
#[derive(Debug, Clone)]
pub struct Context {
    options: Arc<Options>,
}

impl Default for Context {
    /// The root context: echo on, errors reported, text normalized.
    fn default() -> Self {
        Self::new(Options::defaults())
    }
}

impl Context {
    /// Create a context whose baseline is exactly `options`.
    pub fn new(options: Options) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// The baseline options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Derive a child context with `overrides` layered onto this baseline.
    pub fn context(&self, overrides: Options) -> Context {
        Context::new(self.options.merge(&overrides))
    }

    /// Effective options for one call.
    pub fn effective(&self, overrides: &Options) -> Options {
        self.options.merge(overrides)
    }

    /// Run `command` through the system shell and wait for it.
    pub async fn shell(&self, command: &str, overrides: Options) -> Result<Option<Outcome>> {
        self.exec(command, overrides)?.wait().await
    }

    /// Run `command` through the system shell, returning the process handle
    /// alongside the completion.
    pub fn exec(&self, command: &str, overrides: Options) -> Result<Execution> {
        launch(Invocation::shell(command, self.effective(&overrides)))
    }

    /// Run `program` directly with `args`.
    pub fn spawn<I, S>(&self, program: &str, args: I, overrides: Options) -> Result<Execution>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        launch(Invocation::new(program, args, self.effective(&overrides)))
    }

    /// The environment a launch through this context would see, with
    /// `overrides` applied last.
    pub fn env(&self, overrides: &EnvVars) -> EnvVars {
        let base = self.options.env.clone().unwrap_or_default();
        env::compose_with(
            &EnvVars::inherited(),
            &[&base, overrides],
            Platform::current(),
        )
    }
}
