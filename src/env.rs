//! Environment composition.
//!
//! A child's environment is built from the inherited process environment
//! with one or more override layers applied on top, last write wins. On
//! platforms where variable names are case-insensitive, setting a key first
//! drops every existing key that differs from it only by case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// A single override value.
///
/// List values are joined with the platform's path-list separator when
/// they are stored, so `PATH`-like variables can be given as segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    /// Plain string value.
    One(String),
    /// Path-list value.
    List(Vec<String>),
}

impl EnvValue {
    /// Flatten into the string stored in the environment.
    pub fn join(&self, platform: Platform) -> String {
        match self {
            EnvValue::One(value) => value.clone(),
            EnvValue::List(parts) => parts.join(platform.path_list_separator()),
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::One(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        EnvValue::One(value)
    }
}

impl From<Vec<String>> for EnvValue {
    fn from(parts: Vec<String>) -> Self {
        EnvValue::List(parts)
    }
}

impl From<Vec<&str>> for EnvValue {
    fn from(parts: Vec<&str>) -> Self {
        EnvValue::List(parts.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EnvValue {
    fn from(parts: [&str; N]) -> Self {
        EnvValue::List(parts.iter().map(|s| s.to_string()).collect())
    }
}

/// A flat mapping of environment variable names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: BTreeMap<String, String>,
}

impl EnvVars {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the environment of the current process.
    ///
    /// Entries that are not valid Unicode are converted lossily.
    pub fn inherited() -> Self {
        let vars = std::env::vars_os()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.to_string_lossy().into_owned(),
                )
            })
            .collect();
        Self { vars }
    }

    /// Set `key`, replacing any existing entry.
    ///
    /// On case-insensitive platforms entries whose names match `key`
    /// ignoring case are removed first.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<EnvValue>, platform: Platform) {
        let key = key.into();
        let value = value.into().join(platform);
        if platform.env_case_insensitive() {
            self.vars.retain(|name, _| !name.eq_ignore_ascii_case(&key));
        }
        self.vars.insert(key, value);
    }

    /// Apply every entry of `other` on top of `self`.
    pub fn extend_from(&mut self, other: &EnvVars, platform: Platform) {
        for (key, value) in &other.vars {
            self.set(key.clone(), value.clone(), platform);
        }
    }

    /// Look up a variable by exact name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if there are no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for EnvVars
where
    K: Into<String>,
    V: Into<EnvValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let platform = Platform::current();
        let mut vars = EnvVars::new();
        for (k, v) in iter {
            vars.set(k, v, platform);
        }
        vars
    }
}

/// Compose a child environment from an explicit starting point.
///
/// `layers` are applied left to right on top of `inherited`.
pub fn compose_with(inherited: &EnvVars, layers: &[&EnvVars], platform: Platform) -> EnvVars {
    let mut composed = EnvVars::new();
    composed.extend_from(inherited, platform);
    for layer in layers {
        composed.extend_from(layer, platform);
    }
    composed
}

/// Compose the inherited environment of this process with `base` and then
/// `overrides`.
pub fn compose(base: &EnvVars, overrides: &EnvVars) -> EnvVars {
    compose_with(
        &EnvVars::inherited(),
        &[base, overrides],
        Platform::current(),
    )
}
