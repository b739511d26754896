//! Configuration loader for unasync runs.
//!
//! `defaults/unasync.default.toml` is embedded into every binary so the
//! documented defaults and the runtime behavior stay in sync. Callers layer
//! project files on top of those defaults via [`Loader`] before deserializing
//! into [`UnasyncConfig`].

use std::path::{Path, PathBuf};

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;

use crate::errors::Result;
use crate::rule::Rule;

const DEFAULT_TOML: &str = include_str!("../defaults/unasync.default.toml");

/// Top-level configuration consumed by unasync front ends.
#[derive(Debug, Clone, Deserialize)]
pub struct UnasyncConfig {
    /// Extensions (without the dot) collected when walking directories
    pub extensions: Vec<String>,
    pub rules: Vec<RuleConfig>,
}

/// One `[[rules]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub from: PathBuf,
    pub to: PathBuf,
    #[serde(default)]
    pub replacements: Vec<ReplacementConfig>,
}

/// Extra token replacement. Stored as a pair rather than a table key so the
/// token's case is never folded by the config layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplacementConfig {
    pub from: String,
    pub to: String,
}

impl RuleConfig {
    /// Build the rule, resolving relative roots against `base`.
    pub fn to_rule(&self, base: &Path) -> Result<Rule> {
        Rule::new(
            base.join(&self.from),
            base.join(&self.to),
            self.replacements.iter().map(|r| (r.from.clone(), r.to.clone())),
        )
    }
}

impl UnasyncConfig {
    /// Rules in file order; relative roots are resolved against `base`.
    pub fn rules(&self, base: &Path) -> Result<Vec<Rule>> {
        self.rules.iter().map(|rule| rule.to_rule(base)).collect()
    }

    /// Whether `path` carries one of the configured extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer TOML text directly.
    pub fn with_str(mut self, toml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(toml, FileFormat::Toml));
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> std::result::Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<UnasyncConfig> {
        Ok(self.builder.build()?.try_deserialize()?)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<UnasyncConfig> {
    Loader::new().build()
}
