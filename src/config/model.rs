// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::classify::DEFAULT_MAX_MATCHES;
use crate::errors::Result;
use crate::strategy::PatternStrategy;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// max_matches = 10
///
/// [strategy.rsync]
/// stderr = ['^rsync: connection unexpectedly closed']
/// auto = ["rsync"]
/// ```
///
/// All sections are optional. Convert into a [`ConfigFile`] with
/// `ConfigFile::try_from(raw)` to validate it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Custom pattern strategies from `[strategy.<name>]`.
    #[serde(default)]
    pub strategy: BTreeMap<String, StrategyConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Match budget for every strategy that does not set its own.
    #[serde(default = "default_max_matches")]
    pub max_matches: u32,
}

fn default_max_matches() -> u32 {
    DEFAULT_MAX_MATCHES
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_matches: default_max_matches(),
        }
    }
}

/// `[strategy.<name>]` section: a pattern strategy defined in config.
///
/// Within one strategy, stdout patterns are registered first, then stderr,
/// then either, each list in file order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    #[serde(default)]
    pub stdout: Vec<String>,

    #[serde(default)]
    pub stderr: Vec<String>,

    #[serde(default)]
    pub either: Vec<String>,

    /// Program basenames that auto-select this strategy, in addition to its
    /// own name.
    #[serde(default)]
    pub auto: Vec<String>,

    /// Overrides `[config].max_matches` for this strategy.
    #[serde(default)]
    pub max_matches: Option<u32>,
}

impl StrategyConfig {
    pub fn pattern_count(&self) -> usize {
        self.stdout.len() + self.stderr.len() + self.either.len()
    }

    pub fn effective_max_matches(&self, default_max_matches: u32) -> u32 {
        self.max_matches.unwrap_or(default_max_matches)
    }

    /// Compile this definition into a strategy named `name`.
    pub fn build(&self, name: &str, default_max_matches: u32) -> Result<PatternStrategy> {
        let strategy = PatternStrategy::new(name)
            .with_max_matches(self.effective_max_matches(default_max_matches));
        let strategy = self
            .stdout
            .iter()
            .try_fold(strategy, |s, p| s.on_stdout(p))?;
        let strategy = self
            .stderr
            .iter()
            .try_fold(strategy, |s, p| s.on_stderr(p))?;
        self.either.iter().try_fold(strategy, |s, p| s.on_either(p))
    }
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on every pattern compiling and every name being unique.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    strategy: BTreeMap<String, StrategyConfig>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(ConfigSection::default(), BTreeMap::new())
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        strategy: BTreeMap<String, StrategyConfig>,
    ) -> Self {
        Self { config, strategy }
    }

    pub fn strategies(&self) -> &BTreeMap<String, StrategyConfig> {
        &self.strategy
    }
}
