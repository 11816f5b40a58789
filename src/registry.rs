// src/registry.rs

//! Named strategy lookup.
//!
//! The registry maps strategy names to factories. Every factory is invoked
//! once when it is registered, so a strategy that cannot be built or that
//! breaks the [`Strategy`] contract is rejected at load time rather than on
//! first use.
//!
//! Built-in strategies are discovered once per process and cached; see
//! [`StrategyRegistry::builtin`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::classify::DEFAULT_MAX_MATCHES;
use crate::config::ConfigFile;
use crate::errors::{ReliableError, Result};
use crate::strategy::{PatternStrategy, Strategy, git, scp, ssh};

/// Builds a fresh strategy instance with its own classification state.
pub type StrategyFactory = Arc<dyn Fn() -> Result<Box<dyn Strategy>> + Send + Sync>;

type BuiltinConstructor = fn(u32) -> Result<PatternStrategy>;

const BUILTINS: &[(&str, BuiltinConstructor)] = &[
    (git::NAME, git::strategy),
    (scp::NAME, scp::strategy),
    (ssh::NAME, ssh::strategy),
];

/// Names of the strategies compiled into this crate.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|&(name, _)| name)
}

/// Selection keywords; a strategy can never be registered under these.
pub const RESERVED_SELECTORS: &[&str] = &["none", "auto", "automatic"];

static BUILTIN_REGISTRY: OnceLock<std::result::Result<StrategyRegistry, String>> =
    OnceLock::new();

/// Which strategies an executor should bind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StrategySelection {
    /// Plain passthrough; never retry.
    None,
    /// Pick a strategy from the basename of the program being run.
    #[default]
    Auto,
    /// Bind all of these, in order.
    Named(Vec<String>),
}

impl StrategySelection {
    pub fn named(name: impl Into<String>) -> Self {
        StrategySelection::Named(vec![name.into()])
    }
}

impl FromStr for StrategySelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(StrategySelection::None),
            "auto" | "automatic" => Ok(StrategySelection::Auto),
            list => {
                let names: Vec<String> = list
                    .split(',')
                    .map(|n| n.trim().to_string())
                    .collect();
                if names.iter().any(|n| n.is_empty()) {
                    return Err(format!("invalid strategy list: {list:?}"));
                }
                if let Some(keyword) = names
                    .iter()
                    .find(|n| RESERVED_SELECTORS.contains(&n.as_str()))
                {
                    return Err(format!(
                        "'{keyword}' cannot be combined with other strategies: {list:?}"
                    ));
                }
                Ok(StrategySelection::Named(names))
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
    /// Extra program basenames that auto-select a strategy.
    aliases: BTreeMap<String, String>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.factories.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in strategies with the default match budget.
    ///
    /// Built once per process; later calls return the cached registry.
    pub fn builtin() -> Result<&'static StrategyRegistry> {
        BUILTIN_REGISTRY
            .get_or_init(|| {
                Self::with_max_matches(DEFAULT_MAX_MATCHES).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|msg| ReliableError::ContractViolation(msg.clone()))
    }

    /// The built-in strategies with a custom match budget.
    pub fn with_max_matches(max_matches: u32) -> Result<Self> {
        let mut registry = Self::new();
        for &(name, constructor) in BUILTINS {
            registry.register(name, move || {
                Ok(Box::new(constructor(max_matches)?) as Box<dyn Strategy>)
            })?;
        }
        debug!(
            strategies = ?registry.factories.keys().collect::<Vec<_>>(),
            max_matches,
            "loaded built-in strategies"
        );
        Ok(registry)
    }

    /// Built-in strategies plus the pattern strategies defined in `cfg`.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::with_max_matches(cfg.config.max_matches)?;

        for (name, def) in cfg.strategies() {
            let template = def.build(name, cfg.config.max_matches)?;
            registry.register(name, move || {
                Ok(Box::new(template.clone()) as Box<dyn Strategy>)
            })?;
            for basename in &def.auto {
                registry.alias(basename, name)?;
            }
        }

        Ok(registry)
    }

    /// Register `factory` under `name`.
    ///
    /// The factory is invoked once to check that it builds, reports `name`
    /// as its name, and does not recommend a retry before it has seen any
    /// output.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn() -> Result<Box<dyn Strategy>> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(ReliableError::ConfigError(format!(
                "strategy '{name}' is registered twice"
            )));
        }
        if RESERVED_SELECTORS.contains(&name) {
            return Err(ReliableError::ConfigError(format!(
                "'{name}' is a selection keyword, not a strategy name"
            )));
        }

        let factory: StrategyFactory = Arc::new(factory);
        check_contract(name, &factory)?;
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// Make program basename `basename` auto-select strategy `name`.
    pub fn alias(&mut self, basename: &str, name: &str) -> Result<()> {
        if !self.factories.contains_key(name) {
            return Err(ReliableError::UnknownStrategy(name.to_string()));
        }
        if let Some(existing) = self.resolve_auto(basename) {
            if existing != name {
                return Err(ReliableError::ConfigError(format!(
                    "program '{basename}' already selects strategy '{existing}'"
                )));
            }
        }
        self.aliases.insert(basename.to_string(), name.to_string());
        Ok(())
    }

    /// Every registered strategy, by name.
    pub fn list_available(&self) -> &BTreeMap<String, StrategyFactory> {
        &self.factories
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Strategy name for a program basename (case-sensitive), if any.
    pub fn resolve_auto(&self, basename: &str) -> Option<&str> {
        if let Some((name, _)) = self.factories.get_key_value(basename) {
            return Some(name.as_str());
        }
        self.aliases.get(basename).map(String::as_str)
    }

    /// Build a fresh instance of strategy `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Strategy>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ReliableError::UnknownStrategy(name.to_string()))?;
        factory()
    }

    pub fn factory(&self, name: &str) -> Result<StrategyFactory> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| ReliableError::UnknownStrategy(name.to_string()))
    }
}

fn check_contract(name: &str, factory: &StrategyFactory) -> Result<()> {
    let mut instance = factory()?;

    if instance.name() != name {
        return Err(ReliableError::ContractViolation(format!(
            "strategy registered as '{name}' reports its name as '{}'",
            instance.name()
        )));
    }

    if !instance.can_retry() {
        warn!(strategy = %name, "strategy has no patterns; it will never recommend a retry");
    }

    instance.about_to_run();
    if let Some(reason) = instance.should_retry() {
        return Err(ReliableError::ContractViolation(format!(
            "strategy '{name}' recommends a retry before observing any output ({reason})"
        )));
    }

    Ok(())
}
