// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ReliableError, Result};
use crate::registry::{RESERVED_SELECTORS, builtin_names};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ReliableError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.strategy))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_strategy_names(cfg)?;
    validate_strategy_patterns(cfg)?;
    validate_auto_basenames(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_matches == 0 {
        return Err(ReliableError::ConfigError(
            "[config].max_matches must be >= 1 (got 0); select strategy \"none\" to disable retries"
                .to_string(),
        ));
    }

    for (name, def) in cfg.strategy.iter() {
        if def.max_matches == Some(0) {
            return Err(ReliableError::ConfigError(format!(
                "[strategy.{name}].max_matches must be >= 1 (got 0)"
            )));
        }
    }

    Ok(())
}

fn validate_strategy_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.strategy.keys() {
        if name.trim().is_empty() || name.contains(',') {
            return Err(ReliableError::ConfigError(format!(
                "invalid strategy name {name:?}"
            )));
        }
        if RESERVED_SELECTORS.contains(&name.as_str()) {
            return Err(ReliableError::ConfigError(format!(
                "strategy name '{name}' is reserved for --strategy {name}"
            )));
        }
        if builtin_names().any(|builtin| builtin == name) {
            return Err(ReliableError::ConfigError(format!(
                "strategy '{name}' shadows a built-in strategy"
            )));
        }
    }
    Ok(())
}

fn validate_strategy_patterns(cfg: &RawConfigFile) -> Result<()> {
    for (name, def) in cfg.strategy.iter() {
        if def.pattern_count() == 0 {
            return Err(ReliableError::ConfigError(format!(
                "strategy '{name}' defines no stdout, stderr or either patterns"
            )));
        }
        // Compiling reports the first bad regex as `InvalidPattern`.
        def.build(name, cfg.config.max_matches)?;
    }
    Ok(())
}

fn validate_auto_basenames(cfg: &RawConfigFile) -> Result<()> {
    let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();

    for name in builtin_names() {
        claimed.insert(name, name);
    }
    for name in cfg.strategy.keys() {
        claimed.insert(name, name);
    }

    for (name, def) in cfg.strategy.iter() {
        for basename in def.auto.iter() {
            if let Some(owner) = claimed.insert(basename.as_str(), name.as_str()) {
                if owner != name {
                    return Err(ReliableError::ConfigError(format!(
                        "program '{basename}' is claimed by both '{owner}' and '{name}'"
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::load_from_str;
    use crate::errors::ReliableError;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = load_from_str("").unwrap();
        assert_eq!(cfg.config.max_matches, 10);
        assert!(cfg.strategies().is_empty());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = load_from_str("[config]\nmax_matches = 0\n").unwrap_err();
        assert!(matches!(err, ReliableError::ConfigError(msg) if msg.contains("max_matches")));
    }

    #[test]
    fn builtin_names_cannot_be_shadowed() {
        let err = load_from_str("[strategy.git]\nstderr = ['boom']\n").unwrap_err();
        assert!(matches!(err, ReliableError::ConfigError(msg) if msg.contains("shadows")));
    }

    #[test]
    fn selector_keywords_cannot_name_a_strategy() {
        for name in ["none", "auto", "automatic"] {
            let err = load_from_str(&format!("[strategy.{name}]\nstderr = ['x']\n")).unwrap_err();
            assert!(
                matches!(&err, ReliableError::ConfigError(msg) if msg.contains("reserved")),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn strategy_names_may_share_a_prefix_with_builtins() {
        let cfg = load_from_str("[strategy.ssh-jump]\nstderr = ['^channel 0: open failed']\n").unwrap();
        assert_eq!(cfg.strategies().len(), 1);
    }

    #[test]
    fn strategy_without_patterns_is_rejected() {
        let err = load_from_str("[strategy.rsync]\nauto = ['rsync']\n").unwrap_err();
        assert!(matches!(err, ReliableError::ConfigError(msg) if msg.contains("no stdout")));
    }

    #[test]
    fn bad_regex_is_rejected() {
        let err = load_from_str("[strategy.rsync]\nstderr = ['(unclosed']\n").unwrap_err();
        assert!(matches!(err, ReliableError::InvalidPattern { .. }));
    }

    #[test]
    fn auto_basename_claimed_twice_is_rejected() {
        let err = load_from_str(
            r#"
[strategy.rsync]
stderr = ['^rsync: connection unexpectedly closed']
auto = ["rsync"]

[strategy.rsync2]
stderr = ['^rsync error']
auto = ["rsync"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReliableError::ConfigError(msg) if msg.contains("claimed")));

        let err = load_from_str("[strategy.mygit]\nstderr = ['x']\nauto = ['git']\n").unwrap_err();
        assert!(matches!(err, ReliableError::ConfigError(_)));
    }

    #[test]
    fn auto_basenames_are_kept_after_validation() {
        let cfg = load_from_str(
            "[strategy.rsync]\nstderr = ['^rsync: connection unexpectedly closed']\nauto = ['rsync', 'rsync-wrapper']\n",
        )
        .unwrap();
        assert_eq!(cfg.strategies()["rsync"].auto, vec!["rsync", "rsync-wrapper"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_from_str("[config]\nmax_retries = 3\n").unwrap_err();
        assert!(matches!(err, ReliableError::TomlError(_)));
    }
}
