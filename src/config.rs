//! Runtime configuration.
//!
//! Loaded from YAML files and `UCENTER__*` environment variables.

use serde::Deserialize;

use crate::domain::Error;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ucenter.yaml";
/// Environment variable naming an extra configuration file.
pub const CONFIG_ENV_VAR: &str = "UCENTER_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "UCENTER";
/// Environment variable holding the tracing filter.
pub const LOG_ENV_VAR: &str = "UCENTER_LOG";

pub const DEFAULT_REMARK_MAX_LEN: usize = 250;

/// What to do when the operator audit record cannot be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditPolicy {
    /// Roll back the whole balance mutation.
    #[default]
    FailClosed,
    /// Log the failure and commit the mutation anyway.
    BestEffort,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub audit_policy: AuditPolicy,
    pub remark_max_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            audit_policy: AuditPolicy::default(),
            remark_max_len: DEFAULT_REMARK_MAX_LEN,
        }
    }
}

/// Score credited by daily check-ins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SigninConfig {
    /// Credited on every check-in.
    pub day_reward: u64,
    /// Extra credit on a Sunday that completes a Monday..Sunday streak.
    pub week_reward: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub signin: SigninConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Later sources override earlier ones:
    /// 1. `ucenter.yaml` in the current directory (if present)
    /// 2. the file given by `path`
    /// 3. the file named by `UCENTER_CONFIG`
    /// 4. `UCENTER__SECTION__KEY` environment variables
    pub fn load(path: Option<&str>) -> Result<Self, Error> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        use ::config::{Config as ConfigLib, File, FileFormat};

        let config = ConfigLib::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fail_closed() {
        let config = Config::default();
        assert_eq!(config.ledger.audit_policy, AuditPolicy::FailClosed);
        assert_eq!(config.ledger.remark_max_len, 250);
        assert_eq!(config.signin.day_reward, 0);
    }

    #[test]
    fn yaml_overrides_defaults() {
        let config = Config::from_yaml(
            "ledger:\n  audit_policy: best-effort\nsignin:\n  day_reward: 5\n  week_reward: 20\n",
        )
        .unwrap();
        assert_eq!(config.ledger.audit_policy, AuditPolicy::BestEffort);
        assert_eq!(config.ledger.remark_max_len, 250);
        assert_eq!(config.signin.day_reward, 5);
        assert_eq!(config.signin.week_reward, 20);
    }
}
