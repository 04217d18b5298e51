//! Driver configuration (spec.md §6): loaded from TOML under the
//! `cfaMutation.` prefix, with CLI flags taking precedence.

use std::path::PathBuf;
use std::time::Duration;

use cfa_feasibility::CheckerType;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("parsing {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
    #[error("cex.checker.config is required when cex.checker = SameToolWithConfig")]
    MissingCheckerConfig,
    #[error("walltimeLimit.hardcap must be at least 10s, got {0:?}")]
    HardCapTooLow(Duration),
    #[error("timeLimit.cexCheck must be at least 10s, got {0:?}")]
    CexCheckTimeTooLow(Duration),
}

fn default_rollbacks_in_row_check() -> u32 {
    5
}

fn default_walltime_factor() -> f64 {
    2.0
}

fn default_walltime_add() -> DurationSeconds {
    DurationSeconds(Duration::from_secs(5))
}

fn default_walltime_hardcap() -> DurationSeconds {
    DurationSeconds(Duration::from_secs(200))
}

fn default_cex_check_time() -> DurationSeconds {
    DurationSeconds(Duration::from_secs(60))
}

fn default_checker() -> CheckerTypeConfig {
    CheckerTypeConfig::ModelCheckerA
}

fn default_log_file() -> PathBuf {
    PathBuf::from("this-round.log")
}

fn default_round_stat_file() -> PathBuf {
    PathBuf::from("this-round-stats.txt")
}

fn default_ranked_nodes_file() -> PathBuf {
    PathBuf::from("this-round-ranked-nodes.txt")
}

/// A `TimeSpan` config value, expressed in whole seconds. The upstream tool
/// accepts richer units (`ms`, `min`, ...); this driver only needs to carry
/// the value through to [`cfa_budget`], so seconds are enough.
#[derive(Clone, Copy, Debug)]
pub struct DurationSeconds(pub Duration);

impl<'de> Deserialize<'de> for DurationSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Ok(DurationSeconds(Duration::from_secs(seconds)))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckerTypeConfig {
    ModelCheckerA,
    SameToolWithConfig,
    ConcreteExecution,
}

impl From<CheckerTypeConfig> for CheckerType {
    fn from(value: CheckerTypeConfig) -> Self {
        match value {
            CheckerTypeConfig::ModelCheckerA => CheckerType::ModelCheckerA,
            CheckerTypeConfig::SameToolWithConfig => CheckerType::SameToolWithConfig,
            CheckerTypeConfig::ConcreteExecution => CheckerType::ConcreteExecution,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverConfig {
    #[serde(default = "default_rollbacks_in_row_check")]
    pub rollbacks_in_row_check: u32,
    #[serde(default = "default_walltime_factor")]
    pub walltime_factor: f64,
    #[serde(default = "default_walltime_add")]
    pub walltime_add: DurationSeconds,
    #[serde(default = "default_walltime_hardcap")]
    pub walltime_hardcap: DurationSeconds,
    #[serde(default = "default_cex_check_time")]
    pub cex_check_time: DurationSeconds,
    #[serde(default = "default_checker")]
    pub cex_checker: CheckerTypeConfig,
    pub cex_checker_config: Option<PathBuf>,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_round_stat_file")]
    pub round_stat_file: PathBuf,
    #[serde(default = "default_ranked_nodes_file")]
    pub ranked_nodes_file: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            rollbacks_in_row_check: default_rollbacks_in_row_check(),
            walltime_factor: default_walltime_factor(),
            walltime_add: default_walltime_add(),
            walltime_hardcap: default_walltime_hardcap(),
            cex_check_time: default_cex_check_time(),
            cex_checker: default_checker(),
            cex_checker_config: None,
            log_file: default_log_file(),
            round_stat_file: default_round_stat_file(),
            ranked_nodes_file: default_ranked_nodes_file(),
        }
    }
}

impl DriverConfig {
    pub fn from_toml_str(text: &str, path: &std::path::Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text, path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cex_checker == CheckerTypeConfig::SameToolWithConfig && self.cex_checker_config.is_none() {
            return Err(ConfigError::MissingCheckerConfig);
        }
        if self.walltime_hardcap.0 < Duration::from_secs(10) {
            return Err(ConfigError::HardCapTooLow(self.walltime_hardcap.0));
        }
        if self.cex_check_time.0 < Duration::from_secs(10) {
            return Err(ConfigError::CexCheckTimeTooLow(self.cex_check_time.0));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = DriverConfig::default();
        assert_eq!(config.rollbacks_in_row_check, 5);
        assert_eq!(config.walltime_factor, 2.0);
        assert_eq!(config.walltime_add.0, Duration::from_secs(5));
        assert_eq!(config.walltime_hardcap.0, Duration::from_secs(200));
        assert_eq!(config.cex_check_time.0, Duration::from_secs(60));
        assert_eq!(config.cex_checker, CheckerTypeConfig::ModelCheckerA);
    }

    #[test]
    fn same_tool_with_config_requires_a_config_path() {
        let toml = "cexChecker = \"sameToolWithConfig\"\n";
        let err = DriverConfig::from_toml_str(toml, std::path::Path::new("cfg.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCheckerConfig));
    }

    #[test]
    fn an_undersized_hardcap_is_rejected() {
        let toml = "walltimeHardcap = 5\n";
        let err = DriverConfig::from_toml_str(toml, std::path::Path::new("cfg.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::HardCapTooLow(_)));
    }

    #[test]
    fn a_full_config_parses() {
        let toml = r#"
            rollbacksInRowCheck = 3
            walltimeFactor = 1.5
            walltimeAdd = 10
            walltimeHardcap = 120
            cexCheckTime = 30
            cexChecker = "concreteExecution"
        "#;
        let config = DriverConfig::from_toml_str(toml, std::path::Path::new("cfg.toml")).unwrap();
        assert_eq!(config.rollbacks_in_row_check, 3);
        assert_eq!(config.cex_checker, CheckerTypeConfig::ConcreteExecution);
    }
}
