//! Serializable pipeline configuration (TOML).

use rotor_core::momentum::MomentumConfig;
use rotor_core::risk::RiskLimits;
use rotor_core::sizing::SizerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Execution mode: dry runs compute, validate, and journal but never submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    DryRun,
    Live,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::DryRun => "dry_run",
            ExecutionMode::Live => "live",
        }
    }
}

/// `[position_sizing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionSizingConfig {
    pub top_n: usize,
    pub min_trade_threshold: f64,
    pub min_trade_shares: i64,
    pub min_trade_value: f64,
    pub exit_rank_threshold: usize,
}

impl Default for PositionSizingConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            min_trade_threshold: 0.02,
            min_trade_shares: 1,
            min_trade_value: 100.0,
            exit_rank_threshold: 5,
        }
    }
}

/// `[risk_limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimitsConfig {
    pub max_position_pct: f64,
    pub max_turnover_pct: f64,
}

impl Default for RiskLimitsConfig {
    fn default() -> Self {
        Self {
            max_position_pct: 0.25,
            max_turnover_pct: 0.50,
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::DryRun,
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub snapshots: PathBuf,
    pub journal: PathBuf,
    pub kill_switch: PathBuf,
    /// Optional universe TOML; the built-in UK sector universe otherwise.
    pub universe: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshots: PathBuf::from("data/snapshots"),
            journal: PathBuf::from("data/signals/journal.jsonl"),
            kill_switch: PathBuf::from("data/.kill_switch"),
            universe: None,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub position_sizing: PositionSizingConfig,
    pub risk_limits: RiskLimitsConfig,
    pub execution: ExecutionConfig,
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Parse configuration from a TOML string. Missing sections and fields
    /// fall back to defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Sizer parameters for `rotor_core::sizing`.
    pub fn sizer_config(&self) -> SizerConfig {
        SizerConfig {
            min_trade_threshold: self.position_sizing.min_trade_threshold,
            min_trade_shares: self.position_sizing.min_trade_shares,
            min_trade_value: self.position_sizing.min_trade_value,
            max_position_pct: self.risk_limits.max_position_pct,
        }
    }

    /// Risk limits for `rotor_core::risk`.
    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            max_position_pct: self.risk_limits.max_position_pct,
            max_turnover_pct: self.risk_limits.max_turnover_pct,
            exit_rank_threshold: self.position_sizing.exit_rank_threshold,
        }
    }

    /// Momentum parameters for `rotor_core::momentum`.
    pub fn momentum_config(&self) -> MomentumConfig {
        MomentumConfig {
            top_n: self.position_sizing.top_n,
            ..MomentumConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_strategy_parameters() {
        let config = AppConfig::default();
        assert_eq!(config.position_sizing.top_n, 3);
        assert_eq!(config.position_sizing.exit_rank_threshold, 5);
        assert_eq!(config.risk_limits.max_position_pct, 0.25);
        assert_eq!(config.risk_limits.max_turnover_pct, 0.50);
        assert_eq!(config.execution.mode, ExecutionMode::DryRun);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[position_sizing]
top_n = 4
min_trade_threshold = 0.03
min_trade_shares = 2
min_trade_value = 250.0
exit_rank_threshold = 6

[risk_limits]
max_position_pct = 0.30
max_turnover_pct = 0.40

[execution]
mode = "live"

[paths]
snapshots = "var/snapshots"
journal = "var/journal.jsonl"
kill_switch = "var/.halt"
universe = "config/universe.toml"
"#;
        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.position_sizing.top_n, 4);
        assert_eq!(config.risk_limits.max_turnover_pct, 0.40);
        assert_eq!(config.execution.mode, ExecutionMode::Live);
        assert_eq!(config.paths.kill_switch, PathBuf::from("var/.halt"));
        assert_eq!(
            config.paths.universe,
            Some(PathBuf::from("config/universe.toml"))
        );
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = AppConfig::from_toml("[position_sizing]\ntop_n = 5\n").unwrap();
        assert_eq!(config.position_sizing.top_n, 5);
        assert_eq!(config.position_sizing.min_trade_shares, 1);
        assert_eq!(config.execution.mode, ExecutionMode::DryRun);
    }

    #[test]
    fn derived_configs_carry_the_shared_cap() {
        let config = AppConfig::from_toml("[risk_limits]\nmax_position_pct = 0.2\n").unwrap();
        assert_eq!(config.sizer_config().max_position_pct, 0.2);
        assert_eq!(config.risk_limits().max_position_pct, 0.2);
    }

    #[test]
    fn mode_serializes_snake_case() {
        assert_eq!(
            toml::to_string(&ExecutionConfig {
                mode: ExecutionMode::DryRun
            })
            .unwrap()
            .trim(),
            "mode = \"dry_run\""
        );
    }
}
