//! drive-privacy configuration management
//!
//! Every policy constant the pipeline uses (epsilon weights, sensitivity
//! strategies, risk weights and thresholds, output naming) lives here and is
//! passed explicitly into the noise injector and risk scorer, so several
//! configurations can be evaluated side by side.

use crate::error::{Error, Result};
use crate::privacy::budget::validate_weights;
use crate::privacy::SensitivityStrategy;
use crate::telemetry::fields;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Main drive-privacy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrivePrivacyConfig {
    /// Input table schema
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Differential privacy policy
    #[serde(default)]
    pub privacy: PrivacyConfig,

    /// Risk scoring policy
    #[serde(default)]
    pub risk: RiskConfig,

    /// Output file naming
    #[serde(default)]
    pub output: OutputConfig,

    /// Epsilon sweep defaults
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl DrivePrivacyConfig {
    /// Load and validate a configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.privacy.validate()?;
        self.risk.validate()?;
        self.sweep.validate()?;
        Ok(())
    }
}

/// Input table schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Columns parsed as nullable floats at load time; all others stay text
    pub float_columns: Vec<String>,

    /// Cell values read as null in float columns (the empty cell always is)
    pub null_tokens: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            float_columns: [
                fields::TIME,
                fields::SPEED,
                fields::ACCELERATION,
                fields::LATITUDE,
                fields::LONGITUDE,
                fields::SPEED_LIMIT,
                fields::HEADWAY_DISTANCE,
                fields::TIME_GAP,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            null_tokens: ["NaN", "nan", "None", "null", "NA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Privacy policy for one column: how its sensitivity is estimated and
/// what share of the total budget it receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPolicy {
    /// Column name as it appears in the table header
    pub name: String,

    /// Sensitivity estimator
    pub strategy: SensitivityStrategy,

    /// Share of the total epsilon, in (0, 1]
    pub weight: f64,
}

impl ColumnPolicy {
    pub fn new(name: impl Into<String>, strategy: SensitivityStrategy, weight: f64) -> Self {
        Self {
            name: name.into(),
            strategy,
            weight,
        }
    }
}

/// Differential privacy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Label of the weight table in use
    pub weights_version: String,

    /// Per-column policies; a column without one is never privatized
    pub columns: Vec<ColumnPolicy>,

    /// Columns privatized when the caller does not name any
    pub numeric_columns: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            weights_version: "v2".to_string(),
            columns: default_column_policies(),
            numeric_columns: [
                fields::SPEED,
                fields::ACCELERATION,
                fields::LATITUDE,
                fields::LONGITUDE,
                fields::TIME_GAP,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// The published weight table. Longitude is treated like latitude.
pub fn default_column_policies() -> Vec<ColumnPolicy> {
    vec![
        ColumnPolicy::new(fields::SPEED, SensitivityStrategy::Range, 0.3),
        ColumnPolicy::new(fields::ACCELERATION, SensitivityStrategy::Range, 0.4),
        ColumnPolicy::new(fields::TIME_GAP, SensitivityStrategy::Percentile, 0.2),
        ColumnPolicy::new(fields::LATITUDE, SensitivityStrategy::LocalDifference, 0.05),
        ColumnPolicy::new(fields::LONGITUDE, SensitivityStrategy::LocalDifference, 0.05),
    ]
}

impl PrivacyConfig {
    /// Look up the policy for a column
    pub fn policy(&self, name: &str) -> Option<&ColumnPolicy> {
        self.columns.iter().find(|p| p.name == name)
    }

    /// Position of a column in the policy table
    pub fn policy_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|p| p.name == name)
    }

    /// The weight table as a name → weight map
    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.columns
            .iter()
            .map(|p| (p.name.clone(), p.weight))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for policy in &self.columns {
            if !seen.insert(policy.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate privacy policy for column '{}'",
                    policy.name
                )));
            }
        }
        validate_weights(&self.weights())?;
        self.check_columns(&self.numeric_columns)
    }

    /// Fail if any requested column has no policy
    pub fn check_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        for column in columns {
            let column = column.as_ref();
            if self.policy(column).is_none() {
                return Err(Error::Config(format!(
                    "Column '{}' requested for privatization has no entry in weight table '{}'",
                    column, self.weights_version
                )));
            }
        }
        Ok(())
    }
}

/// Risk scoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Indicator weights
    #[serde(default)]
    pub weights: RiskWeights,

    /// Indicator thresholds
    #[serde(default)]
    pub thresholds: RiskThresholds,
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        for (name, value) in [
            ("speeding", w.speeding),
            ("hard_acceleration", w.hard_acceleration),
            ("hard_braking", w.hard_braking),
            ("lane_change", w.lane_change),
            ("unsafe_headway", w.unsafe_headway),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "Risk weight '{}' must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        let t = &self.thresholds;
        for (name, value) in [
            ("hard_acceleration", t.hard_acceleration),
            ("hard_braking", t.hard_braking),
            ("unsafe_headway_secs", t.unsafe_headway_secs),
            ("unsafe_time_gap_secs", t.unsafe_time_gap_secs),
        ] {
            if !value.is_finite() {
                return Err(Error::Config(format!(
                    "Risk threshold '{}' must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Weights of the five binary risk indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub speeding: f64,
    pub hard_acceleration: f64,
    pub hard_braking: f64,
    pub lane_change: f64,
    pub unsafe_headway: f64,
}

impl RiskWeights {
    /// Upper bound of a single record's risk score
    pub fn max_score(&self) -> f64 {
        self.speeding + self.hard_acceleration + self.hard_braking + self.lane_change + self.unsafe_headway
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            speeding: 2.0,
            hard_acceleration: 1.5,
            hard_braking: 1.5,
            lane_change: 1.0,
            unsafe_headway: 2.0,
        }
    }
}

/// Thresholds for the risk indicators and behaviour features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// m/s², acceleration above this is hard acceleration
    pub hard_acceleration: f64,

    /// m/s², acceleration below this is hard braking
    pub hard_braking: f64,

    /// Seconds, a time gap below this is unsafe headway
    pub unsafe_headway_secs: f64,

    /// Seconds, stricter time-gap threshold used by feature extraction
    pub unsafe_time_gap_secs: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            hard_acceleration: 3.0,
            hard_braking: -3.0,
            unsafe_headway_secs: 2.0,
            unsafe_time_gap_secs: 1.5,
        }
    }
}

/// Output file naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix marking a privatized table
    pub dp_prefix: String,

    /// Separator placed before the epsilon value in sweep outputs
    pub epsilon_infix: String,

    /// Suffix of per-vehicle risk tables
    pub risk_suffix: String,

    /// Suffix of the sweep summary table
    pub sweep_summary_suffix: String,

    /// Suffix of per-vehicle behaviour feature tables
    pub features_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dp_prefix: "dp_".to_string(),
            epsilon_infix: "_epsilon_".to_string(),
            risk_suffix: "_risk_scores".to_string(),
            sweep_summary_suffix: "_risk_vs_epsilon".to_string(),
            features_suffix: "_features".to_string(),
        }
    }
}

/// Epsilon sweep defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Total epsilon values evaluated by a sweep
    pub epsilons: Vec<f64>,

    /// Base seed; unset means a fresh random seed per run
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            epsilons: vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0],
            seed: None,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epsilons.is_empty() {
            return Err(Error::Config("Sweep needs at least one epsilon".to_string()));
        }
        for &epsilon in &self.epsilons {
            if !epsilon.is_finite() || epsilon <= 0.0 {
                return Err(Error::Config(format!(
                    "Sweep epsilon must be finite and positive, got {}",
                    epsilon
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DrivePrivacyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.privacy.columns.len(), 5);
        assert_eq!(config.output.dp_prefix, "dp_");
        assert_eq!(config.sweep.epsilons.len(), 6);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let sum: f64 = PrivacyConfig::default().weights().values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_longitude_uses_local_difference() {
        let privacy = PrivacyConfig::default();
        let lon = privacy.policy(fields::LONGITUDE).unwrap();
        let lat = privacy.policy(fields::LATITUDE).unwrap();
        assert_eq!(lon.strategy, SensitivityStrategy::LocalDifference);
        assert_eq!(lat.strategy, lon.strategy);
    }

    #[test]
    fn test_max_risk_score() {
        assert_eq!(RiskWeights::default().max_score(), 8.0);
    }

    #[test]
    fn test_partial_sections_inherit_defaults() {
        let config: DrivePrivacyConfig = toml::from_str(
            r#"
[privacy]
weights_version = "v3"

[risk.weights]
speeding = 3.0

[sweep]
seed = 4
"#,
        )
        .unwrap();
        assert_eq!(config.privacy.weights_version, "v3");
        assert_eq!(config.privacy.columns, default_column_policies());
        assert_eq!(config.privacy.numeric_columns.len(), 5);
        assert_eq!(config.risk.weights.speeding, 3.0);
        assert_eq!(config.risk.weights.unsafe_headway, 2.0);
        assert_eq!(config.sweep.seed, Some(4));
        assert_eq!(config.sweep.epsilons.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_numeric_column_rejected() {
        let mut privacy = PrivacyConfig::default();
        privacy.numeric_columns.push("Headway_Distance".to_string());
        let err = privacy.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("Headway_Distance"));
    }

    #[test]
    fn test_duplicate_policy_rejected() {
        let mut privacy = PrivacyConfig::default();
        privacy
            .columns
            .push(ColumnPolicy::new(fields::SPEED, SensitivityStrategy::Percentile, 0.1));
        assert!(matches!(privacy.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let mut privacy = PrivacyConfig::default();
        privacy.columns[0].weight = 0.0;
        assert!(matches!(privacy.validate(), Err(Error::Config(_))));

        privacy.columns[0].weight = 1.5;
        assert!(matches!(privacy.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_negative_risk_weight_rejected() {
        let mut risk = RiskConfig::default();
        risk.weights.lane_change = -1.0;
        assert!(matches!(risk.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_sweep_rejects_non_positive_epsilon() {
        let sweep = SweepConfig {
            epsilons: vec![1.0, 0.0],
            seed: None,
        };
        assert!(sweep.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_and_partial_file() {
        let config = DrivePrivacyConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: DrivePrivacyConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.privacy.columns, config.privacy.columns);

        let partial: DrivePrivacyConfig = toml::from_str(
            r#"
            [sweep]
            epsilons = [0.5, 5.0]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(partial.sweep.epsilons, vec![0.5, 5.0]);
        assert_eq!(partial.sweep.seed, Some(7));
        assert_eq!(partial.privacy.columns.len(), 5);
    }

    #[test]
    fn test_strategy_names_in_toml() {
        let config: DrivePrivacyConfig = toml::from_str(
            r#"
            [privacy]
            weights_version = "v1"
            numeric_columns = ["Speed"]

            [[privacy.columns]]
            name = "Speed"
            strategy = "local_difference"
            weight = 1.0
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.privacy.columns[0].strategy,
            SensitivityStrategy::LocalDifference
        );
    }
}
