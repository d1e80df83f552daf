//! Noise injection: produce a privatized copy of a telemetry table
//!
//! For every requested column that exists in the table:
//!
//! 1. estimate its sensitivity with the column's configured strategy,
//! 2. take its share of the total epsilon from the budget allocator,
//! 3. calibrate a Laplace mechanism with `b = sensitivity / epsilon`,
//! 4. perturb every non-null value with an independent draw.
//!
//! The input table is never modified; a new table is returned. Row count,
//! row order, column set and null positions are unchanged, and columns that
//! are not privatized are copied as-is.
//!
//! Each column draws from its own ChaCha20 stream, keyed by the column's
//! position in the policy table, so a seed reproduces the same output
//! regardless of column order or thread scheduling.

use super::budget::{validate_epsilon, BudgetAllocator, EpsilonAllocation};
use super::mechanism::LaplaceMechanism;
use super::sensitivity::{estimate, SensitivityStrategy};
use crate::config::{ColumnPolicy, PrivacyConfig};
use crate::error::{Error, Result};
use crate::telemetry::TelemetryTable;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How one column was privatized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNoiseReport {
    pub column: String,
    pub strategy: SensitivityStrategy,
    pub sensitivity: f64,
    pub epsilon: f64,
    /// Laplace scale `b`
    pub scale: f64,
    /// Number of values that received noise
    pub noised_values: usize,
    /// Number of null values passed through
    pub null_values: usize,
    /// Zero sensitivity: constant or (nearly) all-null column, no noise added
    pub degenerate: bool,
}

/// Summary of one privatization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivatizationReport {
    pub total_epsilon: f64,
    /// Seed actually used; replaying it reproduces the output
    pub seed: u64,
    pub weights_version: String,
    pub columns: Vec<ColumnNoiseReport>,
    /// Requested columns absent from the table
    pub skipped: Vec<String>,
}

/// A privatized table together with its report
#[derive(Debug, Clone)]
pub struct Privatized {
    pub table: TelemetryTable,
    pub report: PrivatizationReport,
}

/// A column resolved against the table and the policy table
struct PlannedColumn<'a> {
    stream: u64,
    policy: &'a ColumnPolicy,
    values: &'a [Option<f64>],
}

/// Laplace noise injector configured with a fixed policy table
#[derive(Debug, Clone)]
pub struct NoiseInjector {
    config: PrivacyConfig,
    allocator: BudgetAllocator,
}

impl NoiseInjector {
    /// Create an injector, validating the privacy configuration
    pub fn new(config: PrivacyConfig) -> Result<Self> {
        config.validate()?;
        let allocator = BudgetAllocator::new(config.weights())?;
        Ok(Self { config, allocator })
    }

    pub fn config(&self) -> &PrivacyConfig {
        &self.config
    }

    /// Split a total epsilon across the configured columns
    pub fn allocate(&self, total_epsilon: f64) -> Result<EpsilonAllocation> {
        self.allocator.allocate(total_epsilon)
    }

    /// Check parameters without touching any data
    pub fn check<S: AsRef<str>>(&self, numeric_columns: &[S], total_epsilon: f64) -> Result<()> {
        validate_epsilon(total_epsilon)?;
        self.config.check_columns(numeric_columns)
    }

    /// Privatize the configured default columns
    pub fn privatize_default(
        &self,
        table: &TelemetryTable,
        total_epsilon: f64,
        seed: Option<u64>,
    ) -> Result<Privatized> {
        self.privatize(table, self.config.numeric_columns.as_slice(), total_epsilon, seed)
    }

    /// Privatize `numeric_columns` of `table` under `total_epsilon`
    pub fn privatize<S: AsRef<str>>(
        &self,
        table: &TelemetryTable,
        numeric_columns: &[S],
        total_epsilon: f64,
        seed: Option<u64>,
    ) -> Result<Privatized> {
        self.check(numeric_columns, total_epsilon)?;
        let allocation = self.allocator.allocate(total_epsilon)?;

        let seed = seed.unwrap_or_else(rand::random);
        debug!("Privatizing at epsilon {} with seed {}", total_epsilon, seed);

        let mut plans = Vec::new();
        let mut skipped = Vec::new();
        for name in numeric_columns {
            let name = name.as_ref();
            if plans.iter().any(|p: &PlannedColumn| p.policy.name == name) {
                continue;
            }
            let (Some(stream), Some(policy)) =
                (self.config.policy_index(name), self.config.policy(name))
            else {
                return Err(Error::Internal(format!("No policy for checked column '{}'", name)));
            };
            if !table.has_column(name) {
                warn!("Column '{}' is not in the table, skipping", name);
                skipped.push(name.to_string());
                continue;
            }
            plans.push(PlannedColumn {
                stream: stream as u64,
                policy,
                values: table.floats(name)?,
            });
        }

        #[cfg(feature = "parallel")]
        let results: Vec<Result<(Vec<Option<f64>>, ColumnNoiseReport)>> = {
            use rayon::prelude::*;
            plans
                .par_iter()
                .map(|plan| noise_column(plan, &allocation, seed))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<(Vec<Option<f64>>, ColumnNoiseReport)>> = plans
            .iter()
            .map(|plan| noise_column(plan, &allocation, seed))
            .collect();

        let mut privatized = table.clone();
        let mut columns = Vec::with_capacity(results.len());
        for result in results {
            let (values, report) = result?;
            privatized.replace_floats(&report.column, values)?;
            columns.push(report);
        }

        Ok(Privatized {
            table: privatized,
            report: PrivatizationReport {
                total_epsilon,
                seed,
                weights_version: self.config.weights_version.clone(),
                columns,
                skipped,
            },
        })
    }
}

fn noise_column(
    plan: &PlannedColumn<'_>,
    allocation: &EpsilonAllocation,
    seed: u64,
) -> Result<(Vec<Option<f64>>, ColumnNoiseReport)> {
    let name = plan.policy.name.as_str();
    let sensitivity = estimate(plan.values, plan.policy.strategy);
    if !sensitivity.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "Sensitivity of '{}' is not finite ({})",
            name, sensitivity
        )));
    }
    let epsilon = allocation
        .epsilon_for(name)
        .ok_or_else(|| Error::Internal(format!("No epsilon allocated for '{}'", name)))?;

    let mechanism = LaplaceMechanism::new(epsilon, sensitivity)
        .map_err(|e| Error::InvalidParameter(format!("Column '{}': {}", name, e)))?;

    let null_values = plan.values.iter().filter(|v| v.is_none()).count();
    if null_values == plan.values.len() {
        info!("Column '{}' is entirely null, passing through", name);
    } else if mechanism.is_noiseless() {
        info!("Column '{}' has zero sensitivity, adding no noise", name);
    }
    debug!(
        "Column '{}': strategy={} sensitivity={} epsilon={} scale={}",
        name,
        plan.policy.strategy,
        sensitivity,
        epsilon,
        mechanism.scale()
    );

    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(plan.stream);
    let values = mechanism.randomize_column(plan.values, &mut rng);

    Ok((
        values,
        ColumnNoiseReport {
            column: name.to_string(),
            strategy: plan.policy.strategy,
            sensitivity,
            epsilon,
            scale: mechanism.scale(),
            noised_values: plan.values.len() - null_values,
            null_values,
            degenerate: mechanism.is_noiseless(),
        },
    ))
}
