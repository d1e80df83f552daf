//! Epsilon sweep: utility loss as a function of privacy budget
//!
//! The raw table is scored once as the baseline. For every epsilon the same
//! raw table is privatized and scored again, and the mean per-vehicle risk is
//! compared with the baseline. The source table is read once and shared by
//! all points.
//!
//! Point `i` privatizes with `base_seed + i`, so a whole sweep is
//! reproducible from a single seed.

use crate::error::{Error, Result};
use crate::privacy::budget::validate_epsilon;
use crate::privacy::{NoiseInjector, Privatized};
use crate::risk::{RiskScorer, RiskTable};
use crate::telemetry::{write_atomic, TelemetryTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Render an epsilon for file names and the summary table: `1.0`, `5.0`,
/// `0.01`, `0.5`
pub fn format_epsilon(epsilon: f64) -> String {
    if epsilon.fract() == 0.0 && epsilon.abs() < 1e15 {
        format!("{:.1}", epsilon)
    } else {
        format!("{}", epsilon)
    }
}

/// Outcome at a single epsilon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub epsilon: f64,
    /// Seed used to privatize this point
    pub seed: u64,
    /// Mean per-vehicle risk of the privatized table
    pub avg_risk_score: f64,
    /// `avg_risk_score - baseline`
    pub delta: f64,
    pub abs_delta: f64,
}

/// Summary of a complete sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub generated_at: DateTime<Utc>,
    pub weights_version: String,
    pub base_seed: u64,
    /// Mean per-vehicle risk of the raw table
    pub baseline_risk_score: f64,
    pub points: Vec<SweepPoint>,
}

impl SweepReport {
    /// Write the summary as CSV:
    /// `Epsilon,Avg_Risk_Score,Baseline_Risk_Score,Delta,Abs_Delta`
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "Epsilon",
            "Avg_Risk_Score",
            "Baseline_Risk_Score",
            "Delta",
            "Abs_Delta",
        ])?;
        for point in &self.points {
            csv_writer.write_record([
                format_epsilon(point.epsilon),
                point.avg_risk_score.to_string(),
                self.baseline_risk_score.to_string(),
                point.delta.to_string(),
                point.abs_delta.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_atomic(path.as_ref(), |w| self.write_csv(w))
    }
}

/// Privatized table and its risk scores at one epsilon
#[derive(Debug, Clone)]
pub struct SweepRun {
    pub epsilon: f64,
    pub privatized: Privatized,
    pub risk: RiskTable,
}

/// Full sweep result: the summary plus every intermediate table
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub baseline: RiskTable,
    pub runs: Vec<SweepRun>,
    pub report: SweepReport,
}

/// Runs privatize-then-score across a list of epsilons
#[derive(Debug, Clone)]
pub struct EpsilonSweep {
    injector: NoiseInjector,
    scorer: RiskScorer,
}

impl EpsilonSweep {
    pub fn new(injector: NoiseInjector, scorer: RiskScorer) -> Self {
        Self { injector, scorer }
    }

    /// Check every epsilon and the injector's default columns up front.
    /// Epsilons must render to distinct names so their outputs never collide.
    pub fn check(&self, epsilons: &[f64]) -> Result<()> {
        if epsilons.is_empty() {
            return Err(Error::InvalidParameter(
                "Sweep needs at least one epsilon".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for &epsilon in epsilons {
            validate_epsilon(epsilon)?;
            let rendered = format_epsilon(epsilon);
            if !seen.insert(rendered.clone()) {
                return Err(Error::InvalidParameter(format!(
                    "Sweep epsilon {} is listed more than once",
                    rendered
                )));
            }
        }
        let config = self.injector.config();
        config.check_columns(config.numeric_columns.as_slice())
    }

    /// Sweep `epsilons` over `table`
    pub fn run(
        &self,
        table: &TelemetryTable,
        epsilons: &[f64],
        seed: Option<u64>,
    ) -> Result<SweepOutcome> {
        self.check(epsilons)?;

        let base_seed = seed.unwrap_or_else(rand::random);
        debug!("Sweep base seed {}", base_seed);

        let baseline = self.scorer.score(table)?;
        let baseline_risk_score = baseline.mean_risk_score();
        info!(
            "Baseline risk {:.4} over {} vehicles",
            baseline_risk_score,
            baseline.len()
        );

        let indexed: Vec<(u64, f64)> = epsilons
            .iter()
            .enumerate()
            .map(|(i, &epsilon)| (base_seed.wrapping_add(i as u64), epsilon))
            .collect();

        #[cfg(feature = "parallel")]
        let results: Vec<Result<SweepRun>> = {
            use rayon::prelude::*;
            indexed
                .par_iter()
                .map(|&(seed, epsilon)| self.run_point(table, epsilon, seed))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<SweepRun>> = indexed
            .iter()
            .map(|&(seed, epsilon)| self.run_point(table, epsilon, seed))
            .collect();

        let runs = results.into_iter().collect::<Result<Vec<_>>>()?;

        let points = runs
            .iter()
            .map(|run| {
                let avg_risk_score = run.risk.mean_risk_score();
                let delta = avg_risk_score - baseline_risk_score;
                info!(
                    "epsilon {}: risk {:.4} (delta {:+.4})",
                    run.epsilon, avg_risk_score, delta
                );
                SweepPoint {
                    epsilon: run.epsilon,
                    seed: run.privatized.report.seed,
                    avg_risk_score,
                    delta,
                    abs_delta: delta.abs(),
                }
            })
            .collect();

        Ok(SweepOutcome {
            report: SweepReport {
                generated_at: Utc::now(),
                weights_version: self.injector.config().weights_version.clone(),
                base_seed,
                baseline_risk_score,
                points,
            },
            baseline,
            runs,
        })
    }

    fn run_point(&self, table: &TelemetryTable, epsilon: f64, seed: u64) -> Result<SweepRun> {
        let privatized = self.injector.privatize_default(table, epsilon, Some(seed))?;
        let risk = self.scorer.score(&privatized.table)?;
        Ok(SweepRun {
            epsilon,
            privatized,
            risk,
        })
    }
}
