//! File-level operations
//!
//! Each operation reads a telemetry CSV once, runs the in-memory transform to
//! completion and only then writes its outputs next to the input (or into a
//! configured output directory). Parameters are validated before any file is
//! read, so a bad epsilon or policy never touches the filesystem.
//!
//! Output naming, with the default [`OutputConfig`]:
//!
//! | Operation  | Output                                                  |
//! |------------|---------------------------------------------------------|
//! | privatize  | `dp_<file>`                                             |
//! | score_risk | `<stem>_risk_scores.csv`                                |
//! | sweep      | `dp_<stem>_epsilon_<eps>.csv` and its `_risk_scores.csv`, plus `<stem>_risk_vs_epsilon.csv` |
//! | features   | `<stem>_features.csv`                                   |

use crate::config::{DrivePrivacyConfig, OutputConfig};
use crate::error::{Error, Result};
use crate::privacy::{NoiseInjector, PrivatizationReport};
use crate::risk::{extract_features, save_features, BehaviorSummary, RiskScorer, RiskTable};
use crate::sweep::{EpsilonSweep, SweepReport};
use crate::telemetry::{load_table, save_table};
use std::path::{Path, PathBuf};
use tracing::info;

pub use crate::sweep::format_epsilon;

/// Result of [`Pipeline::privatize`]
#[derive(Debug, Clone)]
pub struct PrivatizeOutput {
    pub output_path: PathBuf,
    pub report: PrivatizationReport,
}

/// Result of [`Pipeline::score_risk`]
#[derive(Debug, Clone)]
pub struct ScoreOutput {
    pub output_path: PathBuf,
    pub risk: RiskTable,
}

/// Result of [`Pipeline::sweep`]
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub summary_path: PathBuf,
    /// Privatized table per epsilon, in sweep order
    pub table_paths: Vec<PathBuf>,
    /// Risk table per epsilon, in sweep order
    pub risk_paths: Vec<PathBuf>,
    pub report: SweepReport,
}

/// Result of [`Pipeline::features`]
#[derive(Debug, Clone)]
pub struct FeaturesOutput {
    pub output_path: PathBuf,
    pub features: Vec<BehaviorSummary>,
}

/// Configured file-level pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: DrivePrivacyConfig,
    injector: NoiseInjector,
    scorer: RiskScorer,
    output_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Build a pipeline, validating the whole configuration
    pub fn new(config: DrivePrivacyConfig) -> Result<Self> {
        config.validate()?;
        let injector = NoiseInjector::new(config.privacy.clone())?;
        let scorer = RiskScorer::new(config.risk.clone())?;
        Ok(Self {
            config,
            injector,
            scorer,
            output_dir: None,
        })
    }

    /// Write outputs into `dir` instead of next to the input
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &DrivePrivacyConfig {
        &self.config
    }

    /// Privatize the configured numeric columns of a dataset
    pub fn privatize(
        &self,
        dataset_path: impl AsRef<Path>,
        epsilon: f64,
        seed: Option<u64>,
    ) -> Result<PrivatizeOutput> {
        let dataset_path = dataset_path.as_ref();
        self.injector
            .check(self.config.privacy.numeric_columns.as_slice(), epsilon)?;
        let output_path = self.privatized_path(dataset_path)?;

        let table = load_table(dataset_path, &self.config.schema)?;
        let privatized = self.injector.privatize_default(&table, epsilon, seed)?;
        save_table(&privatized.table, &output_path)?;

        Ok(PrivatizeOutput {
            output_path,
            report: privatized.report,
        })
    }

    /// Score a dataset and write its per-vehicle risk table
    pub fn score_risk(&self, dataset_path: impl AsRef<Path>, detailed: bool) -> Result<ScoreOutput> {
        let dataset_path = dataset_path.as_ref();
        let output_path = self.risk_path(dataset_path)?;

        let table = load_table(dataset_path, &self.config.schema)?;
        let risk = self.scorer.score(&table)?;
        info!(
            "Scored {} vehicles, mean risk {:.4}",
            risk.len(),
            risk.mean_risk_score()
        );
        risk.save(&output_path, detailed)?;

        Ok(ScoreOutput { output_path, risk })
    }

    /// Run an epsilon sweep over a dataset
    ///
    /// Uses the configured epsilons and seed when `epsilons` is empty or
    /// `seed` is `None`. Nothing is written unless every point succeeds.
    pub fn sweep(
        &self,
        dataset_path: impl AsRef<Path>,
        epsilons: &[f64],
        seed: Option<u64>,
    ) -> Result<SweepOutput> {
        let dataset_path = dataset_path.as_ref();
        let epsilons = if epsilons.is_empty() {
            self.config.sweep.epsilons.as_slice()
        } else {
            epsilons
        };
        let seed = seed.or(self.config.sweep.seed);

        let sweep = EpsilonSweep::new(self.injector.clone(), self.scorer.clone());
        sweep.check(epsilons)?;
        let summary_path = self.summary_path(dataset_path)?;
        let table_paths = epsilons
            .iter()
            .map(|&epsilon| self.sweep_table_path(dataset_path, epsilon))
            .collect::<Result<Vec<_>>>()?;
        let risk_paths = table_paths
            .iter()
            .map(|path| self.risk_path(path))
            .collect::<Result<Vec<_>>>()?;

        let table = load_table(dataset_path, &self.config.schema)?;
        let outcome = sweep.run(&table, epsilons, seed)?;

        for ((run, table_path), risk_path) in outcome.runs.iter().zip(&table_paths).zip(&risk_paths) {
            save_table(&run.privatized.table, table_path)?;
            run.risk.save(risk_path, false)?;
        }
        outcome.report.save(&summary_path)?;

        Ok(SweepOutput {
            summary_path,
            table_paths,
            risk_paths,
            report: outcome.report,
        })
    }

    /// Extract per-vehicle behaviour features of a dataset
    pub fn features(&self, dataset_path: impl AsRef<Path>) -> Result<FeaturesOutput> {
        let dataset_path = dataset_path.as_ref();
        let output_path = self.features_path(dataset_path)?;

        let table = load_table(dataset_path, &self.config.schema)?;
        let features = extract_features(&table, &self.config.risk.thresholds)?;
        save_features(&features, &output_path)?;

        Ok(FeaturesOutput {
            output_path,
            features,
        })
    }

    /// `dp_<file>`
    pub fn privatized_path(&self, dataset_path: &Path) -> Result<PathBuf> {
        let name = file_name(dataset_path)?;
        Ok(self.output_file(dataset_path, format!("{}{}", self.naming().dp_prefix, name)))
    }

    /// `dp_<stem>_epsilon_<eps>.csv`
    pub fn sweep_table_path(&self, dataset_path: &Path, epsilon: f64) -> Result<PathBuf> {
        let naming = self.naming();
        let stem = file_stem(dataset_path)?;
        Ok(self.output_file(
            dataset_path,
            format!(
                "{}{}{}{}.csv",
                naming.dp_prefix,
                stem,
                naming.epsilon_infix,
                format_epsilon(epsilon)
            ),
        ))
    }

    /// `<stem>_risk_scores.csv`
    pub fn risk_path(&self, dataset_path: &Path) -> Result<PathBuf> {
        self.suffixed(dataset_path, &self.naming().risk_suffix)
    }

    /// `<stem>_risk_vs_epsilon.csv`
    pub fn summary_path(&self, dataset_path: &Path) -> Result<PathBuf> {
        self.suffixed(dataset_path, &self.naming().sweep_summary_suffix)
    }

    /// `<stem>_features.csv`
    pub fn features_path(&self, dataset_path: &Path) -> Result<PathBuf> {
        self.suffixed(dataset_path, &self.naming().features_suffix)
    }

    fn naming(&self) -> &OutputConfig {
        &self.config.output
    }

    fn suffixed(&self, dataset_path: &Path, suffix: &str) -> Result<PathBuf> {
        let stem = file_stem(dataset_path)?;
        Ok(self.output_file(dataset_path, format!("{}{}.csv", stem, suffix)))
    }

    fn output_file(&self, dataset_path: &Path, name: String) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => dataset_path.with_file_name(name),
        }
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidParameter(format!("Not a file path: {}", path.display())))
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidParameter(format!("Not a file path: {}", path.display())))
}
