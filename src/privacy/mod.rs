//! Differential privacy for telemetry tables
//!
//! Sensitivity estimation, per-column budget allocation and Laplace noise
//! injection. Includes:
//! - Three sensitivity estimators selected per column by configuration
//! - Fixed-weight epsilon allocation
//! - A seedable Laplace mechanism
//! - The noise injector that privatizes a whole table

pub mod budget;
pub mod injector;
pub mod mechanism;
pub mod sensitivity;

pub use budget::{allocate, BudgetAllocator, EpsilonAllocation};
pub use injector::{ColumnNoiseReport, NoiseInjector, PrivatizationReport, Privatized};
pub use mechanism::LaplaceMechanism;
pub use sensitivity::{estimate, SensitivityStrategy};
