//! drive-privacy - Differential privacy for vehicle telemetry
//!
//! drive-privacy releases per-vehicle driving telemetry under differential
//! privacy and measures what the noise costs, by scoring driving risk on the
//! raw and on the privatized table with the same deterministic function.
//!
//! ## Architecture
//!
//! ```text
//!                   telemetry CSV
//!                         │
//!                  ┌──────▼──────┐
//!                  │  telemetry  │  columnar table, typed float columns
//!                  └──────┬──────┘
//!            ┌────────────┴─────────────┐
//!   ┌────────▼─────────┐                │
//!   │     privacy      │                │
//!   │  - sensitivity   │                │
//!   │  - budget        │                │
//!   │  - mechanism     │                │
//!   │  - injector      │                │
//!   └────────┬─────────┘                │
//!            │ privatized table         │ raw table
//!   ┌────────▼──────────────────────────▼──┐
//!   │                 risk                 │
//!   │  per-vehicle mean risk score         │
//!   └────────────────────┬─────────────────┘
//!                        │
//!                 ┌──────▼──────┐
//!                 │    sweep    │  risk vs epsilon, baseline deltas
//!                 └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`telemetry`]: Telemetry table model and CSV I/O
//! - [`privacy`]: Sensitivity estimation, budget allocation and Laplace noise
//! - [`risk`]: Risk scoring and behaviour features
//! - [`sweep`]: Epsilon sweep comparing privatized and raw risk
//! - [`pipeline`]: File-level operations and output naming
//! - [`config`]: Configuration management

pub mod config;
pub mod error;
pub mod pipeline;
pub mod privacy;
pub mod risk;
pub mod sweep;
pub mod telemetry;

pub use config::DrivePrivacyConfig;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
