//! Driving risk assessment
//!
//! The scorer turns telemetry records into weighted risk scores averaged per
//! vehicle; feature extraction counts the underlying events per vehicle.

pub mod features;
pub mod scorer;

pub use features::{extract_features, save_features, write_features, BehaviorSummary};
pub use scorer::{RiskComponents, RiskScorer, RiskTable, VehicleRisk};
