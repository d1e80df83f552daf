//! Per-vehicle behaviour features
//!
//! Counts of aggressive-driving events per vehicle, used to summarize a
//! table independently of the weighted risk score.

use crate::config::RiskThresholds;
use crate::error::Result;
use crate::telemetry::{fields, parse_flags, write_atomic, DrivingColumns, TelemetryTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Event counts of a single vehicle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub vehicle_id: String,
    pub speeding_violations: usize,
    pub fast_accelerations: usize,
    pub hard_brakings: usize,
    /// 1 when the vehicle changed lanes at least once
    pub lane_changes: usize,
    pub unsafe_headways: usize,
    pub unsafe_time_gaps: usize,
    pub collisions: usize,
    /// Number of records of this vehicle
    pub instance_count: usize,
}

/// Extract behaviour features for every vehicle, ordered by vehicle id
pub fn extract_features(
    table: &TelemetryTable,
    thresholds: &RiskThresholds,
) -> Result<Vec<BehaviorSummary>> {
    let columns = DrivingColumns::resolve(table)?;
    table.require_columns(&[fields::COLLISION])?;
    let collisions = parse_flags(table, fields::COLLISION)?;

    let mut vehicles: BTreeMap<&str, BehaviorSummary> = BTreeMap::new();
    for row in 0..columns.len() {
        let id = columns.vehicle_id(row);
        let s = columns.sample(row);
        let summary = vehicles.entry(id).or_insert_with(|| BehaviorSummary {
            vehicle_id: id.to_string(),
            ..Default::default()
        });

        summary.instance_count += 1;
        if matches!((s.speed, s.speed_limit), (Some(v), Some(l)) if v > l) {
            summary.speeding_violations += 1;
        }
        if matches!(s.acceleration, Some(a) if a > thresholds.hard_acceleration) {
            summary.fast_accelerations += 1;
        }
        if matches!(s.acceleration, Some(a) if a < thresholds.hard_braking) {
            summary.hard_brakings += 1;
        }
        if s.lane_change {
            summary.lane_changes = 1;
        }
        if matches!(s.time_gap, Some(g) if g < thresholds.unsafe_headway_secs) {
            summary.unsafe_headways += 1;
        }
        if matches!(s.time_gap, Some(g) if g < thresholds.unsafe_time_gap_secs) {
            summary.unsafe_time_gaps += 1;
        }
        if collisions[row] {
            summary.collisions += 1;
        }
    }

    Ok(vehicles.into_values().collect())
}

/// Write feature rows as CSV
pub fn write_features<W: Write>(features: &[BehaviorSummary], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "Vehicle_ID",
        "SpeedingViolations",
        "FastAccelerations",
        "HardBrakings",
        "LaneChanges",
        "UnsafeHeadways",
        "UnsafeTimeGaps",
        "Collisions",
        "Instance_Count",
    ])?;
    for f in features {
        csv_writer.write_record([
            f.vehicle_id.clone(),
            f.speeding_violations.to_string(),
            f.fast_accelerations.to_string(),
            f.hard_brakings.to_string(),
            f.lane_changes.to_string(),
            f.unsafe_headways.to_string(),
            f.unsafe_time_gaps.to_string(),
            f.collisions.to_string(),
            f.instance_count.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Save feature rows as CSV, replacing the file atomically
pub fn save_features(features: &[BehaviorSummary], path: impl AsRef<Path>) -> Result<()> {
    write_atomic(path.as_ref(), |w| write_features(features, w))
}
