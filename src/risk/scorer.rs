//! Rule-based driving risk scoring
//!
//! Five binary indicators are evaluated per record and combined with fixed
//! weights:
//!
//! | Indicator         | Condition                    | Default weight |
//! |-------------------|------------------------------|----------------|
//! | Speeding          | speed > speed_limit          | 2.0            |
//! | Hard acceleration | acceleration > 3.0           | 1.5            |
//! | Hard braking      | acceleration < -3.0          | 1.5            |
//! | Lane change       | lane_change                  | 1.0            |
//! | Unsafe headway    | time_gap < 2.0 (not null)    | 2.0            |
//!
//! A record's score is the weighted sum; a vehicle's score is the mean over
//! its records. A null attribute never fires its indicator. Scoring is a
//! pure function of the table, so it is applied identically to raw and
//! privatized data.

use crate::config::{RiskConfig, RiskThresholds, RiskWeights};
use crate::error::Result;
use crate::telemetry::{write_atomic, DrivingColumns, DrivingSample, TelemetryTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Weighted indicator values of one record, or their per-vehicle means
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskComponents {
    pub speeding: f64,
    pub hard_acceleration: f64,
    pub hard_braking: f64,
    pub lane_change: f64,
    pub unsafe_headway: f64,
}

impl RiskComponents {
    /// Weighted sum of the components
    pub fn total(&self) -> f64 {
        self.speeding + self.hard_acceleration + self.hard_braking + self.lane_change + self.unsafe_headway
    }

    fn add(&mut self, other: &RiskComponents) {
        self.speeding += other.speeding;
        self.hard_acceleration += other.hard_acceleration;
        self.hard_braking += other.hard_braking;
        self.lane_change += other.lane_change;
        self.unsafe_headway += other.unsafe_headway;
    }

    fn scaled(&self, factor: f64) -> RiskComponents {
        RiskComponents {
            speeding: self.speeding * factor,
            hard_acceleration: self.hard_acceleration * factor,
            hard_braking: self.hard_braking * factor,
            lane_change: self.lane_change * factor,
            unsafe_headway: self.unsafe_headway * factor,
        }
    }
}

/// Per-vehicle aggregate risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRisk {
    pub vehicle_id: String,
    /// Mean record risk score over the vehicle's records
    pub avg_risk_score: f64,
    /// Mean of each component
    pub components: RiskComponents,
    /// Number of records scored
    pub records: usize,
}

/// One row per vehicle, ordered by vehicle id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskTable {
    pub vehicles: Vec<VehicleRisk>,
}

impl RiskTable {
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn get(&self, vehicle_id: &str) -> Option<&VehicleRisk> {
        self.vehicles.iter().find(|v| v.vehicle_id == vehicle_id)
    }

    /// Mean of the per-vehicle average scores; 0 for an empty table
    pub fn mean_risk_score(&self) -> f64 {
        if self.vehicles.is_empty() {
            return 0.0;
        }
        self.vehicles.iter().map(|v| v.avg_risk_score).sum::<f64>() / self.vehicles.len() as f64
    }

    /// Write as CSV: `Vehicle_ID,Risk_Score`, plus the component means when
    /// `detailed` is set
    pub fn write_csv<W: Write>(&self, writer: W, detailed: bool) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header = vec!["Vehicle_ID", "Risk_Score"];
        if detailed {
            header.extend([
                "Speeding_Risk",
                "Acceleration_Risk",
                "Braking_Risk",
                "Lane_Change_Risk",
                "Headway_Risk",
            ]);
        }
        csv_writer.write_record(&header)?;

        for vehicle in &self.vehicles {
            let mut row = vec![vehicle.vehicle_id.clone(), vehicle.avg_risk_score.to_string()];
            if detailed {
                let c = &vehicle.components;
                row.extend(
                    [c.speeding, c.hard_acceleration, c.hard_braking, c.lane_change, c.unsafe_headway]
                        .iter()
                        .map(|v| v.to_string()),
                );
            }
            csv_writer.write_record(&row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Save as CSV, replacing the file atomically
    pub fn save(&self, path: impl AsRef<Path>, detailed: bool) -> Result<()> {
        write_atomic(path.as_ref(), |w| self.write_csv(w, detailed))
    }
}

/// Risk scorer with explicit weights and thresholds
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: RiskWeights,
    thresholds: RiskThresholds,
}

impl RiskScorer {
    /// Create a scorer, validating the configuration
    pub fn new(config: RiskConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            weights: config.weights,
            thresholds: config.thresholds,
        })
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Highest score a single record can get
    pub fn max_score(&self) -> f64 {
        self.weights.max_score()
    }

    /// Weighted indicator values of one record
    pub fn score_record(&self, sample: &DrivingSample) -> RiskComponents {
        let t = &self.thresholds;
        let w = &self.weights;
        let fires = |hit: bool, weight: f64| if hit { weight } else { 0.0 };

        RiskComponents {
            speeding: fires(
                matches!((sample.speed, sample.speed_limit), (Some(s), Some(l)) if s > l),
                w.speeding,
            ),
            hard_acceleration: fires(
                matches!(sample.acceleration, Some(a) if a > t.hard_acceleration),
                w.hard_acceleration,
            ),
            hard_braking: fires(
                matches!(sample.acceleration, Some(a) if a < t.hard_braking),
                w.hard_braking,
            ),
            lane_change: fires(sample.lane_change, w.lane_change),
            unsafe_headway: fires(
                matches!(sample.time_gap, Some(g) if g < t.unsafe_headway_secs),
                w.unsafe_headway,
            ),
        }
    }

    /// Risk score of every record, in row order
    pub fn score_records(&self, table: &TelemetryTable) -> Result<Vec<f64>> {
        let columns = DrivingColumns::resolve(table)?;
        Ok((0..columns.len())
            .map(|row| self.score_record(&columns.sample(row)).total())
            .collect())
    }

    /// Per-vehicle mean risk scores
    pub fn score(&self, table: &TelemetryTable) -> Result<RiskTable> {
        let columns = DrivingColumns::resolve(table)?;

        // vehicle -> (records, component sums, score sum)
        let mut groups: BTreeMap<&str, (usize, RiskComponents, f64)> = BTreeMap::new();
        for row in 0..columns.len() {
            let components = self.score_record(&columns.sample(row));
            let entry = groups.entry(columns.vehicle_id(row)).or_default();
            entry.0 += 1;
            entry.1.add(&components);
            entry.2 += components.total();
        }

        let vehicles = groups
            .into_iter()
            .map(|(vehicle_id, (records, sum, score_sum))| VehicleRisk {
                vehicle_id: vehicle_id.to_string(),
                avg_risk_score: score_sum / records as f64,
                components: sum.scaled(1.0 / records as f64),
                records,
            })
            .collect();

        Ok(RiskTable { vehicles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::error::Error;
    use crate::telemetry::{read_table, Column};
    use proptest::prelude::*;

    fn scorer() -> RiskScorer {
        RiskScorer::new(RiskConfig::default()).unwrap()
    }

    fn scenario() -> TelemetryTable {
        let csv = "\
Vehicle_ID,Speed,Speed_Limit,Acceleration,Time_Gap,Lane_Change
veh0,25,30,1,3,False
veh0,35,30,4,1,True
veh0,20,30,-4,,False
";
        read_table(csv.as_bytes(), &SchemaConfig::default()).unwrap()
    }

    #[test]
    fn test_scenario_record_scores() {
        let scores = scorer().score_records(&scenario()).unwrap();
        // Row 2 fires speeding, hard acceleration, lane change and unsafe headway.
        assert_eq!(scores, vec![0.0, 6.5, 1.5]);
    }

    #[test]
    fn test_scenario_vehicle_average() {
        let risk = scorer().score(&scenario()).unwrap();
        assert_eq!(risk.len(), 1);
        let veh = risk.get("veh0").unwrap();
        assert_eq!(veh.records, 3);
        assert!((veh.avg_risk_score - 8.0 / 3.0).abs() < 1e-12);
        assert!((veh.components.unsafe_headway - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_headway_indicator_excluded_matches_two() {
        // Without the headway weight the scenario averages 2.0.
        let mut config = RiskConfig::default();
        config.weights.unsafe_headway = 0.0;
        let scorer = RiskScorer::new(config).unwrap();
        let scores = scorer.score_records(&scenario()).unwrap();
        assert_eq!(scores, vec![0.0, 4.5, 1.5]);
        assert_eq!(scorer.score(&scenario()).unwrap().mean_risk_score(), 2.0);
    }

    #[test]
    fn test_null_time_gap_is_not_unsafe() {
        let sample = DrivingSample {
            speed: Some(10.0),
            speed_limit: Some(30.0),
            acceleration: Some(0.0),
            time_gap: None,
            lane_change: false,
        };
        assert_eq!(scorer().score_record(&sample).total(), 0.0);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let at_threshold = DrivingSample {
            speed: Some(30.0),
            speed_limit: Some(30.0),
            acceleration: Some(3.0),
            time_gap: Some(2.0),
            lane_change: false,
        };
        assert_eq!(scorer().score_record(&at_threshold).total(), 0.0);

        let braking = DrivingSample {
            acceleration: Some(-3.0001),
            ..at_threshold
        };
        assert_eq!(scorer().score_record(&braking).hard_braking, 1.5);
    }

    #[test]
    fn test_all_indicators_fire() {
        let worst = DrivingSample {
            speed: Some(40.0),
            speed_limit: Some(30.0),
            acceleration: Some(5.0),
            time_gap: Some(0.5),
            lane_change: true,
        };
        let components = scorer().score_record(&worst);
        assert_eq!(components.hard_braking, 0.0);
        assert_eq!(components.total(), 6.5);
    }

    #[test]
    fn test_vehicles_sorted_and_grouped() {
        let csv = "\
Vehicle_ID,Speed,Speed_Limit,Acceleration,Time_Gap,Lane_Change
veh1,40,30,0,,False
veh0,10,30,0,,True
veh1,10,30,0,,False
";
        let table = read_table(csv.as_bytes(), &SchemaConfig::default()).unwrap();
        let risk = scorer().score(&table).unwrap();
        let ids: Vec<&str> = risk.vehicles.iter().map(|v| v.vehicle_id.as_str()).collect();
        assert_eq!(ids, vec!["veh0", "veh1"]);
        assert_eq!(risk.get("veh0").unwrap().avg_risk_score, 1.0);
        assert_eq!(risk.get("veh1").unwrap().avg_risk_score, 1.0);
        assert_eq!(risk.mean_risk_score(), 1.0);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let table = TelemetryTable::new(vec![
            Column::text("Vehicle_ID", vec!["v".into()]),
            Column::float("Speed", vec![Some(1.0)]),
            Column::float("Speed_Limit", vec![Some(1.0)]),
            Column::float("Acceleration", vec![Some(1.0)]),
            Column::text("Lane_Change", vec!["False".into()]),
        ])
        .unwrap();
        let err = scorer().score(&table).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.to_string().contains("Time_Gap"));
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let table = scenario();
        assert_eq!(scorer().score(&table).unwrap(), scorer().score(&table).unwrap());
    }

    #[test]
    fn test_empty_table() {
        let csv = "Vehicle_ID,Speed,Speed_Limit,Acceleration,Time_Gap,Lane_Change\n";
        let table = read_table(csv.as_bytes(), &SchemaConfig::default()).unwrap();
        let risk = scorer().score(&table).unwrap();
        assert!(risk.is_empty());
        assert_eq!(risk.mean_risk_score(), 0.0);
    }

    #[test]
    fn test_write_csv() {
        let risk = scorer().score(&scenario()).unwrap();

        let mut plain = Vec::new();
        risk.write_csv(&mut plain, false).unwrap();
        let plain = String::from_utf8(plain).unwrap();
        assert!(plain.starts_with("Vehicle_ID,Risk_Score\nveh0,"));

        let mut detailed = Vec::new();
        risk.write_csv(&mut detailed, true).unwrap();
        let detailed = String::from_utf8(detailed).unwrap();
        let header = detailed.lines().next().unwrap();
        assert_eq!(header.split(',').count(), 7);
        assert!(header.ends_with("Headway_Risk"));
    }

    fn arb_sample() -> impl Strategy<Value = DrivingSample> {
        (
            proptest::option::of(-50.0..80.0f64),
            proptest::option::of(0.0..40.0f64),
            proptest::option::of(-15.0..15.0f64),
            proptest::option::of(-5.0..50.0f64),
            any::<bool>(),
        )
            .prop_map(|(speed, speed_limit, acceleration, time_gap, lane_change)| DrivingSample {
                speed,
                speed_limit,
                acceleration,
                time_gap,
                lane_change,
            })
    }

    proptest! {
        #[test]
        fn prop_record_score_within_bounds(sample in arb_sample()) {
            let scorer = scorer();
            let score = scorer.score_record(&sample).total();
            prop_assert!(score >= 0.0);
            prop_assert!(score <= scorer.max_score());
            prop_assert!(score <= 8.0);
        }
    }
}
