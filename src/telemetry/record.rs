//! Typed row view over the columns the risk scorer reads

use super::fields;
use super::table::TelemetryTable;
use crate::error::{Error, Result};

/// Parse a boolean flag cell. Empty cells read as `false`.
pub fn parse_flag(cell: &str) -> Option<bool> {
    match cell.trim() {
        "" | "False" | "false" | "FALSE" | "0" | "0.0" => Some(false),
        "True" | "true" | "TRUE" | "1" | "1.0" => Some(true),
        _ => None,
    }
}

/// One record's risk-relevant attributes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrivingSample {
    pub speed: Option<f64>,
    pub speed_limit: Option<f64>,
    pub acceleration: Option<f64>,
    pub time_gap: Option<f64>,
    pub lane_change: bool,
}

/// Borrowed, schema-checked columns of a table, resolved once per table
pub struct DrivingColumns<'a> {
    vehicle_ids: &'a [String],
    speed: &'a [Option<f64>],
    speed_limit: &'a [Option<f64>],
    acceleration: &'a [Option<f64>],
    time_gap: &'a [Option<f64>],
    lane_change: Vec<bool>,
}

impl<'a> DrivingColumns<'a> {
    /// Resolve the columns, failing on the first missing or malformed one
    pub fn resolve(table: &'a TelemetryTable) -> Result<Self> {
        table.require_columns(&fields::RISK_REQUIRED)?;
        Ok(Self {
            vehicle_ids: table.text(fields::VEHICLE_ID)?,
            speed: table.floats(fields::SPEED)?,
            speed_limit: table.floats(fields::SPEED_LIMIT)?,
            acceleration: table.floats(fields::ACCELERATION)?,
            time_gap: table.floats(fields::TIME_GAP)?,
            lane_change: parse_flags(table, fields::LANE_CHANGE)?,
        })
    }

    pub fn len(&self) -> usize {
        self.vehicle_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicle_ids.is_empty()
    }

    pub fn vehicle_id(&self, row: usize) -> &'a str {
        &self.vehicle_ids[row]
    }

    pub fn sample(&self, row: usize) -> DrivingSample {
        DrivingSample {
            speed: self.speed[row],
            speed_limit: self.speed_limit[row],
            acceleration: self.acceleration[row],
            time_gap: self.time_gap[row],
            lane_change: self.lane_change[row],
        }
    }
}

/// Parse a whole flag column
pub(crate) fn parse_flags(table: &TelemetryTable, name: &str) -> Result<Vec<bool>> {
    table
        .text(name)?
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            parse_flag(cell).ok_or_else(|| {
                Error::Schema(format!(
                    "Column '{}' row {}: '{}' is not a boolean",
                    name,
                    row + 1,
                    cell
                ))
            })
        })
        .collect()
}
