//! Vehicle telemetry tables
//!
//! A telemetry table holds one row per (vehicle, timestep). Tables are
//! immutable once loaded: privatization and scoring read a table and
//! produce new values, they never edit one in place.

pub mod fields;
mod io;
mod record;
mod table;

pub use io::{load_table, read_table, save_table, write_atomic, write_table};
pub use record::{parse_flag, DrivingColumns, DrivingSample};
pub(crate) use record::parse_flags;
pub use table::{Column, ColumnData, TelemetryTable};
