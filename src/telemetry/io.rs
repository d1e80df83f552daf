//! Delimited-file I/O for telemetry tables

use super::table::{Column, TelemetryTable};
use crate::config::SchemaConfig;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

enum Builder {
    Float(Vec<Option<f64>>, Vec<String>),
    Text(Vec<String>),
}

/// Parse a table from CSV with a header row. Columns listed in
/// `schema.float_columns` are parsed as nullable floats.
pub fn read_table<R: Read>(reader: R, schema: &SchemaConfig) -> Result<TelemetryTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut builders: Vec<Builder> = headers
        .iter()
        .map(|h| {
            if schema.float_columns.iter().any(|f| f == h) {
                Builder::Float(Vec::new(), Vec::new())
            } else {
                Builder::Text(Vec::new())
            }
        })
        .collect();

    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        for (idx, cell) in record.iter().enumerate() {
            match &mut builders[idx] {
                Builder::Float(values, source) => {
                    values.push(parse_float_cell(cell, &schema.null_tokens).map_err(|_| {
                        Error::Schema(format!(
                            "Column '{}' row {}: '{}' is not a number",
                            headers[idx],
                            row + 1,
                            cell
                        ))
                    })?);
                    source.push(cell.to_string());
                }
                Builder::Text(cells) => cells.push(cell.to_string()),
            }
        }
    }

    let columns = headers
        .into_iter()
        .zip(builders)
        .map(|(name, builder)| match builder {
            Builder::Float(values, source) => Column::float_with_source(name, values, source),
            Builder::Text(cells) => Column::text(name, cells),
        })
        .collect();

    TelemetryTable::new(columns)
}

fn parse_float_cell(cell: &str, null_tokens: &[String]) -> std::result::Result<Option<f64>, ()> {
    let cell = cell.trim();
    if cell.is_empty() || null_tokens.iter().any(|t| t == cell) {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| ())
}

/// Load a table from a CSV file
pub fn load_table(path: impl AsRef<Path>, schema: &SchemaConfig) -> Result<TelemetryTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = read_table(file, schema)?;
    tracing::info!(
        "Loaded {} rows x {} columns from {}",
        table.row_count(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Write a table as CSV with a header row. Nulls are written as empty cells.
pub fn write_table<W: Write>(table: &TelemetryTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.column_names())?;
    for row in 0..table.row_count() {
        csv_writer.write_record(table.columns().iter().map(|c| c.cell(row)))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Save a table to a CSV file, replacing it atomically
pub fn save_table(table: &TelemetryTable, path: impl AsRef<Path>) -> Result<()> {
    write_atomic(path.as_ref(), |w| write_table(table, w))
}

/// Write through a sibling temporary file and rename it into place, so a
/// failed write never leaves a partial output behind.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidParameter(format!("Not a file path: {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let result = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        write(&mut writer)?;
        writer.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            std::fs::rename(&tmp_path, path)?;
            tracing::info!("Wrote {}", path.display());
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::ColumnData;

    const CSV: &str = "\
Time,Vehicle_ID,Speed,Acceleration,Latitude,Longitude,Lane,Speed_Limit,Headway_Distance,Time_Gap,Lane_Change,Collision
0.0,veh0,25.0,1.0,42.1,-72.5,e1_0,30.0,75.0,3.0,False,False
1.0,veh0,35.0,4.0,42.1001,-72.5001,e1_0,30.0,35.0,1.0,True,False
2.0,veh0,20.0,-4.0,42.1002,-72.5002,e1_1,30.0,,,False,
";

    #[test]
    fn test_read_table_types_columns() {
        let table = read_table(CSV.as_bytes(), &SchemaConfig::default()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.columns().len(), 12);
        assert_eq!(
            table.floats("Speed").unwrap(),
            &[Some(25.0), Some(35.0), Some(20.0)]
        );
        assert_eq!(table.floats("Time_Gap").unwrap()[2], None);
        assert!(matches!(
            table.column("Lane_Change").unwrap().data(),
            ColumnData::Text(_)
        ));
        assert_eq!(table.text("Collision").unwrap()[2], "");
    }

    #[test]
    fn test_null_tokens() {
        let csv = "Vehicle_ID,Time_Gap\nv,NaN\nv,None\nv,1.25\n";
        let table = read_table(csv.as_bytes(), &SchemaConfig::default()).unwrap();
        assert_eq!(table.floats("Time_Gap").unwrap(), &[None, None, Some(1.25)]);
    }

    #[test]
    fn test_bad_number_is_schema_error() {
        let csv = "Vehicle_ID,Speed\nv,fast\n";
        let err = read_table(csv.as_bytes(), &SchemaConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.to_string().contains("Speed"));
    }

    #[test]
    fn test_ragged_row_is_error() {
        let csv = "Vehicle_ID,Speed\nv,1.0,extra\n";
        assert!(read_table(csv.as_bytes(), &SchemaConfig::default()).is_err());
    }

    #[test]
    fn test_write_preserves_text_and_values() {
        let table = read_table(CSV.as_bytes(), &SchemaConfig::default()).unwrap();
        let mut out = Vec::new();
        write_table(&table, &mut out).unwrap();
        let reread = read_table(out.as_slice(), &SchemaConfig::default()).unwrap();
        assert_eq!(reread, table);

        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(2).unwrap().contains("True,False"));
    }

    #[test]
    fn test_unmodified_table_written_byte_for_byte() {
        let csv = "Time,Vehicle_ID,Speed_Limit,Time_Gap\n0.0,veh0,30.0,None\n1.50,veh0,30.0,2.0\n";
        let table = read_table(csv.as_bytes(), &SchemaConfig::default()).unwrap();
        let mut out = Vec::new();
        write_table(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), csv);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vehicle_data.csv");
        let table = read_table(CSV.as_bytes(), &SchemaConfig::default()).unwrap();

        save_table(&table, &path).unwrap();
        let loaded = load_table(&path, &SchemaConfig::default()).unwrap();
        assert_eq!(loaded, table);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let result = write_atomic(&path, |_| Err(Error::Internal("boom".to_string())));
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
