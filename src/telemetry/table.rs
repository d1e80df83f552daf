//! Columnar telemetry table

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Cell storage of a single column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Nullable floats, typed at load time
    Float(Vec<Option<f64>>),
    /// Cells kept verbatim
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(values) => values.len(),
            ColumnData::Text(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column
///
/// Float columns read from a file remember their source cells, so a column
/// that is never rewritten is saved exactly as it was read.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    data: ColumnData,
    source: Option<Vec<String>>,
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.data == other.data
    }
}

impl Column {
    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Float(values),
            source: None,
        }
    }

    /// Float column that keeps the cell text it was parsed from
    pub(crate) fn float_with_source(
        name: impl Into<String>,
        values: Vec<Option<f64>>,
        source: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Float(values),
            source: Some(source),
        }
    }

    pub fn text(name: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(cells),
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Float values, if this is a float column
    pub fn as_floats(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Float(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    /// Text cells, if this is a text column
    pub fn as_text(&self) -> Option<&[String]> {
        match &self.data {
            ColumnData::Text(cells) => Some(cells),
            ColumnData::Float(_) => None,
        }
    }

    /// Render the cell at `row` the way it is written to disk. Source text
    /// wins over the parsed value while the column is unmodified.
    pub fn cell(&self, row: usize) -> String {
        if let Some(cell) = self.source.as_ref().and_then(|cells| cells.get(row)) {
            return cell.clone();
        }
        match &self.data {
            ColumnData::Float(values) => match values.get(row).copied().flatten() {
                Some(v) => v.to_string(),
                None => String::new(),
            },
            ColumnData::Text(cells) => cells.get(row).cloned().unwrap_or_default(),
        }
    }
}

/// Immutable telemetry table: ordered columns of equal length
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryTable {
    columns: Vec<Column>,
    rows: usize,
}

impl TelemetryTable {
    /// Build a table, checking that column names are unique and lengths agree
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::Schema(format!(
                    "Duplicate column '{}'",
                    column.name
                )));
            }
            if column.len() != rows {
                return Err(Error::Schema(format!(
                    "Column '{}' has {} rows, expected {}",
                    column.name,
                    column.len(),
                    rows
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Float values of a required column
    pub fn floats(&self, name: &str) -> Result<&[Option<f64>]> {
        let column = self.require(name)?;
        column.as_floats().ok_or_else(|| {
            Error::Schema(format!("Column '{}' is not declared as a float column", name))
        })
    }

    /// Text cells of a required column
    pub fn text(&self, name: &str) -> Result<&[String]> {
        let column = self.require(name)?;
        column.as_text().ok_or_else(|| {
            Error::Schema(format!("Column '{}' is not declared as a text column", name))
        })
    }

    /// Fail with a schema error unless every named column is present
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.require(name)?;
        }
        Ok(())
    }

    fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::Schema(format!("Table is missing required column '{}'", name)))
    }

    /// Swap the values of an existing float column. Length and null
    /// positions are the caller's responsibility and are checked here.
    pub(crate) fn replace_floats(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        let rows = self.rows;
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::Schema(format!("Table is missing required column '{}'", name)))?;
        match &mut column.data {
            ColumnData::Float(existing) => {
                if values.len() != rows {
                    return Err(Error::Internal(format!(
                        "Replacement for '{}' has {} rows, expected {}",
                        name,
                        values.len(),
                        rows
                    )));
                }
                *existing = values;
                column.source = None;
                Ok(())
            }
            ColumnData::Text(_) => Err(Error::Schema(format!(
                "Column '{}' is not declared as a float column",
                name
            ))),
        }
    }
}
