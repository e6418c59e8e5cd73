//! Core types for the Prior Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: the column-major trial table and the encoded output payload.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// A single table cell. `None` marks an undefined value (a lag at a group
/// boundary, a zero denominator, or unparseable input), never a sentinel number.
pub type Cell = Option<f64>;

/// Wrap a computed value, mapping NaN and infinities to an undefined cell
pub fn finite(value: f64) -> Cell {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Named column of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Column-major table of trial records with a fixed row count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    n_rows: usize,
    columns: Vec<Column>,
}

impl Table {
    /// Create an empty table that will hold `n_rows` rows
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: Vec::new(),
        }
    }

    /// Build a table from columns, checking that all have the same length
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, ComputeError> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut table = Self::with_rows(n_rows);
        for column in columns {
            table.push(column)?;
        }
        Ok(table)
    }

    /// Append a column, replacing any existing column of the same name
    pub fn push(&mut self, column: Column) -> Result<(), ComputeError> {
        if column.len() != self.n_rows {
            return Err(ComputeError::LengthMismatch {
                column: column.name,
                expected: self.n_rows,
                actual: column.values.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column's values by name
    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Look up a column that an earlier stage must have produced
    pub fn require(&self, name: &str) -> Result<&[Cell], ComputeError> {
        self.column(name)
            .ok_or_else(|| ComputeError::MissingColumns(vec![name.to_string()]))
    }

    /// Project onto `names` in the given order.
    ///
    /// Columns not listed are dropped; any listed column that is absent is
    /// reported as a schema mismatch.
    pub fn select(&self, names: &[&str]) -> Result<Table, ComputeError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ComputeError::SchemaMismatch {
                missing,
                extra: Vec::new(),
            });
        }

        let columns = names
            .iter()
            .filter_map(|name| self.columns.iter().find(|c| c.name == *name))
            .cloned()
            .collect();

        Ok(Table {
            n_rows: self.n_rows,
            columns,
        })
    }

    /// Values of row `index` in column order
    pub fn row(&self, index: usize) -> Option<Vec<Cell>> {
        if index >= self.n_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[index]).collect())
    }

    /// Iterate rows in order
    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell>> + '_ {
        (0..self.n_rows).map(move |i| self.columns.iter().map(|c| c.values[i]).collect())
    }
}

/// Producer metadata for encoded tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Provenance metadata for encoded tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProvenance {
    /// Human-readable description of where the raw data came from
    pub source: String,
    pub computed_at_utc: String,
    pub row_count: usize,
}

/// JSON payload wrapping a processed trial table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialTablePayload {
    pub producer: TableProducer,
    pub provenance: TableProvenance,
    pub columns: Vec<String>,
    /// Row-major values, `null` for undefined cells
    pub rows: Vec<Vec<Cell>>,
}
