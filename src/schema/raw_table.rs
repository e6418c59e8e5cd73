//! Raw trial table contract
//!
//! The published dataset is a CSV with one row per trial. Thirteen of its
//! columns feed the pipeline under shorter canonical names; bookkeeping
//! columns (experiment id/name, raw response time) and anything else not in
//! the mapping are dropped.

use crate::error::ComputeError;
use crate::types::{Column, Table};
use std::io::Read;
use tracing::debug;

/// Raw column name → canonical column name, in raw-file order
pub const RAW_COLUMN_MAP: [(&str, &str); 13] = [
    ("subject_id", "subject_id"),
    ("session_id", "session_id"),
    ("run_id", "run_id"),
    ("trial_index", "trial_id"),
    ("trial_time", "trial_time"),
    ("prior_mean", "prior_mean"),
    ("prior_std", "prior_sd"),
    ("motion_direction", "stim_deg"),
    ("motion_coherence", "stim_coh"),
    ("response_arrow_start_angle", "init_deg"),
    ("reaction_time", "rt"),
    ("estimate_x", "resp_x"),
    ("estimate_y", "resp_y"),
];

/// Experiment bookkeeping columns known to be present in the raw file
pub const BOOKKEEPING_COLUMNS: [&str; 3] = ["experiment_id", "experiment_name", "raw_response_time"];

/// Raw tabular records as read from the source, all cells as text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Required raw columns absent from the header
    pub fn missing_columns(&self) -> Vec<String> {
        RAW_COLUMN_MAP
            .iter()
            .filter(|(raw, _)| self.column_index(raw).is_none())
            .map(|(raw, _)| raw.to_string())
            .collect()
    }

    /// Header columns that will not reach the canonical table
    pub fn dropped_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| !RAW_COLUMN_MAP.iter().any(|(raw, _)| raw == h))
            .map(String::as_str)
            .collect()
    }

    /// Rename mapped columns to canonical names, parse them as numbers, and
    /// drop everything else.
    ///
    /// Fails only when a required raw column is missing; unparseable cells
    /// become undefined.
    pub fn to_canonical(&self) -> Result<Table, ComputeError> {
        let missing = self.missing_columns();
        if !missing.is_empty() {
            return Err(ComputeError::MissingColumns(missing));
        }

        let mut table = Table::with_rows(self.n_rows());
        for (raw, canonical) in RAW_COLUMN_MAP {
            let index = self
                .column_index(raw)
                .ok_or_else(|| ComputeError::MissingColumns(vec![raw.to_string()]))?;
            let values = self
                .records
                .iter()
                .map(|record| record.get(index).and_then(|cell| parse_cell(cell)))
                .collect();
            table.push(Column::new(canonical, values))?;
        }

        let dropped = self.dropped_columns();
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "dropping raw columns outside the contract");
        }

        Ok(table)
    }
}

/// Parse one raw cell; empty, non-numeric, and non-finite text is undefined
pub fn parse_cell(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Adapter for reading raw trial tables
pub struct RawTableAdapter;

impl RawTableAdapter {
    /// Parse CSV text with a header row
    pub fn parse_csv(csv_text: &str) -> Result<RawTable, ComputeError> {
        Self::from_reader(csv_text.as_bytes())
    }

    /// Parse CSV from any reader with a header row.
    ///
    /// Rows may be shorter than the header; absent trailing fields read as
    /// undefined.
    pub fn from_reader<R: Read>(reader: R) -> Result<RawTable, ComputeError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable { headers, records })
    }
}
