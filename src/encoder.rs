//! Table encoding
//!
//! This module writes processed trial tables as CSV or as a JSON payload with
//! producer and provenance metadata. Undefined cells become empty CSV fields
//! or JSON `null`.

use crate::error::ComputeError;
use crate::types::{Cell, Table, TableProducer, TableProvenance, TrialTablePayload};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use std::io::Write;
use uuid::Uuid;

/// Encoder for processed trial tables
pub struct TableEncoder {
    instance_id: String,
}

impl Default for TableEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Write `table` as CSV with a header row
    pub fn encode_csv<W: Write>(&self, table: &Table, out: W) -> Result<(), ComputeError> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(table.column_names())?;
        for row in table.rows() {
            writer.write_record(row.into_iter().map(format_csv_cell))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Encode `table` as a CSV string
    pub fn to_csv_string(&self, table: &Table) -> Result<String, ComputeError> {
        let mut buffer = Vec::new();
        self.encode_csv(table, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Wrap `table` in a payload with producer and provenance metadata
    pub fn encode(&self, table: &Table, source: &str) -> TrialTablePayload {
        TrialTablePayload {
            producer: TableProducer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: TableProvenance {
                source: source.to_string(),
                computed_at_utc: Utc::now().to_rfc3339(),
                row_count: table.n_rows(),
            },
            columns: table
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            rows: table.rows().collect(),
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        table: &Table,
        source: &str,
        pretty: bool,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(table, source);
        let json = if pretty {
            serde_json::to_string_pretty(&payload)?
        } else {
            serde_json::to_string(&payload)?
        };
        Ok(json)
    }
}

fn format_csv_cell(cell: Cell) -> String {
    cell.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use pretty_assertions::assert_eq;

    fn sample_table() -> Table {
        Table::from_columns(vec![
            Column::new("subject_id", vec![Some(1.0), Some(1.0)]),
            Column::new("stim_deg_tm1", vec![None, Some(355.0)]),
            Column::new("err", vec![Some(-10.5), Some(0.25)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_csv_encoding() {
        let encoder = TableEncoder::with_instance_id("test".to_string());
        let csv_text = encoder.to_csv_string(&sample_table()).unwrap();
        assert_eq!(csv_text, "subject_id,stim_deg_tm1,err\n1,,-10.5\n1,355,0.25\n");
    }

    #[test]
    fn test_json_payload() {
        let encoder = TableEncoder::with_instance_id("instance-1".to_string());
        let json = encoder
            .encode_to_json(&sample_table(), "local.csv", false)
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["producer"]["name"], PRODUCER_NAME);
        assert_eq!(payload["producer"]["instance_id"], "instance-1");
        assert_eq!(payload["provenance"]["source"], "local.csv");
        assert_eq!(payload["provenance"]["row_count"], 2);
        assert_eq!(payload["columns"][1], "stim_deg_tm1");
        assert!(payload["rows"][0][1].is_null());
        assert_eq!(payload["rows"][1][1], 355.0);
    }

    #[test]
    fn test_payload_round_trip() {
        let encoder = TableEncoder::new();
        let json = encoder.encode_to_json(&sample_table(), "x", true).unwrap();
        let payload: TrialTablePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.rows[0], vec![Some(1.0), None, Some(-10.5)]);
        assert_eq!(payload.columns.len(), 3);
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = TableEncoder::new();
        let b = TableEncoder::new();
        assert_ne!(a.instance_id, b.instance_id);
    }
}
