//! Pipeline orchestration
//!
//! This module provides the public API for Prior Flux.
//! It orchestrates the full pipeline from raw trial CSV to the validated,
//! analysis-ready trial table.

use crate::encoder::TableEncoder;
use crate::error::ComputeError;
use crate::features::FeatureDeriver;
use crate::schema::{ColumnCatalog, RawTable, RawTableAdapter};
use crate::source::DataSource;
use crate::types::Table;
use tracing::{debug, info};

/// Process a raw trial table into the documented output table.
///
/// Pipeline stages:
/// 1. RawTable - Rename contract columns, drop the rest, parse numbers
/// 2. FeatureDeriver - Compute lag, relative-angle and error columns, project
/// 3. ColumnCatalog - Validate the output column set
///
/// # Example
/// ```ignore
/// let raw = RawTableAdapter::parse_csv(&csv_text)?;
/// let table = process_data(&raw)?;
/// ```
pub fn process_data(raw: &RawTable) -> Result<Table, ComputeError> {
    TrialProcessor::new().process(raw)
}

/// Parse raw CSV text and process it
pub fn process_csv(csv_text: &str) -> Result<Table, ComputeError> {
    TrialProcessor::new().process_csv(csv_text)
}

/// Fetch raw CSV from `source` and process it
pub fn process_source(source: &dyn DataSource) -> Result<Table, ComputeError> {
    TrialProcessor::new().process_source(source)
}

/// Processor bound to a column catalog and an output encoder.
///
/// Holds no per-call state; processing the same input twice yields identical
/// tables.
pub struct TrialProcessor {
    catalog: ColumnCatalog,
    encoder: TableEncoder,
}

impl Default for TrialProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialProcessor {
    /// Create a processor validating against the standard catalog
    pub fn new() -> Self {
        Self::with_catalog(ColumnCatalog::standard())
    }

    /// Create a processor validating against a specific catalog
    pub fn with_catalog(catalog: ColumnCatalog) -> Self {
        Self {
            catalog,
            encoder: TableEncoder::new(),
        }
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn encoder(&self) -> &TableEncoder {
        &self.encoder
    }

    /// Run the full pipeline on an already parsed raw table
    pub fn process(&self, raw: &RawTable) -> Result<Table, ComputeError> {
        // Stage 1: Rename, drop and parse raw columns
        let canonical = raw.to_canonical()?;
        debug!(rows = canonical.n_rows(), "canonical table ready");

        // Stage 2: Derive features and project onto the final column list
        let derived = FeatureDeriver::derive(&canonical)?;

        // Stage 3: Validate against the documented schema
        self.catalog.validate(&derived)?;

        info!(
            rows = derived.n_rows(),
            columns = derived.n_columns(),
            "trial table processed"
        );
        Ok(derived)
    }

    /// Parse raw CSV text and run the full pipeline
    pub fn process_csv(&self, csv_text: &str) -> Result<Table, ComputeError> {
        let raw = RawTableAdapter::parse_csv(csv_text)?;
        self.process(&raw)
    }

    /// Fetch raw CSV from `source` and run the full pipeline
    pub fn process_source(&self, source: &dyn DataSource) -> Result<Table, ComputeError> {
        let csv_text = source.fetch()?;
        self.process_csv(&csv_text)
    }

    /// Process raw CSV and encode the result as CSV
    pub fn csv_to_csv(&self, csv_text: &str) -> Result<String, ComputeError> {
        let table = self.process_csv(csv_text)?;
        self.encoder.to_csv_string(&table)
    }

    /// Process raw CSV and encode the result as a JSON payload
    pub fn csv_to_json(&self, csv_text: &str, source: &str) -> Result<String, ComputeError> {
        let table = self.process_csv(csv_text)?;
        self.encoder.encode_to_json(&table, source, true)
    }
}
