//! Output column catalog and schema validation
//!
//! The catalog is the documented contract of the processed table: the exact
//! column list, in order, with a human-readable description per column. It is
//! plain data handed to whoever needs it (the deriver's projection, the
//! validator, the reporter) rather than process-wide state.

use crate::error::ComputeError;
use crate::types::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Final column list of the processed table, in documented order
pub const FINAL_COLUMNS: [&str; 24] = [
    "subject_id",
    "session_id",
    "run_id",
    "trial_id",
    "trial_time",
    "prior_mean",
    "prior_sd",
    "stim_deg",
    "stim_deg_tm1",
    "stim_deg_delta",
    "stim_rel",
    "stim_coh",
    "init_deg",
    "rt",
    "resp_x",
    "resp_y",
    "resp_deg",
    "resp_mag",
    "resp_rel",
    "err",
    "err_tm1",
    "err_toprior",
    "err_toprior_norm",
    "err_awaytm1",
];

const STANDARD_DESCRIPTIONS: [(&str, &str); 24] = [
    ("subject_id", "Integer identifying the subject."),
    ("session_id", "Integer identifying the session within a subject."),
    ("run_id", "Integer identifying the run (block) within a session. Only unique within a subject."),
    ("trial_id", "Integer identifying the trial within a run."),
    ("trial_time", "Start time of the trial in seconds; the first trial of each run starts at 0."),
    ("prior_mean", "Mean of the experimentally imposed prior over motion direction, in degrees. Always 225."),
    ("prior_sd", "Standard deviation of the prior in degrees, one of 10, 20, 40 or 80. Smaller values mean a stronger prior."),
    ("stim_deg", "Motion direction of the stimulus in degrees, one of 5, 15, 25, ..., 355."),
    ("stim_deg_tm1", "Motion direction of the previous trial's stimulus within the same run, in degrees. Undefined for the first trial of a run."),
    ("stim_deg_delta", "Signed circular change of stimulus direction from the previous trial of the run, in degrees within (-180, 180]. Undefined for the first trial of a run."),
    ("stim_rel", "Stimulus direction relative to the prior mean, in degrees within (-180, 180]."),
    ("stim_coh", "Motion coherence of the stimulus (signal strength), one of 6, 12 or 24."),
    ("init_deg", "Angle at which the response arrow started, in degrees."),
    ("rt", "Reaction time in seconds."),
    ("resp_x", "Horizontal cartesian coordinate of the response."),
    ("resp_y", "Vertical cartesian coordinate of the response."),
    ("resp_deg", "Response direction in degrees within [0, 360), counterclockwise from the positive x axis."),
    ("resp_mag", "Distance of the response from the origin."),
    ("resp_rel", "Response direction relative to the prior mean, in degrees within (-180, 180]."),
    ("err", "Response error: signed circular difference between response and stimulus direction, in degrees within (-180, 180]."),
    ("err_tm1", "Response error of the previous trial within the same run. Undefined for the first trial of a run."),
    ("err_toprior", "Magnitude of the response error, positive when the error points toward the prior mean and negative otherwise."),
    ("err_toprior_norm", "err_toprior divided by the absolute distance of the stimulus to the prior mean. Undefined when the stimulus sits on the prior mean."),
    ("err_awaytm1", "Magnitude of the response error, signed against the stimulus change from the previous trial: positive when the error opposes stim_deg_delta (pointing back toward the previous stimulus) and negative otherwise. Undefined for the first trial of a run."),
];

/// One documented output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub description: String,
}

/// Ordered column → description mapping for the processed table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCatalog {
    columns: Vec<ColumnSpec>,
}

impl Default for ColumnCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ColumnCatalog {
    /// Catalog of the 24 documented output columns
    pub fn standard() -> Self {
        Self {
            columns: STANDARD_DESCRIPTIONS
                .iter()
                .map(|(name, description)| ColumnSpec {
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.description.as_str())
    }

    /// Check that `table` has exactly the catalog's columns, no more and no fewer.
    ///
    /// Column order is not part of this check; the deriver's projection fixes it.
    pub fn validate(&self, table: &Table) -> Result<(), ComputeError> {
        let expected: BTreeSet<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let actual: BTreeSet<&str> = table.column_names().into_iter().collect();

        let missing: Vec<String> = self
            .names()
            .into_iter()
            .filter(|name| !actual.contains(name))
            .map(str::to_string)
            .collect();
        let extra: Vec<String> = table
            .column_names()
            .into_iter()
            .filter(|name| !expected.contains(name))
            .map(str::to_string)
            .collect();

        if missing.is_empty() && extra.is_empty() {
            Ok(())
        } else {
            Err(ComputeError::SchemaMismatch { missing, extra })
        }
    }
}
