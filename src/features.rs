//! Feature derivation
//!
//! This module derives the per-trial kinematic and error columns from the
//! canonical trial table:
//! - Stimulus lag and trial-to-trial change within a run
//! - Stimulus and response direction relative to the prior mean
//! - Polar response coordinates
//! - Response error, its lag, and its sign relative to the prior and to the
//!   previous stimulus
//!
//! Each column depends only on raw columns or on columns computed before it.

use crate::error::ComputeError;
use crate::geometry::{cart2pol_many, circdiff_many};
use crate::lag::Grouping;
use crate::schema::FINAL_COLUMNS;
use crate::types::{finite, Cell, Column, Table};
use tracing::debug;

/// Feature deriver for computing the processed trial table
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive all columns and project onto the documented column list.
    ///
    /// The input is the canonical (renamed) table; it is not modified. Row
    /// count and order are preserved.
    pub fn derive(canonical: &Table) -> Result<Table, ComputeError> {
        let derived = Self::derive_all(canonical)?;
        derived.select(&FINAL_COLUMNS)
    }

    /// Canonical columns plus every derived column, before projection
    pub fn derive_all(canonical: &Table) -> Result<Table, ComputeError> {
        let grouping = Grouping::by_subject_run(canonical)?;
        debug!(
            rows = canonical.n_rows(),
            runs = grouping.groups().len(),
            "deriving trial features"
        );

        let prior_mean = canonical.require("prior_mean")?;
        let stim_deg = canonical.require("stim_deg")?;
        let resp_x = canonical.require("resp_x")?;
        let resp_y = canonical.require("resp_y")?;

        let stim_deg_tm1 = grouping.lag(stim_deg)?;
        let stim_deg_delta = circdiff_many(stim_deg, &stim_deg_tm1);
        let stim_rel = circdiff_many(stim_deg, prior_mean);
        let (resp_deg, resp_mag) = cart2pol_many(resp_x, resp_y);
        let resp_rel = circdiff_many(&resp_deg, prior_mean);
        let err = circdiff_many(&resp_deg, stim_deg);
        let err_tm1 = grouping.lag(&err)?;

        let err_toprior: Vec<Cell> = stim_rel
            .iter()
            .zip(&err)
            .map(|(&rel, &e)| compute_err_toprior(rel, e))
            .collect();
        let err_toprior_norm: Vec<Cell> = err_toprior
            .iter()
            .zip(&stim_rel)
            .map(|(&e, &rel)| compute_err_toprior_norm(e, rel))
            .collect();
        let err_awaytm1: Vec<Cell> = stim_deg_delta
            .iter()
            .zip(&err)
            .map(|(&delta, &e)| compute_err_awaytm1(delta, e))
            .collect();

        let mut table = canonical.clone();
        for column in [
            Column::new("stim_deg_tm1", stim_deg_tm1),
            Column::new("stim_deg_delta", stim_deg_delta),
            Column::new("stim_rel", stim_rel),
            Column::new("resp_deg", resp_deg),
            Column::new("resp_mag", resp_mag),
            Column::new("resp_rel", resp_rel),
            Column::new("err", err),
            Column::new("err_tm1", err_tm1),
            Column::new("err_toprior", err_toprior),
            Column::new("err_toprior_norm", err_toprior_norm),
            Column::new("err_awaytm1", err_awaytm1),
        ] {
            table.push(column)?;
        }

        Ok(table)
    }
}

/// `|err|` when the sign of `reference · err` is negative, `-|err|` otherwise
fn sign_aligned(reference: Cell, err: Cell) -> Cell {
    match (reference, err) {
        (Some(reference), Some(err)) => {
            if reference * err < 0.0 {
                Some(err.abs())
            } else {
                Some(-err.abs())
            }
        }
        _ => None,
    }
}

/// Error magnitude, positive when the response error points toward the prior mean
fn compute_err_toprior(stim_rel: Cell, err: Cell) -> Cell {
    sign_aligned(stim_rel, err)
}

/// `err_toprior` normalized by the stimulus distance to the prior mean.
/// Undefined when the stimulus sits exactly on the prior mean.
fn compute_err_toprior_norm(err_toprior: Cell, stim_rel: Cell) -> Cell {
    match (err_toprior, stim_rel) {
        (Some(e), Some(rel)) if rel != 0.0 => finite(e / rel.abs()),
        _ => None,
    }
}

/// Error magnitude signed against the trial-to-trial stimulus change:
/// positive when the error opposes `stim_deg_delta`, i.e. points back toward
/// the previous trial's stimulus
fn compute_err_awaytm1(stim_deg_delta: Cell, err: Cell) -> Cell {
    sign_aligned(stim_deg_delta, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Canonical table from `(subject, run, stim_deg, resp_x, resp_y)` rows
    fn make_canonical(rows: &[(f64, f64, f64, f64, f64)]) -> Table {
        let pick = |i: usize| -> Vec<Cell> {
            rows.iter()
                .map(|r| Some([r.0, r.1, r.2, r.3, r.4][i]))
                .collect()
        };
        let constant = |v: f64| -> Vec<Cell> { vec![Some(v); rows.len()] };

        Table::from_columns(vec![
            Column::new("subject_id", pick(0)),
            Column::new("session_id", constant(1.0)),
            Column::new("run_id", pick(1)),
            Column::new("trial_id", constant(1.0)),
            Column::new("trial_time", constant(0.0)),
            Column::new("prior_mean", constant(225.0)),
            Column::new("prior_sd", constant(80.0)),
            Column::new("stim_deg", pick(2)),
            Column::new("stim_coh", constant(24.0)),
            Column::new("init_deg", constant(0.0)),
            Column::new("rt", constant(1.0)),
            Column::new("resp_x", pick(3)),
            Column::new("resp_y", pick(4)),
        ])
        .unwrap()
    }

    fn unit(deg: f64) -> (f64, f64) {
        crate::geometry::pol2cart(deg, 1.0)
    }

    fn approx(cell: Cell, expected: f64) -> bool {
        cell.map_or(false, |v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn test_output_columns_in_documented_order() {
        let (x, y) = unit(30.0);
        let derived = FeatureDeriver::derive(&make_canonical(&[(1.0, 1.0, 25.0, x, y)])).unwrap();
        assert_eq!(derived.column_names(), FINAL_COLUMNS.to_vec());
        assert_eq!(derived.n_rows(), 1);
    }

    #[test]
    fn test_worked_example() {
        // Stimulus at 200 (25 deg clockwise of the prior), response at 210:
        // the error of +10 points toward the prior mean at 225.
        let (x0, y0) = unit(10.0);
        let (x1, y1) = unit(210.0);
        let canonical = make_canonical(&[(1.0, 1.0, 5.0, x0, y0), (1.0, 1.0, 200.0, x1, y1)]);
        let t = FeatureDeriver::derive(&canonical).unwrap();

        let get = |name: &str, row: usize| t.column(name).unwrap()[row];

        assert_eq!(get("stim_deg_tm1", 0), None);
        assert_eq!(get("stim_deg_tm1", 1), Some(5.0));
        assert_eq!(get("stim_deg_delta", 1), Some(-165.0));
        assert_eq!(get("stim_rel", 1), Some(-25.0));
        assert!(approx(get("resp_deg", 1), 210.0));
        assert!(approx(get("resp_mag", 1), 1.0));
        assert!(approx(get("resp_rel", 1), -15.0));
        assert!(approx(get("err", 1), 10.0));
        assert!(approx(get("err_tm1", 1), 5.0));
        assert!(approx(get("err_toprior", 1), 10.0));
        assert!(approx(get("err_toprior_norm", 1), 0.4));
        // delta is negative and err positive: the error points back toward
        // the previous stimulus
        assert!(approx(get("err_awaytm1", 1), 10.0));
    }

    #[test]
    fn test_error_away_from_prior_is_negative() {
        // Stimulus at 200, response at 190: error of -10 away from 225
        let (x, y) = unit(190.0);
        let t = FeatureDeriver::derive(&make_canonical(&[(1.0, 1.0, 200.0, x, y)])).unwrap();
        assert!(approx(t.column("err").unwrap()[0], -10.0));
        assert!(approx(t.column("err_toprior").unwrap()[0], -10.0));
        assert!(approx(t.column("err_toprior_norm").unwrap()[0], -0.4));
    }

    #[test]
    fn test_stimulus_on_prior_with_zero_response() {
        let t = FeatureDeriver::derive(&make_canonical(&[(1.0, 1.0, 225.0, 0.0, 0.0)])).unwrap();
        let first = |name: &str| t.column(name).unwrap()[0];

        assert_eq!(first("resp_deg"), Some(0.0));
        assert_eq!(first("resp_mag"), Some(0.0));
        assert_eq!(first("stim_rel"), Some(0.0));
        assert_eq!(first("err_toprior_norm"), None);
        // err = circdiff(0, 225) = 135; stim_rel is 0 so the sign rule gives -|err|
        assert_eq!(first("err"), Some(135.0));
        assert_eq!(first("err_toprior"), Some(-135.0));
    }

    #[test]
    fn test_stimulus_delta_wraparound() {
        let (x, y) = unit(0.0);
        let t = FeatureDeriver::derive(&make_canonical(&[
            (1.0, 1.0, 5.0, x, y),
            (1.0, 1.0, 355.0, x, y),
        ]))
        .unwrap();
        assert_eq!(t.column("stim_deg_delta").unwrap(), &[None, Some(-10.0)]);
    }

    #[test]
    fn test_lags_reset_per_run_and_subject() {
        let (x, y) = unit(45.0);
        let t = FeatureDeriver::derive(&make_canonical(&[
            (1.0, 1.0, 5.0, x, y),
            (1.0, 2.0, 15.0, x, y),
            (2.0, 1.0, 25.0, x, y),
            (1.0, 1.0, 35.0, x, y),
        ]))
        .unwrap();
        assert_eq!(
            t.column("stim_deg_tm1").unwrap(),
            &[None, None, None, Some(5.0)]
        );
        let err_tm1 = t.column("err_tm1").unwrap();
        assert_eq!(err_tm1[..3].to_vec(), vec![None::<f64>; 3]);
        assert!(approx(err_tm1[3], 40.0));
        assert_eq!(
            t.column("err_awaytm1").unwrap()[..3].to_vec(),
            vec![None::<f64>; 3]
        );
    }

    #[test]
    fn test_undefined_response_is_local_to_row() {
        let (x, y) = unit(100.0);
        let mut canonical = make_canonical(&[(1.0, 1.0, 95.0, x, y), (1.0, 1.0, 105.0, x, y)]);
        canonical
            .push(Column::new("resp_x", vec![None, Some(x)]))
            .unwrap();
        let t = FeatureDeriver::derive(&canonical).unwrap();

        assert_eq!(t.column("resp_deg").unwrap()[0], None);
        assert_eq!(t.column("err").unwrap()[0], None);
        assert_eq!(t.column("err_toprior").unwrap()[0], None);
        assert!(approx(t.column("err").unwrap()[1], -5.0));
        // the undefined error lags into the next row's err_tm1
        assert_eq!(t.column("err_tm1").unwrap()[1], None);
        assert_eq!(t.column("stim_rel").unwrap()[0], Some(-130.0));
    }

    #[test]
    fn test_input_is_not_modified() {
        let (x, y) = unit(45.0);
        let canonical = make_canonical(&[(1.0, 1.0, 5.0, x, y)]);
        let before = canonical.clone();
        FeatureDeriver::derive(&canonical).unwrap();
        assert_eq!(canonical, before);
    }

    #[test]
    fn test_missing_canonical_column() {
        let table = Table::from_columns(vec![
            Column::new("subject_id", vec![Some(1.0)]),
            Column::new("run_id", vec![Some(1.0)]),
        ])
        .unwrap();
        assert!(matches!(
            FeatureDeriver::derive(&table),
            Err(ComputeError::MissingColumns(_))
        ));
    }

    #[test]
    fn test_sign_aligned() {
        assert_eq!(sign_aligned(Some(-25.0), Some(10.0)), Some(10.0));
        assert_eq!(sign_aligned(Some(25.0), Some(10.0)), Some(-10.0));
        assert_eq!(sign_aligned(Some(25.0), Some(-10.0)), Some(10.0));
        assert_eq!(sign_aligned(None, Some(-10.0)), None);
        assert_eq!(compute_err_toprior_norm(Some(5.0), Some(0.0)), None);
        assert_eq!(compute_err_toprior_norm(Some(5.0), Some(-10.0)), Some(0.5));
    }
}
