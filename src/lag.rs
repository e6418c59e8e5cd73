//! Lag computation over experimental runs
//!
//! Trials are grouped by the combination of subject and run (a run id is only
//! unique within a subject). Within each group the original row order is the
//! chronological trial order, and a lag column copies the previous trial's
//! value. The first trial of every group has no predecessor and its lag is
//! undefined; no lookup ever reads across a group boundary.

use crate::error::ComputeError;
use crate::types::{Cell, Table};
use std::collections::HashMap;

/// Identity of one experimental run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub subject_id: i64,
    pub run_id: i64,
}

impl GroupKey {
    /// Build a key from id cells. Ids must be finite integral numbers.
    pub fn from_cells(subject_id: Cell, run_id: Cell) -> Option<Self> {
        Some(Self {
            subject_id: integral(subject_id?)?,
            run_id: integral(run_id?)?,
        })
    }
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// One run's rows, as indices into the table in chronological order
#[derive(Debug, Clone, PartialEq)]
pub struct RunGroup {
    pub key: GroupKey,
    pub rows: Vec<usize>,
}

/// Partition of a table's rows into (subject, run) groups
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    n_rows: usize,
    groups: Vec<RunGroup>,
}

impl Grouping {
    /// Group rows by explicit keys. Rows with no key belong to no group.
    ///
    /// Groups are ordered by first appearance; rows inside a group keep
    /// their original relative order even when groups are interleaved.
    pub fn from_keys(keys: &[Option<GroupKey>]) -> Self {
        let mut slots: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<RunGroup> = Vec::new();

        for (row, key) in keys.iter().enumerate() {
            let Some(key) = *key else { continue };
            let slot = *slots.entry(key).or_insert_with(|| {
                groups.push(RunGroup {
                    key,
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].rows.push(row);
        }

        Self {
            n_rows: keys.len(),
            groups,
        }
    }

    /// Group a table by its `subject_id` and `run_id` columns
    pub fn by_subject_run(table: &Table) -> Result<Self, ComputeError> {
        let subjects = table.require("subject_id")?;
        let runs = table.require("run_id")?;

        let keys: Vec<Option<GroupKey>> = subjects
            .iter()
            .zip(runs)
            .map(|(&subject, &run)| GroupKey::from_cells(subject, run))
            .collect();

        Ok(Self::from_keys(&keys))
    }

    pub fn groups(&self) -> &[RunGroup] {
        &self.groups
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Previous-trial value of `values` within each group.
    ///
    /// Returns a column of the same length as the grouped table.
    pub fn lag(&self, values: &[Cell]) -> Result<Vec<Cell>, ComputeError> {
        if values.len() != self.n_rows {
            return Err(ComputeError::LengthMismatch {
                column: "lag input".to_string(),
                expected: self.n_rows,
                actual: values.len(),
            });
        }

        let mut lagged: Vec<Cell> = vec![None; self.n_rows];
        for group in &self.groups {
            for pair in group.rows.windows(2) {
                lagged[pair[1]] = values[pair[0]];
            }
        }
        Ok(lagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use pretty_assertions::assert_eq;

    fn key(subject_id: i64, run_id: i64) -> Option<GroupKey> {
        Some(GroupKey { subject_id, run_id })
    }

    #[test]
    fn test_lag_within_single_group() {
        let grouping = Grouping::from_keys(&[key(1, 1), key(1, 1), key(1, 1)]);
        let lagged = grouping.lag(&[Some(5.0), Some(355.0), Some(15.0)]).unwrap();
        assert_eq!(lagged, vec![None, Some(5.0), Some(355.0)]);
    }

    #[test]
    fn test_lag_never_crosses_runs() {
        let grouping = Grouping::from_keys(&[key(1, 1), key(1, 1), key(1, 2), key(1, 2)]);
        let lagged = grouping
            .lag(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)])
            .unwrap();
        assert_eq!(lagged, vec![None, Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_run_id_scoped_to_subject() {
        // Same run id, different subjects: two groups
        let grouping = Grouping::from_keys(&[key(1, 1), key(2, 1), key(1, 1), key(2, 1)]);
        assert_eq!(grouping.groups().len(), 2);
        let lagged = grouping
            .lag(&[Some(10.0), Some(20.0), Some(11.0), Some(21.0)])
            .unwrap();
        assert_eq!(lagged, vec![None, None, Some(10.0), Some(20.0)]);
    }

    #[test]
    fn test_undefined_key_rows_are_ungrouped() {
        let grouping = Grouping::from_keys(&[key(1, 1), None, key(1, 1)]);
        let lagged = grouping.lag(&[Some(1.0), Some(2.0), Some(3.0)]).unwrap();
        assert_eq!(lagged, vec![None, None, Some(1.0)]);
    }

    #[test]
    fn test_undefined_values_carry_forward_as_undefined() {
        let grouping = Grouping::from_keys(&[key(1, 1), key(1, 1), key(1, 1)]);
        let lagged = grouping.lag(&[None, Some(2.0), Some(3.0)]).unwrap();
        assert_eq!(lagged, vec![None, None, Some(2.0)]);
    }

    #[test]
    fn test_lag_length_mismatch() {
        let grouping = Grouping::from_keys(&[key(1, 1), key(1, 1)]);
        assert!(matches!(
            grouping.lag(&[Some(1.0)]),
            Err(ComputeError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_group_key_requires_integral_ids() {
        assert_eq!(GroupKey::from_cells(Some(3.0), Some(2.0)), key(3, 2));
        assert_eq!(GroupKey::from_cells(Some(3.5), Some(2.0)), None);
        assert_eq!(GroupKey::from_cells(Some(f64::NAN), Some(2.0)), None);
        assert_eq!(GroupKey::from_cells(None, Some(2.0)), None);
    }

    #[test]
    fn test_by_subject_run() {
        let table = Table::from_columns(vec![
            Column::new("subject_id", vec![Some(1.0), Some(1.0), Some(2.0)]),
            Column::new("run_id", vec![Some(1.0), Some(1.0), Some(1.0)]),
        ])
        .unwrap();
        let grouping = Grouping::by_subject_run(&table).unwrap();
        assert_eq!(
            grouping.groups(),
            &[
                RunGroup {
                    key: GroupKey {
                        subject_id: 1,
                        run_id: 1
                    },
                    rows: vec![0, 1],
                },
                RunGroup {
                    key: GroupKey {
                        subject_id: 2,
                        run_id: 1
                    },
                    rows: vec![2],
                },
            ]
        );
    }

    #[test]
    fn test_by_subject_run_requires_ids() {
        let table =
            Table::from_columns(vec![Column::new("subject_id", vec![Some(1.0)])]).unwrap();
        assert!(matches!(
            Grouping::by_subject_run(&table),
            Err(ComputeError::MissingColumns(_))
        ));
    }
}
