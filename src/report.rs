//! Text reporting
//!
//! Renders a processed trial table for people: the documented column
//! descriptions, a preview of the first rows, and a per-prior summary. The
//! reporter owns no state; its wrap width, preview size, and prior palette
//! arrive as configuration.

use crate::error::ComputeError;
use crate::schema::ColumnCatalog;
use crate::types::{Cell, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Default wrap width for column descriptions
pub const DEFAULT_WRAP_WIDTH: usize = 70;

/// Default number of rows in a table preview
pub const DEFAULT_HEAD_ROWS: usize = 10;

const INDENT: &str = "    ";

/// RGB color (components in 0-1) per prior standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorPalette {
    colors: BTreeMap<u32, [f64; 3]>,
}

impl Default for PriorPalette {
    fn default() -> Self {
        let colors = BTreeMap::from([
            (80, [0.5, 0.0, 0.0]),
            (40, [1.0, 0.2, 0.0]),
            (20, [1.0, 0.6, 0.0]),
            (10, [0.75, 0.75, 0.0]),
        ]);
        Self { colors }
    }
}

impl PriorPalette {
    pub fn new(colors: BTreeMap<u32, [f64; 3]>) -> Self {
        Self { colors }
    }

    pub fn color(&self, prior_sd: u32) -> Option<[f64; 3]> {
        self.colors.get(&prior_sd).copied()
    }
}

/// Reporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub wrap_width: usize,
    pub head_rows: usize,
    pub palette: PriorPalette,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            wrap_width: DEFAULT_WRAP_WIDTH,
            head_rows: DEFAULT_HEAD_ROWS,
            palette: PriorPalette::default(),
        }
    }
}

/// Renders processed tables and their column metadata to a text stream
pub struct Reporter<'a> {
    config: &'a ReportConfig,
    catalog: &'a ColumnCatalog,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a ReportConfig, catalog: &'a ColumnCatalog) -> Self {
        Self { config, catalog }
    }

    /// Column name followed by its wrapped description, in documented order.
    ///
    /// The table must carry exactly the catalog's columns.
    pub fn render_descriptions<W: Write>(
        &self,
        table: &Table,
        out: &mut W,
    ) -> Result<(), ComputeError> {
        self.catalog.validate(table)?;
        self.render_catalog(out)
    }

    /// Column descriptions without a table to check against
    pub fn render_catalog<W: Write>(&self, out: &mut W) -> Result<(), ComputeError> {
        let width = self.config.wrap_width.saturating_sub(INDENT.len()).max(1);
        for spec in self.catalog.columns() {
            writeln!(out, "{}", spec.name)?;
            for line in wrap(&spec.description, width) {
                writeln!(out, "{INDENT}{line}")?;
            }
        }
        Ok(())
    }

    /// Fixed-width preview of the first rows; undefined cells print as `NaN`
    pub fn render_head<W: Write>(&self, table: &Table, out: &mut W) -> Result<(), ComputeError> {
        let n = self.config.head_rows.min(table.n_rows());

        let mut grid: Vec<Vec<String>> = vec![table
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()];
        grid.extend((0..n).filter_map(|i| table.row(i)).map(|row| {
            row.into_iter().map(format_cell).collect::<Vec<String>>()
        }));

        let widths: Vec<usize> = (0..table.n_columns())
            .map(|c| grid.iter().map(|r| r[c].len()).max().unwrap_or(0))
            .collect();

        for (i, row) in grid.iter().enumerate() {
            let label = if i == 0 { String::new() } else { (i - 1).to_string() };
            let mut line = format!("{label:>4}");
            for (cell, &width) in row.iter().zip(&widths) {
                line.push_str(&format!("  {cell:>width$}"));
            }
            writeln!(out, "{}", line.trim_end())?;
        }

        if table.n_rows() > n {
            writeln!(out, "[{} rows x {} columns]", table.n_rows(), table.n_columns())?;
        }
        Ok(())
    }

    /// Trial count and palette color per prior standard deviation
    pub fn render_prior_summary<W: Write>(
        &self,
        table: &Table,
        out: &mut W,
    ) -> Result<(), ComputeError> {
        let prior_sd = table.require("prior_sd")?;

        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        let mut undefined = 0usize;
        for cell in prior_sd {
            match cell.filter(|v| *v >= 0.0 && v.fract() == 0.0) {
                Some(v) => *counts.entry(v as u32).or_insert(0) += 1,
                None => undefined += 1,
            }
        }

        writeln!(out, "{:>8}  {:>8}  color", "prior_sd", "trials")?;
        for (sd, count) in &counts {
            let color = match self.config.palette.color(*sd) {
                Some([r, g, b]) => format!("[{r:.2}, {g:.2}, {b:.2}]"),
                None => "-".to_string(),
            };
            writeln!(out, "{sd:>8}  {count:>8}  {color}")?;
        }
        if undefined > 0 {
            writeln!(out, "{:>8}  {undefined:>8}  -", "NaN")?;
        }
        Ok(())
    }
}

fn format_cell(cell: Cell) -> String {
    match cell {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{v:.0}"),
        Some(v) => format!("{v:.3}"),
        None => "NaN".to_string(),
    }
}

/// Greedy word wrap; words longer than `width` get a line of their own
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use crate::types::Column;
    use pretty_assertions::assert_eq;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), ComputeError>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_wrap() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert_eq!(wrap("supercalifragilistic x", 5), vec!["supercalifragilistic", "x"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_render_catalog_wraps_descriptions() {
        let catalog = ColumnCatalog::new(vec![
            ColumnSpec {
                name: "err".to_string(),
                description: "Response error in degrees between response and stimulus".to_string(),
            },
            ColumnSpec {
                name: "rt".to_string(),
                description: "Reaction time.".to_string(),
            },
        ]);
        let config = ReportConfig {
            wrap_width: 24,
            ..Default::default()
        };
        let reporter = Reporter::new(&config, &catalog);

        let text = render(|out| reporter.render_catalog(out));
        assert_eq!(
            text,
            "err\n    Response error in\n    degrees between\n    response and\n    stimulus\nrt\n    Reaction time.\n"
        );
        assert!(text.lines().all(|l| l.len() <= 24));
    }

    #[test]
    fn test_render_descriptions_rejects_mismatched_table() {
        let config = ReportConfig::default();
        let catalog = ColumnCatalog::standard();
        let reporter = Reporter::new(&config, &catalog);
        let table = Table::from_columns(vec![Column::new("err", vec![Some(1.0)])]).unwrap();

        let mut out = Vec::new();
        let result = reporter.render_descriptions(&table, &mut out);
        assert!(matches!(result, Err(ComputeError::SchemaMismatch { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_render_head() {
        let table = Table::from_columns(vec![
            Column::new("subject_id", vec![Some(1.0), Some(1.0), Some(2.0)]),
            Column::new("err", vec![None, Some(-12.5), Some(3.25)]),
        ])
        .unwrap();
        let config = ReportConfig {
            head_rows: 2,
            ..Default::default()
        };
        let catalog = ColumnCatalog::standard();
        let reporter = Reporter::new(&config, &catalog);

        let text = render(|out| reporter.render_head(&table, out));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "      subject_id      err");
        assert_eq!(lines[1], "   0           1      NaN");
        assert_eq!(lines[2], "   1           1  -12.500");
        assert_eq!(lines[3], "[3 rows x 2 columns]");
    }

    #[test]
    fn test_render_prior_summary() {
        let table = Table::from_columns(vec![Column::new(
            "prior_sd",
            vec![Some(80.0), Some(10.0), Some(80.0), Some(15.0), None],
        )])
        .unwrap();
        let config = ReportConfig::default();
        let catalog = ColumnCatalog::standard();
        let reporter = Reporter::new(&config, &catalog);

        let text = render(|out| reporter.render_prior_summary(&table, out));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "prior_sd    trials  color");
        assert_eq!(lines[1], "      10         1  [0.75, 0.75, 0.00]");
        assert_eq!(lines[2], "      15         1  -");
        assert_eq!(lines[3], "      80         2  [0.50, 0.00, 0.00]");
        assert_eq!(lines[4], "     NaN         1  -");
    }

    #[test]
    fn test_report_config_from_partial_json() {
        let config: ReportConfig = serde_json::from_str(r#"{"wrap_width": 50}"#).unwrap();
        assert_eq!(config.wrap_width, 50);
        assert_eq!(config.head_rows, DEFAULT_HEAD_ROWS);
        assert_eq!(config.palette.color(40), Some([1.0, 0.2, 0.0]));
    }
}
