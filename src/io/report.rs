//! Measurement tables and run reports, the numeric companion of the logs.

use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::AppError;

/// A measurement table with one row per run.
///
/// Columns are right aligned on their widest cell, which keeps sweep
/// output readable on the terminal and in report files.
#[derive(Debug)]
pub struct ReportTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row; the cell count must match the headers.
    pub fn push_row(&mut self, cells: Vec<String>) {
        debug_assert_eq!(cells.len(), self.headers.len());
        self.rows.push(cells);
    }

    pub fn write_to(&self, out: &mut dyn Write) -> std::io::Result<()> {
        write!(out, "{self}")
    }
}

impl fmt::Display for ReportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        let align = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:>width$}"))
                .collect::<Vec<_>>()
                .join("  ")
        };
        writeln!(f, "{}", align(&self.headers))?;
        for row in &self.rows {
            writeln!(f, "{}", align(row))?;
        }
        Ok(())
    }
}

/// Summary of one solve, written as JSON next to the other run artifacts.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// RFC 3339 creation time.
    pub created: String,
    pub geometry: String,
    pub polynomial_degree: usize,
    pub refinement_level: usize,
    pub dofs: usize,
    /// Fraction of matrix entries kept dense, `None` for dense assembly.
    pub compression_rate: Option<f64>,
    pub iterations: usize,
    pub residual: f64,
    pub max_potential_error: f64,
    /// Wall clock seconds of the assembly, solve and evaluation stages.
    pub seconds: Vec<f64>,
}

impl RunReport {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        tracing::debug!(path = %path.as_ref().display(), "Run report written");
        Ok(())
    }
}
