//! Reader and writer for geometry files in the GEOPDE `.dat` format.
//!
//! The format starts with four comment lines and one header line holding
//! five integers, of which the third is the patch count. Every patch block
//! consists of a name line, the two polynomial degrees, the numbers of
//! control points per direction, one line per knot vector and one line per
//! control point matrix (x, y, z, w), each written row major.

use std::fmt::Write as _;
use std::path::Path;

use nalgebra::DMatrix;

use crate::error::AppError;
use crate::geometry::patch::Patch;

/// Control net of a single patch before Bezier extraction.
#[derive(Debug, Clone)]
pub struct RawPatch {
    /// Homogeneous control point matrices x, y, z, w with the y index on
    /// the rows.
    pub xyzw: [DMatrix<f64>; 4],
    pub knots_x: Vec<f64>,
    pub knots_y: Vec<f64>,
}

fn parse_error(path: &Path, message: impl Into<String>) -> AppError {
    AppError::GeometryFile {
        path: path.display().to_string(),
        message: message.into(),
    }
}

struct Tokens<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines(),
            line_number: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        self.line_number += 1;
        self.lines.next()
    }

    fn numbers(&mut self, count: usize) -> Result<Vec<f64>, String> {
        let line_number = self.line_number + 1;
        let line = self
            .next_line()
            .ok_or_else(|| format!("unexpected end of file at line {}", line_number))?;
        let values: Result<Vec<f64>, _> = line
            .split_whitespace()
            .take(count)
            .map(str::parse::<f64>)
            .collect();
        let values =
            values.map_err(|e| format!("line {}: invalid number: {}", line_number, e))?;
        if values.len() < count {
            return Err(format!(
                "line {}: expected {} values, found {}",
                line_number,
                count,
                values.len()
            ));
        }
        Ok(values)
    }
}

/// Parses the raw patch blocks of a `.dat` file.
pub fn read_raw_patches(path: &Path) -> Result<Vec<RawPatch>, AppError> {
    let content = std::fs::read_to_string(path)?;
    let mut tokens = Tokens::new(&content);

    // Four comment lines, then the header.
    for _ in 0..4 {
        tokens
            .next_line()
            .ok_or_else(|| parse_error(path, "missing header"))?;
    }
    let header = tokens.numbers(5).map_err(|m| parse_error(path, m))?;
    let number_of_patches = header[2] as usize;

    let mut out = Vec::with_capacity(number_of_patches);
    for patch_number in 0..number_of_patches {
        let block = read_patch_block(&mut tokens)
            .map_err(|m| parse_error(path, format!("patch {}: {}", patch_number, m)))?;
        out.push(block);
    }
    Ok(out)
}

fn read_patch_block(tokens: &mut Tokens) -> Result<RawPatch, String> {
    tokens
        .next_line()
        .ok_or_else(|| "missing name line".to_string())?;
    let degrees = tokens.numbers(2)?;
    let (p1, p2) = (degrees[0] as usize, degrees[1] as usize);
    let counts = tokens.numbers(2)?;
    let (n, m) = (counts[0] as usize, counts[1] as usize);
    let knots_x = tokens.numbers(p1 + n + 1)?;
    let knots_y = tokens.numbers(p2 + m + 1)?;
    let mut xyzw = Vec::with_capacity(4);
    for _ in 0..4 {
        let values = tokens.numbers(m * n)?;
        xyzw.push(DMatrix::from_row_slice(m, n, &values));
    }
    let xyzw: [DMatrix<f64>; 4] = xyzw
        .try_into()
        .map_err(|_| "expected four control point matrices".to_string())?;
    Ok(RawPatch {
        xyzw,
        knots_x,
        knots_y,
    })
}

/// Loads a geometry file and performs the Bezier extraction per patch.
pub fn load_dat(path: &Path) -> Result<Vec<Patch>, AppError> {
    read_raw_patches(path)?
        .iter()
        .map(|raw| Patch::new(&raw.xyzw, &raw.knots_x, &raw.knots_y))
        .collect()
}

/// Writes raw patches to a `.dat` file.
pub fn write_dat(path: &Path, patches: &[RawPatch]) -> Result<(), AppError> {
    let mut out = String::new();
    let _ = writeln!(out, "# nurbs mesh v.2.1");
    let _ = writeln!(out, "# {}", path.display());
    let _ = writeln!(out, "# Generated by isobem");
    let _ = writeln!(out, "#");
    let _ = writeln!(out, "2 3 {} 0 0", patches.len());
    for (patch_number, patch) in patches.iter().enumerate() {
        let n = patch.xyzw[0].ncols();
        let m = patch.xyzw[0].nrows();
        let p1 = patch.knots_x.len() - n - 1;
        let p2 = patch.knots_y.len() - m - 1;
        let _ = writeln!(out, "PATCH {}", patch_number);
        let _ = writeln!(out, "{} {}", p1, p2);
        let _ = writeln!(out, "{} {}", n, m);
        let _ = writeln!(out, "{}", join_numbers(&patch.knots_x));
        let _ = writeln!(out, "{}", join_numbers(&patch.knots_y));
        for component in &patch.xyzw {
            let mut row_major = Vec::with_capacity(m * n);
            for i in 0..m {
                for j in 0..n {
                    row_major.push(component[(i, j)]);
                }
            }
            let _ = writeln!(out, "{}", join_numbers(&row_major));
        }
    }
    std::fs::write(path, out)?;
    Ok(())
}

fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.15}", v))
        .collect::<Vec<_>>()
        .join("   ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    fn unit_screen() -> RawPatch {
        let x = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]);
        let y = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        let z = DMatrix::zeros(2, 2);
        let w = DMatrix::from_element(2, 2, 1.0);
        RawPatch {
            xyzw: [x, y, z, w],
            knots_x: vec![0.0, 0.0, 1.0, 1.0],
            knots_y: vec![0.0, 0.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.dat");
        write_dat(&path, &[unit_screen()]).unwrap();
        let patches = load_dat(&path).unwrap();
        assert_eq!(patches.len(), 1);
        let point = patches[0].eval(&Vector2::new(0.25, 0.75));
        assert!((point.x - 0.25).abs() < 1e-12);
        assert!((point.y - 0.75).abs() < 1e-12);
        assert!(point.z.abs() < 1e-12);
    }

    #[test]
    fn test_load_reports_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.dat");
        std::fs::write(&path, "# a\n# b\n# c\n#\n2 3 1 0 0\nPATCH 0\n1 1\n").unwrap();
        let result = load_dat(&path);
        assert!(matches!(result, Err(AppError::GeometryFile { .. })));
    }
}
