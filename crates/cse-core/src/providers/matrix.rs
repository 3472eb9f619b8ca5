//! Plain-text numeric matrices and nearest-neighbour resampling.
//!
//! Label maps and attribution maps are exchanged as delimited text: one row
//! per line, values separated by commas and/or whitespace. Blank lines and
//! lines starting with `#` are ignored.

use ndarray::Array2;
use std::path::Path;
use std::str::FromStr;

/// Parse a rectangular matrix from delimited text.
pub fn parse_matrix<T>(content: &str) -> Result<Array2<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let mut values = Vec::new();
    let mut width: Option<usize> = None;
    let mut rows = 0;

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let before = values.len();
        for field in line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
        {
            let value = field
                .parse::<T>()
                .map_err(|e| format!("line {}: '{field}': {e}", line_no + 1))?;
            values.push(value);
        }
        let row_len = values.len() - before;
        if row_len == 0 {
            return Err(format!("line {}: row has no values", line_no + 1));
        }
        match width {
            None => width = Some(row_len),
            Some(w) if w != row_len => {
                return Err(format!(
                    "line {}: expected {w} values, found {row_len}",
                    line_no + 1
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let width = width.ok_or_else(|| "matrix is empty".to_string())?;
    Array2::from_shape_vec((rows, width), values).map_err(|e| e.to_string())
}

/// Read and parse a matrix file.
pub fn read_matrix<T>(path: &Path) -> Result<Array2<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    parse_matrix(&content)
}

/// Resample to `(height, width)` by nearest neighbour.
///
/// Used for label maps, where interpolating between labels is meaningless.
/// An empty source has nothing to sample and is returned unchanged.
pub fn resize_nearest<T: Clone>(source: &Array2<T>, shape: (usize, usize)) -> Array2<T> {
    let (src_h, src_w) = source.dim();
    if (src_h, src_w) == shape || source.is_empty() {
        return source.clone();
    }
    let (h, w) = shape;
    Array2::from_shape_fn((h, w), |(y, x)| {
        let sy = (y * src_h / h).min(src_h - 1);
        let sx = (x * src_w / w).min(src_w - 1);
        source[[sy, sx]].clone()
    })
}
