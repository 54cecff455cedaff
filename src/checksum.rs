use camino::Utf8Path;

use crate::error::IcevelError;
use crate::tools::SliceReader;

/// One time slice of a gridded variable, row-major, with its fill value.
#[derive(Debug, Clone)]
pub struct GridSlice {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
    fill_value: f64,
}

impl GridSlice {
    pub fn new(
        values: Vec<f64>,
        rows: usize,
        cols: usize,
        fill_value: f64,
    ) -> Result<Self, IcevelError> {
        if values.len() != rows * cols {
            return Err(IcevelError::ArtifactRead(format!(
                "slice holds {} values, expected {rows}x{cols}",
                values.len()
            )));
        }
        Ok(Self {
            values,
            rows,
            cols,
            fill_value,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn is_valid(&self, row: usize, col: usize) -> bool {
        self.values[row * self.cols + col] != self.fill_value
    }
}

/// Fixed sub-rectangle of the grid, half-open on both axes.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Window {
    fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_start && row < self.row_end && col >= self.col_start && col < self.col_end
    }
}

/// Pixels close to the Jakobshavn terminus on the W69.10N grid. A void
/// here means the granule is useless as forcing even if the wider domain
/// decoded.
pub const TERMINUS_WINDOW: Window = Window {
    row_start: 373,
    row_end: 413,
    col_start: 387,
    col_end: 439,
};

/// Sum over all pixels of valid-mask times a synthetic coordinate weight
/// (row index + column index). Systematic decoding failures collapse this
/// toward zero.
pub fn full_domain_checksum(slice: &GridSlice) -> f64 {
    let mut sum = 0.0;
    for row in 0..slice.rows() {
        for col in 0..slice.cols() {
            if slice.is_valid(row, col) {
                sum += (row + col) as f64;
            }
        }
    }
    sum
}

/// Count of valid pixels inside `window`, clipped to the grid.
pub fn window_checksum(slice: &GridSlice, window: &Window) -> f64 {
    let mut count = 0.0;
    for row in 0..slice.rows() {
        for col in 0..slice.cols() {
            if window.contains(row, col) && slice.is_valid(row, col) {
                count += 1.0;
            }
        }
    }
    count
}

/// Reads the first time slice of a converted artifact through the
/// black-box tool contract.
pub fn read_first_slice<S: SliceReader>(
    reader: &S,
    path: &Utf8Path,
    parameter: &str,
    fill_value: f64,
) -> Result<GridSlice, IcevelError> {
    let (rows, cols) = reader.grid_shape(path)?;
    let values = reader.first_slice(path, parameter)?;
    GridSlice::new(values, rows, cols, fill_value)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const FILL: f64 = -2.0e9;

    #[test]
    fn rejects_shape_mismatch() {
        let err = GridSlice::new(vec![0.0; 5], 2, 3, FILL).unwrap_err();
        assert_matches!(err, IcevelError::ArtifactRead(_));
    }

    #[test]
    fn full_domain_weights_by_coordinates() {
        // 2x2 grid, all valid: weights are 0, 1, 1, 2.
        let slice = GridSlice::new(vec![1.0, 1.0, 1.0, 1.0], 2, 2, FILL).unwrap();
        assert_eq!(full_domain_checksum(&slice), 4.0);
    }

    #[test]
    fn full_domain_ignores_fill_pixels() {
        let slice = GridSlice::new(vec![FILL, 1.0, 1.0, FILL], 2, 2, FILL).unwrap();
        // Only (0,1) and (1,0) count, each weighted 1.
        assert_eq!(full_domain_checksum(&slice), 2.0);
    }

    #[test]
    fn all_fill_slice_checksums_to_zero() {
        let slice = GridSlice::new(vec![FILL; 9], 3, 3, FILL).unwrap();
        assert_eq!(full_domain_checksum(&slice), 0.0);
        assert_eq!(window_checksum(&slice, &TERMINUS_WINDOW), 0.0);
    }

    #[test]
    fn window_counts_valid_pixels_inside_only() {
        let window = Window {
            row_start: 1,
            row_end: 3,
            col_start: 1,
            col_end: 3,
        };
        let mut values = vec![1.0; 16];
        values[1 * 4 + 1] = FILL;
        let slice = GridSlice::new(values, 4, 4, FILL).unwrap();
        // 2x2 window with one fill pixel inside.
        assert_eq!(window_checksum(&slice, &window), 3.0);
    }

    #[test]
    fn window_is_clipped_to_small_grids() {
        let slice = GridSlice::new(vec![1.0; 4], 2, 2, FILL).unwrap();
        assert_eq!(window_checksum(&slice, &TERMINUS_WINDOW), 0.0);
    }
}
