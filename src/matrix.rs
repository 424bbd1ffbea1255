//! Dense row-major `f32` matrices and their device wire layout.
//!
//! On the device a matrix travels as a flat `f32` buffer whose first two
//! elements encode `rows` and `cols` (as floats), followed by `rows * cols`
//! values in row-major order. [`Matrix::encode`] and [`Matrix::decode`] are
//! the only places that layout is spelled out.

use crate::error::PipelineError;

/// Number of header elements (`rows`, `cols`) preceding the payload in the
/// device layout.
pub const HEADER_ELEMS: usize = 2;

/// A dense 2-D matrix of `f32` values, stored row-major.
///
/// Both dimensions are always at least 1 and `data.len() == rows * cols`;
/// the constructors enforce this.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Creates a matrix from row-major data.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero or if `data.len() != rows * cols`.
    #[must_use]
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        assert!(rows >= 1 && cols >= 1, "matrix dimensions must be at least 1x1");
        assert_eq!(
            data.len(),
            rows * cols,
            "data length {} does not match shape {rows}x{cols}",
            data.len()
        );
        Self { rows, cols, data }
    }

    /// Creates a matrix from a slice of equal-length rows.
    ///
    /// # Panics
    ///
    /// Panics if `rows` is empty or the rows differ in length.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        assert!(!rows.is_empty(), "matrix must have at least one row");
        let cols = rows[0].len();
        let data: Vec<f32> = rows.iter().flat_map(|r| {
            assert_eq!(r.len(), cols, "all rows must have the same length");
            r.iter().copied()
        }).collect();
        Self::new(rows.len(), cols, data)
    }

    /// An all-zero matrix of the given shape.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, vec![0.0; rows * cols])
    }

    /// The `n`x`n` identity matrix.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major backing data.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// The value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        self.data[row * self.cols + col]
    }

    /// Shape of `self * other`, or `ShapeMismatch` if the inner dimensions
    /// disagree. This is the only validation `matmul` performs before
    /// touching the device.
    pub fn product_shape(&self, other: &Self) -> Result<(usize, usize), PipelineError> {
        if self.cols != other.rows {
            return Err(PipelineError::ShapeMismatch {
                a_cols: self.cols,
                b_rows: other.rows,
            });
        }
        Ok((self.rows, other.cols))
    }

    /// Serializes to the device layout: `[rows, cols, v0, v1, ...]`.
    #[must_use]
    pub fn encode(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(HEADER_ELEMS + self.data.len());
        flat.push(self.rows as f32);
        flat.push(self.cols as f32);
        flat.extend_from_slice(&self.data);
        flat
    }

    /// Deserializes from the device layout.
    ///
    /// Trailing elements beyond `rows * cols` are ignored: device buffers are
    /// rounded up to the kernel's minimum binding size, so a decoded staging
    /// buffer may carry zero padding after the payload.
    ///
    /// Returns `None` if the buffer is too short, the header does not encode
    /// two positive integral dimensions, or the claimed payload does not fit
    /// (including headers whose product overflows `usize`).
    #[must_use]
    pub fn decode(flat: &[f32]) -> Option<Self> {
        if flat.len() < HEADER_ELEMS {
            return None;
        }
        let rows = header_dim(flat[0])?;
        let cols = header_dim(flat[1])?;
        let len = rows.checked_mul(cols)?;
        let payload = &flat[HEADER_ELEMS..];
        if payload.len() < len {
            return None;
        }
        Some(Self::new(rows, cols, payload[..len].to_vec()))
    }
}

/// Interprets a header element as a dimension: finite, positive, integral.
fn header_dim(value: f32) -> Option<usize> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
        return None;
    }
    Some(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_shape_mismatch() {
        let result = std::panic::catch_unwind(|| {
            Matrix::new(2, 2, vec![1.0, 2.0, 3.0]);
        });
        assert!(result.is_err());
    }

    #[test]
    fn new_rejects_empty_dimensions() {
        let result = std::panic::catch_unwind(|| {
            Matrix::new(0, 3, vec![]);
        });
        assert!(result.is_err());
    }

    #[test]
    fn encode_prepends_size_header() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let flat = m.encode();
        assert_eq!(flat.len(), HEADER_ELEMS + 6);
        assert_eq!(&flat[..2], &[2.0, 3.0]);
        assert_eq!(&flat[2..], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn decode_inverts_encode() {
        let m = Matrix::from_rows(&[vec![1.5, -2.0], vec![0.0, 8.25]]);
        let back = Matrix::decode(&m.encode()).expect("decode failed");
        assert_eq!(back, m);
    }

    #[test]
    fn decode_rejects_malformed_buffers() {
        // too short for a header
        assert!(Matrix::decode(&[2.0]).is_none());
        // payload shorter than the header claims
        assert!(Matrix::decode(&[2.0, 2.0, 1.0, 2.0, 3.0]).is_none());
        // non-integral dimension
        assert!(Matrix::decode(&[1.5, 2.0, 1.0, 2.0, 3.0]).is_none());
        // zero dimension
        assert!(Matrix::decode(&[0.0, 2.0]).is_none());
        // NaN header
        assert!(Matrix::decode(&[f32::NAN, 1.0, 1.0]).is_none());
    }

    #[test]
    fn decode_rejects_overflowing_header() {
        // finite, integral dimensions whose product overflows usize
        assert!(Matrix::decode(&[1.0e10, 1.0e10]).is_none());
        assert!(Matrix::decode(&[1.0e30, 2.0, 1.0]).is_none());
    }

    #[test]
    fn decode_tolerates_trailing_padding() {
        // a 1x1 matrix read back from a buffer rounded up to 16 bytes
        let m = Matrix::decode(&[1.0, 1.0, 5.0, 0.0]).expect("decode failed");
        assert_eq!(m, Matrix::new(1, 1, vec![5.0]));
    }

    #[test]
    fn product_shape_checks_inner_dimension() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(4, 2);
        assert_eq!(
            a.product_shape(&b),
            Err(PipelineError::ShapeMismatch { a_cols: 3, b_rows: 4 })
        );

        let b = Matrix::zeros(3, 5);
        assert_eq!(a.product_shape(&b), Ok((2, 5)));
    }

    #[test]
    fn identity_has_unit_diagonal() {
        let i = Matrix::identity(3);
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert_eq!(i.get(r, c), expected);
            }
        }
    }
}
