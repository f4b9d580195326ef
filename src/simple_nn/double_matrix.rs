use std::{
    fmt,
    io::{Read, Write},
};

use rand::Rng;

use crate::{
    error::{HeError, HeResult},
    hebase::{
        bin_io,
        he_context::{counted_load, counted_save},
    },
};

/// A dense row-major matrix of `f64`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoubleMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DoubleMatrix {
    /// A `rows x cols` matrix of zeros.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Builds a matrix from its rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> HeResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(HeError::dimensions(format!(
                "row {bad} has {} values, expected {cols}",
                rows[bad].len()
            )));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.concat(),
        })
    }

    /// Lays `values` out row by row over `rows` rows, padding the last row
    /// with zeros.
    pub fn from_flat(values: &[f64], rows: usize) -> HeResult<Self> {
        if rows == 0 {
            return Err(HeError::invalid("a matrix needs at least one row"));
        }
        let cols = values.len().div_ceil(rows);
        let mut data = values.to_vec();
        data.resize(rows * cols, 0.0);
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `(i, j)` is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.rows && j < self.cols, "({i}, {j}) out of bounds");
        self.data[i * self.cols + j]
    }

    /// # Panics
    ///
    /// Panics if `(i, j)` is out of bounds.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.rows && j < self.cols, "({i}, {j}) out of bounds");
        self.data[i * self.cols + j] = value;
    }

    /// The elements in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(<[f64]>::to_vec).collect()
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    fn require_same_shape(&self, op: &str, other: &Self) -> HeResult<()> {
        if !self.same_shape(other) {
            return Err(HeError::dimensions(format!(
                "{op}: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(())
    }

    fn zip_assign(&mut self, op: &str, other: &Self, f: impl Fn(f64, f64) -> f64) -> HeResult<()> {
        self.require_same_shape(op, other)?;
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a = f(*a, b);
        }
        Ok(())
    }

    pub fn add(&mut self, other: &Self) -> HeResult<()> {
        self.zip_assign("add", other, |a, b| a + b)
    }

    pub fn sub(&mut self, other: &Self) -> HeResult<()> {
        self.zip_assign("sub", other, |a, b| a - b)
    }

    pub fn element_multiply(&mut self, other: &Self) -> HeResult<()> {
        self.zip_assign("element_multiply", other, |a, b| a * b)
    }

    pub fn multiply_by_scalar(&mut self, scalar: f64) {
        self.data.iter_mut().for_each(|v| *v *= scalar);
    }

    pub fn square(&mut self) {
        self.data.iter_mut().for_each(|v| *v *= *v);
    }

    /// Adds `other` to the block starting at `(row, col)`.
    pub fn add_at(&mut self, other: &Self, row: usize, col: usize) -> HeResult<()> {
        if row + other.rows > self.rows || col + other.cols > self.cols {
            return Err(HeError::dimensions(format!(
                "a {}x{} block at ({row}, {col}) does not fit in {}x{}",
                other.rows, other.cols, self.rows, self.cols
            )));
        }
        for i in 0..other.rows {
            for j in 0..other.cols {
                self.data[(row + i) * self.cols + col + j] += other.get(i, j);
            }
        }
        Ok(())
    }

    pub fn matmul(&self, other: &Self) -> HeResult<Self> {
        if self.cols != other.rows {
            return Err(HeError::dimensions(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut res = Self::new(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                for j in 0..other.cols {
                    res.data[i * other.cols + j] += a * other.get(k, j);
                }
            }
        }
        Ok(res)
    }

    pub fn transposed(&self) -> Self {
        let mut res = Self::new(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.set(j, i, self.get(i, j));
            }
        }
        res
    }

    pub fn transpose(&mut self) {
        *self = self.transposed();
    }

    /// Column sums as a `1 x cols` matrix.
    pub fn sum_along_rows(&self) -> HeResult<Self> {
        if self.rows == 0 {
            return Err(HeError::invalid("empty matrix"));
        }
        let mut res = Self::new(1, self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j] += self.get(i, j);
            }
        }
        Ok(res)
    }

    /// Row sums as a `rows x 1` matrix.
    pub fn sum_along_cols(&self) -> HeResult<Self> {
        if self.cols == 0 {
            return Err(HeError::invalid("empty matrix"));
        }
        let data = self.to_rows().iter().map(|r| r.iter().sum()).collect();
        Ok(Self {
            rows: self.rows,
            cols: 1,
            data,
        })
    }

    pub fn mean_along_rows(&self) -> HeResult<Self> {
        let mut res = self.sum_along_rows()?;
        res.multiply_by_scalar(1.0 / self.rows as f64);
        Ok(res)
    }

    pub fn mean_along_cols(&self) -> HeResult<Self> {
        let mut res = self.sum_along_cols()?;
        res.multiply_by_scalar(1.0 / self.cols as f64);
        Ok(res)
    }

    /// The block of rows `row1..row2` and columns `col1..col2`.
    pub fn sub_matrix(&self, row1: usize, col1: usize, row2: usize, col2: usize) -> HeResult<Self> {
        if row1 >= row2 || row2 > self.rows || col1 >= col2 || col2 > self.cols {
            return Err(HeError::dimensions(format!(
                "range ({row1},{col1})-({row2},{col2}) out of {}x{}",
                self.rows, self.cols
            )));
        }
        let mut res = Self::new(row2 - row1, col2 - col1);
        for i in row1..row2 {
            for j in col1..col2 {
                res.set(i - row1, j - col1, self.get(i, j));
            }
        }
        Ok(res)
    }

    /// Appends `other` to the right. An empty matrix takes `other`'s shape.
    pub fn append_cols(&mut self, other: &Self) -> HeResult<()> {
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if other.rows != self.rows {
            return Err(HeError::dimensions(format!(
                "cannot append {} rows to {} rows",
                other.rows, self.rows
            )));
        }
        let mut res = Self::new(self.rows, self.cols + other.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.set(i, j, self.get(i, j));
            }
            for j in 0..other.cols {
                res.set(i, self.cols + j, other.get(i, j));
            }
        }
        *self = res;
        Ok(())
    }

    /// Appends `other` below. An empty matrix takes `other`'s shape.
    pub fn append_rows(&mut self, other: &Self) -> HeResult<()> {
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if other.cols != self.cols {
            return Err(HeError::dimensions(format!(
                "cannot append {} columns to {} columns",
                other.cols, self.cols
            )));
        }
        self.rows += other.rows;
        self.data.extend_from_slice(&other.data);
        Ok(())
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |m, v| m.max(v.abs()))
    }

    pub fn max_diff(&self, other: &Self) -> HeResult<f64> {
        self.require_same_shape("max_diff", other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .fold(0.0, |m, (a, b)| m.max((a - b).abs())))
    }

    /// Largest relative difference, measured absolutely for elements whose
    /// magnitude is below `10 * tolerance`.
    pub fn max_rel_diff(&self, other: &Self, tolerance: f64) -> HeResult<f64> {
        self.require_same_shape("max_rel_diff", other)?;
        Ok(self.data.iter().zip(&other.data).fold(0.0, |m, (&a, &b)| {
            let diff = (a - b).abs();
            let magnitude = a.abs().max(b.abs());
            let rel = if magnitude < tolerance * 10.0 {
                diff
            } else {
                diff / magnitude
            };
            m.max(rel)
        }))
    }

    /// `true` when the shapes match and every element differs by less than
    /// `tolerance`.
    pub fn check_if_equal(&self, other: &Self, tolerance: f64) -> bool {
        self.max_diff(other).is_ok_and(|d| d < tolerance)
    }

    /// Uniform values in `[-1, 1) / rows`.
    pub fn init_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let scale = 1.0 / self.rows.max(1) as f64;
        for v in &mut self.data {
            *v = rng.random_range(-1.0..1.0) * scale;
        }
    }

    pub fn init_const(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Index of the largest element of a row or column vector.
    pub fn argmax(&self) -> HeResult<usize> {
        if self.is_empty() {
            return Err(HeError::invalid("empty matrix"));
        }
        if self.rows > 1 && self.cols > 1 {
            return Err(HeError::invalid("argmax needs a 1xn or nx1 matrix"));
        }
        let mut best = 0;
        for (i, &v) in self.data.iter().enumerate() {
            if v >= self.data[best] {
                best = i;
            }
        }
        Ok(best)
    }

    /// `rows` and `cols` as `i32`, then the elements row by row.
    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            bin_io::write_len(out, self.rows)?;
            bin_io::write_len(out, self.cols)?;
            for &v in &self.data {
                bin_io::write_f64(out, v)?;
            }
            Ok(())
        })
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut loaded = Self::default();
        let read = counted_load(input, |input| {
            let rows = bin_io::read_len(input)?;
            let cols = bin_io::read_len(input)?;
            let len = rows
                .checked_mul(cols)
                .filter(|&n| n <= bin_io::MAX_LENGTH)
                .ok_or_else(|| HeError::corrupt(format!("matrix of {rows}x{cols}")))?;
            let data = (0..len)
                .map(|_| bin_io::read_f64(input))
                .collect::<Result<_, _>>()?;
            loaded = Self { rows, cols, data };
            Ok(())
        })?;
        *self = loaded;
        Ok(read)
    }
}

impl fmt::Display for DoubleMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {} x {}", self.rows, self.cols)?;
        for row in self.to_rows() {
            for v in row {
                write!(f, "{v:>9.3}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn m(rows: &[&[f64]]) -> DoubleMatrix {
        DoubleMatrix::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn matmul_and_transpose() {
        let a = m(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let b = a.transposed();
        assert_eq!(b.rows(), 3);
        assert_eq!(a.matmul(&b).unwrap(), m(&[&[14.0, 32.0], &[32.0, 77.0]]));
        assert!(a.matmul(&a).is_err());
    }

    #[test]
    fn sums_and_means() {
        let a = m(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]);
        assert_eq!(a.sum_along_rows().unwrap(), m(&[&[9.0, 12.0]]));
        assert_eq!(a.sum_along_cols().unwrap(), m(&[&[3.0], &[7.0], &[11.0]]));
        assert_eq!(a.mean_along_rows().unwrap(), m(&[&[3.0, 4.0]]));
        assert_eq!(a.mean_along_cols().unwrap(), m(&[&[1.5], &[3.5], &[5.5]]));
    }

    #[test]
    fn slicing_and_appending() {
        let a = m(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let block = a.sub_matrix(0, 1, 2, 3).unwrap();
        assert_eq!(block, m(&[&[2.0, 3.0], &[5.0, 6.0]]));
        assert!(a.sub_matrix(1, 1, 1, 2).is_err());

        let mut grown = DoubleMatrix::default();
        grown.append_rows(&block).unwrap();
        grown.append_cols(&m(&[&[7.0], &[8.0]])).unwrap();
        assert_eq!(grown, m(&[&[2.0, 3.0, 7.0], &[5.0, 6.0, 8.0]]));
        assert!(grown.append_rows(&block).is_err());
    }

    #[test]
    fn relative_difference_switches_to_absolute_near_zero() {
        let a = m(&[&[100.0, 1e-8]]);
        let b = m(&[&[101.0, 2e-8]]);
        let rel = a.max_rel_diff(&b, 1e-6).unwrap();
        assert_abs_diff_eq!(rel, 1.0 / 101.0, epsilon = 1e-12);
        assert!(!a.check_if_equal(&b, 0.5));
        assert!(a.check_if_equal(&b, 1.5));
    }

    #[test]
    fn random_values_are_bounded_and_persist() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut a = DoubleMatrix::new(4, 5);
        a.init_random(&mut rng);
        assert!(a.max_abs() <= 0.25);

        let mut buf = Vec::new();
        let written = a.save(&mut buf).unwrap();
        assert_eq!(written as usize, buf.len());
        let mut b = DoubleMatrix::default();
        b.load(&mut buf.as_slice()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn flat_layout_pads_last_row() {
        let a = DoubleMatrix::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert_eq!(a, m(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 0.0]]));
        assert!(a.argmax().is_err());
    }
}
