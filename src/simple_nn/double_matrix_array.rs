use std::{
    fmt,
    io::{Read, Write},
};

use rand::Rng;
use tracing::debug;

use super::double_matrix::DoubleMatrix;
use crate::{
    error::{HeError, HeResult},
    hebase::{
        bin_io,
        he_context::{counted_load, counted_save},
    },
};

/// A batch of equally shaped matrices, viewed as a `[rows][cols][depth]`
/// tensor. The depth index is the batch index, and is what a
/// [`CipherMatrix`](super::CipherMatrix) packs into slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoubleMatrixArray {
    mats: Vec<DoubleMatrix>,
}

impl DoubleMatrixArray {
    /// `depth` zero matrices of `rows x cols`.
    pub fn new(rows: usize, cols: usize, depth: usize) -> Self {
        Self::from_matrix(depth, &DoubleMatrix::new(rows, cols))
    }

    /// `depth` copies of `matrix`.
    pub fn from_matrix(depth: usize, matrix: &DoubleMatrix) -> Self {
        Self {
            mats: vec![matrix.clone(); depth],
        }
    }

    /// Builds the array from a `[rows][cols][depth]` tensor.
    pub fn from_tensor(tensor: &[Vec<Vec<f64>>]) -> HeResult<Self> {
        let rows = tensor.len();
        let cols = tensor.first().map_or(0, Vec::len);
        let depth = tensor
            .first()
            .and_then(|row| row.first())
            .map_or(0, Vec::len);
        let mut res = Self::new(rows, cols, depth);
        for (i, row) in tensor.iter().enumerate() {
            if row.len() != cols {
                return Err(HeError::dimensions(format!(
                    "tensor row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            for (j, cell) in row.iter().enumerate() {
                if cell.len() != depth {
                    return Err(HeError::dimensions(format!(
                        "tensor cell ({i}, {j}) has depth {}, expected {depth}",
                        cell.len()
                    )));
                }
                res.set_in_all_depth(i, j, cell);
            }
        }
        Ok(res)
    }

    pub fn to_tensor(&self) -> Vec<Vec<Vec<f64>>> {
        (0..self.rows())
            .map(|i| (0..self.cols()).map(|j| self.get_in_all_depth(i, j)).collect())
            .collect()
    }

    /// Matrices of uniform values in `[-1, 1) / rows`, drawn independently.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, depth: usize, rng: &mut R) -> Self {
        let mut res = Self::new(rows, cols, depth);
        res.init_random(rng);
        res
    }

    pub fn init_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for mat in &mut self.mats {
            mat.init_random(rng);
        }
    }

    /// One random matrix repeated along the depth.
    pub fn init_random_same<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(first) = self.mats.first_mut() {
            first.init_random(rng);
            let first = first.clone();
            self.mats.fill(first);
        }
    }

    pub fn init_const(&mut self, value: f64) {
        for mat in &mut self.mats {
            mat.init_const(value);
        }
    }

    pub fn depth(&self) -> usize {
        self.mats.len()
    }

    pub fn rows(&self) -> usize {
        self.mats.first().map_or(0, DoubleMatrix::rows)
    }

    pub fn cols(&self) -> usize {
        self.mats.first().map_or(0, DoubleMatrix::cols)
    }

    pub fn is_empty(&self) -> bool {
        self.mats.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `k >= depth()`.
    pub fn mat(&self, k: usize) -> &DoubleMatrix {
        &self.mats[k]
    }

    /// # Panics
    ///
    /// Panics if `k >= depth()`.
    pub fn mat_mut(&mut self, k: usize) -> &mut DoubleMatrix {
        &mut self.mats[k]
    }

    pub fn matrices(&self) -> &[DoubleMatrix] {
        &self.mats
    }

    /// Element `(i, j)` of every matrix.
    pub fn get_in_all_depth(&self, i: usize, j: usize) -> Vec<f64> {
        self.mats.iter().map(|m| m.get(i, j)).collect()
    }

    /// Sets element `(i, j)` of matrix `k` to `values[k]`.
    pub fn set_in_all_depth(&mut self, i: usize, j: usize, values: &[f64]) {
        for (mat, &v) in self.mats.iter_mut().zip(values) {
            mat.set(i, j, v);
        }
    }

    pub fn same_depth(&self, other: &Self) -> bool {
        self.depth() == other.depth()
    }

    pub fn same_dims(&self, other: &Self) -> bool {
        self.rows() == other.rows() && self.cols() == other.cols()
    }

    fn require_same_depth(&self, op: &str, other: &Self) -> HeResult<()> {
        if !self.same_depth(other) {
            return Err(HeError::dimensions(format!(
                "{op}: depth {} vs {}",
                self.depth(),
                other.depth()
            )));
        }
        Ok(())
    }

    fn zip_each(
        &mut self,
        op: &str,
        other: &Self,
        f: impl Fn(&mut DoubleMatrix, &DoubleMatrix) -> HeResult<()>,
    ) -> HeResult<()> {
        self.require_same_depth(op, other)?;
        self.mats.iter_mut().zip(&other.mats).try_for_each(|(a, b)| f(a, b))
    }

    fn map_each(&self, f: impl Fn(&DoubleMatrix) -> HeResult<DoubleMatrix>) -> HeResult<Self> {
        Ok(Self {
            mats: self.mats.iter().map(f).collect::<HeResult<_>>()?,
        })
    }

    pub fn add(&mut self, other: &Self) -> HeResult<()> {
        self.zip_each("add", other, DoubleMatrix::add)
    }

    pub fn sub(&mut self, other: &Self) -> HeResult<()> {
        self.zip_each("sub", other, DoubleMatrix::sub)
    }

    pub fn element_multiply(&mut self, other: &Self) -> HeResult<()> {
        self.zip_each("element_multiply", other, DoubleMatrix::element_multiply)
    }

    /// Adds `other` to every matrix at block offset `(row, col)`.
    pub fn add_at(&mut self, other: &Self, row: usize, col: usize) -> HeResult<()> {
        self.zip_each("add_at", other, |a, b| a.add_at(b, row, col))
    }

    pub fn multiply_by_scalar(&mut self, scalar: f64) {
        for mat in &mut self.mats {
            mat.multiply_by_scalar(scalar);
        }
    }

    pub fn square(&mut self) {
        for mat in &mut self.mats {
            mat.square();
        }
    }

    /// Multiplies matrix `k` of `self` by matrix `k` of `other`.
    pub fn matmul(&self, other: &Self) -> HeResult<Self> {
        self.require_same_depth("matmul", other)?;
        Ok(Self {
            mats: self
                .mats
                .iter()
                .zip(&other.mats)
                .map(|(a, b)| a.matmul(b))
                .collect::<HeResult<_>>()?,
        })
    }

    pub fn transposed(&self) -> Self {
        Self {
            mats: self.mats.iter().map(DoubleMatrix::transposed).collect(),
        }
    }

    pub fn transpose(&mut self) {
        *self = self.transposed();
    }

    pub fn sum_along_rows(&self) -> HeResult<Self> {
        self.map_each(DoubleMatrix::sum_along_rows)
    }

    pub fn sum_along_cols(&self) -> HeResult<Self> {
        self.map_each(DoubleMatrix::sum_along_cols)
    }

    pub fn mean_along_rows(&self) -> HeResult<Self> {
        self.map_each(DoubleMatrix::mean_along_rows)
    }

    pub fn mean_along_cols(&self) -> HeResult<Self> {
        self.map_each(DoubleMatrix::mean_along_cols)
    }

    /// A depth-1 array holding the sum of all matrices.
    pub fn sum_in_depth(&self) -> HeResult<Self> {
        let Some((first, rest)) = self.mats.split_first() else {
            return Ok(Self::default());
        };
        let mut sum = first.clone();
        for mat in rest {
            sum.add(mat)?;
        }
        Ok(Self { mats: vec![sum] })
    }

    pub fn mean_in_depth(&self) -> HeResult<Self> {
        let mut res = self.sum_in_depth()?;
        res.multiply_by_scalar(1.0 / self.depth().max(1) as f64);
        Ok(res)
    }

    /// Replaces every element with its sum along the depth.
    pub fn inner_sum(&mut self) -> HeResult<()> {
        let Some(sum) = self.sum_in_depth()?.mats.pop() else {
            return Ok(());
        };
        self.mats.fill(sum);
        Ok(())
    }

    /// The block `(row1, col1)..(row2, col2)` of every matrix.
    pub fn sub_matrix(&self, row1: usize, col1: usize, row2: usize, col2: usize) -> HeResult<Self> {
        self.map_each(|m| m.sub_matrix(row1, col1, row2, col2))
    }

    pub fn column(&self, col: usize) -> HeResult<Self> {
        self.sub_matrix(0, col, self.rows(), col + 1)
    }

    /// Matrices `start..end`.
    pub fn depth_slice(&self, start: usize, end: usize) -> HeResult<Self> {
        if start > end || end > self.depth() {
            return Err(HeError::dimensions(format!(
                "depth slice {start}..{end} out of {}",
                self.depth()
            )));
        }
        Ok(Self {
            mats: self.mats[start..end].to_vec(),
        })
    }

    /// Appends `other` to the right of every matrix. An empty array adopts
    /// `other`.
    pub fn append_cols(&mut self, other: &Self) -> HeResult<()> {
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        self.zip_each("append_cols", other, DoubleMatrix::append_cols)
    }

    /// Appends `other` below every matrix. An empty array adopts `other`.
    pub fn append_rows(&mut self, other: &Self) -> HeResult<()> {
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        self.zip_each("append_rows", other, DoubleMatrix::append_rows)
    }

    /// Adds one more matrix at the end of the depth.
    pub fn push_matrix(&mut self, mat: DoubleMatrix) -> HeResult<()> {
        if let Some(first) = self.mats.first() {
            if !first.same_shape(&mat) {
                return Err(HeError::dimensions(format!(
                    "cannot push a {}x{} matrix onto {}x{}",
                    mat.rows(),
                    mat.cols(),
                    first.rows(),
                    first.cols()
                )));
            }
        }
        self.mats.push(mat);
        Ok(())
    }

    /// Maximal relative difference to `other` (see
    /// [`DoubleMatrix::max_rel_diff`]). Fails with
    /// [`HeError::AssertEqualsFailed`] when it exceeds `eps`.
    pub fn test_equals(&self, title: &str, other: &Self, eps: f64) -> HeResult<f64> {
        if !self.same_depth(other) || !self.same_dims(other) {
            return Err(HeError::AssertEqualsFailed {
                title: title.to_string(),
                message: format!("shape {self} vs {other}"),
            });
        }
        let mut max_diff: f64 = 0.0;
        for (k, (a, b)) in self.mats.iter().zip(&other.mats).enumerate() {
            let diff = a.max_rel_diff(b, eps)?;
            if diff > eps {
                return Err(HeError::AssertEqualsFailed {
                    title: title.to_string(),
                    message: format!("matrix {k}: rel-diff {diff} exceeds {eps}"),
                });
            }
            max_diff = max_diff.max(diff);
        }
        debug!(title, max_diff, depth = self.depth(), "arrays equal");
        Ok(max_diff)
    }

    /// `true` when shapes match and every element differs by less than `eps`.
    pub fn check_if_equal(&self, other: &Self, eps: f64) -> bool {
        self.same_depth(other)
            && self
                .mats
                .iter()
                .zip(&other.mats)
                .all(|(a, b)| a.check_if_equal(b, eps))
    }

    /// The depth as `i32`, then each matrix.
    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            bin_io::write_len(out, self.mats.len())?;
            for mat in &self.mats {
                mat.save(out)?;
            }
            Ok(())
        })
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut mats = Vec::new();
        let read = counted_load(input, |input| {
            let depth = bin_io::read_len(input)?;
            for _ in 0..depth {
                let mut mat = DoubleMatrix::default();
                mat.load(input)?;
                mats.push(mat);
            }
            Ok(())
        })?;
        self.mats = mats;
        Ok(read)
    }
}

impl fmt::Display for DoubleMatrixArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Empty");
        }
        write!(f, "[{}]: {} x {}", self.depth(), self.rows(), self.cols())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn hotel(rows: usize, cols: usize, depth: usize) -> DoubleMatrixArray {
        let tensor: Vec<Vec<Vec<f64>>> = (0..rows)
            .map(|i| {
                (0..cols)
                    .map(|j| (0..depth).map(|k| (i * 100 + j * 10 + k) as f64).collect())
                    .collect()
            })
            .collect();
        DoubleMatrixArray::from_tensor(&tensor).unwrap()
    }

    #[test]
    fn tensor_layout_is_rows_cols_depth() {
        let a = hotel(2, 3, 4);
        assert_eq!((a.rows(), a.cols(), a.depth()), (2, 3, 4));
        assert_eq!(a.mat(3).get(1, 2), 123.0);
        assert_eq!(a.to_tensor()[1][0], vec![100.0, 101.0, 102.0, 103.0]);

        let ragged = vec![vec![vec![1.0, 2.0]], vec![vec![3.0]]];
        assert!(DoubleMatrixArray::from_tensor(&ragged).is_err());
    }

    #[test]
    fn batched_matmul_multiplies_per_depth() {
        let a = hotel(2, 3, 2);
        let b = hotel(3, 1, 2);
        let c = a.matmul(&b).unwrap();
        for k in 0..2 {
            assert_eq!(c.mat(k), &a.mat(k).matmul(b.mat(k)).unwrap());
        }
        assert!(a.matmul(&hotel(3, 1, 3)).is_err());
    }

    #[test]
    fn depth_reductions() {
        let mut a = hotel(1, 2, 3);
        let sum = a.sum_in_depth().unwrap();
        assert_eq!(sum.depth(), 1);
        assert_eq!(sum.mat(0).as_slice(), &[3.0, 33.0]);
        assert_eq!(a.mean_in_depth().unwrap().mat(0).as_slice(), &[1.0, 11.0]);

        a.inner_sum().unwrap();
        assert_eq!(a.get_in_all_depth(0, 1), vec![33.0; 3]);
    }

    #[test]
    fn slicing_and_growing() {
        let a = hotel(3, 3, 2);
        let col = a.column(1).unwrap();
        assert_eq!(col.get_in_all_depth(2, 0), vec![210.0, 211.0]);
        assert_eq!(a.depth_slice(1, 2).unwrap().mat(0), a.mat(1));
        assert!(a.depth_slice(1, 3).is_err());

        let mut grown = DoubleMatrixArray::default();
        grown.append_cols(&col).unwrap();
        grown.append_cols(&col).unwrap();
        assert_eq!((grown.rows(), grown.cols()), (3, 2));

        let mut pushed = col.clone();
        pushed.push_matrix(DoubleMatrix::new(3, 1)).unwrap();
        assert_eq!(pushed.depth(), 3);
        assert!(pushed.push_matrix(DoubleMatrix::new(1, 3)).is_err());
    }

    #[test]
    fn test_equals_reports_relative_difference() {
        let a = hotel(2, 2, 2);
        let mut b = a.clone();
        b.multiply_by_scalar(1.0 + 1e-4);
        let diff = a.test_equals("scaled", &b, 1e-3).unwrap();
        assert_abs_diff_eq!(diff, 1e-4, epsilon = 1e-6);
        assert!(matches!(
            a.test_equals("scaled", &b, 1e-5),
            Err(HeError::AssertEqualsFailed { .. })
        ));
        assert!(!a.check_if_equal(&b, 1e-3));
    }

    #[test]
    fn random_same_repeats_first_matrix() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let mut a = DoubleMatrixArray::new(2, 2, 3);
        a.init_random_same(&mut rng);
        assert_eq!(a.mat(0), a.mat(2));

        let mut buf = Vec::new();
        a.save(&mut buf).unwrap();
        let mut b = DoubleMatrixArray::default();
        let read = b.load(&mut buf.as_slice()).unwrap();
        assert_eq!(read as usize, buf.len());
        assert_eq!(a, b);
    }
}
