use std::io::{Read, Write};

use rand::Rng;
use tracing::debug;

use super::{
    cipher_matrix::CipherMatrix, cipher_matrix_encoder::CipherMatrixEncoder,
    double_matrix_array::DoubleMatrixArray,
};
use crate::{
    error::{HeError, HeResult},
    hebase::{
        HeContext,
        he_context::{counted_load, counted_save},
    },
};

/// Fully connected layer on clear data: `W x + b`, batched along the depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleFcPlainLayer {
    name: String,
    weights: DoubleMatrixArray,
    bias: DoubleMatrixArray,
}

impl SimpleFcPlainLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weights(&self) -> &DoubleMatrixArray {
        &self.weights
    }

    pub fn bias(&self) -> &DoubleMatrixArray {
        &self.bias
    }

    /// Zero weights of `rows x cols` and a `rows x 1` bias, repeated
    /// `filled_slots` times along the depth.
    pub fn init_size(&mut self, rows: usize, cols: usize, filled_slots: usize) {
        self.weights = DoubleMatrixArray::new(rows, cols, filled_slots);
        self.bias = DoubleMatrixArray::new(rows, 1, filled_slots);
    }

    /// Replaces the weights and bias. Both must have the same depth, and
    /// the bias must be a column with one entry per weight row.
    pub fn set_parameters(&mut self, weights: DoubleMatrixArray, bias: DoubleMatrixArray) -> HeResult<()> {
        if weights.depth() != bias.depth() || bias.rows() != weights.rows() || bias.cols() != 1 {
            return Err(HeError::dimensions(format!(
                "weights {weights} do not match bias {bias}"
            )));
        }
        self.weights = weights;
        self.bias = bias;
        Ok(())
    }

    /// The same random weights and bias in every depth.
    pub fn init_weights_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.weights.init_random_same(rng);
        self.bias.init_random_same(rng);
    }

    /// Every weight set to `c / cols`, so a constant input of `x` yields
    /// `c * x` before the bias.
    pub fn init_weights_const(&mut self, c: f64) {
        let cols = self.weights.cols().max(1) as f64;
        self.weights.init_const(c / cols);
    }

    /// A `1 x n` input is treated as the column it stands for.
    pub fn forward(&self, input: &DoubleMatrixArray) -> HeResult<DoubleMatrixArray> {
        let mut res = if input.rows() == 1 && input.cols() > 1 {
            self.weights.matmul(&input.transposed())?
        } else {
            self.weights.matmul(input)?
        };
        res.add(&self.bias)?;
        Ok(res)
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            self.weights.save(out)?;
            self.bias.save(out)?;
            Ok(())
        })
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut weights = DoubleMatrixArray::default();
        let mut bias = DoubleMatrixArray::default();
        let read = counted_load(input, |input| {
            weights.load(input)?;
            bias.load(input)?;
            Ok(())
        })?;
        self.set_parameters(weights, bias)?;
        Ok(read)
    }
}

/// Element-wise square on clear data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareActivationPlainLayer;

impl SquareActivationPlainLayer {
    pub fn forward(&self, input: &DoubleMatrixArray) -> DoubleMatrixArray {
        let mut res = input.clone();
        res.square();
        res
    }
}

/// Element-wise square on encrypted data. Consumes one chain index.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareActivationLayer;

impl SquareActivationLayer {
    pub fn forward(&self, input: &CipherMatrix) -> HeResult<CipherMatrix> {
        input.squared()
    }
}

/// Encrypted fully connected layer.
///
/// The weights sit at the base chain index and the bias one below it, which
/// is where the product lands after its rescale.
#[derive(Debug, Clone)]
pub struct SimpleFcLayer {
    name: String,
    weights: CipherMatrix,
    bias: CipherMatrix,
}

impl SimpleFcLayer {
    pub fn new(he: &dyn HeContext, name: impl Into<String>) -> HeResult<Self> {
        Ok(Self {
            name: name.into(),
            weights: CipherMatrix::new(he)?,
            bias: CipherMatrix::new(he)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weights(&self) -> &CipherMatrix {
        &self.weights
    }

    pub fn bias(&self) -> &CipherMatrix {
        &self.bias
    }

    /// Encrypts `layer` with the weights at `base_chain_index` (`-1` for the
    /// top) and the bias one chain index lower.
    pub fn init_from_layer(
        &mut self,
        he: &dyn HeContext,
        layer: &SimpleFcPlainLayer,
        base_chain_index: i32,
    ) -> HeResult<()> {
        let base = resolve_base_chain_index(he, base_chain_index, 1)?;
        let encoder = CipherMatrixEncoder::new(he)?;
        encoder.encode_encrypt(&mut self.weights, layer.weights(), base)?;
        encoder.encode_encrypt(&mut self.bias, layer.bias(), base - 1)?;
        debug!(
            layer = %self.name,
            rows = layer.weights().rows(),
            cols = layer.weights().cols(),
            chain_index = base,
            "encrypted fully connected layer"
        );
        Ok(())
    }

    pub fn forward(&self, input: &CipherMatrix) -> HeResult<CipherMatrix> {
        let mut res = self.weights.matmul(input)?;
        res.add(&self.bias)?;
        Ok(res)
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            self.weights.save(out)?;
            self.bias.save(out)?;
            Ok(())
        })
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut weights = self.weights.clone();
        let mut bias = self.bias.clone();
        let read = counted_load(input, |input| {
            weights.load(input)?;
            bias.load(input)?;
            Ok(())
        })?;
        self.weights = weights;
        self.bias = bias;
        Ok(read)
    }
}

/// Maps `-1` to the top chain index and checks that `below` further chain
/// indices are available under the base. Contexts that manage chain
/// indices themselves take `base_chain_index` unchanged.
pub(crate) fn resolve_base_chain_index(
    he: &dyn HeContext,
    base_chain_index: i32,
    below: i32,
) -> HeResult<i32> {
    if he.traits().automatically_manages_chain_indices() {
        return Ok(base_chain_index);
    }
    let top = he.top_chain_index()?;
    let base = if base_chain_index == -1 {
        top
    } else {
        base_chain_index
    };
    let min = he.min_chain_index_for_encryption() + below;
    if base < min || base > top {
        return Err(HeError::ChainIndexOutOfRange {
            chain_index: base,
            min,
            max: top,
        });
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_nn::DoubleMatrix;

    #[test]
    fn plain_forward_transposes_row_input() {
        let mut layer = SimpleFcPlainLayer::new("fc");
        layer.init_size(2, 3, 1);
        layer.init_weights_const(3.0);
        let mut bias = layer.bias().clone();
        bias.set_in_all_depth(1, 0, &[0.5]);
        layer.set_parameters(layer.weights().clone(), bias).unwrap();

        let row = DoubleMatrixArray::from_matrix(
            1,
            &DoubleMatrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap(),
        );
        let out = layer.forward(&row).unwrap();
        assert_eq!((out.rows(), out.cols()), (2, 1));
        assert_eq!(out.mat(0).as_slice(), &[6.0, 6.5]);
        assert_eq!(out, layer.forward(&row.transposed()).unwrap());
    }

    #[test]
    fn parameters_must_agree() {
        let mut layer = SimpleFcPlainLayer::new("fc");
        let weights = DoubleMatrixArray::new(2, 3, 4);
        assert!(layer.set_parameters(weights.clone(), DoubleMatrixArray::new(3, 1, 4)).is_err());
        assert!(layer.set_parameters(weights.clone(), DoubleMatrixArray::new(2, 1, 3)).is_err());
        layer.set_parameters(weights, DoubleMatrixArray::new(2, 1, 4)).unwrap();

        let mut buf = Vec::new();
        layer.save(&mut buf).unwrap();
        let mut loaded = SimpleFcPlainLayer::new("fc");
        loaded.load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded, layer);
    }

    #[test]
    fn square_activation() {
        let a = DoubleMatrixArray::from_matrix(2, &DoubleMatrix::filled(1, 2, -3.0));
        let out = SquareActivationPlainLayer.forward(&a);
        assert_eq!(out.get_in_all_depth(0, 1), vec![9.0, 9.0]);
    }
}
