use std::io::{Read, Write};

use rand::Rng;
use tracing::debug;

use super::{
    cipher_matrix::CipherMatrix,
    double_matrix_array::DoubleMatrixArray,
    layers::{
        SimpleFcLayer, SimpleFcPlainLayer, SquareActivationLayer, SquareActivationPlainLayer,
        resolve_base_chain_index,
    },
};
use crate::{
    error::HeResult,
    hebase::{
        HeContext,
        he_context::{counted_load, counted_save},
    },
};

/// Chain indices one forward pass consumes: a rescale and a square per
/// layer.
pub const NETWORK_DEPTH: i32 = 6;

const LAYER_NAMES: [&str; 3] = ["dense_1", "dense_2", "dense_3"];

/// Three fully connected layers, each followed by a square activation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleNeuralNetPlain {
    layers: [SimpleFcPlainLayer; 3],
}

impl SimpleNeuralNetPlain {
    /// Layer `l` maps `dims[l]` inputs to `dims[l + 1]` outputs for a batch
    /// of `filled_slots` samples. Weights start at zero.
    pub fn new(dims: [usize; 4], filled_slots: usize) -> Self {
        let layers = std::array::from_fn(|l| {
            let mut layer = SimpleFcPlainLayer::new(LAYER_NAMES[l]);
            layer.init_size(dims[l + 1], dims[l], filled_slots);
            layer
        });
        Self { layers }
    }

    pub fn layers(&self) -> &[SimpleFcPlainLayer; 3] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [SimpleFcPlainLayer; 3] {
        &mut self.layers
    }

    pub fn init_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for layer in &mut self.layers {
            layer.init_weights_random(rng);
        }
    }

    pub fn init_const(&mut self, c: f64) {
        for layer in &mut self.layers {
            layer.init_weights_const(c);
        }
    }

    /// `input` holds one sample per depth index, as a `dims[0] x 1` column
    /// or a `1 x dims[0]` row.
    pub fn predict(&self, input: &DoubleMatrixArray) -> HeResult<DoubleMatrixArray> {
        let activation = SquareActivationPlainLayer;
        let mut x = input.clone();
        for layer in &self.layers {
            x = activation.forward(&layer.forward(&x)?);
        }
        Ok(x)
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            for layer in &self.layers {
                layer.save(out)?;
            }
            Ok(())
        })
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut layers = self.layers.clone();
        let read = counted_load(input, |input| {
            for layer in &mut layers {
                layer.load(input)?;
            }
            Ok(())
        })?;
        self.layers = layers;
        Ok(read)
    }
}

/// The encrypted counterpart of [`SimpleNeuralNetPlain`].
#[derive(Debug, Clone)]
pub struct SimpleNeuralNet {
    layers: [SimpleFcLayer; 3],
}

impl SimpleNeuralNet {
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        Ok(Self {
            layers: [
                SimpleFcLayer::new(he, LAYER_NAMES[0])?,
                SimpleFcLayer::new(he, LAYER_NAMES[1])?,
                SimpleFcLayer::new(he, LAYER_NAMES[2])?,
            ],
        })
    }

    pub fn layers(&self) -> &[SimpleFcLayer; 3] {
        &self.layers
    }

    /// Encrypts `net` so that an input encrypted at `base_chain_index`
    /// (`-1` for the top) flows through: layer `l` sits at
    /// `base_chain_index - 2 l`.
    pub fn init_from_net(
        &mut self,
        he: &dyn HeContext,
        net: &SimpleNeuralNetPlain,
        base_chain_index: i32,
    ) -> HeResult<()> {
        let base = resolve_base_chain_index(he, base_chain_index, NETWORK_DEPTH)?;
        for (l, (layer, plain)) in self.layers.iter_mut().zip(&net.layers).enumerate() {
            layer.init_from_layer(he, plain, base - 2 * l as i32)?;
        }
        debug!(chain_index = base, "encrypted neural net");
        Ok(())
    }

    pub fn predict(&self, input: &CipherMatrix) -> HeResult<CipherMatrix> {
        let activation = SquareActivationLayer;
        let mut x = input.clone();
        for layer in &self.layers {
            x = activation.forward(&layer.forward(&x)?)?;
        }
        Ok(x)
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            for layer in &self.layers {
                layer.save(out)?;
            }
            Ok(())
        })
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut layers = self.layers.clone();
        let read = counted_load(input, |input| {
            for layer in &mut layers {
                layer.load(input)?;
            }
            Ok(())
        })?;
        self.layers = layers;
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::simple_nn::DoubleMatrix;

    #[test]
    fn constant_net_is_closed_form() {
        let mut net = SimpleNeuralNetPlain::new([4, 3, 3, 2], 2);
        net.init_const(0.5);
        let input = DoubleMatrixArray::from_matrix(2, &DoubleMatrix::filled(4, 1, 2.0));
        let out = net.predict(&input).unwrap();
        // (0.5 * 2)^2 = 1, then (0.5)^2, then (0.125)^2
        assert_eq!((out.rows(), out.cols(), out.depth()), (2, 1, 2));
        for v in out.to_tensor().into_iter().flatten().flatten() {
            assert_abs_diff_eq!(v, 0.015625, epsilon = 1e-12);
        }
    }

    #[test]
    fn persisted_net_predicts_the_same() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut net = SimpleNeuralNetPlain::new([4, 3, 3, 2], 3);
        net.init_random(&mut rng);

        let mut buf = Vec::new();
        net.save(&mut buf).unwrap();
        let mut loaded = SimpleNeuralNetPlain::new([1, 1, 1, 1], 1);
        loaded.load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded, net);

        let input = DoubleMatrixArray::random(4, 1, 3, &mut rng);
        assert_eq!(loaded.predict(&input).unwrap(), net.predict(&input).unwrap());
    }
}
