use super::{cipher_matrix::CipherMatrix, double_matrix_array::DoubleMatrixArray};
use crate::{
    error::{HeError, HeResult},
    hebase::{Encoder, HeContext},
};

/// Moves [`DoubleMatrixArray`]s in and out of [`CipherMatrix`]es.
#[derive(Debug)]
pub struct CipherMatrixEncoder {
    encoder: Encoder,
}

impl CipherMatrixEncoder {
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        Ok(Self {
            encoder: Encoder::new(he)?,
        })
    }

    /// The tile-level encoder underneath.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn encoder_mut(&mut self) -> &mut Encoder {
        &mut self.encoder
    }

    /// Encrypts `vals` tile by tile: tile `(i, j)` holds element `(i, j)`
    /// of every matrix, zero padded to the slot count.
    pub fn encode_encrypt(
        &self,
        res: &mut CipherMatrix,
        vals: &DoubleMatrixArray,
        chain_index: i32,
    ) -> HeResult<()> {
        if vals.depth() > self.encoder.slot_count() {
            return Err(HeError::invalid(format!(
                "Input has depth {} higher than the number of slots in CTile ({})",
                vals.depth(),
                self.encoder.slot_count()
            )));
        }
        res.reset(vals.rows(), vals.cols(), vals.depth());
        for i in 0..vals.rows() {
            for j in 0..vals.cols() {
                self.encoder
                    .encode_encrypt(res.tile_mut(i, j), &vals.get_in_all_depth(i, j), chain_index)?;
            }
        }
        Ok(())
    }

    /// Decrypts the filled slots of every tile. Needs the secret key.
    pub fn decrypt_decode(&self, src: &CipherMatrix) -> HeResult<DoubleMatrixArray> {
        let depth = src.filled_slots();
        let mut res = DoubleMatrixArray::new(src.rows(), src.cols(), depth);
        for i in 0..src.rows() {
            for j in 0..src.cols() {
                let slots = self.encoder.decrypt_decode(src.tile(i, j))?;
                res.set_in_all_depth(i, j, &slots[..depth.min(slots.len())]);
            }
        }
        Ok(res)
    }
}
