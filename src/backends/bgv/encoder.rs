use std::sync::Arc;

use num_complex::Complex64;

use super::{BACKEND_NAME, ciphertext::BgvCiphertext, context::BgvState, plaintext::BgvPlaintext};
use crate::{
    error::{HeError, HeResult},
    hebase::{AbstractCiphertext, AbstractEncoder, AbstractPlaintext},
};

/// Integer slot encoding. Real inputs are rounded, complex inputs must be
/// real. Values are reduced mod `t` and decode into `(-t/2, t/2]`.
#[derive(Debug, Clone)]
pub struct BgvEncoder {
    state: Arc<BgvState>,
}

impl BgvEncoder {
    pub(crate) fn new(state: Arc<BgvState>) -> Self {
        Self { state }
    }

    fn check_len(&self, len: usize) -> HeResult<()> {
        if len > self.slot_count() {
            return Err(HeError::TooManyValues {
                count: len,
                slots: self.slot_count(),
            });
        }
        Ok(())
    }
}

impl AbstractEncoder for BgvEncoder {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn slot_count(&self) -> usize {
        self.state.batching.slot_count()
    }

    fn create_plain(&self) -> Box<dyn AbstractPlaintext> {
        Box::new(BgvPlaintext::new(Arc::clone(&self.state)))
    }

    fn create_cipher(&self) -> Box<dyn AbstractCiphertext> {
        Box::new(BgvCiphertext::new(Arc::clone(&self.state)))
    }

    fn encode_i64(&self, res: &mut dyn AbstractPlaintext, vals: &[i64], _chain_index: i32) -> HeResult<()> {
        self.check_len(vals.len())?;
        let res = BgvPlaintext::downcast_mut(res)?;
        res.set(self.state.batching.encode(vals));
        Ok(())
    }

    fn encode_f64(&self, res: &mut dyn AbstractPlaintext, vals: &[f64], chain_index: i32) -> HeResult<()> {
        let ints = vals
            .iter()
            .map(|&v| {
                let r = v.round();
                if r.is_finite() && r.abs() < 2f64.powi(62) {
                    Ok(r as i64)
                } else {
                    Err(HeError::invalid(format!("{v} is not a representable integer")))
                }
            })
            .collect::<HeResult<Vec<_>>>()?;
        self.encode_i64(res, &ints, chain_index)
    }

    fn encode_complex(
        &self,
        res: &mut dyn AbstractPlaintext,
        vals: &[Complex64],
        chain_index: i32,
    ) -> HeResult<()> {
        if let Some(z) = vals.iter().find(|z| z.im != 0.0) {
            return Err(HeError::invalid(format!(
                "{z} has an imaginary part; BGV slots hold integers"
            )));
        }
        let reals: Vec<f64> = vals.iter().map(|z| z.re).collect();
        self.encode_f64(res, &reals, chain_index)
    }

    fn encode_scalar(&self, res: &mut dyn AbstractPlaintext, val: f64, chain_index: i32) -> HeResult<()> {
        self.encode_f64(res, &vec![val; self.slot_count()], chain_index)
    }

    fn decode_i64(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<i64>> {
        let src = BgvPlaintext::downcast(src)?;
        Ok(self.state.batching.decode(src.coeffs()?))
    }

    fn decode_f64(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<f64>> {
        Ok(self.decode_i64(src)?.into_iter().map(|v| v as f64).collect())
    }

    fn decode_complex(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<Complex64>> {
        Ok(self
            .decode_i64(src)?
            .into_iter()
            .map(|v| Complex64::new(v as f64, 0.0))
            .collect())
    }

    fn encrypt(&self, res: &mut dyn AbstractCiphertext, src: &dyn AbstractPlaintext) -> HeResult<()> {
        let src = BgvPlaintext::downcast(src)?;
        let res = BgvCiphertext::downcast_mut(res)?;
        let message = src.poly_at(self.state.core.chain().top_level())?;
        res.set(self.state.core.encrypt(&message)?);
        Ok(())
    }

    fn decrypt(&self, res: &mut dyn AbstractPlaintext, src: &dyn AbstractCiphertext) -> HeResult<()> {
        let src = BgvCiphertext::downcast(src)?;
        let res = BgvPlaintext::downcast_mut(res)?;
        let poly = self.state.core.decrypt(src.parts()?)?;
        res.set(poly.to_centered_mod(self.state.plaintext_modulus()));
        Ok(())
    }
}
