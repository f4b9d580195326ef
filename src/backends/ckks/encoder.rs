use std::sync::Arc;

use num_complex::Complex64;

use super::{BACKEND_NAME, ciphertext::CkksCiphertext, context::CkksState, plaintext::CkksPlaintext};
use crate::{
    error::{HeError, HeResult},
    hebase::{AbstractCiphertext, AbstractEncoder, AbstractPlaintext},
    math::gaussian_integers,
    rings::RnsPoly,
};

/// Bits of precision kept when decrypt-added noise is on.
pub const DEFAULT_DECRYPT_NOISE_PRECISION: u32 = 20;

#[derive(Debug, Clone)]
pub struct CkksEncoder {
    state: Arc<CkksState>,
    scale: f64,
    decrypt_noise: bool,
    decrypt_noise_precision: u32,
}

impl CkksEncoder {
    pub(crate) fn new(state: Arc<CkksState>) -> Self {
        let scale = state.default_scale;
        Self {
            state,
            scale,
            decrypt_noise: false,
            decrypt_noise_precision: DEFAULT_DECRYPT_NOISE_PRECISION,
        }
    }

    fn level_for(&self, chain_index: i32) -> HeResult<usize> {
        let top = self.state.top_chain_index();
        match chain_index {
            -1 => Ok(top as usize),
            c if (0..=top).contains(&c) => Ok(c as usize),
            c => Err(HeError::ChainIndexOutOfRange {
                chain_index: c,
                min: 0,
                max: top,
            }),
        }
    }

    /// Rounded noise of deviation `scale / 2^precision` added after
    /// decryption, so the result leaks fewer bits of the secret noise.
    fn add_decrypt_noise(&self, poly: &mut RnsPoly, scale: f64) {
        let std_dev = (scale / 2f64.powi(self.decrypt_noise_precision as i32)).max(1.0);
        let noise = self
            .state
            .core
            .with_rng(|rng| gaussian_integers(poly.degree(), std_dev, rng));
        let mut noise = RnsPoly::from_coeffs(&noise, Arc::clone(poly.basis()));
        if poly.is_ntt_domain() {
            noise.to_ntt_domain();
        }
        *poly += &noise;
    }
}

impl AbstractEncoder for CkksEncoder {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn slot_count(&self) -> usize {
        self.state.core.slots()
    }

    fn create_plain(&self) -> Box<dyn AbstractPlaintext> {
        Box::new(CkksPlaintext::new(Arc::clone(&self.state)))
    }

    fn create_cipher(&self) -> Box<dyn AbstractCiphertext> {
        Box::new(CkksCiphertext::new(Arc::clone(&self.state)))
    }

    fn set_default_scale(&mut self, scale: f64) -> HeResult<()> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(HeError::invalid(format!("scale must be positive, got {scale}")));
        }
        self.scale = scale;
        Ok(())
    }

    fn default_scale(&self) -> HeResult<f64> {
        Ok(self.scale)
    }

    fn restore_default_scale(&mut self) -> HeResult<()> {
        self.scale = self.state.default_scale;
        Ok(())
    }

    fn set_decrypt_added_noise_enabled(&mut self, enabled: bool) -> HeResult<()> {
        self.decrypt_noise = enabled;
        Ok(())
    }

    fn decrypt_added_noise_enabled(&self) -> bool {
        self.decrypt_noise
    }

    fn set_decrypt_added_noise_precision(&mut self, bits: u32) -> HeResult<()> {
        if bits == 0 || bits > 60 {
            return Err(HeError::invalid(format!("noise precision {bits} outside 1..=60")));
        }
        self.decrypt_noise_precision = bits;
        Ok(())
    }

    fn decrypt_added_noise_precision(&self) -> HeResult<u32> {
        Ok(self.decrypt_noise_precision)
    }

    fn encode_f64(&self, res: &mut dyn AbstractPlaintext, vals: &[f64], chain_index: i32) -> HeResult<()> {
        let vals: Vec<Complex64> = vals.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.encode_complex(res, &vals, chain_index)
    }

    fn encode_complex(
        &self,
        res: &mut dyn AbstractPlaintext,
        vals: &[Complex64],
        chain_index: i32,
    ) -> HeResult<()> {
        if vals.len() > self.slot_count() {
            return Err(HeError::TooManyValues {
                count: vals.len(),
                slots: self.slot_count(),
            });
        }
        let level = self.level_for(chain_index)?;
        let res = CkksPlaintext::downcast_mut(res)?;
        let coeffs = self.state.embedding.encode(vals, self.scale);
        let basis = Arc::clone(self.state.core.chain().level(level));
        res.set(RnsPoly::from_f64_rounded(&coeffs, basis)?, self.scale);
        Ok(())
    }

    fn decode_f64(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<f64>> {
        Ok(self.decode_complex(src)?.into_iter().map(|z| z.re).collect())
    }

    fn decode_complex(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<Complex64>> {
        let src = CkksPlaintext::downcast(src)?;
        let coeffs = src.poly()?.to_centered_f64();
        Ok(self.state.embedding.decode(&coeffs, src.scale_value()))
    }

    fn encrypt(&self, res: &mut dyn AbstractCiphertext, src: &dyn AbstractPlaintext) -> HeResult<()> {
        let src = CkksPlaintext::downcast(src)?;
        let res = CkksCiphertext::downcast_mut(res)?;
        let parts = self.state.core.encrypt(src.poly()?)?;
        res.set(parts, src.scale_value());
        Ok(())
    }

    fn decrypt(&self, res: &mut dyn AbstractPlaintext, src: &dyn AbstractCiphertext) -> HeResult<()> {
        let src = CkksCiphertext::downcast(src)?;
        let res = CkksPlaintext::downcast_mut(res)?;
        let mut poly = self.state.core.decrypt(src.parts()?)?;
        if self.decrypt_noise {
            self.add_decrypt_noise(&mut poly, src.scale_value());
        }
        res.set(poly, src.scale_value());
        Ok(())
    }
}
