use std::fmt;

use num_complex::Complex64;

use super::{abstract_ciphertext::AbstractCiphertext, abstract_plaintext::AbstractPlaintext};
use crate::error::{HeError, HeResult};

/// Backend side of an [`Encoder`](crate::Encoder).
///
/// Only the vector encode/decode for `f64` and complex values and
/// encrypt/decrypt are mandatory. Everything else has a default written in
/// terms of those.
pub trait AbstractEncoder: Send + Sync + fmt::Debug {
    fn backend_name(&self) -> &'static str;

    fn slot_count(&self) -> usize;

    /// A fresh empty plaintext of the encoder's context.
    fn create_plain(&self) -> Box<dyn AbstractPlaintext>;

    /// A fresh empty ciphertext of the encoder's context.
    fn create_cipher(&self) -> Box<dyn AbstractCiphertext>;

    fn set_default_scale(&mut self, scale: f64) -> HeResult<()> {
        let _ = scale;
        Err(HeError::unsupported("set_default_scale", self.backend_name()))
    }

    fn default_scale(&self) -> HeResult<f64> {
        Err(HeError::unsupported("default_scale", self.backend_name()))
    }

    fn restore_default_scale(&mut self) -> HeResult<()> {
        Err(HeError::unsupported("restore_default_scale", self.backend_name()))
    }

    fn set_decrypt_added_noise_enabled(&mut self, enabled: bool) -> HeResult<()> {
        if enabled {
            return Err(HeError::unsupported("decrypt added noise", self.backend_name()));
        }
        Ok(())
    }

    fn decrypt_added_noise_enabled(&self) -> bool {
        false
    }

    fn set_decrypt_added_noise_precision(&mut self, bits: u32) -> HeResult<()> {
        let _ = bits;
        Err(HeError::unsupported("decrypt added noise precision", self.backend_name()))
    }

    fn decrypt_added_noise_precision(&self) -> HeResult<u32> {
        Err(HeError::unsupported("decrypt added noise precision", self.backend_name()))
    }

    fn encode_f64(
        &self,
        res: &mut dyn AbstractPlaintext,
        vals: &[f64],
        chain_index: i32,
    ) -> HeResult<()>;

    fn encode_complex(
        &self,
        res: &mut dyn AbstractPlaintext,
        vals: &[Complex64],
        chain_index: i32,
    ) -> HeResult<()>;

    fn encode_i64(
        &self,
        res: &mut dyn AbstractPlaintext,
        vals: &[i64],
        chain_index: i32,
    ) -> HeResult<()> {
        let vals: Vec<f64> = vals.iter().map(|&v| v as f64).collect();
        self.encode_f64(res, &vals, chain_index)
    }

    /// Encodes `val` into every slot.
    fn encode_scalar(
        &self,
        res: &mut dyn AbstractPlaintext,
        val: f64,
        chain_index: i32,
    ) -> HeResult<()> {
        self.encode_f64(res, &vec![val; self.slot_count()], chain_index)
    }

    fn decode_f64(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<f64>>;

    fn decode_complex(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<Complex64>>;

    fn decode_i64(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<i64>> {
        Ok(self
            .decode_f64(src)?
            .into_iter()
            .map(|v| v.round() as i64)
            .collect())
    }

    fn encrypt(&self, res: &mut dyn AbstractCiphertext, src: &dyn AbstractPlaintext) -> HeResult<()>;

    fn decrypt(&self, res: &mut dyn AbstractPlaintext, src: &dyn AbstractCiphertext) -> HeResult<()>;

    fn encode_encrypt_f64(
        &self,
        res: &mut dyn AbstractCiphertext,
        vals: &[f64],
        chain_index: i32,
    ) -> HeResult<()> {
        let mut plain = self.create_plain();
        self.encode_f64(plain.as_mut(), vals, chain_index)?;
        self.encrypt(res, plain.as_ref())
    }

    fn encode_encrypt_i64(
        &self,
        res: &mut dyn AbstractCiphertext,
        vals: &[i64],
        chain_index: i32,
    ) -> HeResult<()> {
        let mut plain = self.create_plain();
        self.encode_i64(plain.as_mut(), vals, chain_index)?;
        self.encrypt(res, plain.as_ref())
    }

    fn encode_encrypt_complex(
        &self,
        res: &mut dyn AbstractCiphertext,
        vals: &[Complex64],
        chain_index: i32,
    ) -> HeResult<()> {
        let mut plain = self.create_plain();
        self.encode_complex(plain.as_mut(), vals, chain_index)?;
        self.encrypt(res, plain.as_ref())
    }

    fn decrypt_decode_f64(&self, src: &dyn AbstractCiphertext) -> HeResult<Vec<f64>> {
        let mut plain = self.create_plain();
        self.decrypt(plain.as_mut(), src)?;
        self.decode_f64(plain.as_ref())
    }

    fn decrypt_decode_i64(&self, src: &dyn AbstractCiphertext) -> HeResult<Vec<i64>> {
        let mut plain = self.create_plain();
        self.decrypt(plain.as_mut(), src)?;
        self.decode_i64(plain.as_ref())
    }

    fn decrypt_decode_complex(&self, src: &dyn AbstractCiphertext) -> HeResult<Vec<Complex64>> {
        let mut plain = self.create_plain();
        self.decrypt(plain.as_mut(), src)?;
        self.decode_complex(plain.as_ref())
    }

    /// Decrypts `c` and compares its first slots with `expected`.
    ///
    /// With `percent` the relative difference is checked against `eps`,
    /// otherwise the absolute one. Returns the largest absolute difference.
    fn assert_equals(
        &self,
        c: &dyn AbstractCiphertext,
        title: &str,
        expected: &[Complex64],
        eps: f64,
        percent: bool,
    ) -> HeResult<f64> {
        let vals = self.decrypt_decode_complex(c)?;
        compare_slots(title, &vals, expected, eps, percent)
    }
}

/// Slot-wise comparison behind [`AbstractEncoder::assert_equals`].
pub fn compare_slots(
    title: &str,
    vals: &[Complex64],
    expected: &[Complex64],
    eps: f64,
    percent: bool,
) -> HeResult<f64> {
    if expected.len() > vals.len() {
        return Err(HeError::AssertEqualsFailed {
            title: title.to_string(),
            message: "Size of expected values vector is bigger than size of cipher".to_string(),
        });
    }
    let mut max_diff = 0.0f64;
    for (i, (v, e)) in vals.iter().zip(expected).enumerate() {
        let diff = (v - e).norm();
        let rel_diff = if v.norm() != 0.0 { diff / v.norm() } else { e.norm() };
        if (percent && rel_diff > eps) || (!percent && diff > eps) {
            return Err(HeError::AssertEqualsFailed {
                title: title.to_string(),
                message: format!(
                    "at slot {i}, expected value: {e}, actual value: {v}, diff: {diff}, \
                     relative-diff: {rel_diff}, epsilon: {eps}"
                ),
            });
        }
        max_diff = max_diff.max(diff);
    }
    Ok(max_diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn compare_slots_reports_max_diff() {
        let vals = [c(1.0), c(2.05), c(3.0), c(99.0)];
        let expected = [c(1.0), c(2.0), c(3.01)];
        let max = compare_slots("ok", &vals, &expected, 0.1, false).unwrap();
        assert!((max - 0.05).abs() < 1e-12);
    }

    #[test]
    fn compare_slots_relative_mode() {
        let vals = [c(1000.0)];
        assert!(compare_slots("rel", &vals, &[c(1001.0)], 0.01, true).is_ok());
        assert!(compare_slots("abs", &vals, &[c(1001.0)], 0.01, false).is_err());
    }

    #[test]
    fn compare_slots_rejects_long_expectation() {
        let err = compare_slots("long", &[c(1.0)], &[c(1.0), c(2.0)], 0.1, false).unwrap_err();
        assert!(err.to_string().contains("Size of expected values vector"));
    }
}
