use std::{borrow::Cow, io::Write};

use num_complex::Complex64;

use super::{
    abstract_encoder::AbstractEncoder, ctile::CTile, he_context::HeContext, he_traits::HeTraits,
    ptile::PTile,
};
use crate::error::{HeError, HeResult};

/// Summary of how far decrypted slots are from their expected values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorStats {
    pub max_abs: f64,
    pub mean_abs: f64,
    pub max_rel: f64,
}

/// Encodes, decodes, encrypts and decrypts for one context.
///
/// Chain index `-1` means the context's top chain index. On schemes that
/// manage chain indices themselves the argument is ignored.
#[derive(Debug)]
pub struct Encoder {
    inner: Box<dyn AbstractEncoder>,
    traits: HeTraits,
    slot_count: usize,
    top_chain_index: i32,
    min_chain_index: i32,
}

impl Encoder {
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        Ok(Self {
            inner: he.get_encoder()?,
            traits: he.traits(),
            slot_count: he.slot_count()?,
            top_chain_index: he.top_chain_index()?,
            min_chain_index: he.min_chain_index_for_encryption(),
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn validate_chain_index(&self, chain_index: i32) -> HeResult<i32> {
        if self.traits.automatically_manages_chain_indices() {
            return Ok(-1);
        }
        if chain_index == -1 {
            return Ok(self.top_chain_index);
        }
        if chain_index < self.min_chain_index || chain_index > self.top_chain_index {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index,
                min: self.min_chain_index,
                max: self.top_chain_index,
            });
        }
        Ok(chain_index)
    }

    fn padded<'a, T: Clone + Default>(&self, vals: &'a [T]) -> HeResult<Cow<'a, [T]>> {
        if vals.len() > self.slot_count {
            return Err(HeError::TooManyValues {
                count: vals.len(),
                slots: self.slot_count,
            });
        }
        if vals.len() == self.slot_count {
            return Ok(Cow::Borrowed(vals));
        }
        let mut out = vals.to_vec();
        out.resize(self.slot_count, T::default());
        Ok(Cow::Owned(out))
    }

    pub fn encode(&self, res: &mut PTile, vals: &[f64], chain_index: i32) -> HeResult<()> {
        let chain_index = self.validate_chain_index(chain_index)?;
        let vals = self.padded(vals)?;
        self.inner.encode_f64(res.inner.as_mut(), &vals, chain_index)
    }

    pub fn encode_int(&self, res: &mut PTile, vals: &[i64], chain_index: i32) -> HeResult<()> {
        let chain_index = self.validate_chain_index(chain_index)?;
        let vals = self.padded(vals)?;
        self.inner.encode_i64(res.inner.as_mut(), &vals, chain_index)
    }

    pub fn encode_complex(
        &self,
        res: &mut PTile,
        vals: &[Complex64],
        chain_index: i32,
    ) -> HeResult<()> {
        if !self.traits.supports_complex_numbers() && vals.iter().any(|v| v.im != 0.0) {
            return Err(HeError::unsupported("complex values", self.inner.backend_name()));
        }
        let chain_index = self.validate_chain_index(chain_index)?;
        let vals = self.padded(vals)?;
        self.inner.encode_complex(res.inner.as_mut(), &vals, chain_index)
    }

    /// Encodes `val` into every slot.
    pub fn encode_scalar(&self, res: &mut PTile, val: f64, chain_index: i32) -> HeResult<()> {
        let chain_index = self.validate_chain_index(chain_index)?;
        self.inner.encode_scalar(res.inner.as_mut(), val, chain_index)
    }

    pub fn encode_scalar_int(&self, res: &mut PTile, val: i64, chain_index: i32) -> HeResult<()> {
        self.encode_int(res, &vec![val; self.slot_count], chain_index)
    }

    pub fn decode(&self, src: &PTile) -> HeResult<Vec<f64>> {
        self.inner.decode_f64(non_empty_plain(src)?)
    }

    pub fn decode_int(&self, src: &PTile) -> HeResult<Vec<i64>> {
        self.inner.decode_i64(non_empty_plain(src)?)
    }

    pub fn decode_complex(&self, src: &PTile) -> HeResult<Vec<Complex64>> {
        self.inner.decode_complex(non_empty_plain(src)?)
    }

    pub fn encrypt(&self, res: &mut CTile, src: &PTile) -> HeResult<()> {
        self.inner.encrypt(res.inner.as_mut(), non_empty_plain(src)?)
    }

    pub fn decrypt(&self, res: &mut PTile, src: &CTile) -> HeResult<()> {
        self.inner.decrypt(res.inner.as_mut(), non_empty_cipher(src)?)
    }

    pub fn encode_encrypt(&self, res: &mut CTile, vals: &[f64], chain_index: i32) -> HeResult<()> {
        let chain_index = self.validate_chain_index(chain_index)?;
        let vals = self.padded(vals)?;
        self.inner.encode_encrypt_f64(res.inner.as_mut(), &vals, chain_index)
    }

    pub fn encode_encrypt_int(
        &self,
        res: &mut CTile,
        vals: &[i64],
        chain_index: i32,
    ) -> HeResult<()> {
        let chain_index = self.validate_chain_index(chain_index)?;
        let vals = self.padded(vals)?;
        self.inner.encode_encrypt_i64(res.inner.as_mut(), &vals, chain_index)
    }

    pub fn encode_encrypt_complex(
        &self,
        res: &mut CTile,
        vals: &[Complex64],
        chain_index: i32,
    ) -> HeResult<()> {
        if !self.traits.supports_complex_numbers() && vals.iter().any(|v| v.im != 0.0) {
            return Err(HeError::unsupported("complex values", self.inner.backend_name()));
        }
        let chain_index = self.validate_chain_index(chain_index)?;
        let vals = self.padded(vals)?;
        self.inner.encode_encrypt_complex(res.inner.as_mut(), &vals, chain_index)
    }

    pub fn encode_encrypt_scalar(
        &self,
        res: &mut CTile,
        val: f64,
        chain_index: i32,
    ) -> HeResult<()> {
        self.encode_encrypt(res, &vec![val; self.slot_count], chain_index)
    }

    pub fn decrypt_decode(&self, src: &CTile) -> HeResult<Vec<f64>> {
        self.inner.decrypt_decode_f64(non_empty_cipher(src)?)
    }

    pub fn decrypt_decode_int(&self, src: &CTile) -> HeResult<Vec<i64>> {
        self.inner.decrypt_decode_i64(non_empty_cipher(src)?)
    }

    pub fn decrypt_decode_complex(&self, src: &CTile) -> HeResult<Vec<Complex64>> {
        self.inner.decrypt_decode_complex(non_empty_cipher(src)?)
    }

    /// Scale used by subsequent encodes, on schemes with scaled encoding.
    pub fn set_default_scale(&mut self, scale: f64) -> HeResult<()> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(HeError::invalid(format!("scale must be positive, got {scale}")));
        }
        self.inner.set_default_scale(scale)
    }

    pub fn default_scale(&self) -> HeResult<f64> {
        self.inner.default_scale()
    }

    pub fn restore_default_scale(&mut self) -> HeResult<()> {
        self.inner.restore_default_scale()
    }

    pub fn set_decrypt_added_noise_enabled(&mut self, enabled: bool) -> HeResult<()> {
        self.inner.set_decrypt_added_noise_enabled(enabled)
    }

    pub fn decrypt_added_noise_enabled(&self) -> bool {
        self.inner.decrypt_added_noise_enabled()
    }

    pub fn set_decrypt_added_noise_precision(&mut self, bits: u32) -> HeResult<()> {
        self.inner.set_decrypt_added_noise_precision(bits)
    }

    pub fn decrypt_added_noise_precision(&self) -> HeResult<u32> {
        self.inner.decrypt_added_noise_precision()
    }

    /// Decrypts `c` and checks its first slots against `expected`, see
    /// [`compare_slots`](super::abstract_encoder::compare_slots). Returns the
    /// largest absolute difference.
    pub fn assert_equals(
        &self,
        c: &CTile,
        title: &str,
        expected: &[f64],
        eps: f64,
        percent: bool,
    ) -> HeResult<f64> {
        let expected: Vec<Complex64> = expected.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.assert_equals_complex(c, title, &expected, eps, percent)
    }

    pub fn assert_equals_int(
        &self,
        c: &CTile,
        title: &str,
        expected: &[i64],
        eps: f64,
        percent: bool,
    ) -> HeResult<f64> {
        let expected: Vec<f64> = expected.iter().map(|&v| v as f64).collect();
        self.assert_equals(c, title, &expected, eps, percent)
    }

    pub fn assert_equals_complex(
        &self,
        c: &CTile,
        title: &str,
        expected: &[Complex64],
        eps: f64,
        percent: bool,
    ) -> HeResult<f64> {
        self.inner
            .assert_equals(non_empty_cipher(c)?, title, expected, eps, percent)
    }

    /// Decrypts `c`, compares it with `expected` and writes a one-line
    /// summary to `out`.
    pub fn print_error_stats(
        &self,
        c: &CTile,
        expected: &[f64],
        out: &mut dyn Write,
    ) -> HeResult<ErrorStats> {
        let vals = self.decrypt_decode(c)?;
        if expected.len() > vals.len() {
            return Err(HeError::TooManyValues {
                count: expected.len(),
                slots: vals.len(),
            });
        }
        let mut stats = ErrorStats {
            max_abs: 0.0,
            mean_abs: 0.0,
            max_rel: 0.0,
        };
        for (v, e) in vals.iter().zip(expected) {
            let diff = (v - e).abs();
            stats.max_abs = stats.max_abs.max(diff);
            stats.mean_abs += diff;
            if *e != 0.0 {
                stats.max_rel = stats.max_rel.max(diff / e.abs());
            }
        }
        if !expected.is_empty() {
            stats.mean_abs /= expected.len() as f64;
        }
        writeln!(
            out,
            "max abs error: {:e}, mean abs error: {:e}, max rel error: {:e} ({} slots)",
            stats.max_abs,
            stats.mean_abs,
            stats.max_rel,
            expected.len()
        )?;
        Ok(stats)
    }
}

fn non_empty_plain(p: &PTile) -> HeResult<&dyn super::AbstractPlaintext> {
    if p.is_empty() {
        return Err(HeError::Empty { what: "PTile" });
    }
    Ok(p.inner.as_ref())
}

fn non_empty_cipher(c: &CTile) -> HeResult<&dyn super::AbstractCiphertext> {
    if c.is_empty() {
        return Err(HeError::Empty { what: "CTile" });
    }
    Ok(c.inner.as_ref())
}
