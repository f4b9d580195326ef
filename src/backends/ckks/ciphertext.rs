use std::{
    any::Any,
    borrow::Cow,
    io::{Read, Write},
    sync::Arc,
};

use tracing::warn;

use super::{BACKEND_NAME, context::CkksState, encoder::CkksEncoder, plaintext::CkksPlaintext};
use crate::{
    backends::rlwe::{load_parts, save_parts},
    error::{HeError, HeResult},
    hebase::{
        AbstractCiphertext, AbstractEncoder, AbstractPlaintext, bin_io,
        he_context::{counted_load, counted_save},
    },
    rings::RnsPoly,
};

/// Relative scale difference tolerated when adding.
const SCALE_TOLERANCE: f64 = 1e-3;

/// A CKKS ciphertext: its parts at one chain index, and the scale of the
/// encrypted values.
#[derive(Debug, Clone)]
pub struct CkksCiphertext {
    state: Arc<CkksState>,
    parts: Vec<RnsPoly>,
    scale: f64,
}

fn check_scales(lhs: f64, rhs: f64) -> HeResult<()> {
    let drift = (lhs - rhs).abs() / lhs.abs().max(rhs.abs());
    if drift > SCALE_TOLERANCE {
        return Err(HeError::ScaleMismatch {
            expected: lhs,
            actual: rhs,
        });
    }
    if drift > 1e-9 {
        warn!(lhs, rhs, drift, "adding ciphertexts with slightly different scales");
    }
    Ok(())
}

impl CkksCiphertext {
    pub(crate) fn new(state: Arc<CkksState>) -> Self {
        let scale = state.default_scale;
        Self {
            state,
            parts: Vec::new(),
            scale,
        }
    }

    pub(crate) fn set(&mut self, parts: Vec<RnsPoly>, scale: f64) {
        self.parts = parts;
        self.scale = scale;
    }

    pub(crate) fn parts(&self) -> HeResult<&[RnsPoly]> {
        if self.parts.is_empty() {
            return Err(HeError::Empty { what: "ciphertext" });
        }
        Ok(&self.parts)
    }

    pub(crate) fn scale_value(&self) -> f64 {
        self.scale
    }

    pub(crate) fn downcast(c: &dyn AbstractCiphertext) -> HeResult<&Self> {
        c.as_any()
            .downcast_ref()
            .ok_or(HeError::BackendMismatch { expected: BACKEND_NAME })
    }

    pub(crate) fn downcast_mut(c: &mut dyn AbstractCiphertext) -> HeResult<&mut Self> {
        c.as_any_mut()
            .downcast_mut()
            .ok_or(HeError::BackendMismatch { expected: BACKEND_NAME })
    }

    fn level(&self) -> HeResult<usize> {
        self.state.core.level_of(self.parts()?)
    }

    fn check_same_level(&self, other_level: usize) -> HeResult<usize> {
        let level = self.level()?;
        if level != other_level {
            return Err(HeError::ChainIndexMismatch {
                lhs: level as i32,
                rhs: other_level as i32,
            });
        }
        Ok(level)
    }

    fn drop_to(&mut self, level: usize) -> HeResult<()> {
        self.state.core.drop_to_level(&mut self.parts, level)
    }

    /// Brings `self` and a copy of `other` to the lower of their levels.
    fn aligned<'a>(&mut self, other: &'a CkksCiphertext) -> HeResult<Cow<'a, CkksCiphertext>> {
        let level = self.level()?;
        let other_level = other.level()?;
        if other_level < level {
            self.drop_to(other_level)?;
        }
        if level < other_level {
            let mut copy = other.clone();
            copy.drop_to(level)?;
            return Ok(Cow::Owned(copy));
        }
        Ok(Cow::Borrowed(other))
    }

    /// Lowers `self` to the plaintext's level if needed and returns the
    /// plaintext polynomial at the ciphertext's level.
    fn aligned_plain(&mut self, plain: &CkksPlaintext) -> HeResult<RnsPoly> {
        let level = self.level()?;
        let plain_level = self
            .state
            .core
            .chain()
            .level_of(plain.poly()?.basis())
            .ok_or_else(|| HeError::corrupt("plaintext is not on the modulus chain"))?;
        let target = level.min(plain_level);
        self.drop_to(target)?;
        plain.poly_at(target)
    }

    fn add_parts(&mut self, other: &[RnsPoly], negate: bool) {
        for (i, part) in other.iter().enumerate() {
            let term = if negate { -part.clone() } else { part.clone() };
            match self.parts.get_mut(i) {
                Some(mine) => *mine += &term,
                None => self.parts.push(term),
            }
        }
    }

    fn add_impl(&mut self, other: &dyn AbstractCiphertext, raw: bool, negate: bool) -> HeResult<()> {
        let other = Self::downcast(other)?;
        check_scales(self.scale, other.scale)?;
        let other = if raw {
            self.check_same_level(other.level()?)?;
            Cow::Borrowed(other)
        } else {
            self.aligned(other)?
        };
        self.add_parts(other.parts()?, negate);
        Ok(())
    }

    fn plain_impl(&mut self, plain: &dyn AbstractPlaintext, raw: bool, negate: bool) -> HeResult<()> {
        let plain = CkksPlaintext::downcast(plain)?;
        check_scales(self.scale, plain.scale_value())?;
        let poly = if raw {
            let level = self.level()?;
            let plain_level = plain.poly()?.channel_count() - 1;
            self.check_same_level(plain_level)?;
            plain.poly_at(level)?
        } else {
            self.aligned_plain(plain)?
        };
        let poly = if negate { -poly } else { poly };
        self.parts[0] += &poly;
        Ok(())
    }

    fn multiply_raw_impl(&mut self, other: &CkksCiphertext) -> HeResult<()> {
        self.check_same_level(other.level()?)?;
        self.parts = self.state.core.tensor(&self.parts, other.parts()?)?;
        self.scale *= other.scale;
        Ok(())
    }

    fn multiply_plain_raw_impl(&mut self, poly: &RnsPoly, plain_scale: f64) {
        for part in &mut self.parts {
            *part *= poly;
        }
        self.scale *= plain_scale;
    }

    /// Leaves `self` at the lower operand level on failure; callers run it
    /// on a copy.
    fn multiply_rescaled(&mut self, other: &CkksCiphertext) -> HeResult<()> {
        let mut other = self.aligned(other)?.into_owned();
        self.ensure_can_rescale()?;
        self.relinearize()?;
        other.relinearize()?;
        self.multiply_raw_impl(&other)?;
        self.relinearize()?;
        self.rescale_raw()
    }

    fn multiply_plain_rescaled(&mut self, plain: &CkksPlaintext) -> HeResult<()> {
        let poly = self.aligned_plain(plain)?;
        self.ensure_can_rescale()?;
        self.multiply_plain_raw_impl(&poly, plain.scale_value());
        self.rescale()
    }

    fn ensure_can_rescale(&self) -> HeResult<usize> {
        let level = self.level()?;
        if level == 0 {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index: -1,
                min: 0,
                max: self.state.top_chain_index(),
            });
        }
        Ok(level)
    }
}

impl AbstractCiphertext for CkksCiphertext {
    fn clone_box(&self) -> Box<dyn AbstractCiphertext> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn encoder(&self) -> Box<dyn AbstractEncoder> {
        Box::new(CkksEncoder::new(Arc::clone(&self.state)))
    }

    fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            bin_io::write_f64(out, self.scale)?;
            save_parts(out, &self.parts)
        })
    }

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let chain = self.state.core.chain();
        let mut loaded = (self.scale, Vec::new());
        let read = counted_load(input, |input| {
            loaded.0 = bin_io::read_f64(input)?;
            loaded.1 = load_parts(input, chain)?;
            Ok(())
        })?;
        (self.scale, self.parts) = loaded;
        Ok(read)
    }

    fn add(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, false, false)
    }

    fn add_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, true, false)
    }

    fn sub(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, false, true)
    }

    fn sub_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, true, true)
    }

    fn multiply(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        let other = Self::downcast(other)?;
        let mut product = self.clone();
        product.multiply_rescaled(other)?;
        *self = product;
        Ok(())
    }

    fn multiply_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.multiply_raw_impl(Self::downcast(other)?)
    }

    fn add_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, false, false)
    }

    fn add_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, true, false)
    }

    fn sub_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, false, true)
    }

    fn sub_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, true, true)
    }

    fn multiply_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        let plain = CkksPlaintext::downcast(plain)?;
        let mut product = self.clone();
        product.multiply_plain_rescaled(plain)?;
        *self = product;
        Ok(())
    }

    fn multiply_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        let plain = CkksPlaintext::downcast(plain)?;
        let plain_level = plain.poly()?.channel_count() - 1;
        let level = self.check_same_level(plain_level)?;
        let poly = plain.poly_at(level)?;
        self.multiply_plain_raw_impl(&poly, plain.scale_value());
        Ok(())
    }

    /// Adds `round(scalar * scale)` to the constant term, which adds
    /// `scalar` to every slot.
    fn add_scalar(&mut self, scalar: f64) -> HeResult<()> {
        let level = self.level()?;
        let value = (scalar * self.scale).round();
        if !value.is_finite() || value.abs() >= 2f64.powi(62) {
            return Err(HeError::invalid(format!("scalar {scalar} overflows at scale {}", self.scale)));
        }
        let mut constant =
            RnsPoly::from_coeffs(&[value as i64], Arc::clone(self.state.core.chain().level(level)));
        constant.to_ntt_domain();
        self.parts[0] += &constant;
        Ok(())
    }

    /// Multiplies by `round(scalar * q_l)` and rescales by `q_l`, so the
    /// scale is unchanged and one chain index is consumed.
    fn multiply_scalar(&mut self, scalar: f64) -> HeResult<()> {
        let level = self.ensure_can_rescale()?;
        let q = self.state.core.chain().prime(level) as f64;
        let factor = (scalar * q).round();
        if !factor.is_finite() || factor.abs() >= 2f64.powi(62) {
            return Err(HeError::invalid(format!("scalar {scalar} is too large")));
        }
        for part in &mut self.parts {
            part.mul_scalar(factor as i64);
        }
        self.state.core.divide_by_last_prime(&mut self.parts)
    }

    fn multiply_scalar_int(&mut self, scalar: i64) -> HeResult<()> {
        self.parts()?;
        for part in &mut self.parts {
            part.mul_scalar(scalar);
        }
        Ok(())
    }

    fn negate(&mut self) -> HeResult<()> {
        self.parts()?;
        self.parts = std::mem::take(&mut self.parts).into_iter().map(|p| -p).collect();
        Ok(())
    }

    fn conjugate(&mut self) -> HeResult<()> {
        self.parts()?;
        self.state.core.conjugate(&mut self.parts)
    }

    fn rotate(&mut self, n: i32) -> HeResult<()> {
        self.parts()?;
        self.state.core.rotate(&mut self.parts, n)
    }

    fn relinearize(&mut self) -> HeResult<()> {
        self.parts()?;
        self.state.core.relinearize(&mut self.parts)
    }

    fn rescale(&mut self) -> HeResult<()> {
        self.relinearize()?;
        self.rescale_raw()
    }

    fn rescale_raw(&mut self) -> HeResult<()> {
        let level = self.ensure_can_rescale()?;
        let q = self.state.core.chain().prime(level) as f64;
        self.state.core.divide_by_last_prime(&mut self.parts)?;
        self.scale /= q;
        Ok(())
    }

    fn chain_index(&self) -> i32 {
        self.level().map_or(-1, |level| level as i32)
    }

    fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()> {
        let current = self.level()? as i32;
        if chain_index > current {
            return Err(HeError::ChainIndexIncrease {
                current,
                requested: chain_index,
            });
        }
        if chain_index < 0 {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index,
                min: 0,
                max: self.state.top_chain_index(),
            });
        }
        self.drop_to(chain_index as usize)
    }

    fn scale(&self) -> HeResult<f64> {
        Ok(self.scale)
    }

    fn set_scale(&mut self, scale: f64) -> HeResult<()> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(HeError::invalid(format!("scale must be positive, got {scale}")));
        }
        self.scale = scale;
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.state.core.slots()
    }

    fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
