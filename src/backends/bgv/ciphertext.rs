use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use super::{BACKEND_NAME, context::BgvState, encoder::BgvEncoder, plaintext::BgvPlaintext};
use crate::{
    backends::rlwe::{load_parts, save_parts},
    error::{HeError, HeResult},
    hebase::{
        AbstractCiphertext, AbstractEncoder, AbstractPlaintext,
        he_context::{counted_load, counted_save},
    },
    math::{centered, reduce_i64},
    rings::RnsPoly,
};

/// A BGV ciphertext. Its level is internal: products are followed by a
/// modulus switch while the chain has primes left, and operands at
/// different levels are switched down to the lower one.
#[derive(Debug, Clone)]
pub struct BgvCiphertext {
    state: Arc<BgvState>,
    parts: Vec<RnsPoly>,
}

impl BgvCiphertext {
    pub(crate) fn new(state: Arc<BgvState>) -> Self {
        Self {
            state,
            parts: Vec::new(),
        }
    }

    pub(crate) fn set(&mut self, parts: Vec<RnsPoly>) {
        self.parts = parts;
    }

    pub(crate) fn parts(&self) -> HeResult<&[RnsPoly]> {
        if self.parts.is_empty() {
            return Err(HeError::Empty { what: "ciphertext" });
        }
        Ok(&self.parts)
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

    /// Index of the top prime still present. Not exposed as a chain index.
    pub fn level(&self) -> HeResult<usize> {
        self.state.core.level_of(self.parts()?)
    }

    fn switch_down_to(&mut self, level: usize) -> HeResult<()> {
        while self.level()? > level {
            self.state.core.divide_by_last_prime(&mut self.parts)?;
        }
        Ok(())
    }

    fn switch_after_product(&mut self) -> HeResult<()> {
        if self.level()? > 0 {
            self.state.core.divide_by_last_prime(&mut self.parts)?;
        }
        Ok(())
    }

    fn aligned(&mut self, other: &BgvCiphertext) -> HeResult<BgvCiphertext> {
        let level = self.level()?;
        let other_level = other.level()?;
        self.switch_down_to(other_level)?;
        let mut other = other.clone();
        other.switch_down_to(level)?;
        Ok(other)
    }

    fn add_impl(&mut self, other: &dyn AbstractCiphertext, negate: bool) -> HeResult<()> {
        let other = self.aligned(Self::downcast(other)?)?;
        for (i, part) in other.parts.into_iter().enumerate() {
            let term = if negate { -part } else { part };
            match self.parts.get_mut(i) {
                Some(mine) => *mine += &term,
                None => self.parts.push(term),
            }
        }
        Ok(())
    }

    fn plain_impl(&mut self, plain: &dyn AbstractPlaintext, negate: bool) -> HeResult<()> {
        let poly = BgvPlaintext::downcast(plain)?.poly_at(self.level()?)?;
        let poly = if negate { -poly } else { poly };
        self.parts[0] += &poly;
        Ok(())
    }

    fn constant(&self, value: i64) -> HeResult<RnsPoly> {
        let t = self.state.plaintext_modulus();
        let value = centered(reduce_i64(value, t), t);
        let mut poly = RnsPoly::from_coeffs(&[value], Arc::clone(self.state.core.chain().level(self.level()?)));
        poly.to_ntt_domain();
        Ok(poly)
    }
}

fn rounded(scalar: f64) -> HeResult<i64> {
    let value = scalar.round();
    if !value.is_finite() || value.abs() >= 2f64.powi(62) {
        return Err(HeError::invalid(format!("scalar {scalar} is not a representable integer")));
    }
    Ok(value as i64)
}

impl AbstractCiphertext for BgvCiphertext {
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
        Box::new(BgvEncoder::new(Arc::clone(&self.state)))
    }

    fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| save_parts(out, &self.parts))
    }

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let chain = self.state.core.chain();
        let mut parts = Vec::new();
        let read = counted_load(input, |input| {
            parts = load_parts(input, chain)?;
            Ok(())
        })?;
        self.parts = parts;
        Ok(read)
    }

    fn add(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, false)
    }

    fn add_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, false)
    }

    fn sub(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, true)
    }

    fn sub_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.add_impl(other, true)
    }

    fn multiply(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        let mut other = self.aligned(Self::downcast(other)?)?;
        self.relinearize()?;
        other.relinearize()?;
        self.parts = self.state.core.tensor(&self.parts, &other.parts)?;
        self.relinearize()?;
        self.switch_after_product()
    }

    fn multiply_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.multiply(other)
    }

    fn add_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, false)
    }

    fn add_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, false)
    }

    fn sub_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, true)
    }

    fn sub_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.plain_impl(plain, true)
    }

    fn multiply_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        let poly = BgvPlaintext::downcast(plain)?.poly_at(self.level()?)?;
        for part in &mut self.parts {
            *part *= &poly;
        }
        self.switch_after_product()
    }

    fn multiply_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.multiply_plain(plain)
    }

    /// Rounds `scalar` to an integer first.
    fn add_scalar(&mut self, scalar: f64) -> HeResult<()> {
        self.add_scalar_int(rounded(scalar)?)
    }

    fn add_scalar_int(&mut self, scalar: i64) -> HeResult<()> {
        let constant = self.constant(scalar)?;
        self.parts[0] += &constant;
        Ok(())
    }

    /// Rounds `scalar` to an integer first.
    fn multiply_scalar(&mut self, scalar: f64) -> HeResult<()> {
        self.multiply_scalar_int(rounded(scalar)?)
    }

    fn multiply_scalar_int(&mut self, scalar: i64) -> HeResult<()> {
        self.parts()?;
        let t = self.state.plaintext_modulus();
        let scalar = centered(reduce_i64(scalar, t), t);
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
        Ok(())
    }

    fn rescale_raw(&mut self) -> HeResult<()> {
        Ok(())
    }

    fn chain_index(&self) -> i32 {
        -1
    }

    fn set_chain_index(&mut self, _chain_index: i32) -> HeResult<()> {
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.state.core.slots()
    }

    fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
