use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use num_complex::Complex64;

use super::{
    BACKEND_NAME,
    config::MAX_NUM_BITS,
    context::MockupState,
    encoder::MockupEncoder,
    plaintext::{MockupPlaintext, check_stored_values, read_complex, write_complex},
};
use crate::{
    error::{HeError, HeResult},
    hebase::{
        AbstractCiphertext, AbstractEncoder, AbstractPlaintext, bin_io,
        he_context::{counted_load, counted_save},
    },
};

/// Clear values plus the metadata a real ciphertext would carry: chain
/// index, and the bit width and signedness used by bitwise operations.
#[derive(Debug, Clone)]
pub struct MockupCiphertext {
    state: Arc<MockupState>,
    values: Option<Vec<Complex64>>,
    chain_index: i32,
    num_bits: u32,
    is_signed: bool,
}

impl MockupCiphertext {
    pub(crate) fn new(state: Arc<MockupState>) -> Self {
        let num_bits = state.config.default_num_bits;
        Self {
            state,
            values: None,
            chain_index: -1,
            num_bits,
            is_signed: true,
        }
    }

    pub(crate) fn set(&mut self, values: Vec<Complex64>, chain_index: i32) {
        self.values = Some(values);
        self.chain_index = chain_index;
    }

    pub(crate) fn values(&self) -> HeResult<&[Complex64]> {
        self.values.as_deref().ok_or(HeError::Empty { what: "ciphertext" })
    }

    fn values_mut(&mut self) -> HeResult<&mut Vec<Complex64>> {
        self.values.as_mut().ok_or(HeError::Empty { what: "ciphertext" })
    }

    pub(crate) fn num_bits(&self) -> u32 {
        self.num_bits
    }

    pub(crate) fn is_signed(&self) -> bool {
        self.is_signed
    }

    pub(crate) fn set_bit_format(&mut self, num_bits: u32, is_signed: bool) {
        self.num_bits = num_bits;
        self.is_signed = is_signed;
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

    fn zip_with(&mut self, other: &[Complex64], f: impl Fn(Complex64, Complex64) -> Complex64) -> HeResult<()> {
        for (mine, &theirs) in self.values_mut()?.iter_mut().zip(other) {
            *mine = f(*mine, theirs);
        }
        Ok(())
    }

    fn map(&mut self, f: impl Fn(Complex64) -> Complex64) -> HeResult<()> {
        for v in self.values_mut()? {
            *v = f(*v);
        }
        Ok(())
    }

    /// Chain index both operands end up at. Raw operations require them to
    /// already agree.
    fn joint_chain_index(&self, other: i32, raw: bool) -> HeResult<i32> {
        self.values()?;
        if raw && self.chain_index != other {
            return Err(HeError::ChainIndexMismatch {
                lhs: self.chain_index,
                rhs: other,
            });
        }
        Ok(self.chain_index.min(other))
    }

    /// Chain index one level below `chain_index`.
    fn level_below(&self, chain_index: i32) -> HeResult<i32> {
        if chain_index <= 0 {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index: chain_index - 1,
                min: 0,
                max: self.state.config.top_chain_index,
            });
        }
        Ok(chain_index - 1)
    }

    /// Nothing is modified unless every check passes.
    fn apply_binary(
        &mut self,
        other: &[Complex64],
        other_chain_index: i32,
        raw: bool,
        rescale: bool,
        f: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> HeResult<()> {
        let mut chain_index = self.joint_chain_index(other_chain_index, raw)?;
        if rescale {
            chain_index = self.level_below(chain_index)?;
        }
        self.zip_with(other, f)?;
        self.chain_index = chain_index;
        Ok(())
    }

    fn binary(
        &mut self,
        other: &dyn AbstractCiphertext,
        raw: bool,
        rescale: bool,
        f: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> HeResult<()> {
        let other = Self::downcast(other)?;
        self.apply_binary(other.values()?, other.chain_index, raw, rescale, f)
    }

    fn binary_plain(
        &mut self,
        plain: &dyn AbstractPlaintext,
        raw: bool,
        rescale: bool,
        f: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> HeResult<()> {
        let plain = MockupPlaintext::downcast(plain)?;
        self.apply_binary(plain.values()?, plain.chain_index(), raw, rescale, f)
    }

    fn check_loaded(&self) -> HeResult<()> {
        if !(1..=MAX_NUM_BITS).contains(&self.num_bits) {
            return Err(HeError::corrupt(format!("bit width {} is out of range", self.num_bits)));
        }
        check_stored_values(&self.state, self.values.as_deref(), self.chain_index)
    }

    fn consume_level(&mut self) -> HeResult<()> {
        self.chain_index = self.level_below(self.chain_index)?;
        Ok(())
    }
}

impl AbstractCiphertext for MockupCiphertext {
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
        Box::new(MockupEncoder::new(Arc::clone(&self.state)))
    }

    fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            bin_io::write_i32(out, self.chain_index)?;
            bin_io::write_u32(out, self.num_bits)?;
            bin_io::write_bool(out, self.is_signed)?;
            bin_io::write_bool(out, self.values.is_some())?;
            write_complex(out, self.values.as_deref().unwrap_or_default())
        })
    }

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut loaded = self.clone();
        let read = counted_load(input, |input| {
            loaded.chain_index = bin_io::read_i32(input)?;
            loaded.num_bits = bin_io::read_u32(input)?;
            loaded.is_signed = bin_io::read_bool(input)?;
            let present = bin_io::read_bool(input)?;
            let values = read_complex(input)?;
            loaded.values = present.then_some(values);
            Ok(())
        })?;
        loaded.check_loaded()?;
        *self = loaded;
        Ok(read)
    }

    fn add(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.binary(other, false, false, |a, b| a + b)
    }

    fn add_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.binary(other, true, false, |a, b| a + b)
    }

    fn sub(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.binary(other, false, false, |a, b| a - b)
    }

    fn sub_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.binary(other, true, false, |a, b| a - b)
    }

    fn multiply(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.binary(other, false, true, |a, b| a * b)
    }

    fn multiply_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.binary(other, true, false, |a, b| a * b)
    }

    fn add_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.binary_plain(plain, false, false, |a, b| a + b)
    }

    fn add_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.binary_plain(plain, true, false, |a, b| a + b)
    }

    fn sub_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.binary_plain(plain, false, false, |a, b| a - b)
    }

    fn sub_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.binary_plain(plain, true, false, |a, b| a - b)
    }

    fn multiply_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.binary_plain(plain, false, true, |a, b| a * b)
    }

    fn multiply_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()> {
        self.binary_plain(plain, true, false, |a, b| a * b)
    }

    fn add_scalar(&mut self, scalar: f64) -> HeResult<()> {
        self.map(|v| v + scalar)
    }

    fn multiply_scalar(&mut self, scalar: f64) -> HeResult<()> {
        self.values()?;
        self.consume_level()?;
        self.map(|v| v * scalar)
    }

    fn multiply_scalar_int(&mut self, scalar: i64) -> HeResult<()> {
        self.map(|v| v * scalar as f64)
    }

    fn negate(&mut self) -> HeResult<()> {
        self.map(|v| -v)
    }

    fn conjugate(&mut self) -> HeResult<()> {
        self.map(|v| v.conj())
    }

    /// Slot `i` receives slot `i + n`, cyclically.
    fn rotate(&mut self, n: i32) -> HeResult<()> {
        let values = self.values_mut()?;
        let len = values.len() as i64;
        values.rotate_left((n as i64).rem_euclid(len) as usize);
        Ok(())
    }

    fn relinearize(&mut self) -> HeResult<()> {
        self.values().map(|_| ())
    }

    fn rescale(&mut self) -> HeResult<()> {
        self.rescale_raw()
    }

    fn rescale_raw(&mut self) -> HeResult<()> {
        self.values()?;
        self.consume_level()
    }

    fn chain_index(&self) -> i32 {
        self.chain_index
    }

    fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()> {
        self.values()?;
        if chain_index > self.chain_index {
            return Err(HeError::ChainIndexIncrease {
                current: self.chain_index,
                requested: chain_index,
            });
        }
        if chain_index < 0 {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index,
                min: 0,
                max: self.state.config.top_chain_index,
            });
        }
        self.chain_index = chain_index;
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.state.config.num_slots
    }

    fn is_empty(&self) -> bool {
        self.values.is_none()
    }
}
