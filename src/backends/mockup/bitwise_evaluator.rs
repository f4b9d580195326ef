use std::{io::Write, sync::Arc};

use num_complex::Complex64;

use super::{ciphertext::MockupCiphertext, config::MAX_NUM_BITS, context::MockupState};
use crate::{
    error::{HeError, HeResult},
    hebase::{AbstractBitwiseEvaluator, AbstractCiphertext},
};

/// Two's complement view of `value` at `bits` bits.
fn wrap(value: i128, bits: u32, signed: bool) -> i128 {
    let modulus = 1i128 << bits;
    let m = value.rem_euclid(modulus);
    if signed && m >= modulus / 2 {
        m - modulus
    } else {
        m
    }
}

fn unsigned_bits(value: i128, bits: u32) -> u64 {
    wrap(value, bits, false) as u64
}

/// Bits needed to hold any count in `0..=count`.
fn bits_for_count(count: usize) -> u32 {
    (usize::BITS - count.leading_zeros()).max(1)
}

fn check_width(bits: u32) -> HeResult<u32> {
    if !(1..=MAX_NUM_BITS).contains(&bits) {
        return Err(HeError::invalid(format!(
            "bit width {bits} outside 1..={MAX_NUM_BITS}"
        )));
    }
    Ok(bits)
}

/// A ciphertext's slots as integers, with its format.
struct Operand<'a> {
    cipher: &'a MockupCiphertext,
    ints: Vec<i128>,
}

impl<'a> Operand<'a> {
    fn new(c: &'a dyn AbstractCiphertext) -> HeResult<Self> {
        let cipher = MockupCiphertext::downcast(c)?;
        let ints = cipher
            .values()?
            .iter()
            .map(|z| wrap(z.re.round() as i128, cipher.num_bits(), cipher.is_signed()))
            .collect();
        Ok(Self { cipher, ints })
    }

    fn bits(&self) -> u32 {
        self.cipher.num_bits()
    }

    fn signed(&self) -> bool {
        self.cipher.is_signed()
    }
}

/// Bitwise operations evaluated directly on the clear slot values.
#[derive(Debug, Clone)]
pub struct MockupBitwiseEvaluator {
    state: Arc<MockupState>,
}

impl MockupBitwiseEvaluator {
    pub(crate) fn new(state: Arc<MockupState>) -> Self {
        Self { state }
    }

    fn output(
        &self,
        like: &MockupCiphertext,
        chain_index: i32,
        values: impl IntoIterator<Item = i128>,
        bits: u32,
        signed: bool,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        let bits = check_width(bits)?;
        let values = values
            .into_iter()
            .map(|v| Complex64::new(wrap(v, bits, signed) as f64, 0.0))
            .collect();
        let mut out = like.clone();
        out.set(values, chain_index);
        out.set_bit_format(bits, signed);
        Ok(Box::new(out))
    }

    fn pairwise(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        bits: impl FnOnce(&Operand, &Operand) -> u32,
        signed: impl FnOnce(&Operand, &Operand) -> bool,
        f: impl Fn(i128, i128) -> i128,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        let a = Operand::new(c1)?;
        let b = Operand::new(c2)?;
        let chain_index = a.cipher.chain_index().min(b.cipher.chain_index());
        let values: Vec<i128> = a.ints.iter().zip(&b.ints).map(|(&x, &y)| f(x, y)).collect();
        self.output(a.cipher, chain_index, values, bits(&a, &b), signed(&a, &b))
    }

    fn compare(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        f: impl Fn(i128, i128) -> bool,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.pairwise(c1, c2, |_, _| 1, |_, _| false, |x, y| i128::from(f(x, y)))
    }
}

impl AbstractBitwiseEvaluator for MockupBitwiseEvaluator {
    fn get_msb(&self, c: &dyn AbstractCiphertext) -> HeResult<Box<dyn AbstractCiphertext>> {
        let a = Operand::new(c)?;
        let top = a.bits() - 1;
        let msb = a.ints.iter().map(|&v| i128::from((unsigned_bits(v, a.bits()) >> top) & 1));
        self.output(a.cipher, a.cipher.chain_index(), msb, 1, false)
    }

    fn get_flipped_msb(&self, c: &dyn AbstractCiphertext) -> HeResult<Box<dyn AbstractCiphertext>> {
        let a = Operand::new(c)?;
        let top = a.bits() - 1;
        let flipped = a
            .ints
            .iter()
            .map(|&v| 1 - i128::from((unsigned_bits(v, a.bits()) >> top) & 1));
        self.output(a.cipher, a.cipher.chain_index(), flipped, 1, false)
    }

    fn hamming_weight(
        &self,
        c: &dyn AbstractCiphertext,
        from: usize,
        to: Option<usize>,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        let a = Operand::new(c)?;
        let to = to.unwrap_or(a.bits() as usize);
        if from >= to || to > a.bits() as usize {
            return Err(HeError::invalid(format!(
                "bit range {from}..{to} is not inside 0..{}",
                a.bits()
            )));
        }
        let mask = ((1u64 << (to - from)) - 1) << from;
        let weights = a
            .ints
            .iter()
            .map(|&v| i128::from((unsigned_bits(v, a.bits()) & mask).count_ones()));
        self.output(a.cipher, a.cipher.chain_index(), weights, bits_for_count(to - from), false)
    }

    fn set_is_signed(&self, c: &mut dyn AbstractCiphertext, signed: bool) -> HeResult<()> {
        let a = Operand::new(c)?;
        let bits = a.bits();
        let chain_index = a.cipher.chain_index();
        let values: Vec<Complex64> = a
            .ints
            .iter()
            .map(|&v| Complex64::new(wrap(v, bits, signed) as f64, 0.0))
            .collect();
        let c = MockupCiphertext::downcast_mut(c)?;
        c.set(values, chain_index);
        c.set_bit_format(bits, signed);
        Ok(())
    }

    fn is_signed(&self, c: &dyn AbstractCiphertext) -> HeResult<bool> {
        Ok(MockupCiphertext::downcast(c)?.is_signed())
    }

    fn split(&self, c: &dyn AbstractCiphertext) -> HeResult<Vec<Box<dyn AbstractCiphertext>>> {
        let a = Operand::new(c)?;
        (0..a.bits())
            .map(|bit| {
                let bits = a
                    .ints
                    .iter()
                    .map(|&v| i128::from((unsigned_bits(v, a.bits()) >> bit) & 1));
                self.output(a.cipher, a.cipher.chain_index(), bits, 1, false)
            })
            .collect()
    }

    fn combine(
        &self,
        cs: &[&dyn AbstractCiphertext],
        from: usize,
        to: Option<usize>,
        bits_per_element: u32,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        let to = to.unwrap_or(cs.len());
        if from >= to || to > cs.len() {
            return Err(HeError::invalid(format!(
                "element range {from}..{to} is not inside 0..{}",
                cs.len()
            )));
        }
        let total_bits = u32::try_from(to - from)
            .ok()
            .and_then(|n| n.checked_mul(bits_per_element))
            .ok_or_else(|| {
                HeError::invalid(format!(
                    "{} elements of {bits_per_element} bits overflow the bit width",
                    to - from
                ))
            })?;
        let total_bits = check_width(total_bits)?;
        let operands = cs[from..to]
            .iter()
            .map(|&c| Operand::new(c))
            .collect::<HeResult<Vec<_>>>()?;
        let first = &operands[0];
        let chain_index = operands
            .iter()
            .map(|o| o.cipher.chain_index())
            .min()
            .unwrap_or(first.cipher.chain_index());
        let combined = (0..first.ints.len()).map(|slot| {
            operands.iter().enumerate().fold(0i128, |acc, (i, o)| {
                let element = unsigned_bits(o.ints[slot], bits_per_element) as i128;
                acc | (element << (i as u32 * bits_per_element))
            })
        });
        self.output(first.cipher, chain_index, combined, total_bits, false)
    }

    fn is_equal(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.compare(c1, c2, |x, y| x == y)
    }

    /// Width defaults to the sum of the operand widths.
    fn multiply(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        target_bits: Option<u32>,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.pairwise(
            c1,
            c2,
            |a, b| target_bits.unwrap_or(a.bits() + b.bits()),
            |a, b| a.signed() || b.signed(),
            |x, y| x * y,
        )
    }

    /// Width defaults to one more than the wider operand.
    fn add(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        target_bits: Option<u32>,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.pairwise(
            c1,
            c2,
            |a, b| target_bits.unwrap_or(a.bits().max(b.bits()) + 1),
            |a, b| a.signed() || b.signed(),
            |x, y| x + y,
        )
    }

    /// Width defaults to the wider operand; the result is signed.
    fn sub(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        target_bits: Option<u32>,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.pairwise(
            c1,
            c2,
            |a, b| target_bits.unwrap_or(a.bits().max(b.bits())),
            |_, _| true,
            |x, y| x - y,
        )
    }

    fn multiply_bit(
        &self,
        c: &dyn AbstractCiphertext,
        bit: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        if MockupCiphertext::downcast(bit)?.num_bits() != 1 {
            return Err(HeError::invalid("multiply_bit expects a 1-bit ciphertext"));
        }
        self.pairwise(c, bit, |a, _| a.bits(), |a, _| a.signed(), |x, b| x * b)
    }

    fn bitwise_xor(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        let a = Operand::new(c1)?;
        let b = Operand::new(c2)?;
        let bits = a.bits().max(b.bits());
        let chain_index = a.cipher.chain_index().min(b.cipher.chain_index());
        let xored = a
            .ints
            .iter()
            .zip(&b.ints)
            .map(|(&x, &y)| i128::from(unsigned_bits(x, bits) ^ unsigned_bits(y, bits)));
        self.output(a.cipher, chain_index, xored, bits, a.signed())
    }

    fn num_bits(&self, c: &dyn AbstractCiphertext) -> HeResult<u32> {
        Ok(MockupCiphertext::downcast(c)?.num_bits())
    }

    /// Truncates or widens every slot to `bits`, keeping the signedness.
    fn set_num_bits(&self, c: &mut dyn AbstractCiphertext, bits: u32) -> HeResult<()> {
        let bits = check_width(bits)?;
        let a = Operand::new(c)?;
        let signed = a.signed();
        let chain_index = a.cipher.chain_index();
        let values: Vec<Complex64> = a
            .ints
            .iter()
            .map(|&v| Complex64::new(wrap(v, bits, signed) as f64, 0.0))
            .collect();
        let c = MockupCiphertext::downcast_mut(c)?;
        c.set(values, chain_index);
        c.set_bit_format(bits, signed);
        Ok(())
    }

    fn default_num_bits(&self) -> u32 {
        self.state.config.default_num_bits
    }

    fn scale(&self, c: &dyn AbstractCiphertext) -> HeResult<f64> {
        MockupCiphertext::downcast(c)?;
        Ok(1.0)
    }

    fn max(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.pairwise(
            c1,
            c2,
            |a, b| a.bits().max(b.bits()),
            |a, b| a.signed() || b.signed(),
            i128::max,
        )
    }

    fn min(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.pairwise(
            c1,
            c2,
            |a, b| a.bits().max(b.bits()),
            |a, b| a.signed() || b.signed(),
            i128::min,
        )
    }

    fn is_greater(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.compare(c1, c2, |x, y| x > y)
    }

    fn is_less(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.compare(c1, c2, |x, y| x < y)
    }

    fn is_greater_equal(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.compare(c1, c2, |x, y| x >= y)
    }

    fn is_less_equal(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>> {
        self.compare(c1, c2, |x, y| x <= y)
    }

    fn debug_print_with_binary(
        &self,
        c: &dyn AbstractCiphertext,
        title: &str,
        max_elements: usize,
        out: &mut dyn Write,
    ) -> HeResult<()> {
        let a = Operand::new(c)?;
        let bits = a.bits() as usize;
        writeln!(out, "{title}")?;
        writeln!(
            out,
            "bits={} signed={} chain_index={}",
            bits,
            a.signed(),
            a.cipher.chain_index()
        )?;
        for (i, &v) in a.ints.iter().take(max_elements).enumerate() {
            writeln!(out, "[{i}] {v} {:0bits$b}", unsigned_bits(v, a.bits()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_twos_complement() {
        assert_eq!(wrap(5, 3, false), 5);
        assert_eq!(wrap(5, 3, true), -3);
        assert_eq!(wrap(-1, 8, false), 255);
        assert_eq!(wrap(256 + 7, 8, true), 7);
    }

    #[test]
    fn count_widths() {
        assert_eq!(bits_for_count(1), 1);
        assert_eq!(bits_for_count(3), 2);
        assert_eq!(bits_for_count(4), 3);
        assert_eq!(bits_for_count(16), 5);
    }
}
