use std::{fmt, io::Write};

use super::abstract_ciphertext::AbstractCiphertext;
use crate::error::HeResult;

/// Integer-circuit operations on ciphertexts that carry a bit width and a
/// signedness.
///
/// Every slot holds a `num_bits`-wide integer, two's complement when signed.
/// Results wrap to the width stated for each operation.
pub trait AbstractBitwiseEvaluator: Send + Sync + fmt::Debug {
    /// Most significant bit, as a 1-bit unsigned value.
    fn get_msb(&self, c: &dyn AbstractCiphertext) -> HeResult<Box<dyn AbstractCiphertext>>;

    /// `1 - msb`.
    fn get_flipped_msb(&self, c: &dyn AbstractCiphertext) -> HeResult<Box<dyn AbstractCiphertext>>;

    /// Number of set bits among bits `from..to` (`to = None` means all).
    fn hamming_weight(
        &self,
        c: &dyn AbstractCiphertext,
        from: usize,
        to: Option<usize>,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn set_is_signed(&self, c: &mut dyn AbstractCiphertext, signed: bool) -> HeResult<()>;

    fn is_signed(&self, c: &dyn AbstractCiphertext) -> HeResult<bool>;

    /// The bits of `c`, least significant first, each a 1-bit ciphertext.
    fn split(&self, c: &dyn AbstractCiphertext) -> HeResult<Vec<Box<dyn AbstractCiphertext>>>;

    /// Inverse of [`split`](AbstractBitwiseEvaluator::split): element `i` of
    /// `cs[from..to]` is shifted left by `(i - from) * bits_per_element`.
    fn combine(
        &self,
        cs: &[&dyn AbstractCiphertext],
        from: usize,
        to: Option<usize>,
        bits_per_element: u32,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn is_equal(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn multiply(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        target_bits: Option<u32>,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn add(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        target_bits: Option<u32>,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn sub(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
        target_bits: Option<u32>,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    /// `c` where `bit` is 1, zero elsewhere.
    fn multiply_bit(
        &self,
        c: &dyn AbstractCiphertext,
        bit: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn bitwise_xor(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn num_bits(&self, c: &dyn AbstractCiphertext) -> HeResult<u32>;

    /// Changes the width, wrapping every slot into the new range.
    fn set_num_bits(&self, c: &mut dyn AbstractCiphertext, bits: u32) -> HeResult<()>;

    fn default_num_bits(&self) -> u32;

    fn scale(&self, c: &dyn AbstractCiphertext) -> HeResult<f64>;

    fn max(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn min(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn is_greater(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn is_less(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn is_greater_equal(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn is_less_equal(
        &self,
        c1: &dyn AbstractCiphertext,
        c2: &dyn AbstractCiphertext,
    ) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn debug_print_with_binary(
        &self,
        c: &dyn AbstractCiphertext,
        title: &str,
        max_elements: usize,
        out: &mut dyn Write,
    ) -> HeResult<()>;
}
