use std::io::Write;

use super::{abstract_bitwise_evaluator::AbstractBitwiseEvaluator, ctile::CTile, he_context::HeContext};
use crate::error::{HeError, HeResult};

/// Integer-circuit operations on [`CTile`]s, for contexts that support them.
#[derive(Debug)]
pub struct BitwiseEvaluator {
    inner: Box<dyn AbstractBitwiseEvaluator>,
}

impl BitwiseEvaluator {
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        if !he.traits().supports_bitwise_operations() {
            return Err(HeError::unsupported(
                "BitwiseEvaluator",
                format!("{} (no bitwise operations)", he.signature()),
            ));
        }
        Ok(Self {
            inner: he.get_bitwise_evaluator()?,
        })
    }

    pub fn get_msb(&self, c: &CTile) -> HeResult<CTile> {
        self.inner.get_msb(c.as_abstract()).map(CTile::from_abstract)
    }

    pub fn get_flipped_msb(&self, c: &CTile) -> HeResult<CTile> {
        self.inner.get_flipped_msb(c.as_abstract()).map(CTile::from_abstract)
    }

    /// Number of set bits among bits `from..to`; `to = None` means all bits.
    pub fn hamming_weight(&self, c: &CTile, from: usize, to: Option<usize>) -> HeResult<CTile> {
        self.inner
            .hamming_weight(c.as_abstract(), from, to)
            .map(CTile::from_abstract)
    }

    pub fn set_is_signed(&self, c: &mut CTile, signed: bool) -> HeResult<()> {
        self.inner.set_is_signed(c.as_abstract_mut(), signed)
    }

    pub fn is_signed(&self, c: &CTile) -> HeResult<bool> {
        self.inner.is_signed(c.as_abstract())
    }

    /// One ciphertext per bit, least significant first.
    pub fn split(&self, c: &CTile) -> HeResult<Vec<CTile>> {
        Ok(self
            .inner
            .split(c.as_abstract())?
            .into_iter()
            .map(CTile::from_abstract)
            .collect())
    }

    pub fn combine(
        &self,
        cs: &[CTile],
        from: usize,
        to: Option<usize>,
        bits_per_element: u32,
    ) -> HeResult<CTile> {
        let refs: Vec<_> = cs.iter().map(CTile::as_abstract).collect();
        self.inner
            .combine(&refs, from, to, bits_per_element)
            .map(CTile::from_abstract)
    }

    pub fn is_equal(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .is_equal(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn multiply(&self, c1: &CTile, c2: &CTile, target_bits: Option<u32>) -> HeResult<CTile> {
        self.inner
            .multiply(c1.as_abstract(), c2.as_abstract(), target_bits)
            .map(CTile::from_abstract)
    }

    pub fn add(&self, c1: &CTile, c2: &CTile, target_bits: Option<u32>) -> HeResult<CTile> {
        self.inner
            .add(c1.as_abstract(), c2.as_abstract(), target_bits)
            .map(CTile::from_abstract)
    }

    pub fn sub(&self, c1: &CTile, c2: &CTile, target_bits: Option<u32>) -> HeResult<CTile> {
        self.inner
            .sub(c1.as_abstract(), c2.as_abstract(), target_bits)
            .map(CTile::from_abstract)
    }

    pub fn multiply_bit(&self, c: &CTile, bit: &CTile) -> HeResult<CTile> {
        self.inner
            .multiply_bit(c.as_abstract(), bit.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn bitwise_xor(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .bitwise_xor(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn num_bits(&self, c: &CTile) -> HeResult<u32> {
        self.inner.num_bits(c.as_abstract())
    }

    pub fn set_num_bits(&self, c: &mut CTile, bits: u32) -> HeResult<()> {
        self.inner.set_num_bits(c.as_abstract_mut(), bits)
    }

    pub fn default_num_bits(&self) -> u32 {
        self.inner.default_num_bits()
    }

    pub fn scale(&self, c: &CTile) -> HeResult<f64> {
        self.inner.scale(c.as_abstract())
    }

    pub fn max(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .max(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn min(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .min(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn is_greater(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .is_greater(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn is_less(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .is_less(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn is_greater_equal(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .is_greater_equal(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn is_less_equal(&self, c1: &CTile, c2: &CTile) -> HeResult<CTile> {
        self.inner
            .is_less_equal(c1.as_abstract(), c2.as_abstract())
            .map(CTile::from_abstract)
    }

    pub fn debug_print_with_binary(
        &self,
        c: &CTile,
        title: &str,
        max_elements: usize,
        out: &mut dyn Write,
    ) -> HeResult<()> {
        self.inner
            .debug_print_with_binary(c.as_abstract(), title, max_elements, out)
    }
}
