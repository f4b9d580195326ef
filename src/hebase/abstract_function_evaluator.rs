use std::fmt;

use super::abstract_ciphertext::AbstractCiphertext;
use crate::error::{HeError, HeResult};

/// Functions a backend can evaluate natively, faster than composing them
/// from [`AbstractCiphertext`] operations.
pub trait AbstractFunctionEvaluator: Send + Sync + fmt::Debug {
    fn backend_name(&self) -> &'static str;

    /// `c = c^power` slot-wise.
    fn power_in_place(&self, c: &mut dyn AbstractCiphertext, power: u32) -> HeResult<()> {
        let _ = (c, power);
        Err(HeError::unsupported("power_in_place", self.backend_name()))
    }

    /// Slot-wise product of all of `cs`.
    fn total_product(&self, cs: &[&dyn AbstractCiphertext]) -> HeResult<Box<dyn AbstractCiphertext>> {
        let _ = cs;
        Err(HeError::unsupported("total_product", self.backend_name()))
    }
}

/// Left-to-right square-and-multiply on any ciphertext. Uses at most
/// `2 log2(power)` multiplications.
pub fn power_by_squaring(c: &mut dyn AbstractCiphertext, power: u32) -> HeResult<()> {
    if power == 0 {
        return Err(HeError::invalid("power must be at least 1"));
    }
    let base = c.clone_box();
    let bits = u32::BITS - power.leading_zeros();
    for j in (0..bits - 1).rev() {
        c.square()?;
        if (power >> j) & 1 == 1 {
            c.multiply(base.as_ref())?;
        }
    }
    Ok(())
}

/// Balanced product tree, so depth grows with `log2(cs.len())`.
pub fn product_tree(cs: &[&dyn AbstractCiphertext]) -> HeResult<Box<dyn AbstractCiphertext>> {
    let mut layer: Vec<Box<dyn AbstractCiphertext>> = cs.iter().map(|c| c.clone_box()).collect();
    if layer.is_empty() {
        return Err(HeError::Empty { what: "total_product input" });
    }
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        let mut iter = layer.into_iter();
        while let Some(mut left) = iter.next() {
            if let Some(right) = iter.next() {
                left.multiply(right.as_ref())?;
            }
            next.push(left);
        }
        layer = next;
    }
    layer.pop().ok_or(HeError::Empty { what: "total_product input" })
}
