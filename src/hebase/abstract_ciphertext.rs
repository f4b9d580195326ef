use std::{
    any::Any,
    fmt,
    io::{Read, Write},
};

use super::{abstract_encoder::AbstractEncoder, abstract_plaintext::AbstractPlaintext};
use crate::error::{HeError, HeResult};

/// Backend side of a [`CTile`](crate::CTile).
///
/// Binary operations take the other operand as a trait object. A backend
/// downcasts it through [`AbstractCiphertext::as_any`] and returns
/// [`HeError::BackendMismatch`] when it was created by someone else.
///
/// Non-raw operations are free to realign chain indices and to relinearize
/// and rescale. Raw operations do the bare minimum and fail on mismatched
/// chain indices.
pub trait AbstractCiphertext: Send + Sync + fmt::Debug {
    fn clone_box(&self) -> Box<dyn AbstractCiphertext>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn backend_name(&self) -> &'static str;

    /// An encoder for the context this ciphertext belongs to.
    fn encoder(&self) -> Box<dyn AbstractEncoder>;

    fn save(&self, out: &mut dyn Write) -> HeResult<u64>;

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64>;

    fn add(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()>;

    fn add_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()>;

    fn sub(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()>;

    fn sub_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()>;

    /// Multiply, relinearize and rescale.
    fn multiply(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()>;

    fn multiply_raw(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()>;

    fn square(&mut self) -> HeResult<()> {
        let other = self.clone_box();
        self.multiply(other.as_ref())
    }

    fn square_raw(&mut self) -> HeResult<()> {
        let other = self.clone_box();
        self.multiply_raw(other.as_ref())
    }

    fn add_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()>;

    fn add_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()>;

    fn sub_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()>;

    fn sub_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()>;

    fn multiply_plain(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()>;

    fn multiply_plain_raw(&mut self, plain: &dyn AbstractPlaintext) -> HeResult<()>;

    fn add_scalar(&mut self, scalar: f64) -> HeResult<()>;

    fn add_scalar_int(&mut self, scalar: i64) -> HeResult<()> {
        self.add_scalar(scalar as f64)
    }

    fn multiply_scalar(&mut self, scalar: f64) -> HeResult<()>;

    fn multiply_scalar_int(&mut self, scalar: i64) -> HeResult<()>;

    fn negate(&mut self) -> HeResult<()>;

    fn conjugate(&mut self) -> HeResult<()>;

    fn conjugate_raw(&mut self) -> HeResult<()> {
        self.conjugate()
    }

    /// Rotates left: slot `i` receives the value of slot `i + n`.
    fn rotate(&mut self, n: i32) -> HeResult<()>;

    /// Rotate-and-add ladder for `rot = rot1, 2*rot1, ...` while `rot < rot2`.
    /// With `reverse` the rotations go right instead of left.
    fn inner_sum(&mut self, rot1: i32, rot2: i32, reverse: bool) -> HeResult<()> {
        if rot1 <= 0 {
            return Err(HeError::invalid(format!("inner_sum: rot1 must be positive, got {rot1}")));
        }
        let mut rot = rot1;
        while rot < rot2 {
            let mut tmp = self.clone_box();
            tmp.rotate(if reverse { -rot } else { rot })?;
            self.add(tmp.as_ref())?;
            rot *= 2;
        }
        Ok(())
    }

    /// Slot `i` becomes the sum of slots `i..i+n`, using about `2 log2(n)`
    /// rotations. Scans the bits of `n` from the most significant one.
    fn sum_exp_by_squaring_left_to_right(&mut self, n: u32) -> HeResult<()> {
        if n == 0 {
            return Ok(());
        }
        let v = self.clone_box();
        let bits = u32::BITS - n.leading_zeros();
        let mut e: i32 = 1;
        for j in (0..bits - 1).rev() {
            let mut tmp = self.clone_box();
            tmp.rotate(e)?;
            self.add(tmp.as_ref())?;
            e *= 2;
            if (n >> j) & 1 == 1 {
                self.rotate(1)?;
                self.add(v.as_ref())?;
                e += 1;
            }
        }
        Ok(())
    }

    /// Same result as [`sum_exp_by_squaring_left_to_right`], scanning the
    /// bits of `n` from the least significant one.
    ///
    /// [`sum_exp_by_squaring_left_to_right`]: AbstractCiphertext::sum_exp_by_squaring_left_to_right
    fn sum_exp_by_squaring_right_to_left(&mut self, n: u32) -> HeResult<()> {
        let mut n = n;
        if n == 0 {
            return Ok(());
        }
        let mut y: Option<Box<dyn AbstractCiphertext>> = None;
        let mut curr_exp: i32 = 1;
        while n > 1 {
            if n % 2 == 1 {
                y = Some(match y.take() {
                    None => self.clone_box(),
                    Some(mut prev) => {
                        prev.rotate(curr_exp)?;
                        let mut tmp = self.clone_box();
                        tmp.add(prev.as_ref())?;
                        tmp
                    }
                });
            }
            let mut tmp = self.clone_box();
            tmp.rotate(curr_exp)?;
            self.add(tmp.as_ref())?;
            curr_exp *= 2;
            n /= 2;
        }
        if let Some(mut y) = y {
            y.rotate(curr_exp)?;
            self.add(y.as_ref())?;
        }
        Ok(())
    }

    /// Reduces a size-3 product back to size 2. No-op on size-2 ciphertexts.
    fn relinearize(&mut self) -> HeResult<()>;

    fn rescale(&mut self) -> HeResult<()>;

    fn rescale_raw(&mut self) -> HeResult<()>;

    /// Chain index, or -1 where chain indices are managed by the backend.
    fn chain_index(&self) -> i32;

    /// Lowers the chain index. Raising it is an error.
    fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()>;

    fn set_chain_index_like(&mut self, other: &dyn AbstractCiphertext) -> HeResult<()> {
        self.set_chain_index(other.chain_index())
    }

    fn reduce_chain_index(&mut self) -> HeResult<()> {
        let current = self.chain_index();
        if current < 0 {
            return Ok(());
        }
        self.set_chain_index(current - 1)
    }

    fn scale(&self) -> HeResult<f64> {
        Err(HeError::unsupported("scale", self.backend_name()))
    }

    /// Changes the scale without touching the data, so decoded values are
    /// multiplied by `old_scale / scale`.
    fn set_scale(&mut self, scale: f64) -> HeResult<()> {
        let _ = scale;
        Err(HeError::unsupported("set_scale", self.backend_name()))
    }

    /// Multiplies the decoded values by `factor` by shrinking the scale.
    fn multiply_by_changing_scale(&mut self, factor: f64) -> HeResult<()> {
        let scale = self.scale()?;
        self.set_scale(scale / factor)
    }

    fn slot_count(&self) -> usize;

    fn is_empty(&self) -> bool;
}

impl Clone for Box<dyn AbstractCiphertext> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
