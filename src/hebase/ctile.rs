use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use super::{
    abstract_ciphertext::AbstractCiphertext, abstract_plaintext::write_values,
    he_context::HeContext, ptile::PTile,
};
use crate::error::HeResult;

/// A ciphertext handle: an encrypted vector of slots.
///
/// All arithmetic happens in place. Cloning copies the ciphertext, so two
/// clones evolve independently.
///
/// For schemes with explicit chain indices, the non-raw binary operations
/// first lower the operand with the higher chain index, and `multiply`
/// relinearizes and rescales. The `_raw` variants skip all of that and fail
/// when chain indices differ.
#[derive(Debug, Clone)]
pub struct CTile {
    pub(crate) inner: Box<dyn AbstractCiphertext>,
}

impl CTile {
    /// An empty ciphertext of `he`. Fill it with an [`Encoder`](crate::Encoder).
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        Ok(Self {
            inner: he.create_abstract_cipher()?,
        })
    }

    pub fn from_abstract(inner: Box<dyn AbstractCiphertext>) -> Self {
        Self { inner }
    }

    pub fn as_abstract(&self) -> &dyn AbstractCiphertext {
        self.inner.as_ref()
    }

    pub fn as_abstract_mut(&mut self) -> &mut dyn AbstractCiphertext {
        self.inner.as_mut()
    }

    pub fn add(&mut self, other: &CTile) -> HeResult<()> {
        self.inner.add(other.inner.as_ref())
    }

    pub fn add_raw(&mut self, other: &CTile) -> HeResult<()> {
        self.inner.add_raw(other.inner.as_ref())
    }

    pub fn sub(&mut self, other: &CTile) -> HeResult<()> {
        self.inner.sub(other.inner.as_ref())
    }

    pub fn sub_raw(&mut self, other: &CTile) -> HeResult<()> {
        self.inner.sub_raw(other.inner.as_ref())
    }

    pub fn multiply(&mut self, other: &CTile) -> HeResult<()> {
        self.inner.multiply(other.inner.as_ref())
    }

    pub fn multiply_raw(&mut self, other: &CTile) -> HeResult<()> {
        self.inner.multiply_raw(other.inner.as_ref())
    }

    pub fn square(&mut self) -> HeResult<()> {
        self.inner.square()
    }

    pub fn square_raw(&mut self) -> HeResult<()> {
        self.inner.square_raw()
    }

    pub fn add_plain(&mut self, plain: &PTile) -> HeResult<()> {
        self.inner.add_plain(plain.inner.as_ref())
    }

    pub fn add_plain_raw(&mut self, plain: &PTile) -> HeResult<()> {
        self.inner.add_plain_raw(plain.inner.as_ref())
    }

    pub fn sub_plain(&mut self, plain: &PTile) -> HeResult<()> {
        self.inner.sub_plain(plain.inner.as_ref())
    }

    pub fn sub_plain_raw(&mut self, plain: &PTile) -> HeResult<()> {
        self.inner.sub_plain_raw(plain.inner.as_ref())
    }

    pub fn multiply_plain(&mut self, plain: &PTile) -> HeResult<()> {
        self.inner.multiply_plain(plain.inner.as_ref())
    }

    pub fn multiply_plain_raw(&mut self, plain: &PTile) -> HeResult<()> {
        self.inner.multiply_plain_raw(plain.inner.as_ref())
    }

    pub fn add_scalar(&mut self, scalar: f64) -> HeResult<()> {
        self.inner.add_scalar(scalar)
    }

    pub fn add_scalar_int(&mut self, scalar: i64) -> HeResult<()> {
        self.inner.add_scalar_int(scalar)
    }

    /// Multiplies every slot by `scalar`. On scaled schemes this consumes a
    /// chain index.
    pub fn multiply_scalar(&mut self, scalar: f64) -> HeResult<()> {
        self.inner.multiply_scalar(scalar)
    }

    pub fn multiply_scalar_int(&mut self, scalar: i64) -> HeResult<()> {
        self.inner.multiply_scalar_int(scalar)
    }

    pub fn negate(&mut self) -> HeResult<()> {
        self.inner.negate()
    }

    pub fn conjugate(&mut self) -> HeResult<()> {
        self.inner.conjugate()
    }

    pub fn conjugate_raw(&mut self) -> HeResult<()> {
        self.inner.conjugate_raw()
    }

    /// Rotates left by `n` slots. Negative `n` rotates right.
    pub fn rotate(&mut self, n: i32) -> HeResult<()> {
        self.inner.rotate(n)
    }

    pub fn inner_sum(&mut self, rot1: i32, rot2: i32, reverse: bool) -> HeResult<()> {
        self.inner.inner_sum(rot1, rot2, reverse)
    }

    /// Slot `i` becomes the sum of slots `i..i+n`.
    pub fn sum_exp_by_squaring(&mut self, n: u32) -> HeResult<()> {
        self.inner.sum_exp_by_squaring_left_to_right(n)
    }

    pub fn sum_exp_by_squaring_right_to_left(&mut self, n: u32) -> HeResult<()> {
        self.inner.sum_exp_by_squaring_right_to_left(n)
    }

    pub fn relinearize(&mut self) -> HeResult<()> {
        self.inner.relinearize()
    }

    pub fn rescale(&mut self) -> HeResult<()> {
        self.inner.rescale()
    }

    pub fn rescale_raw(&mut self) -> HeResult<()> {
        self.inner.rescale_raw()
    }

    pub fn chain_index(&self) -> i32 {
        self.inner.chain_index()
    }

    pub fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()> {
        self.inner.set_chain_index(chain_index)
    }

    pub fn set_chain_index_like(&mut self, other: &CTile) -> HeResult<()> {
        self.inner.set_chain_index_like(other.inner.as_ref())
    }

    pub fn set_chain_index_like_plain(&mut self, other: &PTile) -> HeResult<()> {
        self.inner.set_chain_index(other.chain_index())
    }

    pub fn reduce_chain_index(&mut self) -> HeResult<()> {
        self.inner.reduce_chain_index()
    }

    pub fn scale(&self) -> HeResult<f64> {
        self.inner.scale()
    }

    pub fn set_scale(&mut self, scale: f64) -> HeResult<()> {
        self.inner.set_scale(scale)
    }

    pub fn multiply_by_changing_scale(&mut self, factor: f64) -> HeResult<()> {
        self.inner.multiply_by_changing_scale(factor)
    }

    pub fn slot_count(&self) -> usize {
        self.inner.slot_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        self.inner.save(out)
    }

    pub fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        self.inner.load(input)
    }

    pub fn save_to_file(&self, path: &Path) -> HeResult<u64> {
        let mut out = BufWriter::new(File::create(path)?);
        let written = self.save(&mut out)?;
        out.flush()?;
        Ok(written)
    }

    pub fn load_from_file(&mut self, path: &Path) -> HeResult<u64> {
        let mut input = BufReader::new(File::open(path)?);
        self.load(&mut input)
    }

    /// Decrypts and prints the slots. Needs the secret key.
    pub fn debug_print(&self, title: &str, max_vals: usize, out: &mut dyn Write) -> HeResult<()> {
        if !title.is_empty() {
            writeln!(out, "{title}")?;
        }
        writeln!(out, "chain index         : {}", self.chain_index())?;
        if self.is_empty() {
            writeln!(out, "  <empty>")?;
            return Ok(());
        }
        let values = self.inner.encoder().decrypt_decode_complex(self.inner.as_ref())?;
        write_values(out, &values, max_vals)
    }
}
