use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use super::{
    abstract_plaintext::{AbstractPlaintext, write_values},
    he_context::HeContext,
};
use crate::error::HeResult;

/// An encoded, unencrypted vector of slots.
///
/// Cloning copies the underlying plaintext.
#[derive(Debug, Clone)]
pub struct PTile {
    pub(crate) inner: Box<dyn AbstractPlaintext>,
}

impl PTile {
    /// An empty plaintext of `he`. Fill it with an [`Encoder`](crate::Encoder).
    pub fn new(he: &dyn HeContext) -> HeResult<Self> {
        Ok(Self {
            inner: he.create_abstract_plain()?,
        })
    }

    pub fn from_abstract(inner: Box<dyn AbstractPlaintext>) -> Self {
        Self { inner }
    }

    pub fn as_abstract(&self) -> &dyn AbstractPlaintext {
        self.inner.as_ref()
    }

    pub fn as_abstract_mut(&mut self) -> &mut dyn AbstractPlaintext {
        self.inner.as_mut()
    }

    pub fn chain_index(&self) -> i32 {
        self.inner.chain_index()
    }

    pub fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()> {
        self.inner.set_chain_index(chain_index)
    }

    pub fn set_chain_index_like(&mut self, other: &PTile) -> HeResult<()> {
        self.inner.set_chain_index_like(other.inner.as_ref())
    }

    pub fn reduce_chain_index(&mut self) -> HeResult<()> {
        self.inner.reduce_chain_index()
    }

    pub fn slot_count(&self) -> usize {
        self.inner.slot_count()
    }

    pub fn scale(&self) -> HeResult<f64> {
        self.inner.scale()
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

    /// Prints the chain index and the decoded slots, at most `max_vals` of
    /// them plus the last one.
    pub fn debug_print(&self, title: &str, max_vals: usize, out: &mut dyn Write) -> HeResult<()> {
        if !title.is_empty() {
            writeln!(out, "{title}")?;
        }
        writeln!(out, "chain index         : {}", self.chain_index())?;
        if self.is_empty() {
            writeln!(out, "  <empty>")?;
            return Ok(());
        }
        let values = self.inner.encoder().decode_complex(self.inner.as_ref())?;
        write_values(out, &values, max_vals)
    }
}
