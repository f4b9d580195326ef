use std::{
    any::Any,
    fmt,
    io::{Read, Write},
};

use super::abstract_encoder::AbstractEncoder;
use crate::error::{HeError, HeResult};

/// Backend side of a [`PTile`](crate::PTile): an encoded, unencrypted vector.
pub trait AbstractPlaintext: Send + Sync + fmt::Debug {
    fn clone_box(&self) -> Box<dyn AbstractPlaintext>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Name of the backend that created this object, used in error messages.
    fn backend_name(&self) -> &'static str;

    /// An encoder for the context this plaintext belongs to.
    fn encoder(&self) -> Box<dyn AbstractEncoder>;

    /// Writes the plaintext, returning the number of bytes written.
    fn save(&self, out: &mut dyn Write) -> HeResult<u64>;

    /// Replaces the content with one read from `input`, returning the number
    /// of bytes read.
    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64>;

    /// Chain index, or -1 where chain indices are managed by the backend.
    fn chain_index(&self) -> i32;

    fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()>;

    fn reduce_chain_index(&mut self) -> HeResult<()> {
        let current = self.chain_index();
        if current < 0 {
            return Ok(());
        }
        self.set_chain_index(current - 1)
    }

    fn set_chain_index_like(&mut self, other: &dyn AbstractPlaintext) -> HeResult<()> {
        self.set_chain_index(other.chain_index())
    }

    fn slot_count(&self) -> usize;

    fn scale(&self) -> HeResult<f64> {
        Err(HeError::unsupported("scale", self.backend_name()))
    }

    /// `true` until something has been encoded or loaded.
    fn is_empty(&self) -> bool;
}

impl Clone for Box<dyn AbstractPlaintext> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Writes `values` on one line, eliding the middle when there are more than
/// `max_vals` of them.
pub(crate) fn write_values<T: fmt::Display>(
    out: &mut dyn Write,
    values: &[T],
    max_vals: usize,
) -> HeResult<()> {
    writeln!(out, "slots               : {}", values.len())?;
    write!(out, " ")?;
    for v in values.iter().take(max_vals) {
        write!(out, " {v}")?;
    }
    if max_vals + 1 < values.len() {
        if let Some(last) = values.last() {
            write!(out, " ... {last}")?;
        }
    }
    writeln!(out)?;
    Ok(())
}
