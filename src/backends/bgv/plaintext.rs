use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use super::{BACKEND_NAME, context::BgvState, encoder::BgvEncoder};
use crate::{
    error::{HeError, HeResult},
    hebase::{
        AbstractEncoder, AbstractPlaintext, bin_io,
        he_context::{counted_load, counted_save},
    },
    math::centered,
    rings::RnsPoly,
};

/// A batched BGV plaintext: polynomial coefficients mod `t`.
#[derive(Debug, Clone)]
pub struct BgvPlaintext {
    state: Arc<BgvState>,
    coeffs: Option<Vec<u64>>,
}

impl BgvPlaintext {
    pub(crate) fn new(state: Arc<BgvState>) -> Self {
        Self {
            state,
            coeffs: None,
        }
    }

    pub(crate) fn set(&mut self, coeffs: Vec<u64>) {
        self.coeffs = Some(coeffs);
    }

    pub(crate) fn coeffs(&self) -> HeResult<&[u64]> {
        self.coeffs.as_deref().ok_or(HeError::Empty { what: "plaintext" })
    }

    /// The plaintext lifted to chain level `level`, in NTT domain.
    pub(crate) fn poly_at(&self, level: usize) -> HeResult<RnsPoly> {
        let t = self.state.plaintext_modulus();
        let lifted: Vec<i64> = self.coeffs()?.iter().map(|&c| centered(c, t)).collect();
        let mut poly = RnsPoly::from_coeffs(&lifted, Arc::clone(self.state.core.chain().level(level)));
        poly.to_ntt_domain();
        Ok(poly)
    }

    pub(crate) fn downcast(plain: &dyn AbstractPlaintext) -> HeResult<&Self> {
        plain
            .as_any()
            .downcast_ref()
            .ok_or(HeError::BackendMismatch { expected: BACKEND_NAME })
    }

    pub(crate) fn downcast_mut(plain: &mut dyn AbstractPlaintext) -> HeResult<&mut Self> {
        plain
            .as_any_mut()
            .downcast_mut()
            .ok_or(HeError::BackendMismatch { expected: BACKEND_NAME })
    }
}

impl AbstractPlaintext for BgvPlaintext {
    fn clone_box(&self) -> Box<dyn AbstractPlaintext> {
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
        counted_save(out, |out| {
            bin_io::write_bool(out, self.coeffs.is_some())?;
            bin_io::write_u64_slice(out, self.coeffs.as_deref().unwrap_or_default())
        })
    }

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let degree = self.state.config.ring_degree;
        let mut loaded = None;
        let read = counted_load(input, |input| {
            let present = bin_io::read_bool(input)?;
            let coeffs = bin_io::read_u64_vec(input)?;
            if present {
                if coeffs.len() != degree {
                    return Err(HeError::corrupt(format!(
                        "plaintext has {} coefficients, ring degree is {degree}",
                        coeffs.len()
                    )));
                }
                loaded = Some(coeffs);
            }
            Ok(())
        })?;
        self.coeffs = loaded;
        Ok(read)
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
        self.coeffs.is_none()
    }
}
