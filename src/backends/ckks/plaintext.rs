use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use super::{BACKEND_NAME, context::CkksState, encoder::CkksEncoder};
use crate::{
    backends::rlwe::{load_parts, save_parts},
    error::{HeError, HeResult},
    hebase::{
        AbstractEncoder, AbstractPlaintext, bin_io,
        he_context::{counted_load, counted_save},
    },
    rings::RnsPoly,
};

/// An encoded CKKS vector: one polynomial in NTT domain plus its scale.
#[derive(Debug, Clone)]
pub struct CkksPlaintext {
    state: Arc<CkksState>,
    poly: Option<RnsPoly>,
    scale: f64,
}

impl CkksPlaintext {
    pub(crate) fn new(state: Arc<CkksState>) -> Self {
        let scale = state.default_scale;
        Self {
            state,
            poly: None,
            scale,
        }
    }

    pub(crate) fn set(&mut self, mut poly: RnsPoly, scale: f64) {
        poly.to_ntt_domain();
        self.poly = Some(poly);
        self.scale = scale;
    }

    pub(crate) fn poly(&self) -> HeResult<&RnsPoly> {
        self.poly.as_ref().ok_or(HeError::Empty { what: "plaintext" })
    }

    pub(crate) fn scale_value(&self) -> f64 {
        self.scale
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

    /// A copy of the polynomial with residues dropped to `chain_index`.
    pub(crate) fn poly_at(&self, chain_index: usize) -> HeResult<RnsPoly> {
        let mut poly = self.poly()?.clone();
        poly.drop_to(self.state.core.chain().level(chain_index))?;
        Ok(poly)
    }
}

impl AbstractPlaintext for CkksPlaintext {
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
        Box::new(CkksEncoder::new(Arc::clone(&self.state)))
    }

    fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            bin_io::write_f64(out, self.scale)?;
            save_parts(out, self.poly.as_slice())
        })
    }

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let chain = self.state.core.chain();
        let mut loaded = (self.scale, Vec::new());
        let read = counted_load(input, |input| {
            loaded.0 = bin_io::read_f64(input)?;
            loaded.1 = load_parts(input, chain)?;
            Ok(())
        })?;
        let (scale, mut parts) = loaded;
        if parts.len() > 1 {
            return Err(HeError::corrupt("plaintext with more than one polynomial"));
        }
        self.scale = scale;
        self.poly = parts.pop();
        Ok(read)
    }

    fn chain_index(&self) -> i32 {
        self.poly
            .as_ref()
            .and_then(|p| self.state.core.chain().level_of(p.basis()))
            .map_or(-1, |level| level as i32)
    }

    fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()> {
        let current = self.chain_index();
        if self.poly.is_none() {
            return Err(HeError::Empty { what: "plaintext" });
        }
        if chain_index > current {
            return Err(HeError::ChainIndexIncrease {
                current,
                requested: chain_index,
            });
        }
        if chain_index < 0 {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index,
                min: 0,
                max: self.state.top_chain_index(),
            });
        }
        let poly = self.poly_at(chain_index as usize)?;
        self.poly = Some(poly);
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.state.core.slots()
    }

    fn scale(&self) -> HeResult<f64> {
        Ok(self.scale)
    }

    fn is_empty(&self) -> bool {
        self.poly.is_none()
    }
}
