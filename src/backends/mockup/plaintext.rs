use std::{
    any::Any,
    io::{Read, Write},
    sync::Arc,
};

use num_complex::Complex64;

use super::{BACKEND_NAME, context::MockupState, encoder::MockupEncoder};
use crate::{
    error::{HeError, HeResult},
    hebase::{
        AbstractEncoder, AbstractPlaintext, bin_io,
        he_context::{counted_load, counted_save},
    },
};

#[derive(Debug, Clone)]
pub struct MockupPlaintext {
    state: Arc<MockupState>,
    values: Option<Vec<Complex64>>,
    chain_index: i32,
}

impl MockupPlaintext {
    pub(crate) fn new(state: Arc<MockupState>) -> Self {
        Self {
            state,
            values: None,
            chain_index: -1,
        }
    }

    pub(crate) fn set(&mut self, values: Vec<Complex64>, chain_index: i32) {
        self.values = Some(values);
        self.chain_index = chain_index;
    }

    pub(crate) fn values(&self) -> HeResult<&[Complex64]> {
        self.values.as_deref().ok_or(HeError::Empty { what: "plaintext" })
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

pub(crate) fn write_complex(out: &mut dyn Write, values: &[Complex64]) -> HeResult<()> {
    bin_io::write_len(out, values.len())?;
    for z in values {
        bin_io::write_f64(out, z.re)?;
        bin_io::write_f64(out, z.im)?;
    }
    Ok(())
}

/// Rejects a deserialized tile whose slot count or chain index does not fit
/// the context. Empty tiles are stored with chain index -1.
pub(crate) fn check_stored_values(
    state: &MockupState,
    values: Option<&[Complex64]>,
    chain_index: i32,
) -> HeResult<()> {
    let Some(values) = values else {
        return Ok(());
    };
    if values.len() != state.config.num_slots {
        return Err(HeError::corrupt(format!(
            "{} slots stored for a context with {}",
            values.len(),
            state.config.num_slots
        )));
    }
    if !(0..=state.config.top_chain_index).contains(&chain_index) {
        return Err(HeError::corrupt(format!(
            "chain index {chain_index} is outside 0..={}",
            state.config.top_chain_index
        )));
    }
    Ok(())
}

pub(crate) fn read_complex(input: &mut dyn Read) -> HeResult<Vec<Complex64>> {
    let len = bin_io::read_len(input)?;
    (0..len)
        .map(|_| Ok(Complex64::new(bin_io::read_f64(input)?, bin_io::read_f64(input)?)))
        .collect()
}

impl AbstractPlaintext for MockupPlaintext {
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
        Box::new(MockupEncoder::new(Arc::clone(&self.state)))
    }

    fn save(&self, out: &mut dyn Write) -> HeResult<u64> {
        counted_save(out, |out| {
            bin_io::write_i32(out, self.chain_index)?;
            bin_io::write_bool(out, self.values.is_some())?;
            write_complex(out, self.values.as_deref().unwrap_or_default())
        })
    }

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let mut loaded = (-1, None);
        let read = counted_load(input, |input| {
            loaded.0 = bin_io::read_i32(input)?;
            let present = bin_io::read_bool(input)?;
            let values = read_complex(input)?;
            loaded.1 = present.then_some(values);
            Ok(())
        })?;
        check_stored_values(&self.state, loaded.1.as_deref(), loaded.0)?;
        (self.chain_index, self.values) = loaded;
        Ok(read)
    }

    fn chain_index(&self) -> i32 {
        self.chain_index
    }

    fn set_chain_index(&mut self, chain_index: i32) -> HeResult<()> {
        if self.values.is_none() {
            return Err(HeError::Empty { what: "plaintext" });
        }
        if chain_index > self.chain_index {
            return Err(HeError::ChainIndexIncrease {
                current: self.chain_index,
                requested: chain_index,
            });
        }
        if chain_index < 0 {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index,
                min: 0,
                max: self.state.config.top_chain_index,
            });
        }
        self.chain_index = chain_index;
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.state.config.num_slots
    }

    fn is_empty(&self) -> bool {
        self.values.is_none()
    }
}
