use std::sync::Arc;

use num_complex::Complex64;

use super::{
    BACKEND_NAME, ciphertext::MockupCiphertext, context::MockupState, plaintext::MockupPlaintext,
};
use crate::{
    error::{HeError, HeResult},
    hebase::{AbstractCiphertext, AbstractEncoder, AbstractPlaintext},
};

#[derive(Debug, Clone)]
pub struct MockupEncoder {
    state: Arc<MockupState>,
}

impl MockupEncoder {
    pub(crate) fn new(state: Arc<MockupState>) -> Self {
        Self { state }
    }

    fn chain_index_for(&self, chain_index: i32) -> HeResult<i32> {
        let top = self.state.config.top_chain_index;
        match chain_index {
            -1 => Ok(top),
            c if (0..=top).contains(&c) => Ok(c),
            c => Err(HeError::ChainIndexOutOfRange {
                chain_index: c,
                min: 0,
                max: top,
            }),
        }
    }
}

impl AbstractEncoder for MockupEncoder {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn slot_count(&self) -> usize {
        self.state.config.num_slots
    }

    fn create_plain(&self) -> Box<dyn AbstractPlaintext> {
        Box::new(MockupPlaintext::new(Arc::clone(&self.state)))
    }

    fn create_cipher(&self) -> Box<dyn AbstractCiphertext> {
        Box::new(MockupCiphertext::new(Arc::clone(&self.state)))
    }

    fn encode_f64(&self, res: &mut dyn AbstractPlaintext, vals: &[f64], chain_index: i32) -> HeResult<()> {
        let vals: Vec<Complex64> = vals.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.encode_complex(res, &vals, chain_index)
    }

    fn encode_complex(
        &self,
        res: &mut dyn AbstractPlaintext,
        vals: &[Complex64],
        chain_index: i32,
    ) -> HeResult<()> {
        let slots = self.slot_count();
        if vals.len() > slots {
            return Err(HeError::TooManyValues {
                count: vals.len(),
                slots,
            });
        }
        let chain_index = self.chain_index_for(chain_index)?;
        let mut values = vals.to_vec();
        values.resize(slots, Complex64::new(0.0, 0.0));
        MockupPlaintext::downcast_mut(res)?.set(values, chain_index);
        Ok(())
    }

    fn decode_f64(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<f64>> {
        Ok(self.decode_complex(src)?.into_iter().map(|z| z.re).collect())
    }

    fn decode_complex(&self, src: &dyn AbstractPlaintext) -> HeResult<Vec<Complex64>> {
        Ok(MockupPlaintext::downcast(src)?.values()?.to_vec())
    }

    fn encrypt(&self, res: &mut dyn AbstractCiphertext, src: &dyn AbstractPlaintext) -> HeResult<()> {
        let src = MockupPlaintext::downcast(src)?;
        let values = src.values()?.to_vec();
        MockupCiphertext::downcast_mut(res)?.set(values, src.chain_index());
        Ok(())
    }

    fn decrypt(&self, res: &mut dyn AbstractPlaintext, src: &dyn AbstractCiphertext) -> HeResult<()> {
        self.state.require_secret_key()?;
        let src = MockupCiphertext::downcast(src)?;
        let values = src.values()?.to_vec();
        MockupPlaintext::downcast_mut(res)?.set(values, src.chain_index());
        Ok(())
    }
}
