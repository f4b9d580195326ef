use std::{
    io::{Read, Write},
    sync::{Arc, OnceLock},
};

use rand::Rng;
use tracing::{debug, info};

use super::{
    BACKEND_NAME, bitwise_evaluator::MockupBitwiseEvaluator, ciphertext::MockupCiphertext,
    config::MockupConfig, encoder::MockupEncoder, plaintext::MockupPlaintext,
};
use crate::{
    backends::function_evaluator::SquaringFunctionEvaluator,
    error::{HeError, HeResult},
    hebase::{
        AbstractBitwiseEvaluator, AbstractCiphertext, AbstractEncoder, AbstractFunctionEvaluator,
        AbstractPlaintext, HeConfigRequirement, HeContext, HeTraits, bin_io,
        he_context::{counted_load, counted_save, read_context_header, write_context_header},
    },
};

/// The mockup "secret key" is a random tag. Decryption only checks that it
/// is present; loading checks that it matches the context it is loaded into.
#[derive(Debug)]
pub(crate) struct MockupState {
    pub config: MockupConfig,
    key_tag: u64,
    secret_key: OnceLock<u64>,
}

impl MockupState {
    pub fn has_secret_key(&self) -> bool {
        self.secret_key.get().is_some()
    }

    pub fn require_secret_key(&self) -> HeResult<()> {
        if self.has_secret_key() {
            Ok(())
        } else {
            Err(HeError::MissingSecretKey)
        }
    }
}

/// Runs the same bookkeeping as a leveled scheme on clear values: explicit
/// chain indices, explicit rescale, complex slots and bitwise operations.
#[derive(Debug, Default)]
pub struct MockupContext {
    state: Option<Arc<MockupState>>,
}

impl MockupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_with_config(&mut self, config: MockupConfig) -> HeResult<()> {
        if self.state.is_some() {
            return Err(HeError::AlreadyInitialized);
        }
        config.validate()?;
        let key_tag = rand::rng().random::<u64>();
        info!(
            slots = config.num_slots,
            top_chain_index = config.top_chain_index,
            "initialized mockup context"
        );
        self.state = Some(Arc::new(MockupState {
            config,
            key_tag,
            secret_key: OnceLock::from(key_tag),
        }));
        Ok(())
    }

    pub fn config(&self) -> HeResult<&MockupConfig> {
        Ok(&self.state()?.config)
    }

    fn state(&self) -> HeResult<&Arc<MockupState>> {
        self.state.as_ref().ok_or(HeError::NotInitialized)
    }
}

impl HeContext for MockupContext {
    fn init(&mut self, requirement: &HeConfigRequirement) -> HeResult<()> {
        if self.state.is_some() {
            return Err(HeError::AlreadyInitialized);
        }
        self.init_with_config(MockupConfig::from_requirement(requirement)?)
    }

    fn check_config_requirement(&self, requirement: &HeConfigRequirement) -> HeResult<()> {
        MockupConfig::from_requirement(requirement).map(|_| ())
    }

    fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn clone_empty(&self) -> Box<dyn HeContext> {
        Box::new(Self::new())
    }

    fn traits(&self) -> HeTraits {
        let mut traits = HeTraits::default();
        traits
            .set_supports_explicit_chain_indices(true)
            .set_supports_explicit_rescale(true)
            .set_supports_complex_numbers(true)
            .set_supports_bitwise_operations(true)
            .set_supports_native_functions(true);
        traits
    }

    fn library_name(&self) -> &'static str {
        "Mockup"
    }

    fn scheme_name(&self) -> &'static str {
        "MOCKUP"
    }

    fn slot_count(&self) -> HeResult<usize> {
        Ok(self.state()?.config.num_slots)
    }

    fn top_chain_index(&self) -> HeResult<i32> {
        Ok(self.state()?.config.top_chain_index)
    }

    fn security_level(&self) -> HeResult<u32> {
        Ok(self.state()?.config.security_level)
    }

    fn has_secret_key(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.has_secret_key())
    }

    fn create_abstract_cipher(&self) -> HeResult<Box<dyn AbstractCiphertext>> {
        Ok(Box::new(MockupCiphertext::new(Arc::clone(self.state()?))))
    }

    fn create_abstract_plain(&self) -> HeResult<Box<dyn AbstractPlaintext>> {
        Ok(Box::new(MockupPlaintext::new(Arc::clone(self.state()?))))
    }

    fn get_encoder(&self) -> HeResult<Box<dyn AbstractEncoder>> {
        Ok(Box::new(MockupEncoder::new(Arc::clone(self.state()?))))
    }

    fn get_function_evaluator(&self) -> HeResult<Box<dyn AbstractFunctionEvaluator>> {
        self.state()?;
        Ok(Box::new(SquaringFunctionEvaluator::new(BACKEND_NAME)))
    }

    fn get_bitwise_evaluator(&self) -> HeResult<Box<dyn AbstractBitwiseEvaluator>> {
        Ok(Box::new(MockupBitwiseEvaluator::new(Arc::clone(self.state()?))))
    }

    fn save(&self, out: &mut dyn Write, with_secret_key: bool) -> HeResult<u64> {
        let state = self.state()?;
        if with_secret_key {
            state.require_secret_key()?;
        }
        let written = counted_save(out, |out| {
            write_context_header(out, self)?;
            state.config.save(out)?;
            bin_io::write_u64(out, state.key_tag)?;
            bin_io::write_bool(out, with_secret_key)?;
            Ok(())
        })?;
        debug!(bytes = written, with_secret_key, "saved {}", BACKEND_NAME);
        Ok(written)
    }

    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        if self.state.is_some() {
            return Err(HeError::AlreadyInitialized);
        }
        let signature = self.signature();
        let mut loaded = None;
        let read = counted_load(input, |input| {
            read_context_header(input, &signature)?;
            let config = MockupConfig::load(input)?;
            let key_tag = bin_io::read_u64(input)?;
            let secret_key = OnceLock::new();
            if bin_io::read_bool(input)? {
                let _ = secret_key.set(key_tag);
            }
            loaded = Some(MockupState {
                config,
                key_tag,
                secret_key,
            });
            Ok(())
        })?;
        self.state = loaded.map(Arc::new);
        Ok(read)
    }

    fn save_secret_key(&self, out: &mut dyn Write) -> HeResult<u64> {
        let state = self.state()?;
        state.require_secret_key()?;
        counted_save(out, |out| Ok(bin_io::write_u64(out, state.key_tag)?))
    }

    fn load_secret_key(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let state = self.state()?;
        if state.has_secret_key() {
            return Err(HeError::SecretKeyExists);
        }
        let mut tag = 0;
        let read = counted_load(input, |input| {
            tag = bin_io::read_u64(input)?;
            Ok(())
        })?;
        if tag != state.key_tag {
            return Err(HeError::corrupt("secret key belongs to a different context"));
        }
        state
            .secret_key
            .set(tag)
            .map_err(|_| HeError::SecretKeyExists)?;
        Ok(read)
    }
}
