use std::{
    io::{Read, Write},
    sync::Arc,
};

use tracing::{debug, info};

use super::{
    BACKEND_NAME, batching::BgvBatching, ciphertext::BgvCiphertext, config::BgvConfig,
    encoder::BgvEncoder, plaintext::BgvPlaintext,
};
use crate::{
    backends::{function_evaluator::SquaringFunctionEvaluator, rlwe::RlweCore},
    error::{HeError, HeResult},
    hebase::{
        AbstractCiphertext, AbstractEncoder, AbstractFunctionEvaluator, AbstractPlaintext,
        HeConfigRequirement, HeContext, HeTraits,
        he_context::{counted_load, counted_save, read_context_header, write_context_header},
    },
};

#[derive(Debug)]
pub(crate) struct BgvState {
    pub config: BgvConfig,
    pub core: RlweCore,
    pub batching: BgvBatching,
}

impl BgvState {
    fn build(config: BgvConfig, core: RlweCore) -> HeResult<Self> {
        let batching = BgvBatching::new(config.plaintext_modulus(), config.ring_degree)?;
        Ok(Self {
            config,
            core,
            batching,
        })
    }

    pub fn plaintext_modulus(&self) -> u64 {
        self.batching.plaintext_modulus()
    }
}

/// Exact arithmetic on integer vectors modulo a prime `t`. Chain indices and
/// modulus switching are handled internally.
#[derive(Debug, Default)]
pub struct BgvContext {
    state: Option<Arc<BgvState>>,
}

impl BgvContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_with_config(&mut self, config: BgvConfig) -> HeResult<()> {
        if self.state.is_some() {
            return Err(HeError::AlreadyInitialized);
        }
        config.validate()?;
        let setup = config.setup()?;
        let core = RlweCore::generate(&setup)?;
        info!(
            ring_degree = config.ring_degree,
            chain_length = setup.primes.len(),
            plaintext_modulus = config.plaintext_modulus(),
            log_qp = core.chain().log_qp(),
            security = core.security_level(),
            "initialized BGV context"
        );
        self.state = Some(Arc::new(BgvState::build(config, core)?));
        Ok(())
    }

    pub fn config(&self) -> HeResult<&BgvConfig> {
        Ok(&self.state()?.config)
    }

    pub fn plaintext_modulus(&self) -> HeResult<u64> {
        Ok(self.state()?.plaintext_modulus())
    }

    fn state(&self) -> HeResult<&Arc<BgvState>> {
        self.state.as_ref().ok_or(HeError::NotInitialized)
    }
}

impl HeContext for BgvContext {
    fn init(&mut self, requirement: &HeConfigRequirement) -> HeResult<()> {
        if self.state.is_some() {
            return Err(HeError::AlreadyInitialized);
        }
        self.init_with_config(BgvConfig::from_requirement(requirement)?)
    }

    fn check_config_requirement(&self, requirement: &HeConfigRequirement) -> HeResult<()> {
        BgvConfig::from_requirement(requirement).map(|_| ())
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
            .set_automatically_manages_chain_indices(true)
            .set_automatically_manages_rescale(true)
            .set_is_modular_arithmetic(true)
            .set_supports_native_functions(true);
        if let Some(state) = &self.state {
            traits.set_arithmetic_modulus(state.plaintext_modulus());
        }
        traits
    }

    fn library_name(&self) -> &'static str {
        "ToyHe"
    }

    fn scheme_name(&self) -> &'static str {
        "BGV"
    }

    fn slot_count(&self) -> HeResult<usize> {
        Ok(self.state()?.core.slots())
    }

    fn top_chain_index(&self) -> HeResult<i32> {
        self.state()?;
        Ok(-1)
    }

    fn min_chain_index_for_encryption(&self) -> i32 {
        -1
    }

    fn security_level(&self) -> HeResult<u32> {
        Ok(self.state()?.core.security_level())
    }

    fn modulus_chain(&self) -> HeResult<Vec<u64>> {
        Ok(self.state()?.core.chain().moduli().to_vec())
    }

    fn has_secret_key(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.core.has_secret_key())
    }

    fn create_abstract_cipher(&self) -> HeResult<Box<dyn AbstractCiphertext>> {
        Ok(Box::new(BgvCiphertext::new(Arc::clone(self.state()?))))
    }

    fn create_abstract_plain(&self) -> HeResult<Box<dyn AbstractPlaintext>> {
        Ok(Box::new(BgvPlaintext::new(Arc::clone(self.state()?))))
    }

    fn get_encoder(&self) -> HeResult<Box<dyn AbstractEncoder>> {
        Ok(Box::new(BgvEncoder::new(Arc::clone(self.state()?))))
    }

    fn get_function_evaluator(&self) -> HeResult<Box<dyn AbstractFunctionEvaluator>> {
        self.state()?;
        Ok(Box::new(SquaringFunctionEvaluator::new(BACKEND_NAME)))
    }

    fn save(&self, out: &mut dyn Write, with_secret_key: bool) -> HeResult<u64> {
        let state = self.state()?;
        let written = counted_save(out, |out| {
            write_context_header(out, self)?;
            state.config.save(out)?;
            state.core.save(out, with_secret_key)
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
            let config = BgvConfig::load(input)?;
            let core = RlweCore::load(input, &config.setup()?)?;
            loaded = Some(BgvState::build(config, core)?);
            Ok(())
        })?;
        self.state = loaded.map(Arc::new);
        debug!(bytes = read, "loaded {}", BACKEND_NAME);
        Ok(read)
    }

    fn save_secret_key(&self, out: &mut dyn Write) -> HeResult<u64> {
        let state = self.state()?;
        counted_save(out, |out| state.core.save_secret_key(out))
    }

    fn load_secret_key(&mut self, input: &mut dyn Read) -> HeResult<u64> {
        let state = self.state()?;
        counted_load(input, |input| state.core.load_secret_key(input))
    }
}
