use std::{
    io::{Read, Write},
    sync::Arc,
};

use tracing::{debug, info};

use super::{
    BACKEND_NAME, ciphertext::CkksCiphertext, config::CkksConfig, embedding::CkksEmbedding,
    encoder::CkksEncoder, plaintext::CkksPlaintext,
};
use crate::{
    backends::rlwe::RlweCore,
    error::{HeError, HeResult},
    hebase::{
        AbstractCiphertext, AbstractEncoder, AbstractPlaintext, HeConfigRequirement, HeContext,
        HeTraits,
        he_context::{counted_load, counted_save, read_context_header, write_context_header},
    },
};

/// Shared, immutable state of an initialized CKKS context.
#[derive(Debug)]
pub(crate) struct CkksState {
    pub config: CkksConfig,
    pub core: RlweCore,
    pub embedding: CkksEmbedding,
    pub default_scale: f64,
}

impl CkksState {
    pub fn top_chain_index(&self) -> i32 {
        self.core.chain().top_level() as i32
    }
}

/// Approximate arithmetic on complex vectors, with explicit chain indices
/// and explicit rescale.
#[derive(Debug, Default)]
pub struct CkksContext {
    state: Option<Arc<CkksState>>,
}

impl CkksContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes from concrete parameters instead of a requirement.
    pub fn init_with_config(&mut self, config: CkksConfig) -> HeResult<()> {
        if self.state.is_some() {
            return Err(HeError::AlreadyInitialized);
        }
        config.validate()?;
        let setup = config.setup()?;
        let core = RlweCore::generate(&setup)?;
        info!(
            ring_degree = config.ring_degree,
            chain_length = setup.primes.len(),
            scale_bits = config.fractional_part_precision,
            log_qp = core.chain().log_qp(),
            security = core.security_level(),
            "initialized CKKS context"
        );
        self.state = Some(Arc::new(CkksState {
            embedding: CkksEmbedding::new(config.ring_degree),
            default_scale: config.default_scale(),
            config,
            core,
        }));
        Ok(())
    }

    pub fn config(&self) -> HeResult<&CkksConfig> {
        Ok(&self.state()?.config)
    }

    fn state(&self) -> HeResult<&Arc<CkksState>> {
        self.state.as_ref().ok_or(HeError::NotInitialized)
    }
}

impl HeContext for CkksContext {
    fn init(&mut self, requirement: &HeConfigRequirement) -> HeResult<()> {
        if self.state.is_some() {
            return Err(HeError::AlreadyInitialized);
        }
        self.init_with_config(CkksConfig::from_requirement(requirement)?)
    }

    fn check_config_requirement(&self, requirement: &HeConfigRequirement) -> HeResult<()> {
        CkksConfig::from_requirement(requirement).map(|_| ())
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
            .set_supports_explicit_rescale(true)
            .set_supports_explicit_chain_indices(true)
            .set_supports_complex_numbers(true)
            .set_supports_scaled_encoding(true)
            .set_supports_decrypt_added_noise(true);
        traits
    }

    fn library_name(&self) -> &'static str {
        "ToyHe"
    }

    fn scheme_name(&self) -> &'static str {
        "CKKS"
    }

    fn slot_count(&self) -> HeResult<usize> {
        Ok(self.state()?.core.slots())
    }

    fn top_chain_index(&self) -> HeResult<i32> {
        Ok(self.state()?.top_chain_index())
    }

    fn security_level(&self) -> HeResult<u32> {
        Ok(self.state()?.core.security_level())
    }

    fn modulus_chain(&self) -> HeResult<Vec<u64>> {
        Ok(self.state()?.core.chain().moduli().to_vec())
    }

    fn default_scale(&self) -> HeResult<f64> {
        Ok(self.state()?.default_scale)
    }

    fn has_secret_key(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.core.has_secret_key())
    }

    fn create_abstract_cipher(&self) -> HeResult<Box<dyn AbstractCiphertext>> {
        Ok(Box::new(CkksCiphertext::new(Arc::clone(self.state()?))))
    }

    fn create_abstract_plain(&self) -> HeResult<Box<dyn AbstractPlaintext>> {
        Ok(Box::new(CkksPlaintext::new(Arc::clone(self.state()?))))
    }

    fn get_encoder(&self) -> HeResult<Box<dyn AbstractEncoder>> {
        Ok(Box::new(CkksEncoder::new(Arc::clone(self.state()?))))
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
            let default_scale = read_context_header(input, &signature)?;
            let config = CkksConfig::load(input)?;
            let core = RlweCore::load(input, &config.setup()?)?;
            loaded = Some(CkksState {
                embedding: CkksEmbedding::new(config.ring_degree),
                default_scale,
                config,
                core,
            });
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
