use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

use tracing::debug;

use super::{
    abstract_bitwise_evaluator::AbstractBitwiseEvaluator,
    abstract_ciphertext::AbstractCiphertext,
    abstract_encoder::AbstractEncoder,
    abstract_function_evaluator::AbstractFunctionEvaluator,
    abstract_plaintext::AbstractPlaintext,
    bin_io::{self, CountingReader, CountingWriter},
    config_requirement::HeConfigRequirement,
    he_traits::HeTraits,
};
use crate::error::{HeError, HeResult};

/// An initialized HE scheme: parameters, keys and a factory for backend
/// objects.
///
/// Contexts start empty. [`init`](HeContext::init) or
/// [`load`](HeContext::load) fills them, after which they are read-only
/// except for [`load_secret_key`](HeContext::load_secret_key).
pub trait HeContext: Send + Sync + fmt::Debug {
    /// Derives parameters from `requirement`, generates keys and becomes
    /// usable.
    fn init(&mut self, requirement: &HeConfigRequirement) -> HeResult<()>;

    /// `Ok(())` if [`init`](HeContext::init) would succeed, otherwise the
    /// [`HeError::InfeasibleConfig`] it would return. Generates no keys.
    fn check_config_requirement(&self, requirement: &HeConfigRequirement) -> HeResult<()>;

    fn is_config_requirement_feasible(&self, requirement: &HeConfigRequirement) -> bool {
        self.check_config_requirement(requirement).is_ok()
    }

    fn is_initialized(&self) -> bool;

    /// A new uninitialized context of the same kind.
    fn clone_empty(&self) -> Box<dyn HeContext>;

    fn traits(&self) -> HeTraits;

    fn library_name(&self) -> &'static str;

    fn scheme_name(&self) -> &'static str;

    /// `<library>_<scheme>`, the name written at the head of a saved context.
    fn signature(&self) -> String {
        format!("{}_{}", self.library_name(), self.scheme_name())
    }

    fn slot_count(&self) -> HeResult<usize>;

    /// Highest chain index a fresh ciphertext can have, or -1 when chain
    /// indices are managed by the backend.
    fn top_chain_index(&self) -> HeResult<i32>;

    fn min_chain_index_for_encryption(&self) -> i32 {
        0
    }

    /// Estimated classical security of the chosen parameters in bits.
    fn security_level(&self) -> HeResult<u32>;

    /// The primes of the modulus chain, lowest level first.
    fn modulus_chain(&self) -> HeResult<Vec<u64>> {
        Err(HeError::unsupported("modulus_chain", self.signature()))
    }

    fn default_scale(&self) -> HeResult<f64> {
        Ok(1.0)
    }

    fn has_secret_key(&self) -> bool;

    fn create_abstract_cipher(&self) -> HeResult<Box<dyn AbstractCiphertext>>;

    fn create_abstract_plain(&self) -> HeResult<Box<dyn AbstractPlaintext>>;

    fn get_encoder(&self) -> HeResult<Box<dyn AbstractEncoder>>;

    fn get_function_evaluator(&self) -> HeResult<Box<dyn AbstractFunctionEvaluator>> {
        Err(HeError::unsupported("native functions", self.signature()))
    }

    fn get_bitwise_evaluator(&self) -> HeResult<Box<dyn AbstractBitwiseEvaluator>> {
        Err(HeError::unsupported("bitwise operations", self.signature()))
    }

    /// Writes the header, the parameters, the public key material and, when
    /// asked, the secret key. Returns the number of bytes written.
    fn save(&self, out: &mut dyn Write, with_secret_key: bool) -> HeResult<u64>;

    /// Reads a context written by [`save`](HeContext::save) into this
    /// uninitialized context. Fails with [`HeError::HeaderMismatch`] when the
    /// stream holds a different kind of context.
    fn load(&mut self, input: &mut dyn Read) -> HeResult<u64>;

    fn save_secret_key(&self, out: &mut dyn Write) -> HeResult<u64>;

    /// Installs a secret key into a context loaded without one.
    fn load_secret_key(&mut self, input: &mut dyn Read) -> HeResult<u64>;

    fn save_to_file(&self, path: &Path, with_secret_key: bool) -> HeResult<u64> {
        let mut out = BufWriter::new(File::create(path)?);
        let written = self.save(&mut out, with_secret_key)?;
        out.flush()?;
        Ok(written)
    }

    fn load_from_file(&mut self, path: &Path) -> HeResult<u64> {
        let mut input = BufReader::new(File::open(path)?);
        self.load(&mut input)
    }

    fn save_secret_key_to_file(&self, path: &Path) -> HeResult<u64> {
        let mut out = BufWriter::new(File::create(path)?);
        let written = self.save_secret_key(&mut out)?;
        out.flush()?;
        Ok(written)
    }

    fn load_secret_key_from_file(&mut self, path: &Path) -> HeResult<u64> {
        let mut input = BufReader::new(File::open(path)?);
        self.load_secret_key(&mut input)
    }

    fn print_signature(&self, out: &mut dyn Write) -> HeResult<()> {
        writeln!(out, "{}", self.signature())?;
        Ok(())
    }

    fn debug_print(&self, title: &str, out: &mut dyn Write) -> HeResult<()> {
        if !title.is_empty() {
            writeln!(out, "{title}")?;
        }
        self.print_signature(out)?;
        if !self.is_initialized() {
            writeln!(out, "  <not initialized>")?;
            return Ok(());
        }
        writeln!(out, "slots               : {}", self.slot_count()?)?;
        writeln!(out, "top chain index     : {}", self.top_chain_index()?)?;
        writeln!(out, "security level      : {}", self.security_level()?)?;
        writeln!(out, "has secret key      : {}", self.has_secret_key())?;
        write!(out, "{}", self.traits())?;
        Ok(())
    }
}

/// Writes `<library>_<scheme>` and the default scale. Every context's
/// `save` starts with this.
pub fn write_context_header(out: &mut dyn Write, he: &dyn HeContext) -> HeResult<()> {
    bin_io::write_string(out, &he.signature())?;
    bin_io::write_f64(out, he.default_scale()?)?;
    Ok(())
}

/// Reads the header written by [`write_context_header`] and checks it names
/// `expected`. Returns the stored default scale.
pub fn read_context_header(input: &mut dyn Read, expected: &str) -> HeResult<f64> {
    let found = bin_io::read_string(input)?;
    if found != expected {
        return Err(HeError::HeaderMismatch {
            expected: expected.to_string(),
            found,
        });
    }
    Ok(bin_io::read_f64(input)?)
}

/// Runs a save body through a byte counter.
pub(crate) fn counted_save(
    out: &mut dyn Write,
    body: impl FnOnce(&mut dyn Write) -> HeResult<()>,
) -> HeResult<u64> {
    let mut counter = CountingWriter::new(out);
    body(&mut counter)?;
    Ok(counter.count())
}

/// Runs a load body through a byte counter.
pub(crate) fn counted_load(
    input: &mut dyn Read,
    body: impl FnOnce(&mut dyn Read) -> HeResult<()>,
) -> HeResult<u64> {
    let mut counter = CountingReader::new(input);
    body(&mut counter)?;
    Ok(counter.count())
}

type ContextFactory = fn() -> Box<dyn HeContext>;

/// Maps saved-context signatures to constructors, so a stream can be loaded
/// without knowing in advance which scheme wrote it.
#[derive(Default)]
pub struct ContextRegistry {
    factories: HashMap<String, ContextFactory>,
}

impl fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ContextRegistry").field("contexts", &names).finish()
    }
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the context built by `factory` under its signature.
    pub fn register(&mut self, factory: ContextFactory) -> HeResult<()> {
        let name = factory().signature();
        if self.factories.contains_key(&name) {
            return Err(HeError::DuplicateContext { name });
        }
        debug!(context = %name, "registered context");
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Peeks the signature at the head of `input`, builds the matching
    /// context and loads it.
    pub fn load(&self, input: &mut dyn Read) -> HeResult<Box<dyn HeContext>> {
        let name = bin_io::read_string(input)?;
        let factory = self
            .factories
            .get(&name)
            .ok_or_else(|| HeError::UnrecognizedContext { name: name.clone() })?;

        let mut header = Vec::with_capacity(4 + name.len());
        bin_io::write_string(&mut header, &name)?;
        let mut replay = Cursor::new(header).chain(input);

        let mut he = factory();
        he.load(&mut replay)?;
        Ok(he)
    }

    pub fn load_from_file(&self, path: &Path) -> HeResult<Box<dyn HeContext>> {
        let mut input = BufReader::new(File::open(path)?);
        self.load(&mut input)
    }
}
