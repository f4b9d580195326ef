//! Concrete HE schemes behind the [`HeContext`] interface.

pub mod bgv;
pub mod ckks;
pub mod function_evaluator;
pub mod mockup;
pub(crate) mod rlwe;

use std::io::Read;

use crate::{
    error::HeResult,
    hebase::{ContextRegistry, HeContext},
};

pub use bgv::BgvContext;
pub use ckks::CkksContext;
pub use mockup::MockupContext;

fn new_ckks() -> Box<dyn HeContext> {
    Box::new(CkksContext::new())
}

fn new_bgv() -> Box<dyn HeContext> {
    Box::new(BgvContext::new())
}

fn new_mockup() -> Box<dyn HeContext> {
    Box::new(MockupContext::new())
}

/// A registry that knows every context this crate ships.
pub fn builtin_registry() -> HeResult<ContextRegistry> {
    let mut registry = ContextRegistry::new();
    registry.register(new_ckks)?;
    registry.register(new_bgv)?;
    registry.register(new_mockup)?;
    Ok(registry)
}

/// Loads a saved context of any built-in kind.
pub fn load_he_context(input: &mut dyn Read) -> HeResult<Box<dyn HeContext>> {
    builtin_registry()?.load(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_signatures() {
        let registry = builtin_registry().unwrap();
        for name in ["ToyHe_CKKS", "ToyHe_BGV", "Mockup_MOCKUP"] {
            assert!(registry.contains(name), "{name} missing");
        }
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = builtin_registry().unwrap();
        assert!(registry.register(new_bgv).is_err());
    }
}
