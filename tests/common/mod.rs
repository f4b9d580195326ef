#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use toy_he_tiles::{
    BgvContext, CTile, CkksContext, Encoder, HeConfigRequirement, HeContext, MockupContext,
};

pub const SLOTS: usize = 16;
pub const DEPTH: usize = 3;

#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Ckks,
    Bgv,
    Mockup,
}

pub fn context_with(backend: Backend, requirement: &HeConfigRequirement) -> Box<dyn HeContext> {
    let mut he: Box<dyn HeContext> = match backend {
        Backend::Ckks => Box::new(CkksContext::new()),
        Backend::Bgv => Box::new(BgvContext::new()),
        Backend::Mockup => Box::new(MockupContext::new()),
    };
    he.init(requirement).unwrap();
    he
}

pub fn context(backend: Backend) -> Box<dyn HeContext> {
    context_with(backend, &HeConfigRequirement::insecure(SLOTS, DEPTH))
}

/// Slot tolerance: approximate for scaled encodings, exact otherwise.
pub fn tolerance(he: &dyn HeContext) -> f64 {
    if he.traits().supports_scaled_encoding() {
        1e-3
    } else {
        1e-9
    }
}

pub fn encrypt(he: &dyn HeContext, vals: &[f64]) -> CTile {
    let encoder = Encoder::new(he).unwrap();
    let mut c = CTile::new(he).unwrap();
    encoder.encode_encrypt(&mut c, vals, -1).unwrap();
    c
}

pub fn assert_slots(he: &dyn HeContext, c: &CTile, expected: &[f64]) {
    let eps = tolerance(he);
    let actual = Encoder::new(he).unwrap().decrypt_decode(c).unwrap();
    for (a, e) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(*a, *e, epsilon = eps);
    }
}

/// Expected chain index after `levels` rescales, or -1 on schemes that
/// manage chain indices themselves.
pub fn chain_after(he: &dyn HeContext, levels: i32) -> i32 {
    if he.traits().automatically_manages_chain_indices() {
        -1
    } else {
        he.top_chain_index().unwrap() - levels
    }
}
