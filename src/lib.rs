//! Toy homomorphic encryption behind a scheme-agnostic tile API.
//!
//! User code talks to an [`HeContext`] through [`Encoder`], [`CTile`] and
//! [`PTile`]; the context decides whether that means CKKS, BGV or clear
//! values with HE bookkeeping. [`simple_nn`] builds a batched encrypted
//! neural network on top.

pub mod backends;
pub mod error;
pub mod hebase;
pub mod keys;
pub mod math;
pub mod rings;
pub mod simple_nn;

pub use backends::{BgvContext, CkksContext, MockupContext, builtin_registry, load_he_context};
pub use error::{HeError, HeResult};
pub use hebase::{
    BitwiseEvaluator, CTile, ContextRegistry, Encoder, HeConfigRequirement, HeContext, HeTraits,
    NativeFunctionEvaluator, PTile,
};
pub use simple_nn::{
    CipherMatrix, CipherMatrixEncoder, DoubleMatrix, DoubleMatrixArray, SimpleNeuralNet,
    SimpleNeuralNetPlain,
};
