//! Leveled CKKS over the RNS ring layer.
//!
//! Chain index `l` means the ciphertext lives modulo `q_0 ... q_l`. Every
//! rescale divides by `q_l` and lowers the chain index by one.

pub mod ciphertext;
pub mod config;
pub mod context;
mod embedding;
pub mod encoder;
pub mod plaintext;

pub use ciphertext::CkksCiphertext;
pub use config::{CkksConfig, CkksConfigBuilder, CkksPreset};
pub use context::CkksContext;
pub use encoder::CkksEncoder;
pub use plaintext::CkksPlaintext;

pub(crate) const BACKEND_NAME: &str = "ToyHe_CKKS";
