//! Scheme-agnostic HE layer: the traits a backend implements and the
//! handles user code works with.

pub mod abstract_bitwise_evaluator;
pub mod abstract_ciphertext;
pub mod abstract_encoder;
pub mod abstract_function_evaluator;
pub mod abstract_plaintext;
pub mod bin_io;
pub mod bitwise_evaluator;
pub mod config_requirement;
pub mod ctile;
pub mod encoder;
pub mod he_context;
pub mod he_traits;
pub mod native_function_evaluator;
pub mod ptile;

pub use abstract_bitwise_evaluator::AbstractBitwiseEvaluator;
pub use abstract_ciphertext::AbstractCiphertext;
pub use abstract_encoder::AbstractEncoder;
pub use abstract_function_evaluator::AbstractFunctionEvaluator;
pub use abstract_plaintext::AbstractPlaintext;
pub use bitwise_evaluator::BitwiseEvaluator;
pub use config_requirement::{HeConfigRequirement, PublicFunctions, RotationKeys};
pub use ctile::CTile;
pub use encoder::{Encoder, ErrorStats};
pub use he_context::{ContextRegistry, HeContext};
pub use he_traits::HeTraits;
pub use native_function_evaluator::NativeFunctionEvaluator;
pub use ptile::PTile;
