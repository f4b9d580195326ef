//! RLWE key material shared by the CKKS and BGV backends.

pub mod evaluation_keys;
pub mod public_key;
pub mod secret_key;
pub mod switching_key;

pub use evaluation_keys::EvaluationKeys;
pub use public_key::{PublicKey, PublicKeyParams};
pub use secret_key::{SecretKey, SecretKeyParams};
pub use switching_key::{LastPrimeDivision, SwitchingKey, SwitchingKeyParams};

use thiserror::Error;

/// Standard deviation of the rounded Gaussian error, as in the HE standard.
pub const DEFAULT_ERROR_STD: f64 = 3.2;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyError {
    #[error("Hamming weight {weight} exceeds ring dimension {degree}")]
    InvalidHammingWeight { weight: usize, degree: usize },
    #[error("Invalid error standard deviation: {0} (must be positive)")]
    InvalidErrorStd(f64),
    #[error("no rotation key available for rotation {rotation}")]
    MissingRotationKey { rotation: usize },
    #[error("no relinearization key was generated")]
    MissingRelinearizationKey,
    #[error("no conjugation key was generated")]
    MissingConjugationKey,
    #[error("switching key has {available} digits, level {level} needs {needed}")]
    TooFewDigits {
        available: usize,
        needed: usize,
        level: usize,
    },
}

pub(crate) fn validate_error_std(error_std: f64) -> Result<(), KeyError> {
    if error_std > 0.0 && error_std.is_finite() {
        Ok(())
    } else {
        Err(KeyError::InvalidErrorStd(error_std))
    }
}
