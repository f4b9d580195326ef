use thiserror::Error;

use crate::{keys::KeyError, rings::RingError};

/// Errors raised by contexts, tiles, encoders and the tensor layer.
#[derive(Debug, Error)]
pub enum HeError {
    #[error("HeContext is not initialized")]
    NotInitialized,
    #[error("HeContext is already initialized")]
    AlreadyInitialized,
    #[error("Infeasible configuration: {reason}")]
    InfeasibleConfig { reason: String },
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("{operation} is not supported by {backend}")]
    Unsupported { operation: String, backend: String },
    #[error("this HeContext does not have a secret key")]
    MissingSecretKey,
    #[error("this HeContext already has a secret key")]
    SecretKeyExists,
    #[error("Chain index mismatch: {lhs} vs {rhs}")]
    ChainIndexMismatch { lhs: i32, rhs: i32 },
    #[error("Chain index {chain_index} is out of range [{min}, {max}]")]
    ChainIndexOutOfRange { chain_index: i32, min: i32, max: i32 },
    #[error("Cannot raise chain index from {current} to {requested}")]
    ChainIndexIncrease { current: i32, requested: i32 },
    #[error("Scale mismatch: expected {expected:.2}, got {actual:.2}")]
    ScaleMismatch { expected: f64, actual: f64 },
    #[error("{count} values exceed the slot count {slots}")]
    TooManyValues { count: usize, slots: usize },
    #[error("Object belongs to a different backend, expected {expected}")]
    BackendMismatch { expected: &'static str },
    #[error("{what} is empty")]
    Empty { what: &'static str },
    #[error("Context for {expected} trying to read a context for {found}")]
    HeaderMismatch { expected: String, found: String },
    #[error("File contains unrecognized context {name}")]
    UnrecognizedContext { name: String },
    #[error("Duplicate context {name}")]
    DuplicateContext { name: String },
    #[error("Assert Equals Failed: {title}: {message}")]
    AssertEqualsFailed { title: String, message: String },
    #[error("Incompatible dimensions: {message}")]
    DimensionMismatch { message: String },
    #[error("Corrupt stream: {message}")]
    CorruptStream { message: String },
    #[error(transparent)]
    Ring(#[from] RingError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type HeResult<T> = Result<T, HeError>;

impl HeError {
    pub fn unsupported(operation: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            backend: backend.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self::InfeasibleConfig {
            reason: reason.into(),
        }
    }

    pub fn dimensions(message: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptStream {
            message: message.into(),
        }
    }
}
