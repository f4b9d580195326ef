use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RingError {
    #[error("ring degree must be a power of two >= 2, got {degree}")]
    InvalidDegree { degree: usize },
    #[error("RNS basis must contain at least one modulus")]
    EmptyBasis,
    #[error("modulus {modulus} is not NTT-friendly for degree {degree}")]
    NonNttFriendlyModulus { modulus: u64, degree: usize },
    #[error("invalid mod-drop count {drop_count} for {channel_count} channels")]
    InvalidModDrop {
        drop_count: usize,
        channel_count: usize,
    },
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },
    #[error("coefficient {coefficient} is not reduced modulo {modulus}")]
    NonReducedCoefficient { coefficient: u64, modulus: u64 },
    #[error("degree mismatch: expected {expected}, got {actual}")]
    DegreeMismatch { expected: usize, actual: usize },
    #[error("basis {target:?} is not a prefix of {source_moduli:?}")]
    NotAPrefix {
        target: Vec<u64>,
        source_moduli: Vec<u64>,
    },
    #[error("coefficient {value:e} is too large to reduce exactly")]
    CoefficientOverflow { value: f64 },
}

pub type RingResult<T> = Result<T, RingError>;
