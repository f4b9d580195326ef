//! Secret key: a sparse ternary polynomial `s(X)`.

use std::{
    fmt,
    io::{Read, Write},
    sync::Arc,
};

use rand::Rng;

use super::KeyError;
use crate::{
    error::{HeError, HeResult},
    hebase::bin_io,
    math::ternary_integers,
    rings::{RnsBasis, RnsPoly},
};

/// Parameters for generating a secret key.
pub struct SecretKeyParams {
    pub degree: usize,
    pub hamming_weight: usize,
}

impl SecretKeyParams {
    /// 64 non-zero coefficients, capped at half the ring.
    pub fn sparse(degree: usize) -> Self {
        Self {
            degree,
            hamming_weight: 64.min(degree / 2),
        }
    }

    fn validate(&self) -> Result<(), KeyError> {
        if self.hamming_weight > self.degree {
            Err(KeyError::InvalidHammingWeight {
                weight: self.hamming_weight,
                degree: self.degree,
            })
        } else {
            Ok(())
        }
    }
}

/// The secret key, kept as its small integer coefficients so it can be
/// lifted into any basis.
#[derive(Clone)]
pub struct SecretKey {
    coeffs: Vec<i64>,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("degree", &self.coeffs.len())
            .finish_non_exhaustive()
    }
}

impl SecretKey {
    pub fn generate<R: Rng + ?Sized>(params: &SecretKeyParams, rng: &mut R) -> Result<Self, KeyError> {
        params.validate()?;
        Ok(Self {
            coeffs: ternary_integers(params.degree, params.hamming_weight, rng),
        })
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len()
    }

    /// `s` over `basis`, in NTT domain.
    pub fn to_poly(&self, basis: &Arc<RnsBasis>) -> RnsPoly {
        let mut s = RnsPoly::from_coeffs(&self.coeffs, Arc::clone(basis));
        s.to_ntt_domain();
        s
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        bin_io::write_len(out, self.coeffs.len())?;
        for &c in &self.coeffs {
            bin_io::write_i32(out, c as i32)?;
        }
        Ok(())
    }

    pub fn load(input: &mut dyn Read, degree: usize) -> HeResult<Self> {
        let len = bin_io::read_len(input)?;
        if len != degree {
            return Err(HeError::corrupt(format!(
                "secret key of degree {len}, context has degree {degree}"
            )));
        }
        let coeffs = (0..len)
            .map(|_| match bin_io::read_i32(input)? {
                c @ -1..=1 => Ok(i64::from(c)),
                c => Err(HeError::corrupt(format!("secret key coefficient {c} is not ternary"))),
            })
            .collect::<HeResult<Vec<_>>>()?;
        Ok(Self { coeffs })
    }
}
