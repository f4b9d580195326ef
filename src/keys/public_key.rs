//! Public key: an RLWE sample `(b, a)` with `b = -a*s + t*e`.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use rand::Rng;

use super::{KeyError, SecretKey, validate_error_std};
use crate::{
    error::{HeError, HeResult},
    rings::{RnsBasis, RnsPoly},
};

/// Parameters for public-key generation and encryption.
///
/// `noise_factor` multiplies every error term: 1 for CKKS, the plaintext
/// modulus `t` for BGV.
#[derive(Debug, Clone, Copy)]
pub struct PublicKeyParams {
    pub error_std: f64,
    pub noise_factor: u64,
}

impl PublicKeyParams {
    pub(crate) fn scaled_error<R: Rng + ?Sized>(&self, basis: &Arc<RnsBasis>, rng: &mut R) -> RnsPoly {
        let mut e = RnsPoly::sample_gaussian(Arc::clone(basis), self.error_std, rng);
        if self.noise_factor != 1 {
            e.mul_scalar(self.noise_factor as i64);
        }
        e.to_ntt_domain();
        e
    }
}

/// RLWE public key over the top level of the chain, in NTT domain.
#[derive(Debug, Clone)]
pub struct PublicKey {
    /// b = -(a * s) + t * e
    pub b: RnsPoly,
    /// uniformly random
    pub a: RnsPoly,
}

impl PublicKey {
    pub fn generate<R: Rng + ?Sized>(
        secret_key: &SecretKey,
        basis: &Arc<RnsBasis>,
        params: &PublicKeyParams,
        rng: &mut R,
    ) -> Result<Self, KeyError> {
        validate_error_std(params.error_std)?;
        let s = secret_key.to_poly(basis);
        let a = RnsPoly::sample_uniform(Arc::clone(basis), rng);
        let e = params.scaled_error(basis, rng);

        let mut a_times_s = a.clone();
        a_times_s *= &s;
        let mut b = -a_times_s;
        b += &e;
        Ok(Self { b, a })
    }

    /// Encrypts `message` at the level of its basis:
    /// `(b*u + t*e0 + m, a*u + t*e1)` with a ternary `u`.
    pub fn encrypt<R: Rng + ?Sized>(
        &self,
        message: &RnsPoly,
        params: &PublicKeyParams,
        rng: &mut R,
    ) -> HeResult<Vec<RnsPoly>> {
        let basis = message.basis();
        let mut b = self.b.clone();
        b.drop_to(basis)?;
        let mut a = self.a.clone();
        a.drop_to(basis)?;

        let mut u = RnsPoly::sample_ternary(Arc::clone(basis), basis.degree() / 2, rng);
        u.to_ntt_domain();
        let e0 = params.scaled_error(basis, rng);
        let e1 = params.scaled_error(basis, rng);

        let mut m = message.clone();
        m.to_ntt_domain();

        let mut c0 = b;
        c0 *= &u;
        c0 += &e0;
        c0 += &m;
        let mut c1 = a;
        c1 *= &u;
        c1 += &e1;
        Ok(vec![c0, c1])
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        self.b.save(out)?;
        self.a.save(out)
    }

    pub fn load(input: &mut dyn Read, basis: &Arc<RnsBasis>) -> HeResult<Self> {
        let b = RnsPoly::load(input, Arc::clone(basis))?;
        let a = RnsPoly::load(input, Arc::clone(basis))?;
        Ok(Self { b, a })
    }
}

/// `c_0 + c_1 s + c_2 s^2 + ...`, in coefficient domain.
pub fn decrypt_parts(parts: &[RnsPoly], secret_key: &SecretKey) -> HeResult<RnsPoly> {
    let (first, rest) = parts
        .split_first()
        .ok_or(HeError::Empty { what: "ciphertext" })?;
    let basis = first.basis();
    let s = secret_key.to_poly(basis);
    let mut acc = first.clone();
    acc.to_ntt_domain();
    let mut s_power = s.clone();
    for part in rest {
        let mut term = part.clone();
        term *= &s_power;
        acc += &term;
        s_power *= &s;
    }
    acc.to_coeff_domain();
    Ok(acc)
}
