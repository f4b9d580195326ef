//! Hybrid key switching with one special prime `P`.
//!
//! A key for `s'` holds one RLWE sample per chain prime `q_j`, over the
//! extended basis `q_0..q_L, P`:
//!
//! ```text
//! b_j = -a_j * s + t * e_j + P * s' * [1 mod q_j, 0 mod everything else]
//! ```
//!
//! To switch a polynomial `d`, its residue `d mod q_j` is lifted as a
//! centered integer `d_j`. Then `sum_j d_j * (b_j, a_j)` decrypts to
//! `P * s' * d`, and dividing both parts by `P` leaves a pair that decrypts
//! to `s' * d` plus a small error.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use rand::Rng;
use tracing::instrument;

use super::{KeyError, SecretKey, public_key::PublicKeyParams, validate_error_std};
use crate::{
    error::{HeError, HeResult},
    hebase::bin_io,
    math::{add_mod, mul_mod},
    rings::{ModulusChain, RnsBasis, RnsPoly},
};

pub type SwitchingKeyParams = PublicKeyParams;

/// How the key-switching accumulator is divided by the special prime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastPrimeDivision {
    /// Rounded division, for approximate schemes.
    Rescale,
    /// Division that keeps the value congruent modulo the plaintext modulus.
    ModSwitch { plaintext_modulus: u64 },
}

impl LastPrimeDivision {
    pub fn apply(self, poly: &mut RnsPoly, target: &Arc<RnsBasis>) -> HeResult<()> {
        match self {
            Self::Rescale => poly.rescale_by_last(target)?,
            Self::ModSwitch { plaintext_modulus } => poly.bgv_mod_switch(plaintext_modulus, target)?,
        }
        Ok(())
    }
}

/// Switching key from `s'` to `s`, in NTT domain over the top extended basis.
#[derive(Debug, Clone)]
pub struct SwitchingKey {
    digits: Vec<(RnsPoly, RnsPoly)>,
}

impl SwitchingKey {
    /// `target` is `s'`, in NTT domain over `chain.extended(chain.top_level())`.
    #[instrument(skip_all, fields(digits = chain.top_level() + 1))]
    pub fn generate<R: Rng + ?Sized>(
        secret_key: &SecretKey,
        target: &RnsPoly,
        chain: &ModulusChain,
        params: &SwitchingKeyParams,
        rng: &mut R,
    ) -> HeResult<Self> {
        validate_error_std(params.error_std)?;
        let ext = chain.extended(chain.top_level());
        let s = secret_key.to_poly(ext);
        let special = chain.special_prime();

        let mut target = target.clone();
        target.to_ntt_domain();

        let digits = (0..=chain.top_level())
            .map(|j| {
                let a = RnsPoly::sample_uniform(Arc::clone(ext), rng);
                let e = params.scaled_error(ext, rng);
                let mut a_times_s = a.clone();
                a_times_s *= &s;
                let mut b = -a_times_s;
                b += &e;

                let q_j = ext.moduli()[j];
                let p_mod_q = special % q_j;
                let mut channels = b.channels().to_vec();
                for (c, &sv) in channels[j].iter_mut().zip(&target.channels()[j]) {
                    *c = add_mod(*c, mul_mod(sv, p_mod_q, q_j), q_j);
                }
                let b = RnsPoly::from_channels(channels, Arc::clone(ext), true)?;
                Ok((b, a))
            })
            .collect::<HeResult<Vec<_>>>()?;
        Ok(Self { digits })
    }

    pub fn digit_count(&self) -> usize {
        self.digits.len()
    }

    /// Returns `(k0, k1)` over the basis of `d` with `k0 + k1*s ~ s' * d`.
    pub fn switch(
        &self,
        d: &RnsPoly,
        chain: &ModulusChain,
        division: LastPrimeDivision,
    ) -> HeResult<(RnsPoly, RnsPoly)> {
        let level = chain
            .level_of(d.basis())
            .ok_or_else(|| HeError::invalid("key switching input is not on the modulus chain"))?;
        if level >= self.digits.len() {
            return Err(KeyError::TooFewDigits {
                available: self.digits.len(),
                needed: level + 1,
                level,
            }
            .into());
        }
        let ext = chain.extended(level);

        let mut d = d.clone();
        d.to_coeff_domain();
        let mut acc0 = RnsPoly::zero_ntt(Arc::clone(ext));
        let mut acc1 = RnsPoly::zero_ntt(Arc::clone(ext));
        for (j, (b, a)) in self.digits.iter().enumerate().take(level + 1) {
            let mut digit = d.lift_channel(j, Arc::clone(ext));
            digit.to_ntt_domain();

            let mut term = select_channels(b, ext)?;
            term *= &digit;
            acc0 += &term;
            let mut term = select_channels(a, ext)?;
            term *= &digit;
            acc1 += &term;
        }
        let base = chain.level(level);
        division.apply(&mut acc0, base)?;
        division.apply(&mut acc1, base)?;
        Ok((acc0, acc1))
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        bin_io::write_len(out, self.digits.len())?;
        for (b, a) in &self.digits {
            b.save(out)?;
            a.save(out)?;
        }
        Ok(())
    }

    pub fn load(input: &mut dyn Read, chain: &ModulusChain) -> HeResult<Self> {
        let count = bin_io::read_len(input)?;
        if count != chain.top_level() + 1 {
            return Err(HeError::corrupt(format!(
                "switching key has {count} digits, chain has {} primes",
                chain.top_level() + 1
            )));
        }
        let ext = chain.extended(chain.top_level());
        let digits = (0..count)
            .map(|_| {
                let b = RnsPoly::load(input, Arc::clone(ext))?;
                let a = RnsPoly::load(input, Arc::clone(ext))?;
                Ok((b, a))
            })
            .collect::<HeResult<Vec<_>>>()?;
        Ok(Self { digits })
    }
}

/// Restricts `poly` to the moduli of `target`, matching channels by modulus.
pub(crate) fn select_channels(poly: &RnsPoly, target: &Arc<RnsBasis>) -> HeResult<RnsPoly> {
    let source = poly.basis().moduli();
    let channels = target
        .moduli()
        .iter()
        .map(|q| {
            source
                .iter()
                .position(|s| s == q)
                .map(|i| poly.channels()[i].clone())
                .ok_or_else(|| HeError::invalid(format!("modulus {q} missing from key basis")))
        })
        .collect::<HeResult<Vec<_>>>()?;
    Ok(RnsPoly::from_channels(channels, Arc::clone(target), poly.is_ntt_domain())?)
}
