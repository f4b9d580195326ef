//! Relinearization, rotation and conjugation keys.

use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

use rand::Rng;
use tracing::{debug, instrument};

use super::{KeyError, SecretKey, SwitchingKey, SwitchingKeyParams};
use crate::{
    error::{HeError, HeResult},
    hebase::{PublicFunctions, RotationKeys, bin_io},
    math::mod_pow,
    rings::ModulusChain,
};

/// Galois element of a left rotation by `step` slots: `5^step mod 2N`.
pub fn rotation_galois_element(step: usize, degree: usize) -> usize {
    let two_n = 2 * degree as u64;
    mod_pow(5, step as u64, two_n) as usize
}

/// Galois element of complex conjugation: `2N - 1`.
pub fn conjugation_galois_element(degree: usize) -> usize {
    2 * degree - 1
}

/// Rotation offsets that `functions` asks keys for, normalized to
/// `1..slots`.
pub fn requested_rotations(functions: &PublicFunctions, slots: usize) -> Vec<usize> {
    let mut steps: Vec<usize> = match &functions.rotate {
        RotationKeys::None => Vec::new(),
        RotationKeys::PowersOfTwo => (0..)
            .map(|k| 1usize << k)
            .take_while(|&step| step < slots)
            .collect(),
        RotationKeys::Custom(offsets) => offsets
            .iter()
            .map(|&r| normalize_rotation(r, slots))
            .filter(|&r| r != 0)
            .collect(),
    };
    steps.sort_unstable();
    steps.dedup();
    steps
}

/// Maps any rotation to the equivalent left rotation in `0..slots`.
pub fn normalize_rotation(rotation: i32, slots: usize) -> usize {
    if slots == 0 {
        return 0;
    }
    (i64::from(rotation).rem_euclid(slots as i64)) as usize
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationKeys {
    relinearization: Option<SwitchingKey>,
    rotations: BTreeMap<usize, SwitchingKey>,
    conjugation: Option<SwitchingKey>,
}

impl EvaluationKeys {
    #[instrument(skip_all, fields(slots))]
    pub fn generate<R: Rng + ?Sized>(
        secret_key: &SecretKey,
        chain: &ModulusChain,
        functions: &PublicFunctions,
        slots: usize,
        params: &SwitchingKeyParams,
        rng: &mut R,
    ) -> HeResult<Self> {
        let ext = chain.extended(chain.top_level());
        let s = secret_key.to_poly(ext);
        let degree = chain.degree();

        let relinearization = if functions.relinearize {
            let mut s_squared = s.clone();
            s_squared *= &s;
            Some(SwitchingKey::generate(secret_key, &s_squared, chain, params, rng)?)
        } else {
            None
        };

        let mut rotations = BTreeMap::new();
        for step in requested_rotations(functions, slots) {
            let target = s.automorphism(rotation_galois_element(step, degree));
            rotations.insert(step, SwitchingKey::generate(secret_key, &target, chain, params, rng)?);
        }

        let conjugation = if functions.conjugate {
            let target = s.automorphism(conjugation_galois_element(degree));
            Some(SwitchingKey::generate(secret_key, &target, chain, params, rng)?)
        } else {
            None
        };

        debug!(
            relinearization = relinearization.is_some(),
            rotations = rotations.len(),
            conjugation = conjugation.is_some(),
            "generated evaluation keys"
        );
        Ok(Self {
            relinearization,
            rotations,
            conjugation,
        })
    }

    pub fn relinearization(&self) -> Result<&SwitchingKey, KeyError> {
        self.relinearization.as_ref().ok_or(KeyError::MissingRelinearizationKey)
    }

    pub fn conjugation(&self) -> Result<&SwitchingKey, KeyError> {
        self.conjugation.as_ref().ok_or(KeyError::MissingConjugationKey)
    }

    pub fn rotation(&self, step: usize) -> Result<&SwitchingKey, KeyError> {
        self.rotations
            .get(&step)
            .ok_or(KeyError::MissingRotationKey { rotation: step })
    }

    pub fn rotation_steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.rotations.keys().copied()
    }

    /// Splits a normalized left rotation into steps that have keys: the
    /// rotation itself when it has one, otherwise its binary digits.
    pub fn decompose_rotation(&self, rotation: usize) -> Result<Vec<usize>, KeyError> {
        if rotation == 0 {
            return Ok(Vec::new());
        }
        if self.rotations.contains_key(&rotation) {
            return Ok(vec![rotation]);
        }
        (0..usize::BITS)
            .map(|k| 1usize << k)
            .take_while(|&bit| bit <= rotation)
            .filter(|&bit| rotation & bit != 0)
            .map(|bit| {
                if self.rotations.contains_key(&bit) {
                    Ok(bit)
                } else {
                    Err(KeyError::MissingRotationKey { rotation: bit })
                }
            })
            .collect()
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        save_optional(out, self.relinearization.as_ref())?;
        bin_io::write_len(out, self.rotations.len())?;
        for (&step, key) in &self.rotations {
            bin_io::write_u64(out, step as u64)?;
            key.save(out)?;
        }
        save_optional(out, self.conjugation.as_ref())
    }

    pub fn load(input: &mut dyn Read, chain: &ModulusChain) -> HeResult<Self> {
        let relinearization = load_optional(input, chain)?;
        let count = bin_io::read_len(input)?;
        let mut rotations = BTreeMap::new();
        for _ in 0..count {
            let step = bin_io::read_u64(input)? as usize;
            if rotations.insert(step, SwitchingKey::load(input, chain)?).is_some() {
                return Err(HeError::corrupt(format!("rotation key {step} stored twice")));
            }
        }
        let conjugation = load_optional(input, chain)?;
        Ok(Self {
            relinearization,
            rotations,
            conjugation,
        })
    }
}

fn save_optional(out: &mut dyn Write, key: Option<&SwitchingKey>) -> HeResult<()> {
    bin_io::write_bool(out, key.is_some())?;
    if let Some(key) = key {
        key.save(out)?;
    }
    Ok(())
}

fn load_optional(input: &mut dyn Read, chain: &ModulusChain) -> HeResult<Option<SwitchingKey>> {
    if bin_io::read_bool(input)? {
        Ok(Some(SwitchingKey::load(input, chain)?))
    } else {
        Ok(None)
    }
}
