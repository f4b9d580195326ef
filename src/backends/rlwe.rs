//! Key ownership and ciphertext-part arithmetic shared by the CKKS and BGV
//! backends.
//!
//! A ciphertext is a list of parts `c_0, c_1, ...` over one level of the
//! modulus chain, all kept in NTT domain, decrypting to `sum c_i s^i`.

use std::{
    io::{Read, Write},
    sync::{Mutex, OnceLock, PoisonError},
};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::{
    error::{HeError, HeResult},
    hebase::{PublicFunctions, bin_io},
    keys::{
        DEFAULT_ERROR_STD, EvaluationKeys, LastPrimeDivision, PublicKey, PublicKeyParams,
        SecretKey, SecretKeyParams, SwitchingKey,
        evaluation_keys::{conjugation_galois_element, normalize_rotation, rotation_galois_element},
        public_key::decrypt_parts,
    },
    math::estimate_security_level,
    rings::{ModulusChain, RnsPoly},
};

/// Everything needed to rebuild the same chain and keys.
#[derive(Debug, Clone)]
pub(crate) struct RlweSetup {
    pub degree: usize,
    /// `q_0` first.
    pub primes: Vec<u64>,
    pub special_prime: u64,
    pub slots: usize,
    pub functions: PublicFunctions,
    pub noise_factor: u64,
    pub division: LastPrimeDivision,
    pub seed: Option<u64>,
}

impl RlweSetup {
    fn rng(&self) -> ChaCha20Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_rng(&mut rand::rng()),
        }
    }

    fn key_params(&self) -> PublicKeyParams {
        PublicKeyParams {
            error_std: DEFAULT_ERROR_STD,
            noise_factor: self.noise_factor,
        }
    }
}

/// Keys and randomness of an initialized RLWE context.
#[derive(Debug)]
pub(crate) struct RlweCore {
    chain: ModulusChain,
    public_key: PublicKey,
    evaluation_keys: EvaluationKeys,
    secret_key: OnceLock<SecretKey>,
    rng: Mutex<ChaCha20Rng>,
    params: PublicKeyParams,
    division: LastPrimeDivision,
    slots: usize,
}

impl RlweCore {
    pub fn generate(setup: &RlweSetup) -> HeResult<Self> {
        let chain = ModulusChain::new(setup.degree, &setup.primes, setup.special_prime)?;
        let mut rng = setup.rng();
        let params = setup.key_params();

        let secret_key = SecretKey::generate(&SecretKeyParams::sparse(setup.degree), &mut rng)?;
        let public_key = PublicKey::generate(&secret_key, chain.top(), &params, &mut rng)?;
        let evaluation_keys = EvaluationKeys::generate(
            &secret_key,
            &chain,
            &setup.functions,
            setup.slots,
            &params,
            &mut rng,
        )?;
        debug!(degree = setup.degree, levels = chain.top_level() + 1, "generated RLWE keys");

        Ok(Self {
            chain,
            public_key,
            evaluation_keys,
            secret_key: OnceLock::from(secret_key),
            rng: Mutex::new(rng),
            params,
            division: setup.division,
            slots: setup.slots,
        })
    }

    pub fn chain(&self) -> &ModulusChain {
        &self.chain
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn security_level(&self) -> u32 {
        estimate_security_level(self.chain.degree(), self.chain.log_qp().ceil() as u32)
    }

    pub fn has_secret_key(&self) -> bool {
        self.secret_key.get().is_some()
    }

    fn secret_key(&self) -> HeResult<&SecretKey> {
        self.secret_key.get().ok_or(HeError::MissingSecretKey)
    }

    pub fn install_secret_key(&self, secret_key: SecretKey) -> HeResult<()> {
        self.secret_key
            .set(secret_key)
            .map_err(|_| HeError::SecretKeyExists)
    }

    /// Runs `f` with the context RNG.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha20Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Public-key encryption of `message` at the level of its basis.
    pub fn encrypt(&self, message: &RnsPoly) -> HeResult<Vec<RnsPoly>> {
        self.with_rng(|rng| self.public_key.encrypt(message, &self.params, rng))
    }

    /// `sum c_i s^i` in coefficient domain.
    pub fn decrypt(&self, parts: &[RnsPoly]) -> HeResult<RnsPoly> {
        decrypt_parts(parts, self.secret_key()?)
    }

    pub fn level_of(&self, parts: &[RnsPoly]) -> HeResult<usize> {
        let first = parts.first().ok_or(HeError::Empty { what: "ciphertext" })?;
        self.chain
            .level_of(first.basis())
            .ok_or_else(|| HeError::corrupt("ciphertext is not on the modulus chain"))
    }

    /// Drops residues down to `level` without dividing.
    pub fn drop_to_level(&self, parts: &mut [RnsPoly], level: usize) -> HeResult<()> {
        let target = self.chain.level(level);
        for part in parts {
            part.drop_to(target)?;
        }
        Ok(())
    }

    /// Divides every part by the top prime of its level: a rescale for CKKS,
    /// a modulus switch for BGV.
    pub fn divide_by_last_prime(&self, parts: &mut [RnsPoly]) -> HeResult<()> {
        let level = self.level_of(parts)?;
        if level == 0 {
            return Err(HeError::ChainIndexOutOfRange {
                chain_index: -1,
                min: 0,
                max: self.chain.top_level() as i32,
            });
        }
        let target = self.chain.level(level - 1);
        for part in parts {
            self.division.apply(part, target)?;
        }
        Ok(())
    }

    /// Product of two ciphertexts before relinearization: the convolution
    /// of their part lists.
    pub fn tensor(&self, lhs: &[RnsPoly], rhs: &[RnsPoly]) -> HeResult<Vec<RnsPoly>> {
        let (Some(first), false) = (lhs.first(), rhs.is_empty()) else {
            return Err(HeError::Empty { what: "ciphertext" });
        };
        let mut out = vec![RnsPoly::zero_ntt(first.basis().clone()); lhs.len() + rhs.len() - 1];
        for (i, a) in lhs.iter().enumerate() {
            for (j, b) in rhs.iter().enumerate() {
                let mut term = a.clone();
                term *= b;
                out[i + j] += &term;
            }
        }
        Ok(out)
    }

    /// Folds `c_2` back into `(c_0, c_1)` with the relinearization key.
    pub fn relinearize(&self, parts: &mut Vec<RnsPoly>) -> HeResult<()> {
        match parts.len() {
            0..=2 => Ok(()),
            3 => {
                let key = self.evaluation_keys.relinearization()?;
                let Some(c2) = parts.pop() else {
                    return Err(HeError::Empty { what: "ciphertext" });
                };
                let (k0, k1) = key.switch(&c2, &self.chain, self.division)?;
                parts[0] += &k0;
                parts[1] += &k1;
                Ok(())
            }
            n => Err(HeError::invalid(format!(
                "cannot relinearize a ciphertext with {n} parts"
            ))),
        }
    }

    /// Left rotation by `rotation` slots, composed from the available keys.
    pub fn rotate(&self, parts: &mut Vec<RnsPoly>, rotation: i32) -> HeResult<()> {
        let normalized = normalize_rotation(rotation, self.slots);
        let steps = self.evaluation_keys.decompose_rotation(normalized)?;
        for step in steps {
            let key = self.evaluation_keys.rotation(step)?;
            let galois = rotation_galois_element(step, self.chain.degree());
            self.apply_galois(parts, key, galois)?;
        }
        Ok(())
    }

    pub fn conjugate(&self, parts: &mut Vec<RnsPoly>) -> HeResult<()> {
        let key = self.evaluation_keys.conjugation()?;
        let galois = conjugation_galois_element(self.chain.degree());
        self.apply_galois(parts, key, galois)
    }

    fn apply_galois(&self, parts: &mut Vec<RnsPoly>, key: &SwitchingKey, galois: usize) -> HeResult<()> {
        self.relinearize(parts)?;
        let [c0, c1] = parts.as_slice() else {
            return Err(HeError::Empty { what: "ciphertext" });
        };
        let mut c0 = c0.automorphism(galois);
        let c1 = c1.automorphism(galois);
        let (k0, k1) = key.switch(&c1, &self.chain, self.division)?;
        c0 += &k0;
        *parts = vec![c0, k1];
        Ok(())
    }

    /// Public key, evaluation keys and, when asked, the secret key.
    pub fn save(&self, out: &mut dyn Write, with_secret_key: bool) -> HeResult<()> {
        self.public_key.save(out)?;
        self.evaluation_keys.save(out)?;
        let secret = if with_secret_key {
            Some(self.secret_key()?)
        } else {
            None
        };
        bin_io::write_bool(out, secret.is_some())?;
        if let Some(secret) = secret {
            secret.save(out)?;
        }
        Ok(())
    }

    /// Reads what [`RlweCore::save`] wrote. The RNG is seeded afresh.
    pub fn load(input: &mut dyn Read, setup: &RlweSetup) -> HeResult<Self> {
        let chain = ModulusChain::new(setup.degree, &setup.primes, setup.special_prime)?;
        let public_key = PublicKey::load(input, chain.top())?;
        let evaluation_keys = EvaluationKeys::load(input, &chain)?;
        let secret_key = OnceLock::new();
        if bin_io::read_bool(input)? {
            let _ = secret_key.set(SecretKey::load(input, setup.degree)?);
        }
        Ok(Self {
            chain,
            public_key,
            evaluation_keys,
            secret_key,
            rng: Mutex::new(ChaCha20Rng::from_rng(&mut rand::rng())),
            params: setup.key_params(),
            division: setup.division,
            slots: setup.slots,
        })
    }

    pub fn save_secret_key(&self, out: &mut dyn Write) -> HeResult<()> {
        self.secret_key()?.save(out)
    }

    pub fn load_secret_key(&self, input: &mut dyn Read) -> HeResult<()> {
        if self.has_secret_key() {
            return Err(HeError::SecretKeyExists);
        }
        let secret_key = SecretKey::load(input, self.chain.degree())?;
        self.install_secret_key(secret_key)
    }
}

/// Writes the part count and every part. The level is implied by the
/// channel count of the parts.
pub(crate) fn save_parts(out: &mut dyn Write, parts: &[RnsPoly]) -> HeResult<()> {
    bin_io::write_len(out, parts.len())?;
    match parts.first() {
        Some(first) => bin_io::write_len(out, first.channel_count())?,
        None => bin_io::write_len(out, 0)?,
    }
    for part in parts {
        part.save(out)?;
    }
    Ok(())
}

pub(crate) fn load_parts(input: &mut dyn Read, chain: &ModulusChain) -> HeResult<Vec<RnsPoly>> {
    let count = bin_io::read_len(input)?;
    let channels = bin_io::read_len(input)?;
    if count == 0 {
        return Ok(Vec::new());
    }
    if channels == 0 || channels > chain.top_level() + 1 {
        return Err(HeError::corrupt(format!(
            "ciphertext with {channels} channels on a chain of {} primes",
            chain.top_level() + 1
        )));
    }
    let basis = chain.level(channels - 1);
    (0..count)
        .map(|_| RnsPoly::load(input, basis.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hebase::RotationKeys;
    use crate::math::generate_primes;
    use std::{io::Cursor, sync::Arc};

    const DEGREE: usize = 32;

    fn setup() -> RlweSetup {
        let step = 2 * DEGREE as u64;
        let primes = generate_primes(40, 3, step, &[]).unwrap();
        let special_prime = generate_primes(61, 1, step, &primes).unwrap()[0];
        RlweSetup {
            degree: DEGREE,
            primes,
            special_prime,
            slots: DEGREE / 2,
            functions: PublicFunctions {
                relinearize: true,
                rotate: RotationKeys::PowersOfTwo,
                conjugate: true,
            },
            noise_factor: 1,
            division: LastPrimeDivision::Rescale,
            seed: Some(42),
        }
    }

    fn encrypt_coeffs(core: &RlweCore, coeffs: &[i64]) -> Vec<RnsPoly> {
        let m = RnsPoly::from_coeffs(coeffs, Arc::clone(core.chain().top()));
        core.encrypt(&m).unwrap()
    }

    #[test]
    fn tensor_then_relinearize_decrypts_to_product() {
        let core = RlweCore::generate(&setup()).unwrap();
        let mut a = vec![0i64; DEGREE];
        a[0] = 1 << 20;
        let mut b = vec![0i64; DEGREE];
        b[1] = 1 << 20;
        let ca = encrypt_coeffs(&core, &a);
        let cb = encrypt_coeffs(&core, &b);

        let mut product = core.tensor(&ca, &cb).unwrap();
        assert_eq!(product.len(), 3);
        core.relinearize(&mut product).unwrap();
        assert_eq!(product.len(), 2);

        let got = core.decrypt(&product).unwrap().to_centered_f64();
        let expected = (1u64 << 40) as f64;
        assert!((got[1] - expected).abs() / expected < 1e-3);
        assert!(got[0].abs() / expected < 1e-3);
    }

    #[test]
    fn divide_by_last_prime_drops_one_level() {
        let core = RlweCore::generate(&setup()).unwrap();
        let mut parts = encrypt_coeffs(&core, &[1 << 45]);
        assert_eq!(core.level_of(&parts).unwrap(), 2);
        core.divide_by_last_prime(&mut parts).unwrap();
        assert_eq!(core.level_of(&parts).unwrap(), 1);
        core.drop_to_level(&mut parts, 0).unwrap();
        assert!(core.divide_by_last_prime(&mut parts).is_err());
    }

    #[test]
    fn save_load_without_secret_key() {
        let setup = setup();
        let core = RlweCore::generate(&setup).unwrap();
        let mut buf = Vec::new();
        core.save(&mut buf, false).unwrap();
        let loaded = RlweCore::load(&mut Cursor::new(buf), &setup).unwrap();
        assert!(!loaded.has_secret_key());

        let parts = encrypt_coeffs(&loaded, &[12345]);
        assert!(matches!(loaded.decrypt(&parts), Err(HeError::MissingSecretKey)));

        let mut secret = Vec::new();
        core.save_secret_key(&mut secret).unwrap();
        loaded.load_secret_key(&mut Cursor::new(secret.clone())).unwrap();
        assert!(matches!(
            loaded.load_secret_key(&mut Cursor::new(secret)),
            Err(HeError::SecretKeyExists)
        ));
        let got = loaded.decrypt(&parts).unwrap().to_coeffs();
        assert!((got[0] - 12345).abs() < 1000);
    }

    #[test]
    fn parts_round_trip() {
        let core = RlweCore::generate(&setup()).unwrap();
        let mut parts = encrypt_coeffs(&core, &[7]);
        core.drop_to_level(&mut parts, 1).unwrap();
        let mut buf = Vec::new();
        save_parts(&mut buf, &parts).unwrap();
        let loaded = load_parts(&mut Cursor::new(buf), core.chain()).unwrap();
        assert_eq!(loaded, parts);
    }
}
