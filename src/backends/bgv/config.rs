use std::io::{Read, Write};

use tracing::warn;

use crate::{
    backends::rlwe::RlweSetup,
    error::{HeError, HeResult},
    hebase::{HeConfigRequirement, PublicFunctions, bin_io},
    keys::LastPrimeDivision,
    math::{SecurityTable, generate_primes, get_first_prime_up, max_log_qp},
};

/// Bit size of `q_0`, the prime left after the last modulus switch.
pub const BASE_PRIME_BITS: u32 = 58;
/// Bit size of every prime consumed by a modulus switch.
pub const CHAIN_PRIME_BITS: u32 = 40;
pub const SPECIAL_PRIME_BITS: u32 = 61;
pub const MIN_PLAINTEXT_MODULUS_BITS: u32 = 16;
pub const MAX_PLAINTEXT_MODULUS_BITS: u32 = 20;
pub const DEFAULT_MULTIPLICATION_DEPTH: usize = 3;

const MIN_RING_DEGREE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BgvPreset {
    /// N = 64, depth 4. For unit tests only.
    NotSecureN64,
    /// N = 256, depth 4. For demos only.
    NotSecureN256,
    /// N = 16384, depth 3, 128-bit security.
    N16384,
    /// N = 32768, depth 6, 128-bit security.
    N32768,
}

/// Concrete BGV parameters.
///
/// The plaintext modulus `t` is the first prime above
/// `2^plaintext_modulus_bits` with `t = 1 mod 2N`, so the slots are the
/// `N/2` Galois orbits of the `2N`-th roots of unity mod `t`. The chain is
/// `q_0` followed by `multiplication_depth` primes `q_i = 1 mod 2N*t`; a
/// modulus switch by such a prime leaves the message untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BgvConfig {
    pub ring_degree: usize,
    pub multiplication_depth: usize,
    pub plaintext_modulus_bits: u32,
    pub security_level: u32,
    pub public_functions: PublicFunctions,
    pub seed: Option<u64>,
}

impl Default for BgvConfig {
    fn default() -> Self {
        Self::preset(BgvPreset::N16384)
    }
}

impl BgvConfig {
    pub fn builder() -> BgvConfigBuilder {
        BgvConfigBuilder::new()
    }

    pub fn preset(preset: BgvPreset) -> Self {
        let (ring_degree, multiplication_depth, security_level) = match preset {
            BgvPreset::NotSecureN64 => (64, 4, 0),
            BgvPreset::NotSecureN256 => (256, 4, 0),
            BgvPreset::N16384 => (16384, 3, 128),
            BgvPreset::N32768 => (32768, 6, 128),
        };
        Self {
            ring_degree,
            multiplication_depth,
            plaintext_modulus_bits: MIN_PLAINTEXT_MODULUS_BITS,
            security_level,
            public_functions: PublicFunctions::default(),
            seed: None,
        }
    }

    /// The integer precision of the requirement becomes the plaintext
    /// modulus size (at least [`MIN_PLAINTEXT_MODULUS_BITS`]). The fractional
    /// precision is ignored: BGV slots hold integers.
    pub fn from_requirement(requirement: &HeConfigRequirement) -> HeResult<Self> {
        if requirement.bootstrappable {
            return Err(HeError::infeasible("bootstrapping is not supported"));
        }
        let min_degree = requirement
            .num_slots
            .map_or(MIN_RING_DEGREE, |slots| (2 * slots).max(MIN_RING_DEGREE))
            .next_power_of_two();
        let mut config = Self {
            ring_degree: min_degree,
            multiplication_depth: requirement
                .multiplication_depth
                .unwrap_or(DEFAULT_MULTIPLICATION_DEPTH),
            plaintext_modulus_bits: requirement
                .integer_part_precision
                .max(MIN_PLAINTEXT_MODULUS_BITS),
            security_level: requirement.security_level,
            public_functions: requirement.public_functions.clone(),
            seed: None,
        };
        config.validate_plaintext_modulus()?;
        while config.ring_degree <= SecurityTable::MAX_RING_DEGREE {
            if config.meets_security() {
                return Ok(config);
            }
            config.ring_degree *= 2;
        }
        Err(HeError::infeasible(format!(
            "no ring degree reaches {} bits of security for log2(QP) = {}",
            requirement.security_level,
            config.estimated_log_qp()
        )))
    }

    pub fn slot_count(&self) -> usize {
        self.ring_degree / 2
    }

    pub fn plaintext_modulus(&self) -> u64 {
        get_first_prime_up(self.plaintext_modulus_bits, 2 * self.ring_degree as u64)
    }

    pub fn estimated_log_qp(&self) -> u32 {
        BASE_PRIME_BITS + self.multiplication_depth as u32 * CHAIN_PRIME_BITS + SPECIAL_PRIME_BITS
    }

    fn meets_security(&self) -> bool {
        max_log_qp(self.ring_degree, self.security_level)
            .is_some_and(|max| self.estimated_log_qp() <= max)
    }

    fn validate_plaintext_modulus(&self) -> HeResult<()> {
        if !(MIN_PLAINTEXT_MODULUS_BITS..=MAX_PLAINTEXT_MODULUS_BITS)
            .contains(&self.plaintext_modulus_bits)
        {
            return Err(HeError::infeasible(format!(
                "plaintext modulus of {} bits outside {MIN_PLAINTEXT_MODULUS_BITS}..={MAX_PLAINTEXT_MODULUS_BITS}",
                self.plaintext_modulus_bits
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> HeResult<()> {
        if !self.ring_degree.is_power_of_two()
            || !(MIN_RING_DEGREE..=SecurityTable::MAX_RING_DEGREE).contains(&self.ring_degree)
        {
            return Err(HeError::infeasible(format!(
                "ring degree {} must be a power of two in {MIN_RING_DEGREE}..={}",
                self.ring_degree,
                SecurityTable::MAX_RING_DEGREE
            )));
        }
        self.validate_plaintext_modulus()?;
        if !self.meets_security() {
            return Err(HeError::infeasible(format!(
                "N = {} with log2(QP) = {} does not reach {} bits of security",
                self.ring_degree,
                self.estimated_log_qp(),
                self.security_level
            )));
        }
        if self.security_level == 0 {
            warn!(ring_degree = self.ring_degree, "BGV parameters are not secure");
        }
        Ok(())
    }

    pub(crate) fn setup(&self) -> HeResult<RlweSetup> {
        let two_n = 2 * self.ring_degree as u64;
        let t = self.plaintext_modulus();
        let no_primes = || {
            HeError::infeasible(format!(
                "not enough {CHAIN_PRIME_BITS}-bit primes = 1 mod 2N*t for depth {}",
                self.multiplication_depth
            ))
        };
        let switch_primes =
            generate_primes(CHAIN_PRIME_BITS, self.multiplication_depth, two_n * t, &[])
                .ok_or_else(no_primes)?;
        let mut primes =
            generate_primes(BASE_PRIME_BITS, 1, two_n, &switch_primes).ok_or_else(no_primes)?;
        primes.extend(&switch_primes);
        let special_prime =
            generate_primes(SPECIAL_PRIME_BITS, 1, two_n, &primes).ok_or_else(no_primes)?[0];

        Ok(RlweSetup {
            degree: self.ring_degree,
            primes,
            special_prime,
            slots: self.slot_count(),
            functions: self.public_functions.clone(),
            noise_factor: t,
            division: LastPrimeDivision::ModSwitch {
                plaintext_modulus: t,
            },
            seed: self.seed,
        })
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        bin_io::write_len(out, self.ring_degree)?;
        bin_io::write_len(out, self.multiplication_depth)?;
        bin_io::write_u32(out, self.plaintext_modulus_bits)?;
        bin_io::write_u32(out, self.security_level)?;
        self.public_functions.save(out)?;
        bin_io::write_bool(out, self.seed.is_some())?;
        bin_io::write_u64(out, self.seed.unwrap_or_default())?;
        Ok(())
    }

    pub fn load(input: &mut dyn Read) -> HeResult<Self> {
        let ring_degree = bin_io::read_len(input)?;
        let multiplication_depth = bin_io::read_len(input)?;
        let plaintext_modulus_bits = bin_io::read_u32(input)?;
        let security_level = bin_io::read_u32(input)?;
        let public_functions = PublicFunctions::load(input)?;
        let has_seed = bin_io::read_bool(input)?;
        let seed = bin_io::read_u64(input)?;
        let config = Self {
            ring_degree,
            multiplication_depth,
            plaintext_modulus_bits,
            security_level,
            public_functions,
            seed: has_seed.then_some(seed),
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct BgvConfigBuilder {
    config: BgvConfig,
}

impl Default for BgvConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BgvConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BgvConfig::preset(BgvPreset::NotSecureN256),
        }
    }

    pub fn from_preset(preset: BgvPreset) -> Self {
        Self {
            config: BgvConfig::preset(preset),
        }
    }

    pub fn ring_degree(mut self, ring_degree: usize) -> Self {
        self.config.ring_degree = ring_degree;
        self
    }

    pub fn multiplication_depth(mut self, depth: usize) -> Self {
        self.config.multiplication_depth = depth;
        self
    }

    pub fn plaintext_modulus_bits(mut self, bits: u32) -> Self {
        self.config.plaintext_modulus_bits = bits;
        self
    }

    pub fn security_level(mut self, bits: u32) -> Self {
        self.config.security_level = bits;
        self
    }

    pub fn public_functions(mut self, functions: PublicFunctions) -> Self {
        self.config.public_functions = functions;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> HeResult<BgvConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn plaintext_modulus_is_batching_friendly() {
        let config = BgvConfig::preset(BgvPreset::NotSecureN64);
        let t = config.plaintext_modulus();
        assert!(t > 1 << 16);
        assert_eq!(t % 128, 1);
        assert_eq!(t, 65537);
    }

    #[test]
    fn switch_primes_are_one_mod_t() {
        let config = BgvConfig::preset(BgvPreset::NotSecureN64);
        let t = config.plaintext_modulus();
        let setup = config.setup().unwrap();
        assert_eq!(setup.primes.len(), 5);
        assert!(setup.primes[0] > 1 << 57);
        for &q in &setup.primes[1..] {
            assert_eq!(q % t, 1);
            assert_eq!(q % 128, 1);
        }
        assert_eq!(
            setup.division,
            LastPrimeDivision::ModSwitch { plaintext_modulus: t }
        );
        assert_eq!(setup.noise_factor, t);
    }

    #[test]
    fn requirement_sizes_the_ring() {
        let config = BgvConfig::from_requirement(&HeConfigRequirement::insecure(32, 2)).unwrap();
        assert_eq!(config.ring_degree, 64);
        assert_eq!(config.plaintext_modulus_bits, 16);

        let secure = HeConfigRequirement::new(128, 10, 30).with_multiplication_depth(3);
        assert_eq!(BgvConfig::from_requirement(&secure).unwrap().ring_degree, 16384);

        let wide = HeConfigRequirement::new(0, 40, 10);
        assert!(BgvConfig::from_requirement(&wide).is_err());
    }

    #[test]
    fn config_persists() {
        let config = BgvConfig::builder().ring_degree(128).seed(3).build().unwrap();
        let mut buf = Vec::new();
        config.save(&mut buf).unwrap();
        assert_eq!(BgvConfig::load(&mut Cursor::new(buf)).unwrap(), config);
    }
}
