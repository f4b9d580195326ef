use std::io::{Read, Write};

use tracing::warn;

use crate::{
    backends::rlwe::RlweSetup,
    error::{HeError, HeResult},
    hebase::{HeConfigRequirement, PublicFunctions, bin_io},
    keys::LastPrimeDivision,
    math::{SecurityTable, generate_primes, max_log_qp},
};

/// Bit size of the special key-switching prime.
pub const SPECIAL_PRIME_BITS: u32 = 61;
/// Largest base prime.
pub const MAX_BASE_PRIME_BITS: u32 = 60;
/// Depth assumed when a requirement does not state one.
pub const DEFAULT_MULTIPLICATION_DEPTH: usize = 3;

const MIN_RING_DEGREE: usize = 16;

/// Named parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CkksPreset {
    /// N = 64, depth 6. For unit tests only.
    NotSecureN64,
    /// N = 256, depth 4. For demos only.
    NotSecureN256,
    /// N = 8192, depth 2, 128-bit security.
    N8192,
    /// N = 16384, depth 7, 128-bit security.
    N16384,
    /// N = 32768, depth 16, 128-bit security.
    N32768,
}

/// Concrete CKKS parameters.
///
/// The modulus chain is `q_0` of `integer + fractional + 1` bits (at most
/// 60), then `multiplication_depth` primes of `fractional` bits, plus a
/// 61-bit special prime for key switching. The default scale is
/// `2^fractional`.
#[derive(Debug, Clone, PartialEq)]
pub struct CkksConfig {
    pub ring_degree: usize,
    pub multiplication_depth: usize,
    pub integer_part_precision: u32,
    pub fractional_part_precision: u32,
    /// Security the parameters must reach; 0 accepts anything.
    pub security_level: u32,
    pub public_functions: PublicFunctions,
    /// Seeds key generation and encryption when set.
    pub seed: Option<u64>,
}

impl Default for CkksConfig {
    fn default() -> Self {
        Self::preset(CkksPreset::N16384)
    }
}

impl CkksConfig {
    pub fn builder() -> CkksConfigBuilder {
        CkksConfigBuilder::new()
    }

    pub fn preset(preset: CkksPreset) -> Self {
        let (ring_degree, multiplication_depth, fractional, security_level) = match preset {
            CkksPreset::NotSecureN64 => (64, 6, 30, 0),
            CkksPreset::NotSecureN256 => (256, 4, 30, 0),
            CkksPreset::N8192 => (8192, 2, 40, 128),
            CkksPreset::N16384 => (16384, 7, 40, 128),
            CkksPreset::N32768 => (32768, 16, 40, 128),
        };
        Self {
            ring_degree,
            multiplication_depth,
            integer_part_precision: 10,
            fractional_part_precision: fractional,
            security_level,
            public_functions: PublicFunctions::default(),
            seed: None,
        }
    }

    /// Picks the smallest ring that fits the requested slots and reaches the
    /// requested security with the chain the precision and depth imply.
    pub fn from_requirement(requirement: &HeConfigRequirement) -> HeResult<Self> {
        if requirement.bootstrappable {
            return Err(HeError::infeasible("bootstrapping is not supported"));
        }
        let multiplication_depth = requirement
            .multiplication_depth
            .unwrap_or(DEFAULT_MULTIPLICATION_DEPTH);
        let min_degree = requirement
            .num_slots
            .map_or(MIN_RING_DEGREE, |slots| (2 * slots).max(MIN_RING_DEGREE))
            .next_power_of_two();

        let mut config = Self {
            ring_degree: min_degree,
            multiplication_depth,
            integer_part_precision: requirement.integer_part_precision,
            fractional_part_precision: requirement.fractional_part_precision,
            security_level: requirement.security_level,
            public_functions: requirement.public_functions.clone(),
            seed: None,
        };
        config.validate_precision()?;

        while config.ring_degree <= SecurityTable::MAX_RING_DEGREE {
            if config.meets_security() {
                return Ok(config);
            }
            config.ring_degree *= 2;
        }
        Err(HeError::infeasible(format!(
            "no ring degree up to {} gives {} bits of security for log2(QP) = {}",
            SecurityTable::MAX_RING_DEGREE,
            requirement.security_level,
            config.estimated_log_qp()
        )))
    }

    pub fn slot_count(&self) -> usize {
        self.ring_degree / 2
    }

    pub fn default_scale(&self) -> f64 {
        2f64.powi(self.fractional_part_precision as i32)
    }

    pub fn base_prime_bits(&self) -> u32 {
        (self.integer_part_precision + self.fractional_part_precision + 1).min(MAX_BASE_PRIME_BITS)
    }

    /// Upper bound on `log2(QP)` for this chain.
    pub fn estimated_log_qp(&self) -> u32 {
        self.base_prime_bits()
            + self.multiplication_depth as u32 * self.fractional_part_precision
            + SPECIAL_PRIME_BITS
    }

    fn meets_security(&self) -> bool {
        max_log_qp(self.ring_degree, self.security_level)
            .is_some_and(|max| self.estimated_log_qp() <= max)
    }

    fn validate_precision(&self) -> HeResult<()> {
        if !(20..=58).contains(&self.fractional_part_precision) {
            return Err(HeError::infeasible(format!(
                "fractional precision {} outside 20..=58 bits",
                self.fractional_part_precision
            )));
        }
        if self.integer_part_precision + self.fractional_part_precision + 1 > MAX_BASE_PRIME_BITS {
            return Err(HeError::infeasible(format!(
                "integer plus fractional precision {} exceeds {} bits",
                self.integer_part_precision + self.fractional_part_precision,
                MAX_BASE_PRIME_BITS - 1
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
        self.validate_precision()?;
        if !self.meets_security() {
            return Err(HeError::infeasible(format!(
                "N = {} with log2(QP) = {} does not reach {} bits of security",
                self.ring_degree,
                self.estimated_log_qp(),
                self.security_level
            )));
        }
        if self.security_level == 0 {
            warn!(ring_degree = self.ring_degree, "CKKS parameters are not secure");
        }
        Ok(())
    }

    /// Generates the modulus chain the parameters describe.
    pub(crate) fn setup(&self) -> HeResult<RlweSetup> {
        let step = 2 * self.ring_degree as u64;
        let no_primes = || HeError::infeasible("not enough NTT-friendly primes for the chain");
        let rescale_primes = generate_primes(
            self.fractional_part_precision,
            self.multiplication_depth,
            step,
            &[],
        )
        .ok_or_else(no_primes)?;
        let base = generate_primes(self.base_prime_bits(), 1, step, &rescale_primes)
            .ok_or_else(no_primes)?;

        let mut primes = base;
        primes.extend(&rescale_primes);
        let special_prime =
            generate_primes(SPECIAL_PRIME_BITS, 1, step, &primes).ok_or_else(no_primes)?[0];

        Ok(RlweSetup {
            degree: self.ring_degree,
            primes,
            special_prime,
            slots: self.slot_count(),
            functions: self.public_functions.clone(),
            noise_factor: 1,
            division: LastPrimeDivision::Rescale,
            seed: self.seed,
        })
    }

    pub fn save(&self, out: &mut dyn Write) -> HeResult<()> {
        bin_io::write_len(out, self.ring_degree)?;
        bin_io::write_len(out, self.multiplication_depth)?;
        bin_io::write_u32(out, self.integer_part_precision)?;
        bin_io::write_u32(out, self.fractional_part_precision)?;
        bin_io::write_u32(out, self.security_level)?;
        self.public_functions.save(out)?;
        bin_io::write_bool(out, self.seed.is_some())?;
        bin_io::write_u64(out, self.seed.unwrap_or_default())?;
        Ok(())
    }

    pub fn load(input: &mut dyn Read) -> HeResult<Self> {
        let ring_degree = bin_io::read_len(input)?;
        let multiplication_depth = bin_io::read_len(input)?;
        let integer_part_precision = bin_io::read_u32(input)?;
        let fractional_part_precision = bin_io::read_u32(input)?;
        let security_level = bin_io::read_u32(input)?;
        let public_functions = PublicFunctions::load(input)?;
        let has_seed = bin_io::read_bool(input)?;
        let seed = bin_io::read_u64(input)?;
        let config = Self {
            ring_degree,
            multiplication_depth,
            integer_part_precision,
            fractional_part_precision,
            security_level,
            public_functions,
            seed: has_seed.then_some(seed),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Builder over [`CkksConfig`], starting from the `NotSecureN256` preset.
#[derive(Debug, Clone)]
pub struct CkksConfigBuilder {
    config: CkksConfig,
}

impl Default for CkksConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CkksConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CkksConfig::preset(CkksPreset::NotSecureN256),
        }
    }

    pub fn from_preset(preset: CkksPreset) -> Self {
        Self {
            config: CkksConfig::preset(preset),
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

    pub fn integer_part_precision(mut self, bits: u32) -> Self {
        self.config.integer_part_precision = bits;
        self
    }

    pub fn fractional_part_precision(mut self, bits: u32) -> Self {
        self.config.fractional_part_precision = bits;
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

    pub fn build(self) -> HeResult<CkksConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn requirement_picks_smallest_secure_ring() {
        let req = HeConfigRequirement::new(128, 10, 40).with_multiplication_depth(2);
        let config = CkksConfig::from_requirement(&req).unwrap();
        assert_eq!(config.ring_degree, 8192);
        assert!(config.estimated_log_qp() <= 218);

        let deeper = req.with_multiplication_depth(5);
        assert_eq!(CkksConfig::from_requirement(&deeper).unwrap().ring_degree, 16384);
    }

    #[test]
    fn insecure_requirement_follows_slots() {
        let config = CkksConfig::from_requirement(&HeConfigRequirement::insecure(32, 6)).unwrap();
        assert_eq!(config.ring_degree, 64);
        assert_eq!(config.slot_count(), 32);
        assert_eq!(config.base_prime_bits(), 41);
    }

    #[test]
    fn infeasible_requirements() {
        let mut req = HeConfigRequirement::insecure(8, 2);
        req.bootstrappable = true;
        assert!(matches!(
            CkksConfig::from_requirement(&req),
            Err(HeError::InfeasibleConfig { .. })
        ));

        let too_deep = HeConfigRequirement::new(256, 10, 50).with_multiplication_depth(40);
        assert!(CkksConfig::from_requirement(&too_deep).is_err());

        let odd_level = HeConfigRequirement::new(100, 10, 30);
        assert!(CkksConfig::from_requirement(&odd_level).is_err());
    }

    #[test]
    fn setup_builds_ordered_chain() {
        let config = CkksConfig::preset(CkksPreset::NotSecureN64);
        let setup = config.setup().unwrap();
        assert_eq!(setup.primes.len(), 7);
        assert!(setup.primes[0] > 1 << 40);
        assert!(setup.primes[1..].iter().all(|&q| q < 1 << 30 && q > 1 << 29));
        assert!(setup.special_prime > 1 << 60);
        assert!(setup.primes.iter().all(|&q| q % 128 == 1));
    }

    #[test]
    fn builder_and_persistence() {
        let config = CkksConfig::builder()
            .ring_degree(128)
            .multiplication_depth(3)
            .seed(9)
            .build()
            .unwrap();
        let mut buf = Vec::new();
        config.save(&mut buf).unwrap();
        assert_eq!(CkksConfig::load(&mut Cursor::new(buf)).unwrap(), config);

        assert!(CkksConfig::builder().ring_degree(100).build().is_err());
    }
}
