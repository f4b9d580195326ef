use std::sync::Arc;

use super::{basis::RnsBasis, errors::RingResult, ntt::NttTable};

/// A leveled modulus chain `q_0, q_1, ..., q_L` plus a special prime `P`.
///
/// Level `l` works modulo `q_0 * ... * q_l`. Key switching at level `l`
/// temporarily extends that basis with `P`. All bases share the same NTT
/// tables.
#[derive(Debug, Clone)]
pub struct ModulusChain {
    levels: Vec<Arc<RnsBasis>>,
    extended: Vec<Arc<RnsBasis>>,
}

impl ModulusChain {
    /// `primes[0]` is the base prime `q_0`; the last one is dropped first.
    pub fn new(degree: usize, primes: &[u64], special_prime: u64) -> RingResult<Self> {
        let tables = primes
            .iter()
            .map(|&q| NttTable::new(q, degree).map(Arc::new))
            .collect::<RingResult<Vec<_>>>()?;
        let special = Arc::new(NttTable::new(special_prime, degree)?);

        let mut levels = Vec::with_capacity(tables.len());
        let mut extended = Vec::with_capacity(tables.len());
        for level in 0..tables.len() {
            let basis = RnsBasis::from_tables(tables[..=level].to_vec())?;
            extended.push(Arc::new(basis.extend_with(Arc::clone(&special))?));
            levels.push(Arc::new(basis));
        }
        if levels.is_empty() {
            return Err(super::RingError::EmptyBasis);
        }
        Ok(Self { levels, extended })
    }

    pub fn degree(&self) -> usize {
        self.levels[0].degree()
    }

    pub fn top_level(&self) -> usize {
        self.levels.len() - 1
    }

    /// Basis `q_0..=q_level`.
    ///
    /// # Panics
    ///
    /// Panics if `level > top_level()`.
    pub fn level(&self, level: usize) -> &Arc<RnsBasis> {
        &self.levels[level]
    }

    /// Basis `q_0..=q_level, P`.
    pub fn extended(&self, level: usize) -> &Arc<RnsBasis> {
        &self.extended[level]
    }

    pub fn top(&self) -> &Arc<RnsBasis> {
        &self.levels[self.top_level()]
    }

    /// `q_level`, the prime a rescale at `level` divides by.
    pub fn prime(&self, level: usize) -> u64 {
        self.levels[level].moduli()[level]
    }

    pub fn moduli(&self) -> &[u64] {
        self.top().moduli()
    }

    pub fn special_prime(&self) -> u64 {
        let ext = &self.extended[0];
        ext.moduli()[ext.channel_count() - 1]
    }

    /// `log2(q_0 * ... * q_L * P)`, the figure security estimates use.
    pub fn log_qp(&self) -> f64 {
        self.extended[self.top_level()].log_modulus()
    }

    /// Level of a basis with `channel_count` chain primes.
    pub fn level_of(&self, basis: &RnsBasis) -> Option<usize> {
        let level = basis.channel_count().checked_sub(1)?;
        (level <= self.top_level() && basis.moduli() == self.levels[level].moduli()).then_some(level)
    }
}
