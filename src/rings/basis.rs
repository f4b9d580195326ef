use std::sync::Arc;

use crate::math::{centered, mod_inverse, mul_mod, reduce_i64, sub_mod};

use super::{
    errors::{RingError, RingResult},
    ntt::NttTable,
};

/// RNS basis: an ordered set of NTT-friendly primes sharing one ring degree.
///
/// # Invariants
/// - `moduli.len() == tables.len()` and `tables[i].modulus() == moduli[i]`
/// - `garner[i][j] = q_j^{-1} mod q_i` for every `j < i`
/// - `last_inverses[i] = q_last^{-1} mod q_i` for every `i < last`
#[derive(Debug, Clone)]
pub struct RnsBasis {
    degree: usize,
    moduli: Vec<u64>,
    tables: Vec<Arc<NttTable>>,
    garner: Vec<Vec<u64>>,
    last_inverses: Vec<u64>,
}

impl RnsBasis {
    pub fn new(degree: usize, moduli: Vec<u64>) -> RingResult<Self> {
        let tables = moduli
            .iter()
            .map(|&q| NttTable::new(q, degree).map(Arc::new))
            .collect::<RingResult<Vec<_>>>()?;
        Self::from_tables(tables)
    }

    /// Builds a basis from already computed tables, sharing them.
    pub fn from_tables(tables: Vec<Arc<NttTable>>) -> RingResult<Self> {
        let first = tables.first().ok_or(RingError::EmptyBasis)?;
        let degree = first.degree();
        if let Some(odd) = tables.iter().find(|t| t.degree() != degree) {
            return Err(RingError::DegreeMismatch {
                expected: degree,
                actual: odd.degree(),
            });
        }
        let moduli: Vec<u64> = tables.iter().map(|t| t.modulus()).collect();

        let mut garner = Vec::with_capacity(moduli.len());
        for (i, &qi) in moduli.iter().enumerate() {
            let mut row = Vec::with_capacity(i);
            for &qj in &moduli[..i] {
                row.push(inverse_or_err(qj % qi, qi, degree)?);
            }
            garner.push(row);
        }

        let last = moduli[moduli.len() - 1];
        let last_inverses = moduli[..moduli.len() - 1]
            .iter()
            .map(|&qi| inverse_or_err(last % qi, qi, degree))
            .collect::<RingResult<Vec<_>>>()?;

        Ok(Self {
            degree,
            moduli,
            tables,
            garner,
            last_inverses,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    pub fn ntt_table(&self, channel: usize) -> &NttTable {
        &self.tables[channel]
    }

    pub fn tables(&self) -> &[Arc<NttTable>] {
        &self.tables
    }

    pub fn channel_count(&self) -> usize {
        self.moduli.len()
    }

    /// `q_last^{-1} mod q_channel` for a channel below the last one.
    pub fn last_inverse(&self, channel: usize) -> u64 {
        self.last_inverses[channel]
    }

    /// Total bit size `log2(q_0 * ... * q_{L-1})`.
    pub fn log_modulus(&self) -> f64 {
        self.moduli.iter().map(|&q| (q as f64).log2()).sum()
    }

    /// Returns `true` when `self` holds the first moduli of `other`.
    pub fn is_prefix_of(&self, other: &RnsBasis) -> bool {
        self.moduli.len() <= other.moduli.len()
            && other.moduli[..self.moduli.len()] == self.moduli[..]
    }

    /// Returns a new basis with the last `drop_count` channels removed.
    pub fn drop_last(&self, drop_count: usize) -> RingResult<Self> {
        let channel_count = self.channel_count();
        if drop_count >= channel_count {
            return Err(RingError::InvalidModDrop {
                drop_count,
                channel_count,
            });
        }
        Self::from_tables(self.tables[..channel_count - drop_count].to_vec())
    }

    /// Returns a new basis with `table` appended as the last channel.
    pub fn extend_with(&self, table: Arc<NttTable>) -> RingResult<Self> {
        let mut tables = self.tables.clone();
        tables.push(table);
        Self::from_tables(tables)
    }

    /// Mixed-radix (Garner) digits of one coefficient, each centered.
    ///
    /// The value `d_0 + q_0 (d_1 + q_1 (d_2 + ...))` is congruent to the input
    /// and equals its centered representative whenever that representative is
    /// comfortably inside `(-Q/2, Q/2)`.
    pub fn mixed_radix_digits(&self, residues: &[u64], digits: &mut [i64]) {
        debug_assert_eq!(residues.len(), self.moduli.len());
        for (i, &qi) in self.moduli.iter().enumerate() {
            let mut x = residues[i];
            for (j, &inv) in self.garner[i].iter().enumerate() {
                x = sub_mod(x, reduce_i64(digits[j], qi), qi);
                x = mul_mod(x, inv, qi);
            }
            digits[i] = centered(x, qi);
        }
    }

    /// Centered lift of one coefficient, evaluated in floating point.
    pub fn reconstruct_f64(&self, residues: &[u64], scratch: &mut [i64]) -> f64 {
        self.mixed_radix_digits(residues, scratch);
        let mut acc = 0.0f64;
        for (i, &q) in self.moduli.iter().enumerate().rev() {
            acc = scratch[i] as f64 + q as f64 * acc;
        }
        acc
    }

    /// Centered lift of one coefficient, reduced modulo `t`.
    pub fn reconstruct_mod(&self, residues: &[u64], t: u64, scratch: &mut [i64]) -> u64 {
        self.mixed_radix_digits(residues, scratch);
        let mut acc = 0u64;
        for (i, &q) in self.moduli.iter().enumerate().rev() {
            acc = mul_mod(acc, q % t, t);
            acc = (acc + reduce_i64(scratch[i], t)) % t;
        }
        acc
    }

    /// Centered lift of one coefficient as a wide integer. Exact whenever the
    /// centered value fits an `i128`.
    pub fn reconstruct_i128(&self, residues: &[u64], scratch: &mut [i64]) -> i128 {
        self.mixed_radix_digits(residues, scratch);
        let mut acc = 0i128;
        for (i, &q) in self.moduli.iter().enumerate().rev() {
            acc = acc.wrapping_mul(q as i128).wrapping_add(scratch[i] as i128);
        }
        acc
    }
}

fn inverse_or_err(value: u64, modulus: u64, degree: usize) -> RingResult<u64> {
    mod_inverse(value, modulus)
        .ok_or(RingError::NonNttFriendlyModulus { modulus, degree })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_basis() {
        assert!(matches!(RnsBasis::new(8, vec![]), Err(RingError::EmptyBasis)));
    }

    #[test]
    fn drop_last_reduces_channel_count() {
        let basis = RnsBasis::new(8, vec![17, 97, 113]).unwrap();
        let reduced = basis.drop_last(1).unwrap();
        assert_eq!(reduced.moduli(), &[17, 97]);
        assert!(reduced.is_prefix_of(&basis));
        assert!(!basis.is_prefix_of(&reduced));
        assert!(matches!(
            basis.drop_last(3),
            Err(RingError::InvalidModDrop { .. })
        ));
    }

    #[test]
    fn reconstructs_centered_values() {
        let basis = RnsBasis::new(8, vec![17, 97, 113]).unwrap();
        let mut scratch = vec![0i64; 3];
        for value in [-90_000i64, -7, -1, 0, 3, 12_345, 90_000] {
            let residues: Vec<u64> =
                basis.moduli().iter().map(|&q| reduce_i64(value, q)).collect();
            assert_eq!(basis.reconstruct_i128(&residues, &mut scratch), value as i128);
            assert_eq!(basis.reconstruct_f64(&residues, &mut scratch), value as f64);
            assert_eq!(
                basis.reconstruct_mod(&residues, 257, &mut scratch),
                reduce_i64(value, 257)
            );
        }
    }

    #[test]
    fn last_inverse_inverts_last_prime() {
        let basis = RnsBasis::new(8, vec![17, 97, 113]).unwrap();
        for channel in 0..2 {
            let q = basis.moduli()[channel];
            assert_eq!(mul_mod(113 % q, basis.last_inverse(channel), q), 1);
        }
    }
}
