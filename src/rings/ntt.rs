use crate::math::{
    add_mod, find_primitive_root, is_ntt_friendly_prime, mod_inverse, mod_pow,
    mul_mod, sub_mod,
};

use super::errors::{RingError, RingResult};

/// Precomputed twiddles for the negacyclic NTT over `Z_q[X]/(X^N + 1)`.
///
/// The forward transform maps coefficients `m_j` to evaluations
/// `m(psi^(2t+1))` in natural order `t = 0..N`, where `psi` is a primitive
/// `2N`-th root of unity. It is computed as a twist by `psi^j` followed by a
/// cyclic radix-2 transform with `omega = psi^2`.
#[derive(Debug, Clone)]
pub struct NttTable {
    degree: usize,
    modulus: u64,
    psi: u64,
    psi_powers: Vec<u64>,
    // n^{-1} * psi^{-j}, folded into the inverse untwist
    psi_inv_scaled: Vec<u64>,
    omega_powers: Vec<u64>,
    omega_inv_powers: Vec<u64>,
}

impl NttTable {
    pub fn new(modulus: u64, degree: usize) -> RingResult<Self> {
        if degree < 2 || !degree.is_power_of_two() {
            return Err(RingError::InvalidDegree { degree });
        }
        if !is_ntt_friendly_prime(modulus, degree as u64) {
            return Err(RingError::NonNttFriendlyModulus { modulus, degree });
        }

        let psi = find_primitive_root(modulus, 2 * degree as u64);
        let psi_inv = mod_inverse(psi, modulus).ok_or(
            RingError::NonNttFriendlyModulus { modulus, degree },
        )?;
        let n_inv = mod_inverse(degree as u64, modulus)
            .ok_or(RingError::NonNttFriendlyModulus { modulus, degree })?;
        let omega = mul_mod(psi, psi, modulus);
        let omega_inv = mul_mod(psi_inv, psi_inv, modulus);

        let powers = |base: u64, count: usize, start: u64| {
            let mut out = Vec::with_capacity(count);
            let mut acc = start;
            for _ in 0..count {
                out.push(acc);
                acc = mul_mod(acc, base, modulus);
            }
            out
        };

        Ok(Self {
            degree,
            modulus,
            psi,
            psi_powers: powers(psi, degree, 1),
            psi_inv_scaled: powers(psi_inv, degree, n_inv),
            omega_powers: powers(omega, degree / 2, 1),
            omega_inv_powers: powers(omega_inv, degree / 2, 1),
        })
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// The primitive `2N`-th root of unity the table is built on.
    pub fn psi(&self) -> u64 {
        self.psi
    }

    /// In-place forward negacyclic NTT.
    pub fn forward(&self, values: &mut [u64]) {
        debug_assert_eq!(values.len(), self.degree);
        for (v, &w) in values.iter_mut().zip(&self.psi_powers) {
            *v = mul_mod(*v, w, self.modulus);
        }
        bit_reverse_permute(values);
        cooley_tukey(values, &self.omega_powers, self.modulus);
    }

    /// In-place inverse negacyclic NTT.
    pub fn inverse(&self, values: &mut [u64]) {
        debug_assert_eq!(values.len(), self.degree);
        bit_reverse_permute(values);
        cooley_tukey(values, &self.omega_inv_powers, self.modulus);
        for (v, &w) in values.iter_mut().zip(&self.psi_inv_scaled) {
            *v = mul_mod(*v, w, self.modulus);
        }
    }

    /// Evaluates the polynomial at `psi^exponent` directly. Reference path for
    /// tests and batching checks.
    pub fn evaluate_at(&self, coeffs: &[u64], exponent: u64) -> u64 {
        let point = mod_pow(self.psi, exponent, self.modulus);
        coeffs.iter().rev().fold(0, |acc, &c| {
            add_mod(mul_mod(acc, point, self.modulus), c, self.modulus)
        })
    }
}

// ─── Kernels ──────────────────────────────────────────────────────────────────

// Radix-2 DIT over bit-reversed input; `roots[k] = omega^k` for k < n/2.
fn cooley_tukey(values: &mut [u64], roots: &[u64], modulus: u64) {
    let n = values.len();
    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let step = n / len;
        for start in (0..n).step_by(len) {
            for offset in 0..half {
                let left = start + offset;
                let right = left + half;
                let t = mul_mod(values[right], roots[offset * step], modulus);
                let u = values[left];
                values[left] = add_mod(u, t, modulus);
                values[right] = sub_mod(u, t, modulus);
            }
        }
        len *= 2;
    }
}

fn bit_reverse_permute(values: &mut [u64]) {
    let bits = values.len().trailing_zeros();
    if bits == 0 {
        return;
    }
    for i in 0..values.len() {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if i < j {
            values.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            NttTable::new(19, 8),
            Err(RingError::NonNttFriendlyModulus { modulus: 19, degree: 8 })
        ));
        assert!(matches!(
            NttTable::new(17, 6),
            Err(RingError::InvalidDegree { degree: 6 })
        ));
    }

    #[test]
    fn forward_evaluates_at_odd_powers_of_psi() {
        let table = NttTable::new(97, 8).unwrap();
        let coeffs = vec![3u64, 1, 4, 1, 5, 9, 2, 6];
        let mut evals = coeffs.clone();
        table.forward(&mut evals);
        for (t, &value) in evals.iter().enumerate() {
            assert_eq!(value, table.evaluate_at(&coeffs, 2 * t as u64 + 1));
        }
    }

    #[test]
    fn inverse_undoes_forward() {
        let table = NttTable::new(7681, 16).unwrap();
        let coeffs: Vec<u64> = (0..16).map(|i| (i * 37 + 5) % 7681).collect();
        let mut values = coeffs.clone();
        table.forward(&mut values);
        table.inverse(&mut values);
        assert_eq!(values, coeffs);
    }

    #[test]
    fn pointwise_product_is_negacyclic() {
        // x^7 * x = x^8 = -1 in Z_97[x]/(x^8 + 1)
        let table = NttTable::new(97, 8).unwrap();
        let mut a = vec![0, 0, 0, 0, 0, 0, 0, 1];
        let mut b = vec![0, 1, 0, 0, 0, 0, 0, 0];
        table.forward(&mut a);
        table.forward(&mut b);
        let mut product: Vec<u64> =
            a.iter().zip(&b).map(|(&x, &y)| mul_mod(x, y, 97)).collect();
        table.inverse(&mut product);
        assert_eq!(product, vec![96, 0, 0, 0, 0, 0, 0, 0]);
    }
}
