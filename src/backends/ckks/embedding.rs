//! Canonical embedding between slot vectors and real polynomial
//! coefficients, computed with a length-`N` FFT.
//!
//! Slot `i` is the evaluation at `psi^(5^i)`, where `psi = e^(i pi / N)`.
//! Writing `b_j = m_j psi^j`, the evaluation at `psi^(2t+1)` is
//! `sum_j b_j omega^(tj)` with `omega = psi^2`: an inverse DFT of `b`.

use std::{f64::consts::PI, fmt, sync::Arc};

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::math::mod_pow;

pub(crate) struct CkksEmbedding {
    degree: usize,
    /// DFT index of slot `i`.
    slot_index: Vec<usize>,
    /// DFT index of the conjugate of slot `i`.
    conjugate_index: Vec<usize>,
    /// `psi^j`
    twist: Vec<Complex64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for CkksEmbedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CkksEmbedding")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl CkksEmbedding {
    pub fn new(degree: usize) -> Self {
        let two_n = 2 * degree as u64;
        let slots = degree / 2;
        let (slot_index, conjugate_index) = (0..slots)
            .map(|i| {
                let k = mod_pow(5, i as u64, two_n);
                (((k - 1) / 2) as usize, ((two_n - k - 1) / 2) as usize)
            })
            .unzip();
        let twist = (0..degree)
            .map(|j| Complex64::from_polar(1.0, PI * j as f64 / degree as f64))
            .collect();

        let mut planner = FftPlanner::new();
        Self {
            degree,
            slot_index,
            conjugate_index,
            twist,
            forward: planner.plan_fft_forward(degree),
            inverse: planner.plan_fft_inverse(degree),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_index.len()
    }

    /// Real coefficients (not yet rounded) of the polynomial whose slots
    /// are `scale * values`. Missing slots are zero.
    pub fn encode(&self, values: &[Complex64], scale: f64) -> Vec<f64> {
        let mut spectrum = vec![Complex64::new(0.0, 0.0); self.degree];
        for (i, &z) in values.iter().enumerate().take(self.slot_count()) {
            spectrum[self.slot_index[i]] = z;
            spectrum[self.conjugate_index[i]] = z.conj();
        }
        self.forward.process(&mut spectrum);
        let norm = scale / self.degree as f64;
        spectrum
            .iter()
            .zip(&self.twist)
            .map(|(b, psi)| (b * psi.conj()).re * norm)
            .collect()
    }

    /// Slot values of the polynomial with coefficients `coeffs`, divided by
    /// `scale`.
    pub fn decode(&self, coeffs: &[f64], scale: f64) -> Vec<Complex64> {
        let mut twisted: Vec<Complex64> = coeffs
            .iter()
            .zip(&self.twist)
            .map(|(&m, psi)| psi * (m / scale))
            .collect();
        twisted.resize(self.degree, Complex64::new(0.0, 0.0));
        self.inverse.process(&mut twisted);
        self.slot_index.iter().map(|&t| twisted[t]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Direct evaluation of `m(X)` at `psi^k`.
    fn evaluate(coeffs: &[f64], k: u64, degree: usize) -> Complex64 {
        coeffs
            .iter()
            .enumerate()
            .map(|(j, &m)| m * Complex64::from_polar(1.0, PI * (k as f64 * j as f64) / degree as f64))
            .sum()
    }

    #[test]
    fn encoded_polynomial_evaluates_to_slots() {
        let degree = 16;
        let embedding = CkksEmbedding::new(degree);
        let values: Vec<Complex64> = (0..8)
            .map(|i| Complex64::new(i as f64 - 3.5, 0.25 * i as f64))
            .collect();
        let coeffs = embedding.encode(&values, 1.0);
        for (i, z) in values.iter().enumerate() {
            let k = mod_pow(5, i as u64, 2 * degree as u64);
            let got = evaluate(&coeffs, k, degree);
            assert_abs_diff_eq!(got.re, z.re, epsilon = 1e-9);
            assert_abs_diff_eq!(got.im, z.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let embedding = CkksEmbedding::new(32);
        let values: Vec<Complex64> = (0..16).map(|i| Complex64::new((i * i) as f64 / 7.0, -1.0)).collect();
        let scale = 2f64.powi(30);
        let coeffs: Vec<f64> = embedding.encode(&values, scale).iter().map(|c| c.round()).collect();
        let decoded = embedding.decode(&coeffs, scale);
        for (d, v) in decoded.iter().zip(&values) {
            assert_abs_diff_eq!(d.re, v.re, epsilon = 1e-6);
            assert_abs_diff_eq!(d.im, v.im, epsilon = 1e-6);
        }
    }

    #[test]
    fn real_slots_give_real_coefficients_without_imaginary_leak() {
        let embedding = CkksEmbedding::new(16);
        let coeffs = embedding.encode(&[Complex64::new(2.0, 0.0); 8], 1.0);
        assert_abs_diff_eq!(coeffs[0], 2.0, epsilon = 1e-12);
        assert!(coeffs[1..].iter().all(|c| c.abs() < 1e-12));
    }
}
