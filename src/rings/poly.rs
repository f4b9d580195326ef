use super::{
    basis::RnsBasis,
    errors::{RingError, RingResult},
};
use crate::math::{
    add_mod, centered, mul_mod, reduce_i64, reduce_i128, sub_mod,
    sampling::{gaussian_integers, ternary_integers, uniform_residues},
};
use rand::Rng;
use std::{
    ops::{AddAssign, MulAssign, Neg, SubAssign},
    sync::Arc,
};

/// A polynomial in `Z_{q_0} x … x Z_{q_{L-1}}[X] / (X^N + 1)`.
///
/// Stores one residue vector per RNS channel. The `in_ntt_domain` flag tracks
/// whether they hold coefficients or negacyclic NTT evaluations.
///
/// # Invariants
/// - `channels.len() == basis.channel_count()`
/// - `channels[i].len() == basis.degree()`
/// - Every `channels[i][j] < basis.moduli()[i]`
#[derive(Clone, Debug)]
pub struct RnsPoly {
    channels: Vec<Vec<u64>>,
    basis: Arc<RnsBasis>,
    in_ntt_domain: bool,
}

// ─── Constructors ─────────────────────────────────────────────────────────────

impl RnsPoly {
    /// Creates the zero polynomial in coefficient domain.
    pub fn zero(basis: Arc<RnsBasis>) -> Self {
        let channels = vec![vec![0u64; basis.degree()]; basis.channel_count()];
        Self {
            channels,
            basis,
            in_ntt_domain: false,
        }
    }

    /// Creates the zero polynomial flagged as NTT domain.
    pub fn zero_ntt(basis: Arc<RnsBasis>) -> Self {
        let mut poly = Self::zero(basis);
        poly.in_ntt_domain = true;
        poly
    }

    /// Creates a polynomial from signed integer coefficients.
    ///
    /// Missing trailing coefficients are zero.
    ///
    /// # Panics
    ///
    /// Panics if more than `degree` coefficients are given.
    pub fn from_coeffs(coeffs: &[i64], basis: Arc<RnsBasis>) -> Self {
        let degree = basis.degree();
        assert!(
            coeffs.len() <= degree,
            "from_coeffs: got {} coefficients for degree {degree}",
            coeffs.len()
        );
        let mut poly = Self::zero(basis);
        for (ch, channel) in poly.channels.iter_mut().enumerate() {
            let q = poly.basis.moduli()[ch];
            for (slot, &c) in channel.iter_mut().zip(coeffs) {
                *slot = reduce_i64(c, q);
            }
        }
        poly
    }

    /// Creates a polynomial from real coefficients, rounding each to the
    /// nearest integer before reduction.
    pub fn from_f64_rounded(coeffs: &[f64], basis: Arc<RnsBasis>) -> RingResult<Self> {
        const LIMIT: f64 = 1.7e38; // just below 2^127
        let rounded = coeffs
            .iter()
            .map(|&c| {
                let r = c.round();
                if r.is_finite() && r.abs() < LIMIT {
                    Ok(r as i128)
                } else {
                    Err(RingError::CoefficientOverflow { value: c })
                }
            })
            .collect::<RingResult<Vec<i128>>>()?;
        let degree = basis.degree();
        if rounded.len() > degree {
            return Err(RingError::DegreeMismatch {
                expected: degree,
                actual: rounded.len(),
            });
        }
        let mut poly = Self::zero(basis);
        for (ch, channel) in poly.channels.iter_mut().enumerate() {
            let q = poly.basis.moduli()[ch];
            for (slot, &c) in channel.iter_mut().zip(&rounded) {
                *slot = reduce_i128(c, q);
            }
        }
        Ok(poly)
    }

    /// Creates a polynomial from pre-built channel vectors.
    ///
    /// Returns an error if the shape doesn't match the basis, or if any value
    /// is not reduced.
    pub fn from_channels(
        channels: Vec<Vec<u64>>,
        basis: Arc<RnsBasis>,
        in_ntt_domain: bool,
    ) -> RingResult<Self> {
        let expected = basis.channel_count();
        let actual = channels.len();
        if actual != expected {
            return Err(RingError::ChannelCountMismatch { expected, actual });
        }
        for (ch, channel) in channels.iter().enumerate() {
            if channel.len() != basis.degree() {
                return Err(RingError::DegreeMismatch {
                    expected: basis.degree(),
                    actual: channel.len(),
                });
            }
            let q = basis.moduli()[ch];
            if let Some(&c) = channel.iter().find(|&&c| c >= q) {
                return Err(RingError::NonReducedCoefficient {
                    coefficient: c,
                    modulus: q,
                });
            }
        }
        Ok(Self {
            channels,
            basis,
            in_ntt_domain,
        })
    }

    /// Samples residues uniform in `[0, q_i)` per channel. The result is
    /// flagged as NTT domain, where uniform is uniform.
    pub fn sample_uniform<R: Rng + ?Sized>(basis: Arc<RnsBasis>, rng: &mut R) -> Self {
        let channels = basis
            .moduli()
            .iter()
            .map(|&q| uniform_residues(basis.degree(), q, rng))
            .collect();
        Self {
            channels,
            basis,
            in_ntt_domain: true,
        }
    }

    /// Samples rounded Gaussian noise, in coefficient domain.
    pub fn sample_gaussian<R: Rng + ?Sized>(
        basis: Arc<RnsBasis>,
        std_dev: f64,
        rng: &mut R,
    ) -> Self {
        let noise = gaussian_integers(basis.degree(), std_dev, rng);
        Self::from_coeffs(&noise, basis)
    }

    /// Samples a ternary polynomial with exactly `hamming_weight` non-zero
    /// coefficients, in coefficient domain.
    pub fn sample_ternary<R: Rng + ?Sized>(
        basis: Arc<RnsBasis>,
        hamming_weight: usize,
        rng: &mut R,
    ) -> Self {
        let ternary = ternary_integers(basis.degree(), hamming_weight, rng);
        Self::from_coeffs(&ternary, basis)
    }
}

// ─── Accessors & domain conversion ───────────────────────────────────────────

impl RnsPoly {
    pub fn channels(&self) -> &[Vec<u64>] {
        &self.channels
    }

    pub fn basis(&self) -> &Arc<RnsBasis> {
        &self.basis
    }

    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_ntt_domain(&self) -> bool {
        self.in_ntt_domain
    }

    /// Converts to NTT domain in-place (no-op if already there).
    pub fn to_ntt_domain(&mut self) {
        if self.in_ntt_domain {
            return;
        }
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            self.basis.ntt_table(ch).forward(channel);
        }
        self.in_ntt_domain = true;
    }

    /// Converts to coefficient domain in-place (no-op if already there).
    pub fn to_coeff_domain(&mut self) {
        if !self.in_ntt_domain {
            return;
        }
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            self.basis.ntt_table(ch).inverse(channel);
        }
        self.in_ntt_domain = false;
    }

    /// Drops trailing channels so that the polynomial lives in `target`,
    /// which must be a prefix of the current basis. Works in both domains.
    pub fn drop_to(&mut self, target: &Arc<RnsBasis>) -> RingResult<()> {
        self.check_prefix(target)?;
        self.channels.truncate(target.channel_count());
        self.basis = Arc::clone(target);
        Ok(())
    }

    fn check_prefix(&self, target: &Arc<RnsBasis>) -> RingResult<()> {
        if target.is_prefix_of(&self.basis) {
            Ok(())
        } else {
            Err(RingError::NotAPrefix {
                target: target.moduli().to_vec(),
                source_moduli: self.basis.moduli().to_vec(),
            })
        }
    }

    fn check_single_drop(&self, target: &Arc<RnsBasis>) -> RingResult<()> {
        self.check_prefix(target)?;
        if target.channel_count() + 1 != self.channel_count() {
            return Err(RingError::InvalidModDrop {
                drop_count: self.channel_count() - target.channel_count(),
                channel_count: self.channel_count(),
            });
        }
        Ok(())
    }
}

// ─── Modulus reduction ────────────────────────────────────────────────────────

impl RnsPoly {
    /// Divides by the last prime `q_l` with rounding and drops its channel:
    /// `c' = (c - [c]_{q_l}) / q_l` with the centered remainder.
    ///
    /// `target` is the basis without the last prime. The domain is preserved.
    pub fn rescale_by_last(&mut self, target: &Arc<RnsBasis>) -> RingResult<()> {
        self.divide_by_last(target, |last, _| i128::from(last))
    }

    /// BGV modulus switch: divides by the last prime `q_l` after subtracting
    /// `delta = t * [c * t^{-1}]_{q_l}`, so the result stays congruent to
    /// `c * q_l^{-1}` modulo `t`.
    pub fn bgv_mod_switch(
        &mut self,
        plaintext_modulus: u64,
        target: &Arc<RnsBasis>,
    ) -> RingResult<()> {
        let q_last = self.basis.moduli()[self.channel_count() - 1];
        let t_inv = crate::math::mod_inverse(plaintext_modulus % q_last, q_last)
            .ok_or(RingError::NonReducedCoefficient {
                coefficient: plaintext_modulus,
                modulus: q_last,
            })?;
        self.divide_by_last(target, move |last, q| {
            let k = centered(mul_mod(last.rem_euclid(q as i64) as u64, t_inv, q), q);
            k as i128 * plaintext_modulus as i128
        })
    }

    // `delta(centered_last_residue, q_last)` returns the integer subtracted
    // before dividing; it must be congruent to the residue mod q_last.
    fn divide_by_last<F>(&mut self, target: &Arc<RnsBasis>, delta: F) -> RingResult<()>
    where
        F: Fn(i64, u64) -> i128,
    {
        self.check_single_drop(target)?;
        let was_ntt = self.in_ntt_domain;
        self.to_coeff_domain();

        let last_index = self.channel_count() - 1;
        let q_last = self.basis.moduli()[last_index];
        let Some(last) = self.channels.pop() else {
            return Err(RingError::EmptyBasis);
        };
        let deltas: Vec<i128> = last
            .iter()
            .map(|&r| delta(centered(r, q_last), q_last))
            .collect();

        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.moduli()[ch];
            let inv = self.basis.last_inverse(ch);
            for (c, &d) in channel.iter_mut().zip(&deltas) {
                *c = mul_mod(sub_mod(*c, reduce_i128(d, q), q), inv, q);
            }
        }
        self.basis = Arc::clone(target);
        if was_ntt {
            self.to_ntt_domain();
        }
        Ok(())
    }
}

// ─── Structural maps ──────────────────────────────────────────────────────────

impl RnsPoly {
    /// Applies the ring automorphism `X -> X^galois` (`galois` odd).
    ///
    /// Returns a polynomial in the same domain as `self`.
    pub fn automorphism(&self, galois: usize) -> RnsPoly {
        let degree = self.degree();
        let two_n = 2 * degree;
        debug_assert!(galois % 2 == 1, "automorphism: galois element must be odd");

        let mut source = self.clone();
        source.to_coeff_domain();
        let mut out = RnsPoly::zero(Arc::clone(&self.basis));
        for (ch, channel) in source.channels.iter().enumerate() {
            let q = self.basis.moduli()[ch];
            let target = &mut out.channels[ch];
            for (j, &c) in channel.iter().enumerate() {
                let index = (j * galois) % two_n;
                if index < degree {
                    target[index] = c;
                } else {
                    target[index - degree] = if c == 0 { 0 } else { q - c };
                }
            }
        }
        if self.in_ntt_domain {
            out.to_ntt_domain();
        }
        out
    }

    /// Lifts the residues of one channel, read as centered integers, into the
    /// basis `target`. Requires coefficient domain; the result is in
    /// coefficient domain.
    pub fn lift_channel(&self, channel: usize, target: Arc<RnsBasis>) -> RnsPoly {
        debug_assert!(!self.in_ntt_domain, "lift_channel: requires coefficient domain");
        let q = self.basis.moduli()[channel];
        let values: Vec<i64> = self.channels[channel]
            .iter()
            .map(|&r| centered(r, q))
            .collect();
        RnsPoly::from_coeffs(&values, target)
    }

    /// Multiplies channel `i` by `scalars[i]`.
    pub fn mul_channel_scalars(&mut self, scalars: &[u64]) {
        debug_assert_eq!(scalars.len(), self.channel_count());
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.moduli()[ch];
            let s = scalars[ch] % q;
            for c in channel.iter_mut() {
                *c = mul_mod(*c, s, q);
            }
        }
    }

    /// Multiplies every coefficient by the signed integer `scalar`.
    pub fn mul_scalar(&mut self, scalar: i64) {
        let scalars: Vec<u64> = self
            .basis
            .moduli()
            .iter()
            .map(|&q| reduce_i64(scalar, q))
            .collect();
        self.mul_channel_scalars(&scalars);
    }
}

// ─── Reconstruction ───────────────────────────────────────────────────────────

impl RnsPoly {
    fn coeff_domain_channels(&self) -> std::borrow::Cow<'_, [Vec<u64>]> {
        if self.in_ntt_domain {
            let mut clone = self.clone();
            clone.to_coeff_domain();
            std::borrow::Cow::Owned(clone.channels)
        } else {
            std::borrow::Cow::Borrowed(&self.channels)
        }
    }

    fn reconstruct_each<T>(&self, mut lift: impl FnMut(&[u64], &mut [i64]) -> T) -> Vec<T> {
        let channels = self.coeff_domain_channels();
        let mut residues = vec![0u64; self.channel_count()];
        let mut scratch = vec![0i64; self.channel_count()];
        (0..self.degree())
            .map(|i| {
                for (ch, channel) in channels.iter().enumerate() {
                    residues[ch] = channel[i];
                }
                lift(&residues, &mut scratch)
            })
            .collect()
    }

    /// Centered coefficients as `f64`. Does not mutate `self`.
    pub fn to_centered_f64(&self) -> Vec<f64> {
        self.reconstruct_each(|r, s| self.basis.reconstruct_f64(r, s))
    }

    /// Centered coefficients reduced modulo `t`.
    pub fn to_centered_mod(&self, t: u64) -> Vec<u64> {
        self.reconstruct_each(|r, s| self.basis.reconstruct_mod(r, t, s))
    }

    /// Centered coefficients as integers. Exact when every coefficient fits
    /// an `i64`.
    pub fn to_coeffs(&self) -> Vec<i64> {
        self.reconstruct_each(|r, s| self.basis.reconstruct_i128(r, s) as i64)
    }

    /// Largest centered coefficient magnitude, as `f64`.
    pub fn infinity_norm(&self) -> f64 {
        self.to_centered_f64()
            .into_iter()
            .fold(0.0, |acc, c| acc.max(c.abs()))
    }
}

// ─── Arithmetic ───────────────────────────────────────────────────────────────

impl AddAssign<&RnsPoly> for RnsPoly {
    /// Residue-wise addition. Both operands must share moduli and domain.
    fn add_assign(&mut self, rhs: &RnsPoly) {
        debug_assert_eq!(self.basis.moduli(), rhs.basis.moduli(), "add_assign: basis mismatch");
        debug_assert_eq!(self.in_ntt_domain, rhs.in_ntt_domain, "add_assign: domain mismatch");
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.moduli()[ch];
            for (a, &b) in channel.iter_mut().zip(&rhs.channels[ch]) {
                *a = add_mod(*a, b, q);
            }
        }
    }
}

impl SubAssign<&RnsPoly> for RnsPoly {
    fn sub_assign(&mut self, rhs: &RnsPoly) {
        debug_assert_eq!(self.basis.moduli(), rhs.basis.moduli(), "sub_assign: basis mismatch");
        debug_assert_eq!(self.in_ntt_domain, rhs.in_ntt_domain, "sub_assign: domain mismatch");
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.moduli()[ch];
            for (a, &b) in channel.iter_mut().zip(&rhs.channels[ch]) {
                *a = sub_mod(*a, b, q);
            }
        }
    }
}

impl MulAssign<&RnsPoly> for RnsPoly {
    /// Ring multiplication via pointwise products in NTT domain.
    ///
    /// Operands in coefficient domain are transformed first. The result is
    /// always in NTT domain.
    fn mul_assign(&mut self, rhs: &RnsPoly) {
        debug_assert_eq!(self.basis.moduli(), rhs.basis.moduli(), "mul_assign: basis mismatch");
        self.to_ntt_domain();
        let converted;
        let rhs = if rhs.in_ntt_domain {
            rhs
        } else {
            let mut tmp = rhs.clone();
            tmp.to_ntt_domain();
            converted = tmp;
            &converted
        };
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.moduli()[ch];
            for (a, &b) in channel.iter_mut().zip(&rhs.channels[ch]) {
                *a = mul_mod(*a, b, q);
            }
        }
    }
}

impl Neg for RnsPoly {
    type Output = Self;

    /// Residue-wise negation. Works in both domains.
    fn neg(mut self) -> Self {
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.moduli()[ch];
            for c in channel.iter_mut() {
                if *c != 0 {
                    *c = q - *c;
                }
            }
        }
        self
    }
}

impl PartialEq for RnsPoly {
    fn eq(&self, other: &Self) -> bool {
        self.basis.moduli() == other.basis.moduli()
            && self.in_ntt_domain == other.in_ntt_domain
            && self.channels == other.channels
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn basis_17_97() -> Arc<RnsBasis> {
        Arc::new(RnsBasis::new(8, vec![17, 97]).unwrap())
    }

    fn basis_three() -> Arc<RnsBasis> {
        Arc::new(RnsBasis::new(8, vec![17, 97, 113]).unwrap())
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn from_coeffs_reduces_correctly() {
        let poly = RnsPoly::from_coeffs(&[-1, 2, -3, 4], basis_17_97());
        assert_eq!(poly.channels()[0][..4], [16, 2, 14, 4]);
        assert_eq!(poly.channels()[1][0], 96);
        assert_eq!(poly.channels()[1][4], 0);
    }

    #[test]
    fn from_f64_rounds_and_rejects_overflow() {
        let poly = RnsPoly::from_f64_rounded(&[1.4, -2.6, 0.5], basis_17_97()).unwrap();
        assert_eq!(poly.to_coeffs()[..3], [1, -3, 1]);
        assert!(matches!(
            RnsPoly::from_f64_rounded(&[f64::INFINITY], basis_17_97()),
            Err(RingError::CoefficientOverflow { .. })
        ));
    }

    #[test]
    fn from_channels_validates_shape() {
        let basis = basis_17_97();
        assert!(matches!(
            RnsPoly::from_channels(vec![vec![17; 8], vec![0; 8]], basis.clone(), false),
            Err(RingError::NonReducedCoefficient { .. })
        ));
        assert!(matches!(
            RnsPoly::from_channels(vec![vec![0; 8]], basis.clone(), false),
            Err(RingError::ChannelCountMismatch { .. })
        ));
        assert!(matches!(
            RnsPoly::from_channels(vec![vec![0; 4], vec![0; 4]], basis, false),
            Err(RingError::DegreeMismatch { .. })
        ));
    }

    // ── Domains ───────────────────────────────────────────────────────────────

    #[test]
    fn ntt_roundtrip_preserves_coefficients() {
        let mut poly = RnsPoly::from_coeffs(&[1, -2, 3, 4, -5, 6, 7, -8], basis_17_97());
        let original = poly.clone();
        poly.to_ntt_domain();
        poly.to_ntt_domain();
        assert!(poly.is_ntt_domain());
        poly.to_coeff_domain();
        assert_eq!(poly, original);
    }

    #[test]
    fn multiplication_wraps_around_quotient() {
        let basis = basis_17_97();
        let mut a = RnsPoly::from_coeffs(&[0, 0, 0, 0, 0, 0, 0, 1], basis.clone());
        let b = RnsPoly::from_coeffs(&[1, 1], basis);
        a *= &b;
        assert!(a.is_ntt_domain());
        // x^7 * (1 + x) = x^7 - 1
        assert_eq!(a.to_coeffs(), vec![-1, 0, 0, 0, 0, 0, 0, 1]);
    }

    // ── Modulus reduction ─────────────────────────────────────────────────────

    #[test]
    fn drop_to_requires_prefix() {
        let mut poly = RnsPoly::from_coeffs(&[5, -5], basis_three());
        let smaller = basis_17_97();
        poly.drop_to(&smaller).unwrap();
        assert_eq!(poly.channel_count(), 2);
        assert_eq!(poly.to_coeffs()[..2], [5, -5]);

        let unrelated = Arc::new(RnsBasis::new(8, vec![97]).unwrap());
        assert!(matches!(
            poly.drop_to(&unrelated),
            Err(RingError::NotAPrefix { .. })
        ));
    }

    #[test]
    fn rescale_divides_with_rounding() {
        let full = basis_three();
        let target = basis_17_97();
        // 113 * 40 + 50 rounds to 40, 113 * (-3) - 60 rounds to -4
        let mut poly = RnsPoly::from_coeffs(&[113 * 40 + 50, 113 * -3 - 60], full);
        poly.to_ntt_domain();
        poly.rescale_by_last(&target).unwrap();
        assert!(poly.is_ntt_domain());
        assert_eq!(poly.to_coeffs()[..2], [40, -4]);
    }

    #[test]
    fn rescale_uses_the_centered_remainder() {
        // remainders 56 and 57 sit on either side of 113 / 2
        let mut poly =
            RnsPoly::from_coeffs(&[113 * 5 + 56, 113 * 5 + 57, 113 * 5 - 56], basis_three());
        poly.rescale_by_last(&basis_17_97()).unwrap();
        assert!(!poly.is_ntt_domain());
        assert_eq!(poly.to_coeffs()[..3], [5, 6, 5]);
    }

    #[test]
    fn bgv_mod_switch_preserves_residue_mod_t() {
        // The result must be congruent to c * 113^{-1} mod t.
        let full = basis_three();
        let target = basis_17_97();
        let t = 7u64;
        let value = 12_345i64;
        let mut poly = RnsPoly::from_coeffs(&[value], full);
        poly.bgv_mod_switch(t, &target).unwrap();
        let switched = poly.to_coeffs()[0];
        let inv_113 = crate::math::mod_inverse(113 % t, t).unwrap();
        assert_eq!(
            reduce_i64(switched, t),
            mul_mod(reduce_i64(value, t), inv_113, t)
        );
        assert!((switched - value / 113).abs() <= t as i64);
    }

    #[test]
    fn rescale_rejects_multi_channel_drop() {
        let mut poly = RnsPoly::from_coeffs(&[1], basis_three());
        let one = Arc::new(RnsBasis::new(8, vec![17]).unwrap());
        assert!(matches!(
            poly.rescale_by_last(&one),
            Err(RingError::InvalidModDrop { .. })
        ));
    }

    // ── Structural maps ───────────────────────────────────────────────────────

    #[test]
    fn automorphism_permutes_with_sign() {
        let poly = RnsPoly::from_coeffs(&[1, 2, 0, 0, 0, 0, 0, 3], basis_17_97());
        // X -> X^3: 1 + 2X^3 + 3X^21 = 1 + 2X^3 + 3X^5 * X^16 = 1 + 2X^3 + 3X^5
        let mapped = poly.automorphism(3);
        assert_eq!(mapped.to_coeffs(), vec![1, 0, 0, 2, 0, 3, 0, 0]);
        // X -> X^15 maps X^1 to X^15 = -X^7
        let mapped = RnsPoly::from_coeffs(&[0, 1], basis_17_97()).automorphism(15);
        assert_eq!(mapped.to_coeffs(), vec![0, 0, 0, 0, 0, 0, 0, -1]);
    }

    #[test]
    fn lift_channel_reads_centered_residues() {
        let poly = RnsPoly::from_coeffs(&[-3, 5], basis_17_97());
        let lifted = poly.lift_channel(0, basis_three());
        assert_eq!(lifted.to_coeffs()[..2], [-3, 5]);
    }

    #[test]
    fn scalar_multiplication() {
        let mut poly = RnsPoly::from_coeffs(&[3, -2], basis_17_97());
        poly.mul_scalar(-4);
        assert_eq!(poly.to_coeffs()[..2], [-12, 8]);
    }

    // ── Sampling ──────────────────────────────────────────────────────────────

    #[test]
    fn samplers_respect_moduli_and_weight() {
        let basis = basis_17_97();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let uniform = RnsPoly::sample_uniform(basis.clone(), &mut rng);
        assert!(uniform.is_ntt_domain());
        for (ch, channel) in uniform.channels().iter().enumerate() {
            assert!(channel.iter().all(|&c| c < basis.moduli()[ch]));
        }
        let ternary = RnsPoly::sample_ternary(basis, 3, &mut rng);
        assert_eq!(ternary.to_coeffs().iter().filter(|&&c| c != 0).count(), 3);
    }
}
