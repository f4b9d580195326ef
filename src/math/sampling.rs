use rand::{Rng, distr::Uniform, seq::SliceRandom};
use rand_distr::{Distribution, Normal};

/// Samples `len` residues uniform in `[0, modulus)`.
///
/// # Panics
///
/// Panics if `modulus == 0`.
pub fn uniform_residues<R: Rng + ?Sized>(
    len: usize,
    modulus: u64,
    rng: &mut R,
) -> Vec<u64> {
    let distribution = Uniform::new(0, modulus).unwrap_or_else(|_| {
        panic!("uniform_residues: invalid range [0, {modulus}), modulus must be positive")
    });
    (0..len).map(|_| distribution.sample(rng)).collect()
}

/// Samples `len` rounded Gaussian integers with deviation `std_dev`.
///
/// # Panics
///
/// Panics if `std_dev` is not finite and positive.
pub fn gaussian_integers<R: Rng + ?Sized>(
    len: usize,
    std_dev: f64,
    rng: &mut R,
) -> Vec<i64> {
    assert!(
        std_dev.is_finite() && std_dev > 0.0,
        "gaussian_integers: std_dev must be finite and positive"
    );
    let normal = Normal::new(0.0, std_dev)
        .expect("gaussian_integers: failed to create Normal distribution");
    (0..len).map(|_| normal.sample(rng).round() as i64).collect()
}

/// Samples a vector in `{-1, 0, 1}^len` with exactly `hamming_weight` non-zero
/// entries.
///
/// # Panics
///
/// Panics if `hamming_weight > len`.
pub fn ternary_integers<R: Rng + ?Sized>(
    len: usize,
    hamming_weight: usize,
    rng: &mut R,
) -> Vec<i64> {
    assert!(
        hamming_weight <= len,
        "ternary_integers: hamming_weight must be <= len"
    );
    let mut out = vec![0i64; len];
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    for &idx in indices.iter().take(hamming_weight) {
        out[idx] = if rng.random_bool(0.5) { 1 } else { -1 };
    }
    out
}
