//! Prime search for modulus chains.
//!
//! Primality is decided with Miller-Rabin over a fixed base set that is
//! deterministic for every `u64`. Chain primes are searched inside a residue
//! class `1 mod step`:
//! - `step = 2n` gives NTT-friendly primes for `Z[X]/(X^n + 1)`;
//! - `step = 2n * t` additionally makes every prime `1 mod t`, which keeps a BGV
//!   plaintext unchanged across modulus switching.

use super::modular::{mod_pow, mul_mod};

// Deterministic for all n < 3.3 * 10^24.
// Source: https://miller-rabin.appspot.com/
const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Returns `(odd_part, power_of_two)` such that `n = odd_part * 2^power_of_two`.
fn split_two_power(n: u64) -> (u64, u32) {
    let r = n.trailing_zeros();
    (n >> r, r)
}

/// Returns `true` if `n` is prime.
pub fn is_prime(n: u64) -> bool {
    match n {
        0 | 1 => return false,
        2 | 3 => return true,
        _ if n & 1 == 0 => return false,
        _ => {}
    }

    let (d, r) = split_two_power(n - 1);
    'bases: for &a in MILLER_RABIN_BASES.iter() {
        if a >= n {
            continue;
        }
        let mut x = mod_pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// Returns `true` when `p` is prime and `p = 1 (mod 2n)`, i.e. `Z_p` holds a
/// primitive `2n`-th root of unity for the negacyclic NTT.
///
/// # Panics
///
/// Panics if `n == 0` or `2n` overflows.
#[inline]
pub fn is_ntt_friendly_prime(p: u64, n: u64) -> bool {
    assert!(n > 0, "is_ntt_friendly_prime: n must be positive");
    let order = n
        .checked_mul(2)
        .expect("is_ntt_friendly_prime: 2 * n must fit in u64");
    is_prime(p) && p % order == 1
}

/// Smallest prime `p > 2^bits` with `p = 1 (mod step)`.
///
/// # Panics
///
/// Panics if `bits >= 63`, `step < 2`, or the search leaves `u64`.
pub fn get_first_prime_up(bits: u32, step: u64) -> u64 {
    assert!(bits < 63, "get_first_prime_up: bits must be less than 63");
    assert!(step > 1, "get_first_prime_up: step must be greater than 1");

    let start = (1u64 << bits) + 1;
    let remainder = start % step;
    let mut candidate = if remainder == 1 {
        start
    } else {
        start
            .checked_add((step + 1 - remainder) % step)
            .expect("get_first_prime_up: overflow while stepping upward")
    };
    loop {
        if is_prime(candidate) {
            return candidate;
        }
        candidate = candidate
            .checked_add(step)
            .expect("get_first_prime_up: overflow while stepping upward");
    }
}

/// Largest prime `p < bound` with `p = 1 (mod step)`, or `None`.
///
/// # Panics
///
/// Panics if `step < 2`.
pub fn get_first_prime_down(bound: u64, step: u64) -> Option<u64> {
    assert!(step > 1, "get_first_prime_down: step must be greater than 1");
    if bound <= 2 {
        return None;
    }
    let top = bound - 1;
    let mut candidate = top.checked_sub((top % step + step - 1) % step)?;
    loop {
        if candidate <= 2 {
            return None;
        }
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_sub(step)?;
    }
}

/// Collects `count` distinct primes `p = 1 (mod step)` lying in
/// `[2^(bits-1), 2^bits)`, largest first, skipping anything in `exclude`.
///
/// Returns `None` when the interval runs out of primes.
pub fn generate_primes(
    bits: u32,
    count: usize,
    step: u64,
    exclude: &[u64],
) -> Option<Vec<u64>> {
    assert!(
        (2..=62).contains(&bits),
        "generate_primes: bits must lie in 2..=62"
    );
    let lower = 1u64 << (bits - 1);
    let mut primes = Vec::with_capacity(count);
    let mut cursor = 1u64 << bits;
    while primes.len() < count {
        let prime = get_first_prime_down(cursor, step)?;
        if prime < lower {
            return None;
        }
        if !exclude.contains(&prime) {
            primes.push(prime);
        }
        cursor = prime;
    }
    Some(primes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_division(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        let mut d = 2u64;
        while d * d <= n {
            if n.is_multiple_of(d) {
                return false;
            }
            d += 1;
        }
        true
    }

    #[test]
    fn is_prime_matches_trial_division() {
        for n in (0..2_000u64).chain(1_000_000..1_000_100) {
            assert_eq!(is_prime(n), trial_division(n), "mismatch at {n}");
        }
    }

    #[test]
    fn is_prime_rejects_strong_pseudoprimes() {
        for n in [561u64, 1_105, 1_729, 3_215_031_751] {
            assert!(!is_prime(n), "expected composite: {n}");
        }
        assert!(is_prime(18_446_744_073_709_551_557));
        assert!(!is_prime(u64::MAX));
    }

    #[test]
    fn ntt_friendly_condition() {
        assert!(is_ntt_friendly_prime(12289, 1024));
        assert!(!is_ntt_friendly_prime(2049, 1024));
        assert!(!is_ntt_friendly_prime(19, 8));
    }

    #[test]
    fn first_prime_up_matches_known_value() {
        assert_eq!(get_first_prime_up(30, 2048), 1_073_750_017);
    }

    #[test]
    fn first_prime_up_respects_compound_step() {
        let t = get_first_prime_up(10, 128);
        let q = get_first_prime_up(40, 128 * t);
        assert_eq!(q % 128, 1);
        assert_eq!(q % t, 1);
        assert!(q > 1 << 40);
    }

    #[test]
    fn first_prime_down_descends() {
        let prime = get_first_prime_up(20, 2048);
        let below = get_first_prime_down(prime, 2048).unwrap();
        assert!(below < prime);
        assert!(is_ntt_friendly_prime(below, 1024));
        assert_eq!(get_first_prime_down(2, 8), None);
    }

    #[test]
    fn generated_chain_is_distinct_and_in_range() {
        let primes = generate_primes(30, 4, 128, &[]).unwrap();
        assert_eq!(primes.len(), 4);
        for window in primes.windows(2) {
            assert!(window[0] > window[1]);
        }
        for &p in &primes {
            assert!(p >= 1 << 29 && p < 1 << 30);
            assert!(is_ntt_friendly_prime(p, 64));
        }
    }

    #[test]
    fn generated_chain_skips_excluded() {
        let first = generate_primes(30, 1, 128, &[]).unwrap()[0];
        let next = generate_primes(30, 1, 128, &[first]).unwrap()[0];
        assert!(next < first);
    }

    #[test]
    fn generation_fails_when_interval_is_exhausted() {
        assert_eq!(generate_primes(4, 10, 4, &[]), None);
    }

    #[test]
    #[should_panic(expected = "get_first_prime_up: bits must be less than 63")]
    fn first_prime_up_panics_on_large_bits() {
        let _ = get_first_prime_up(63, 1024);
    }
}
