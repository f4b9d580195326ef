//! Word-sized modular arithmetic.
//!
//! All moduli handled by the crate are below `2^62`, so `a + b` of two reduced
//! residues never overflows a `u64` and products fit a `u128`.

/// `(a + b) mod q` for reduced inputs.
#[inline]
pub fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    let s = a + b;
    if s >= q { s - q } else { s }
}

/// `(a - b) mod q` for reduced inputs.
#[inline]
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b { a - b } else { a + q - b }
}

/// Computes `(a * b) mod modulus` using `u128` intermediate arithmetic.
///
/// # Panics
///
/// Panics if `modulus == 0`.
#[inline]
pub fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    assert!(modulus > 0, "mul_mod: modulus must be positive");
    ((a as u128 * b as u128) % modulus as u128) as u64
}

/// Computes `base^exp mod modulus` via binary exponentiation.
///
/// # Panics
///
/// Panics if `modulus == 0`.
pub fn mod_pow(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    assert!(modulus > 0, "mod_pow: modulus must be positive");
    if modulus == 1 {
        return 0;
    }
    let mut acc = 1;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    acc
}

/// Multiplicative inverse of `value` modulo `modulus`.
///
/// Returns `None` when the two are not coprime.
pub fn mod_inverse(value: u64, modulus: u64) -> Option<u64> {
    let (mut old_r, mut r) = (value as i128 % modulus as i128, modulus as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(modulus as i128) as u64)
}

/// Maps a residue in `[0, q)` to its centered representative in `(-q/2, q/2]`.
#[inline]
pub fn centered(value: u64, q: u64) -> i64 {
    if value > q / 2 {
        value as i64 - q as i64
    } else {
        value as i64
    }
}

/// Reduces a signed integer into `[0, q)`.
#[inline]
pub fn reduce_i64(value: i64, q: u64) -> u64 {
    (value as i128).rem_euclid(q as i128) as u64
}

/// Reduces a wide signed integer into `[0, q)`.
#[inline]
pub fn reduce_i128(value: i128, q: u64) -> u64 {
    value.rem_euclid(q as i128) as u64
}

/// Finds a primitive `order`-th root of unity in `Z_modulus`.
///
/// # Panics
///
/// Panics if `order` does not divide `modulus - 1`. For an NTT-friendly prime
/// and `order = 2n` such a root always exists.
pub fn find_primitive_root(modulus: u64, order: u64) -> u64 {
    assert!(
        order > 0 && (modulus - 1).is_multiple_of(order),
        "find_primitive_root: order {order} must divide {modulus} - 1"
    );
    let exponent = (modulus - 1) / order;
    let factors = distinct_prime_factors(order);

    'candidate: for candidate in 2..modulus {
        let root = mod_pow(candidate, exponent, modulus);
        if root == 1 {
            continue;
        }
        for &factor in &factors {
            if mod_pow(root, order / factor, modulus) == 1 {
                continue 'candidate;
            }
        }
        return root;
    }

    panic!("find_primitive_root: no root found for modulus {modulus}, order {order}");
}

fn distinct_prime_factors(mut value: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut d = 2u64;
    while d * d <= value {
        if value.is_multiple_of(d) {
            factors.push(d);
            while value.is_multiple_of(d) {
                value /= d;
            }
        }
        d += 1;
    }
    if value > 1 {
        factors.push(value);
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_sub_wrap() {
        assert_eq!(add_mod(16, 2, 17), 1);
        assert_eq!(sub_mod(1, 2, 17), 16);
        assert_eq!(sub_mod(5, 5, 17), 0);
    }

    #[test]
    fn mul_mod_matches_widened_reference() {
        let a = u64::MAX - 11;
        let b = u64::MAX - 17;
        let modulus = 1_073_750_017u64;
        let expected = ((a as u128 * b as u128) % modulus as u128) as u64;
        assert_eq!(mul_mod(a, b, modulus), expected);
    }

    #[test]
    #[should_panic(expected = "mul_mod: modulus must be positive")]
    fn mul_mod_panics_on_zero_modulus() {
        let _ = mul_mod(5, 7, 0);
    }

    #[test]
    fn mod_pow_handles_edge_cases() {
        assert_eq!(mod_pow(2, 0, 17), 1);
        assert_eq!(mod_pow(5, 0, 1), 0);
        assert_eq!(mod_pow(0, 5, 17), 0);
        assert_eq!(mod_pow(3, 16, 17), 1);
    }

    #[test]
    fn inverse_round_trips() {
        let q = 1_073_750_017u64;
        for value in [1u64, 2, 12345, q - 1] {
            let inv = mod_inverse(value, q).unwrap();
            assert_eq!(mul_mod(value, inv, q), 1);
        }
        assert_eq!(mod_inverse(6, 9), None);
    }

    #[test]
    fn centered_representatives() {
        assert_eq!(centered(3, 17), 3);
        assert_eq!(centered(8, 17), 8);
        assert_eq!(centered(9, 17), -8);
        assert_eq!(centered(16, 17), -1);
        assert_eq!(reduce_i64(-1, 17), 16);
        assert_eq!(reduce_i128(-35, 17), 16);
    }

    #[test]
    fn primitive_root_has_exact_order() {
        let root = find_primitive_root(97, 16);
        assert_eq!(mod_pow(root, 16, 97), 1);
        assert_ne!(mod_pow(root, 8, 97), 1);
    }
}
