use std::sync::{Arc, LazyLock};

use proptest::prelude::*;
use toy_he_tiles::{
    math::generate_primes,
    rings::{RnsBasis, RnsPoly},
};

const DEGREE: usize = 16;

static BASIS: LazyLock<Arc<RnsBasis>> = LazyLock::new(|| {
    let primes = generate_primes(30, 2, 2 * DEGREE as u64, &[]).unwrap();
    Arc::new(RnsBasis::new(DEGREE, primes).unwrap())
});

fn coeffs_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1000i64..1000, 0..=DEGREE)
}

fn poly_strategy() -> impl Strategy<Value = RnsPoly> {
    coeffs_strategy().prop_map(|c| RnsPoly::from_coeffs(&c, Arc::clone(&BASIS)))
}

/// Product in Z[X]/(X^N + 1), computed directly.
fn negacyclic_product(a: &[i64], b: &[i64]) -> Vec<i64> {
    let mut out = vec![0i64; DEGREE];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            let k = i + j;
            if k < DEGREE {
                out[k] += x * y;
            } else {
                out[k - DEGREE] -= x * y;
            }
        }
    }
    out
}

fn padded(c: &[i64]) -> Vec<i64> {
    let mut out = c.to_vec();
    out.resize(DEGREE, 0);
    out
}

proptest! {
    #[test]
    fn coefficients_round_trip(c in coeffs_strategy()) {
        let p = RnsPoly::from_coeffs(&c, Arc::clone(&BASIS));
        prop_assert_eq!(p.to_coeffs(), padded(&c));
    }

    #[test]
    fn ntt_round_trip(p in poly_strategy()) {
        let mut q = p.clone();
        q.to_ntt_domain();
        prop_assert!(q.is_ntt_domain());
        q.to_coeff_domain();
        prop_assert_eq!(q, p);
    }

    #[test]
    fn addition_commutes_and_associates(
        a in poly_strategy(),
        b in poly_strategy(),
        c in poly_strategy(),
    ) {
        let mut ab = a.clone();
        ab += &b;
        let mut ba = b.clone();
        ba += &a;
        prop_assert_eq!(&ab, &ba);

        let mut ab_c = ab;
        ab_c += &c;
        let mut bc = b;
        bc += &c;
        let mut a_bc = a;
        a_bc += &bc;
        prop_assert_eq!(ab_c, a_bc);
    }

    #[test]
    fn subtraction_undoes_addition(a in poly_strategy(), b in poly_strategy()) {
        let mut x = a.clone();
        x += &b;
        x -= &b;
        prop_assert_eq!(&x, &a);

        let mut y = a.clone();
        y += &(-a.clone());
        prop_assert!(y.to_coeffs().iter().all(|&v| v == 0));
    }

    #[test]
    fn multiplication_is_negacyclic(a in coeffs_strategy(), b in coeffs_strategy()) {
        let mut p = RnsPoly::from_coeffs(&a, Arc::clone(&BASIS));
        p *= &RnsPoly::from_coeffs(&b, Arc::clone(&BASIS));
        prop_assert_eq!(p.to_coeffs(), negacyclic_product(&a, &b));
    }

    #[test]
    fn multiplication_distributes(
        a in poly_strategy(),
        b in poly_strategy(),
        c in poly_strategy(),
    ) {
        let mut sum = b.clone();
        sum += &c;
        let mut lhs = a.clone();
        lhs *= &sum;

        let mut ab = a.clone();
        ab *= &b;
        let mut ac = a;
        ac *= &c;
        ab += &ac;
        prop_assert_eq!(lhs.to_coeffs(), ab.to_coeffs());
    }

    #[test]
    fn scalar_multiplication_matches_repeated_addition(
        a in poly_strategy(),
        k in 0i64..8,
    ) {
        let mut scaled = a.clone();
        scaled.mul_scalar(k);
        let expected: Vec<i64> = a.to_coeffs().iter().map(|&v| v * k).collect();
        prop_assert_eq!(scaled.to_coeffs(), expected);
    }
}

#[test]
fn x_to_the_degree_is_minus_one() {
    let mut x_top = vec![0i64; DEGREE];
    x_top[DEGREE - 1] = 1;
    let mut p = RnsPoly::from_coeffs(&x_top, Arc::clone(&BASIS));
    p *= &RnsPoly::from_coeffs(&[0, 1], Arc::clone(&BASIS));
    let mut expected = vec![0i64; DEGREE];
    expected[0] = -1;
    assert_eq!(p.to_coeffs(), expected);
}
