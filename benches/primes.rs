use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use toy_he_tiles::{
    math::{generate_primes, is_prime},
    rings::NttTable,
};

fn bench_prime_checks(c: &mut Criterion) {
    let inputs = [2_147_483_647u64, 9_223_372_036_854_775_783u64];
    let mut group = c.benchmark_group("is_prime");

    for &n in &inputs {
        group.bench_with_input(BenchmarkId::new("miller_rabin", n), &n, |b, &n| {
            b.iter(|| black_box(is_prime(black_box(n))));
        });
    }

    group.finish();
}

fn bench_prime_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_primes");
    let configs = [(30u32, 5usize, 8192u64), (41, 1, 8192), (61, 5, 8192)];

    for &(bits, count, degree) in &configs {
        let label = format!("{bits}b_{count}x_deg{degree}");
        group.bench_with_input(
            BenchmarkId::from_parameter(label),
            &(bits, count, degree),
            |b, &(bits, count, degree)| {
                b.iter(|| black_box(generate_primes(bits, count, 2 * degree, &[])));
            },
        );
    }

    group.finish();
}

fn bench_ntt(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt");

    for &degree in &[1024usize, 8192] {
        let q = generate_primes(30, 1, 2 * degree as u64, &[]).unwrap()[0];
        let table = NttTable::new(q, degree).unwrap();
        let values: Vec<u64> = (0..degree as u64).map(|i| i * 7919 % q).collect();
        group.bench_with_input(BenchmarkId::new("forward", degree), &values, |b, values| {
            b.iter(|| {
                let mut v = values.clone();
                table.forward(&mut v);
                black_box(v)
            });
        });
        group.bench_with_input(BenchmarkId::new("round_trip", degree), &values, |b, values| {
            b.iter(|| {
                let mut v = values.clone();
                table.forward(&mut v);
                table.inverse(&mut v);
                black_box(v)
            });
        });
    }

    group.finish();
}

criterion_group!(primes, bench_prime_checks, bench_prime_generation, bench_ntt);
criterion_main!(primes);
