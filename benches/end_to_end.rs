use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use toy_he_tiles::{
    BgvContext, CTile, CkksContext, Encoder, HeConfigRequirement, HeContext, MockupContext,
};

fn init(mut he: Box<dyn HeContext>, slots: usize) -> Box<dyn HeContext> {
    he.init(&HeConfigRequirement::insecure(slots, 3)).unwrap();
    he
}

fn contexts(slots: usize) -> Vec<Box<dyn HeContext>> {
    vec![
        init(Box::new(CkksContext::new()), slots),
        init(Box::new(BgvContext::new()), slots),
        init(Box::new(MockupContext::new()), slots),
    ]
}

fn bench_tile_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_pipeline");
    group.sample_size(20);

    for &slots in &[64usize, 512] {
        let values: Vec<f64> = (0..slots).map(|i| (i % 13) as f64).collect();
        for he in contexts(slots) {
            let encoder = Encoder::new(he.as_ref()).unwrap();
            let id = BenchmarkId::new(he.signature(), slots);
            group.bench_with_input(id, &values, |b, values| {
                b.iter(|| {
                    let mut x = CTile::new(he.as_ref()).unwrap();
                    encoder.encode_encrypt(&mut x, black_box(values), -1).unwrap();
                    let y = x.clone();
                    x.multiply(&y).unwrap();
                    x.rotate(1).unwrap();
                    x.add(&y).unwrap();
                    black_box(encoder.decrypt_decode(&x).unwrap())
                });
            });
        }
    }

    group.finish();
}

fn bench_inner_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("inner_sum");
    group.sample_size(20);

    let slots = 256;
    let values: Vec<f64> = (0..slots).map(|i| i as f64 / slots as f64).collect();
    for he in contexts(slots) {
        let encoder = Encoder::new(he.as_ref()).unwrap();
        let mut x = CTile::new(he.as_ref()).unwrap();
        encoder.encode_encrypt(&mut x, &values, -1).unwrap();
        group.bench_function(he.signature(), |b| {
            b.iter(|| {
                let mut sum = x.clone();
                sum.inner_sum(1, slots as i32, false).unwrap();
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tile_pipeline, bench_inner_sum);
criterion_main!(benches);
