use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use golden_core::{Descriptor, SearchParams, DESCRIPTOR_LEN};
use golden_match::{match_descriptors, ratio_test, BruteForce, KdForest, NeighborSearch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn create_descriptors(n: usize, seed: u64) -> Vec<Descriptor> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut d = [0.0; DESCRIPTOR_LEN];
            for v in d.iter_mut() {
                *v = rng.random_range(0..=255u8) as f32;
            }
            d
        })
        .collect()
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    for &n in &[500, 2000] {
        let points = create_descriptors(n, 1);
        group.bench_with_input(BenchmarkId::new("kd_forest", n), &points, |b, points| {
            b.iter(|| KdForest::build(black_box(points), &SearchParams::default()))
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_two");
    let points = create_descriptors(2000, 2);
    let queries = create_descriptors(100, 3);

    if let Ok(forest) = KdForest::build(&points, &SearchParams::default()) {
        group.bench_function("kd_forest_100_queries", |b| {
            b.iter(|| queries.iter().map(|q| forest.nearest_two(black_box(q))).count())
        });
    }
    if let Ok(exact) = BruteForce::new(&points) {
        group.bench_function("brute_force_100_queries", |b| {
            b.iter(|| queries.iter().map(|q| exact.nearest_two(black_box(q))).count())
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let reference = create_descriptors(800, 4);
    let query = create_descriptors(800, 5);

    c.bench_function("match_and_ratio_800x800", |b| {
        b.iter(|| {
            match_descriptors(black_box(&reference), black_box(&query), &SearchParams::default())
                .map(|pairs| ratio_test(&pairs, 0.9).accepted_count)
        })
    });
}

criterion_group!(benches, bench_index_build, bench_queries, bench_pipeline);
criterion_main!(benches);
