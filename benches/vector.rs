use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use imdedup::db::NeighborResult;
use imdedup::decision::decide;
use imdedup::vector::{cosine_distance, normalize_l2, similarity_percent};
use rand::prelude::*;

/// CLIP ViT-B/32 的输出维度
const DIM: usize = 512;

fn random_vectors(rng: &mut impl Rng, count: usize) -> Vec<Vec<f32>> {
    (0..count).map(|_| (0..DIM).map(|_| rng.random_range(-1.0..1.0)).collect()).collect()
}

fn bench_cosine(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cosine");
    let mut rng = rand::rng();
    let query = random_vectors(&mut rng, 1).remove(0);
    let stored = random_vectors(&mut rng, 10000);

    group.throughput(Throughput::Elements(stored.len() as u64));
    group.bench_function("full_scan_10000", |b| {
        b.iter(|| {
            stored
                .iter()
                .map(|v| cosine_distance(black_box(&query), v))
                .min_by(f32::total_cmp)
        });
    });
    group.bench_function("normalize_l2", |b| {
        b.iter_batched_ref(
            || query.clone(),
            |v| normalize_l2(black_box(v)),
            criterion::BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_similarity(c: &mut Criterion) {
    c.bench_function("similarity_percent", |b| {
        b.iter(|| similarity_percent(black_box(0.123456)));
    });
    let empty: Vec<NeighborResult> = vec![];
    c.bench_function("decide_empty", |b| {
        b.iter(|| decide(black_box(&empty), black_box(90.0)).is_admit());
    });
}

criterion_group!(benches, bench_cosine, bench_similarity);
criterion_main!(benches);
