use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nstrided::{Arithmetic, Slice, StridedView, Vector};

mod native;

const DIMENSIONS: usize = 1 << 16;

pub fn reductions_benchmark(c: &mut Criterion) {
    let values = native::generate_random_vector(DIMENSIONS);
    let vector = Vector::from_vec(values.clone());
    let reversed = vector.slice(Slice::FLIP);

    let mut group = c.benchmark_group("Reductions");

    for i in 0..=2 {
        group.bench_with_input(BenchmarkId::new("NStrided mean", i), &i, |b, _| b.iter(|| vector.mean()));
        group.bench_with_input(BenchmarkId::new("NStrided reversed mean", i), &i, |b, _| {
            b.iter(|| reversed.mean())
        });
        group.bench_with_input(BenchmarkId::new("Rust Native mean", i), &i, |b, _| {
            b.iter(|| native::mean_cpu(&values))
        });
        group.bench_with_input(BenchmarkId::new("NStrided maximum", i), &i, |b, _| b.iter(|| vector.maximum()));
        group.bench_with_input(BenchmarkId::new("Rust Native maximum", i), &i, |b, _| {
            b.iter(|| native::maximum_cpu(&values))
        });
    }
}

criterion_group!(benches, reductions_benchmark);
criterion_main!(benches);
