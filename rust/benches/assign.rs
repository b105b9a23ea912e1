use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nstrided::{add, Matrix, Slice, StridedView};

mod native;

const SIDE: usize = 512;

pub fn assign_benchmark(c: &mut Criterion) {
    let values = native::generate_random_vector(SIDE * SIDE);
    let source = Matrix::from_row_major(values.clone(), SIDE, SIDE);
    let packed = Matrix::<f32>::zeros(SIDE, SIDE);
    let strided = Matrix::<f32>::zeros(SIDE / 2, SIDE / 2);
    let mut target = vec![0.0f32; SIDE * SIDE / 4];

    let mut group = c.benchmark_group("Strided Assign");

    for step in [1usize, 2] {
        group.bench_with_input(BenchmarkId::new("NStrided", step), &step, |b, &step| {
            if step == 1 {
                b.iter(|| packed.assign(&source))
            } else {
                let view = source.slice(Slice::stepped(2), Slice::stepped(2));
                b.iter(|| strided.assign(&view))
            }
        });
        group.bench_with_input(BenchmarkId::new("Rust Native", step), &step, |b, &step| {
            if step == 1 {
                let mut copy = vec![0.0f32; values.len()];
                b.iter(|| copy.copy_from_slice(&values))
            } else {
                b.iter(|| native::strided_copy_cpu(&values, SIDE, step, &mut target))
            }
        });
    }
    group.finish();

    let mut group = c.benchmark_group("Lockstep Add");
    let transposed = source.t();
    let output = Matrix::<f32>::zeros(SIDE, SIDE);
    group.bench_function("NStrided compact", |b| b.iter(|| add(&source, &source, &output)));
    group.bench_function("NStrided transposed", |b| b.iter(|| add(&source, &transposed, &output)));
    let mut sum = vec![0.0f32; values.len()];
    group.bench_function("Rust Native", |b| b.iter(|| native::add_cpu(&values, &values, &mut sum)));
    group.finish();
}

criterion_group!(benches, assign_benchmark);
criterion_main!(benches);
