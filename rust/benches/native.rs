#![allow(unused)]
use rand::Rng;

pub(crate) fn generate_random_vector(dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rand::thread_rng().gen()).collect()
}

/// Strided copy of a `rows × columns` row-major buffer, every `step`-th row and column.
pub(crate) fn strided_copy_cpu(source: &[f32], columns: usize, step: usize, target: &mut [f32]) {
    let picked_columns = (columns + step - 1) / step;
    for (r, row) in source.chunks_exact(columns).step_by(step).enumerate() {
        for (c, &value) in row.iter().step_by(step).enumerate() {
            target[r * picked_columns + c] = value;
        }
    }
}

pub(crate) fn add_cpu(a: &[f32], b: &[f32], c: &mut [f32]) {
    for ((a, b), c) in a.iter().zip(b).zip(c.iter_mut()) {
        *c = a + b;
    }
}

pub(crate) fn mean_cpu(a: &[f32]) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    (a.iter().map(|&x| x as f64).sum::<f64>() / a.len() as f64) as f32
}

pub(crate) fn maximum_cpu(a: &[f32]) -> f32 {
    a.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}
