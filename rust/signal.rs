//! One-dimensional signal helpers on [`Vector`] and same-size 2D correlation on [`Matrix`].
//!
//! Convolutions here are correlations: the kernel is not flipped, so `out[n] = Σ in[n + p] · k[p]`.

extern crate alloc;

use alloc::vec::Vec;
use core::cmp::Ordering;

use tracing::debug;

use crate::backend::Kernels;
use crate::linalg::{packed, with_packed_output};
use crate::matrix::Matrix;
use crate::storage::StorageAccess;
use crate::value::Numeric;
use crate::vector::Vector;
use crate::view::{with_linearized2, StridedView};

/// How values outside the input are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingMode {
    /// Replicates the first and last elements.
    #[default]
    Edge,
}

/// Output extent of [`Vector::convolving`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvolutionDomain {
    /// Same length as the input, padding it first.
    #[default]
    Same,
    /// Only positions where the kernel fits entirely, `M - K + 1` values.
    Valid,
}

// region: Generators

impl<T: Kernels> Vector<T> {
    /// `count` evenly spaced values from `start` to `stop`, both included.
    #[track_caller]
    pub fn linspace(start: T, stop: T, count: usize) -> Self {
        assert!(count >= 2, "linspace needs at least two points, got {}", count);
        let output = Self::zeros(count);
        let step = (stop - start) / T::from_f64((count - 1) as f64);
        output.with_storage_access(|access| T::vramp(start, step, &access));
        output
    }

    /// Values `start, start + step, ...` strictly before `stop`.
    #[track_caller]
    pub fn range(start: T, stop: T, step: T) -> Self {
        assert!(step != T::ZERO, "range step cannot be zero");
        let count = ((stop - start) / step).to_f64().ceil();
        let output = Self::zeros(if count > 0.0 { count as usize } else { 0 });
        output.with_storage_access(|access| T::vramp(start, step, &access));
        output
    }
}

// endregion: Generators

// region: Filters

impl<T: Numeric> Vector<T> {
    /// Running median over an odd `kernel`, replicating the edge values beyond the borders.
    #[track_caller]
    pub fn median(&self, kernel: usize) -> Self {
        assert!(kernel % 2 == 1, "median kernel must be odd, got {}", kernel);
        let values = self.to_vec();
        let (first, last) = match (values.first(), values.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Self::new(0),
        };

        let half = kernel / 2;
        let mut augmented = Vec::with_capacity(values.len() + 2 * half);
        augmented.extend(core::iter::repeat(first).take(half));
        augmented.extend_from_slice(&values);
        augmented.extend(core::iter::repeat(last).take(half));

        let mut window = Vec::with_capacity(kernel);
        Self::from_fn(values.len(), |i| {
            window.clear();
            window.extend_from_slice(&augmented[i..i + kernel]);
            window.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            window[half]
        })
    }
}

/// Writes `input` into the middle of `output` and fills `before` and `after` elements around it.
#[track_caller]
pub fn pad<T: Numeric>(input: &Vector<T>, before: usize, after: usize, mode: PaddingMode, output: &Vector<T>) {
    assert!(!input.is_empty(), "cannot pad an empty vector");
    assert_eq!(
        output.size(),
        before + input.size() + after,
        "padded output must hold {} + {} + {} elements",
        before,
        input.size(),
        after
    );
    let middle = before + input.size();
    output.slice(..middle as isize).slice(before as isize..).assign(input);
    match mode {
        PaddingMode::Edge => {
            for i in 0..before {
                output.set(i, input.first());
            }
            for i in middle..output.size() {
                output.set(i, input.last());
            }
        }
    }
}

/// Valid-domain correlation, `output` holds `input.size() - kernel.size() + 1` values.
#[track_caller]
pub fn convolve<T: Kernels>(input: &Vector<T>, kernel: &Vector<T>, output: &Vector<T>) {
    assert!(!kernel.is_empty(), "empty convolution kernel");
    assert!(
        input.size() >= kernel.size(),
        "kernel of {} elements is longer than the input of {}",
        kernel.size(),
        input.size()
    );
    assert_eq!(output.size(), input.size() - kernel.size() + 1, "valid convolution output size");
    input.with_storage_access(|i| kernel.with_storage_access(|k| output.with_storage_access(|o| T::vconv(&i, &k, &o))))
}

impl<T: Numeric> Vector<T> {
    #[track_caller]
    pub fn padding(&self, before: usize, after: usize, mode: PaddingMode) -> Self {
        let output = Self::new(before + self.size() + after);
        pad(self, before, after, mode, &output);
        output
    }
}

impl<T: Kernels> Vector<T> {
    #[track_caller]
    pub fn convolving(&self, kernel: &Vector<T>, domain: ConvolutionDomain, padding: PaddingMode) -> Self {
        assert!(self.size() >= kernel.size(), "kernel is longer than the input");
        match domain {
            ConvolutionDomain::Same => {
                let before = kernel.size() / 2;
                let after = kernel.size().saturating_sub(1 + before);
                let input = self.padding(before, after, padding);
                let output = Self::zeros(self.size());
                convolve(&input, kernel, &output);
                output
            }
            ConvolutionDomain::Valid => {
                let output = Self::zeros(self.size() + 1 - kernel.size());
                convolve(self, kernel, &output);
                output
            }
        }
    }

    /// Running sum.
    pub fn cumsum(&self) -> Self {
        let output = self.like();
        with_linearized2(self, &output, |a, c| T::vcumsum(&a, &c)).unwrap_or_else(|err| panic!("{}", err));
        output
    }
}

// endregion: Filters

// region: Convolve2D

/// Same-size 2D correlation with an odd-sized kernel; outside the input reads as zero.
#[track_caller]
pub fn convolve2d<T: Kernels>(input: &Matrix<T>, kernel: &Matrix<T>, output: &Matrix<T>) {
    assert!(
        kernel.rows() % 2 == 1 && kernel.columns() % 2 == 1,
        "convolution kernel must have odd sides, got {}×{}",
        kernel.rows(),
        kernel.columns()
    );
    assert_eq!(input.shape(), output.shape(), "convolution output must match the input shape");
    debug!(
        rows = input.rows(),
        columns = input.columns(),
        krows = kernel.rows(),
        kcolumns = kernel.columns(),
        "convolving matrix"
    );

    let source = packed(input, "input");
    let kernel = packed(kernel, "kernel");
    let aliased = output.aliases(&source);
    let (rows, columns) = (source.rows(), source.columns());
    source.with_storage_access(|i| {
        kernel.with_storage_access(|k| {
            with_packed_output(output, aliased, |o| unsafe {
                T::conv2d(i.base(), rows, columns, columns, k.base(), k.rows(), k.columns(), o, columns)
            })
        })
    })
}

impl<T: Kernels> Matrix<T> {
    #[track_caller]
    pub fn convolving2d(&self, kernel: &Matrix<T>) -> Self {
        let output = self.like();
        convolve2d(self, kernel, &output);
        output
    }
}

// endregion: Convolve2D

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Arithmetic;
    use crate::slice::Slice;

    fn assert_almost_equal(left: f64, right: f64, tolerance: f64) {
        let lower = right - tolerance;
        let upper = right + tolerance;

        assert!(left >= lower && left <= upper, "{} is not within {} of {}", left, tolerance, right);
    }

    #[test]
    fn generators() {
        assert_eq!(Vector::linspace(0.0f64, 1.0, 5).to_vec(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(Vector::linspace(-1.0f32, 1.0, 3).to_vec(), vec![-1.0, 0.0, 1.0]);

        let r = Vector::range(0.0f64, 1.0, 0.25);
        assert_eq!(r.to_vec(), vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(Vector::range(3.0f64, 0.0, -1.0).to_vec(), vec![3.0, 2.0, 1.0]);
        assert!(Vector::range(1.0f32, 0.0, 1.0).is_empty());
    }

    #[test]
    fn linspace_statistics() {
        let v = Vector::linspace(0.0f64, 1.0, 51);
        assert_almost_equal(v.mean(), 0.5, 1e-9);
        assert_eq!(v.minimum(), 0.0);
        assert_almost_equal(v.maximum(), 1.0, 1e-9);
    }

    #[test]
    fn median_replicates_edges() {
        let v = Vector::from_vec(vec![1.0f32, 5.0, 2.0, 8.0, 3.0]);
        assert_eq!(v.median(3).to_vec(), vec![1.0, 2.0, 5.0, 3.0, 3.0]);
        assert_eq!(v.median(1).to_vec(), v.to_vec());
        assert!(Vector::<f32>::zeros(0).median(3).is_empty());
    }

    #[test]
    fn padding_and_convolution() {
        let v = Vector::from_vec(vec![1.0f64, 2.0, 3.0]);
        assert_eq!(v.padding(2, 1, PaddingMode::Edge).to_vec(), vec![1.0, 1.0, 1.0, 2.0, 3.0, 3.0]);

        let input = Vector::from_vec(vec![1.0f64, 2.0, 3.0, 4.0]);
        let difference = Vector::from_vec(vec![1.0f64, 0.0, -1.0]);
        let output = Vector::zeros(2);
        convolve(&input, &difference, &output);
        assert_eq!(output.to_vec(), vec![-2.0, -2.0]);

        let smooth = Vector::filled(1.0 / 3.0, 3);
        let same = Vector::from_vec(vec![3.0f64, 3.0, 6.0, 6.0]).convolving(&smooth, ConvolutionDomain::Same, PaddingMode::Edge);
        for (got, expected) in same.to_vec().into_iter().zip([3.0, 4.0, 5.0, 6.0]) {
            assert_almost_equal(got, expected, 1e-9);
        }
        let valid = input.convolving(&difference, ConvolutionDomain::Valid, PaddingMode::Edge);
        assert_eq!(valid.to_vec(), vec![-2.0, -2.0]);
    }

    #[test]
    fn cumsum_follows_view_order() {
        let v = Vector::from_vec(vec![1.0f32, 2.0, 3.0, 4.0]);
        assert_eq!(v.cumsum().to_vec(), vec![1.0, 3.0, 6.0, 10.0]);
        assert_eq!(v.slice(Slice::FLIP).cumsum().to_vec(), vec![4.0, 7.0, 9.0, 10.0]);
    }

    #[test]
    fn box_filter_2d() {
        let input = Matrix::<f64>::ones(3, 3);
        let kernel = Matrix::<f64>::ones(3, 3);
        let output = input.convolving2d(&kernel);
        assert_eq!(output.to_vec(), vec![4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]);

        // strided input and output go through packed copies
        let big = Matrix::<f64>::zeros(6, 6);
        let target = big.slice(Slice::stepped(2), Slice::stepped(2));
        convolve2d(&input, &kernel, &target);
        assert_eq!(big.get(2, 2), 9.0);
        assert_eq!(big.get(2, 3), 0.0);
    }

    #[test]
    #[should_panic(expected = "odd sides")]
    fn even_kernels_are_rejected() {
        Matrix::<f32>::ones(3, 3).convolving2d(&Matrix::ones(2, 3));
    }
}
