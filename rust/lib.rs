//! # NStrided - Strided N-Dimensional Views over Shared Storage
//!
//! * Rank-specialized [`Vector`], [`Matrix`] and [`Tensor`] views sharing one [`StridedView`] trait.
//! * NumPy-style slicing with open ends, negative bounds and negative steps, all without copying.
//! * Reference-counted storage: every slice, transpose and reshape aliases the elements it came from.
//! * Element-wise arithmetic, reductions, convolutions and linear algebra in a C 99 backend.
//! * Handles `f64` double- and `f32` single-precision kernels, plus `f16` storage and conversions.
//!
//! ## Example
//!
//! ```rust
//! use nstrided::{Arithmetic, Matrix, Slice, StridedView};
//!
//! let m = Matrix::<f32>::zeros(3, 4);
//! m.ramp();
//!
//! // Every other row and column, reversed, over the same storage
//! let corners = m.slice(Slice::range_step(-1, -4, -2), Slice::stepped(2));
//! assert_eq!(corners.to_vec(), vec![8.0, 10.0, 0.0, 2.0]);
//!
//! corners.fill(1.5);
//! assert_eq!(m.get(2, 2), 1.5);
//! assert_eq!(m.maximum(), 11.0);
//! ```
//!
//! ## Views
//!
//! A view is a storage handle plus a resolved layout: one `(start, count, step)` triple per axis.
//!
//! - `compact()`: elements are packed in row-major order.
//! - `coalesceable()`: one uniform stride visits every element in row-major order.
//!   Only coalesceable views can be reshaped or flattened without a copy.
//! - `copy()`: packed copy that no longer aliases the source.
//!
//! Multi-view operations require identical shapes. When every operand is compact the backend
//! sees one span per operand, otherwise the operands are walked row by row in lockstep.
//!
//! ## Errors
//!
//! Malformed slices, mismatched shapes and non-coalesceable reshapes are contract violations.
//! The `try_*` entry points return them as [`ViewError`], their panicking twins report them with
//! the caller's location. Backend failures in [`invert`] and [`solve`] are [`LinalgError`]s.
//!
//! ## Features
//!
//! - `ndarray` (default): copying conversions to and from `ndarray` arrays.
//! - `rand`: uniform random fills through [`Randomize`](random::Randomize).
//!

// Module declarations
pub mod backend;
pub mod convert;
pub mod error;
pub mod layout;
pub mod linalg;
pub mod matrix;
pub mod ops;
pub mod signal;
pub mod slice;
pub mod storage;
pub mod tensor;
pub mod value;
pub mod vector;
pub mod view;

#[cfg(feature = "ndarray")]
pub mod array;
#[cfg(feature = "rand")]
pub mod random;

// Re-export the element types
pub use half::f16;
pub use value::{Numeric, PlainValue, Value};

// Re-export views and their layouts
pub use layout::{GenericSlice, QuadraticIndex, QuadraticSlice, ResolvedLayout};
pub use matrix::Matrix;
pub use slice::{Axis, ResolvedSlice, Slice, SliceExpression};
pub use storage::{GenericAccess, LinearAccess, QuadraticAccess, Storage, StorageAccess};
pub use tensor::Tensor;
pub use vector::Vector;
pub use view::{
    not, true_count, with_linearized, with_linearized2, with_linearized3, with_linearized4, with_storage_access2,
    with_storage_access3, StridedView,
};

// Re-export errors
pub use error::{LinalgError, ShapeDescriptor, ViewError};

// Re-export numerics
pub use backend::Kernels;
pub use convert::{convert_f16_to_f32, convert_f32_to_f16, deinterleave4, interleave4, narrowed, widened};
pub use linalg::{invert, multiply, multiply_vector, polyfit, polyval, polyval_scalar, solve, transpose, Solution};
pub use ops::{
    add, add_scalar, divide_elements, lerp, multiply_elements, multiply_scalar, scaled_add, subtract, Arithmetic,
};
pub use signal::{convolve, convolve2d, pad, ConvolutionDomain, PaddingMode};

// region: Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_almost_equal(left: f64, right: f64, tolerance: f64) {
        let lower = right - tolerance;
        let upper = right + tolerance;

        assert!(left >= lower && left <= upper, "{} is not within {} of {}", left, tolerance, right);
    }

    #[test]
    fn inverse_of_three_by_three() {
        let a = Matrix::from_row_major(vec![1.0f64, 2.0, 3.0, 1.0, -2.0, 3.0, 1.0, 2.0, 1.0], 3, 3);
        let expected = [-1.0, 0.5, 1.5, 0.25, -0.25, 0.0, 0.5, 0.0, -0.5];
        let inverse = a.inverted().unwrap();
        for (got, want) in inverse.to_vec().into_iter().zip(expected) {
            assert_almost_equal(got, want, 1e-5);
        }

        let output = Matrix::zeros(3, 3);
        invert(&a.t(), &output).unwrap();
        assert!(output.is_equal(&inverse.t(), 1e-5));
    }

    #[test]
    fn masked_fill_of_a_ramp() {
        let v = Vector::linspace(0.0f64, 50.0, 51);
        let mask = v.ge_scalar(21.0);
        assert_eq!(true_count(&mask), 30);

        v.fill_where(1.1, &mask);
        let values = v.to_vec();
        assert!(values[21..].iter().all(|&x| x == 1.1));
        for (i, &x) in values[..21].iter().enumerate() {
            assert_almost_equal(x, i as f64, 1e-9);
        }

        // reading the masked elements and writing them back is a no-op
        let before = v.to_vec();
        v.scatter(&mask, &v.gather(&mask));
        assert_eq!(v.to_vec(), before);
    }

    #[test]
    fn strided_matrix_fill() {
        let m = Matrix::<f32>::zeros(3, 4);
        m.slice(Slice::range_step(0, 3, 2), Slice::range_step(0, 3, 2)).fill(1.5);
        for (index, value) in m.to_vec().into_iter().enumerate() {
            let (row, column) = (index / 4, index % 4);
            let expected = if row % 2 == 0 && column % 2 == 0 && column < 3 { 1.5 } else { 0.0 };
            assert_eq!(value, expected, "at ({}, {})", row, column);
        }
    }

    #[test]
    fn ramp_tensor_statistics() {
        let t = Tensor::<f64>::zeros(&[3, 3, 3]);
        t.ramp();
        assert_almost_equal(t.mean(), 13.0, 1e-9);
        assert_eq!(t.minimum(), 0.0);
        assert_eq!(t.maximum(), 26.0);

        // strided sub-tensors reduce span by span
        let odd = t.slice(&[Axis::All, Axis::Range(Slice::starting_step(1, 2)), Axis::All]);
        assert!(!odd.coalesceable());
        assert_almost_equal(odd.mean(), 13.0, 1e-9);
    }

    #[test]
    fn slices_compose() {
        let v = Vector::<f64>::zeros(20);
        v.ramp();
        let outer = Slice::range_step(2, 18, 3);
        let inner = Slice::range_step(-1, 0, -2);
        let twice = v.slice(outer).slice(inner);
        let once = v.slice(inner.resolve_within(&outer.resolve(20)));
        assert_eq!(twice.to_vec(), once.to_vec());
        assert_eq!(twice.to_vec(), vec![17.0, 11.0, 5.0]);
    }
}

// endregion: Tests
