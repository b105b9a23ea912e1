//! Element-wise arithmetic, reductions and operators over views of [`Kernels`] elements.
//!
//! Every binary operation requires operands of exactly the same shape; there is no broadcasting.
//! Output views may alias inputs when they address the same elements, so `add(&a, &b, &a)` is an
//! in-place update.
//!
//! ```rust
//! use nstrided::{Arithmetic, StridedView, Vector};
//!
//! let a = Vector::from_vec(vec![1.0f32, 2.0, 3.0]);
//! let b = &a * 2.0 + &a;
//! assert_eq!(b.to_vec(), vec![3.0, 6.0, 9.0]);
//! assert_eq!(b.mean(), 6.0);
//! ```

use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::backend::Kernels;
use crate::matrix::Matrix;
use crate::storage::LinearAccess;
use crate::tensor::Tensor;
use crate::value::Numeric;
use crate::vector::Vector;
use crate::view::{with_linearized, with_linearized2, with_linearized3, StridedView};

// region: Element-wise

/// `output = a + b`
#[track_caller]
pub fn add<V: StridedView>(a: &V, b: &V, output: &V)
where
    V::Element: Kernels,
{
    with_linearized3(a, b, output, |a, b, c| V::Element::vadd(&a, &b, &c)).unwrap_or_else(|err| panic!("{}", err))
}

/// `output = a - b`
#[track_caller]
pub fn subtract<V: StridedView>(a: &V, b: &V, output: &V)
where
    V::Element: Kernels,
{
    with_linearized3(a, b, output, |a, b, c| V::Element::vsub(&a, &b, &c)).unwrap_or_else(|err| panic!("{}", err))
}

/// `output = a * b`, element by element.
#[track_caller]
pub fn multiply_elements<V: StridedView>(a: &V, b: &V, output: &V)
where
    V::Element: Kernels,
{
    with_linearized3(a, b, output, |a, b, c| V::Element::vmul(&a, &b, &c)).unwrap_or_else(|err| panic!("{}", err))
}

/// `output = a / b`, element by element.
#[track_caller]
pub fn divide_elements<V: StridedView>(a: &V, b: &V, output: &V)
where
    V::Element: Kernels,
{
    with_linearized3(a, b, output, |a, b, c| V::Element::vdiv(&a, &b, &c)).unwrap_or_else(|err| panic!("{}", err))
}

/// `output = a + scalar`
#[track_caller]
pub fn add_scalar<V: StridedView>(a: &V, scalar: V::Element, output: &V)
where
    V::Element: Kernels,
{
    with_linearized2(a, output, |a, c| V::Element::vsadd(&a, scalar, &c)).unwrap_or_else(|err| panic!("{}", err))
}

/// `output = a * scalar`
#[track_caller]
pub fn multiply_scalar<V: StridedView>(a: &V, scalar: V::Element, output: &V)
where
    V::Element: Kernels,
{
    with_linearized2(a, output, |a, c| V::Element::vsmul(&a, scalar, &c)).unwrap_or_else(|err| panic!("{}", err))
}

/// `output = a * a_scale + b * b_scale`
#[track_caller]
pub fn scaled_add<V: StridedView>(a: &V, a_scale: V::Element, b: &V, b_scale: V::Element, output: &V)
where
    V::Element: Kernels,
{
    with_linearized3(a, b, output, |a, b, c| V::Element::vsmsma(&a, a_scale, &b, b_scale, &c))
        .unwrap_or_else(|err| panic!("{}", err))
}

/// `output = a * (1 - t) + b * t`
#[track_caller]
pub fn lerp<V: StridedView>(a: &V, b: &V, t: V::Element, output: &V)
where
    V::Element: Kernels,
{
    scaled_add(a, V::Element::ONE - t, b, t, output)
}

// endregion: Element-wise

// region: Arithmetic

/// Reductions and allocating forms of the element-wise operations.
pub trait Arithmetic: StridedView
where
    Self::Element: Kernels,
{
    /// Mean of all elements, zero for an empty view.
    fn mean(&self) -> Self::Element {
        average_of_spans(self, Self::Element::meanv)
    }

    /// Mean of the squared elements, zero for an empty view.
    fn mean_square(&self) -> Self::Element {
        average_of_spans(self, Self::Element::measqv)
    }

    /// Smallest element, `+inf` for an empty view.
    fn minimum(&self) -> Self::Element {
        let mut result = Self::Element::INFINITY;
        with_linearized(self, |span| {
            let candidate = Self::Element::minv(&span);
            if candidate < result {
                result = candidate;
            }
        });
        result
    }

    /// Largest element, `-inf` for an empty view.
    fn maximum(&self) -> Self::Element {
        let mut result = Self::Element::NEG_INFINITY;
        with_linearized(self, |span| {
            let candidate = Self::Element::maxv(&span);
            if candidate > result {
                result = candidate;
            }
        });
        result
    }

    #[track_caller]
    fn added(&self, other: &Self) -> Self {
        let output = self.like();
        add(self, other, &output);
        output
    }

    #[track_caller]
    fn subtracted(&self, other: &Self) -> Self {
        let output = self.like();
        subtract(self, other, &output);
        output
    }

    #[track_caller]
    fn multiplied_elements(&self, other: &Self) -> Self {
        let output = self.like();
        multiply_elements(self, other, &output);
        output
    }

    #[track_caller]
    fn divided_elements(&self, other: &Self) -> Self {
        let output = self.like();
        divide_elements(self, other, &output);
        output
    }

    fn added_scalar(&self, scalar: Self::Element) -> Self {
        let output = self.like();
        add_scalar(self, scalar, &output);
        output
    }

    fn multiplied_scalar(&self, scalar: Self::Element) -> Self {
        let output = self.like();
        multiply_scalar(self, scalar, &output);
        output
    }

    #[track_caller]
    fn scaled_added(&self, own_scale: Self::Element, other: &Self, other_scale: Self::Element) -> Self {
        let output = self.like();
        scaled_add(self, own_scale, other, other_scale, &output);
        output
    }

    #[track_caller]
    fn lerped(&self, other: &Self, t: Self::Element) -> Self {
        let output = self.like();
        lerp(self, other, t, &output);
        output
    }
}

impl<V: StridedView> Arithmetic for V where V::Element: Kernels {}

/// Spans of one view all have the same length, so their means average to the overall mean.
fn average_of_spans<V: StridedView>(view: &V, reduce: fn(&LinearAccess<'_, V::Element>) -> V::Element) -> V::Element
where
    V::Element: Kernels,
{
    let mut total = 0.0f64;
    let mut spans = 0usize;
    with_linearized(view, |span| {
        total += reduce(&span).to_f64();
        spans += 1;
    });
    if spans == 0 {
        V::Element::ZERO
    } else {
        V::Element::from_f64(total / spans as f64)
    }
}

// endregion: Arithmetic

// region: Operators

macro_rules! impl_view_operators {
    ($view:ident) => {
        impl<T: Kernels> Add<&$view<T>> for &$view<T> {
            type Output = $view<T>;
            #[track_caller]
            fn add(self, rhs: &$view<T>) -> $view<T> {
                self.added(rhs)
            }
        }

        impl<T: Kernels> Add<&$view<T>> for $view<T> {
            type Output = $view<T>;
            #[track_caller]
            fn add(self, rhs: &$view<T>) -> $view<T> {
                self.added(rhs)
            }
        }

        impl<T: Kernels> Sub<&$view<T>> for &$view<T> {
            type Output = $view<T>;
            #[track_caller]
            fn sub(self, rhs: &$view<T>) -> $view<T> {
                self.subtracted(rhs)
            }
        }

        impl<T: Kernels> Sub<&$view<T>> for $view<T> {
            type Output = $view<T>;
            #[track_caller]
            fn sub(self, rhs: &$view<T>) -> $view<T> {
                self.subtracted(rhs)
            }
        }

        impl<T: Kernels> Add<T> for &$view<T> {
            type Output = $view<T>;
            fn add(self, rhs: T) -> $view<T> {
                self.added_scalar(rhs)
            }
        }

        impl<T: Kernels> Sub<T> for &$view<T> {
            type Output = $view<T>;
            fn sub(self, rhs: T) -> $view<T> {
                self.added_scalar(-rhs)
            }
        }

        impl<T: Kernels> Mul<T> for &$view<T> {
            type Output = $view<T>;
            fn mul(self, rhs: T) -> $view<T> {
                self.multiplied_scalar(rhs)
            }
        }

        impl<T: Kernels> Div<T> for &$view<T> {
            type Output = $view<T>;
            fn div(self, rhs: T) -> $view<T> {
                self.multiplied_scalar(T::ONE / rhs)
            }
        }

        impl<T: Kernels> Neg for &$view<T> {
            type Output = $view<T>;
            fn neg(self) -> $view<T> {
                self.multiplied_scalar(-T::ONE)
            }
        }

        impl<T: Kernels> AddAssign<&$view<T>> for $view<T> {
            #[track_caller]
            fn add_assign(&mut self, rhs: &$view<T>) {
                add(&*self, rhs, &*self)
            }
        }

        impl<T: Kernels> SubAssign<&$view<T>> for $view<T> {
            #[track_caller]
            fn sub_assign(&mut self, rhs: &$view<T>) {
                subtract(&*self, rhs, &*self)
            }
        }

        impl<T: Kernels> AddAssign<T> for $view<T> {
            fn add_assign(&mut self, rhs: T) {
                add_scalar(&*self, rhs, &*self)
            }
        }

        impl<T: Kernels> SubAssign<T> for $view<T> {
            fn sub_assign(&mut self, rhs: T) {
                add_scalar(&*self, -rhs, &*self)
            }
        }

        impl<T: Kernels> MulAssign<T> for $view<T> {
            fn mul_assign(&mut self, rhs: T) {
                multiply_scalar(&*self, rhs, &*self)
            }
        }

        impl<T: Kernels> DivAssign<T> for $view<T> {
            fn div_assign(&mut self, rhs: T) {
                multiply_scalar(&*self, T::ONE / rhs, &*self)
            }
        }

        impl Mul<&$view<f32>> for f32 {
            type Output = $view<f32>;
            fn mul(self, rhs: &$view<f32>) -> $view<f32> {
                rhs.multiplied_scalar(self)
            }
        }

        impl Mul<&$view<f64>> for f64 {
            type Output = $view<f64>;
            fn mul(self, rhs: &$view<f64>) -> $view<f64> {
                rhs.multiplied_scalar(self)
            }
        }
    };
}

impl_view_operators!(Vector);
impl_view_operators!(Matrix);
impl_view_operators!(Tensor);

impl<T: Kernels> Mul<&Vector<T>> for &Vector<T> {
    type Output = Vector<T>;
    #[track_caller]
    fn mul(self, rhs: &Vector<T>) -> Vector<T> {
        self.multiplied_elements(rhs)
    }
}

impl<T: Kernels> Div<&Vector<T>> for &Vector<T> {
    type Output = Vector<T>;
    #[track_caller]
    fn div(self, rhs: &Vector<T>) -> Vector<T> {
        self.divided_elements(rhs)
    }
}

impl<T: Kernels> Div<&Matrix<T>> for &Matrix<T> {
    type Output = Matrix<T>;
    #[track_caller]
    fn div(self, rhs: &Matrix<T>) -> Matrix<T> {
        self.divided_elements(rhs)
    }
}

// endregion: Operators

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::Slice;

    fn assert_almost_equal(left: f64, right: f64, tolerance: f64) {
        let lower = right - tolerance;
        let upper = right + tolerance;

        assert!(left >= lower && left <= upper, "{} is not within {} of {}", left, tolerance, right);
    }

    #[test]
    fn ramp_statistics_per_rank() {
        let v = Vector::<f64>::zeros(3);
        v.ramp();
        assert_almost_equal(v.mean(), 1.0, 1e-9);
        assert_almost_equal(v.mean_square(), 1.6667, 1e-4);
        assert_eq!((v.minimum(), v.maximum()), (0.0, 2.0));

        let m = Matrix::<f64>::zeros(3, 3);
        m.ramp();
        assert_almost_equal(m.mean(), 4.0, 1e-9);
        assert_almost_equal(m.mean_square(), 22.6667, 1e-4);
        assert_eq!((m.minimum(), m.maximum()), (0.0, 8.0));

        // strided reductions go span by span
        let corners = m.slice(Slice::stepped(2), Slice::stepped(2));
        assert_almost_equal(corners.mean(), 4.0, 1e-9);
        assert_eq!(corners.maximum(), 8.0);
    }

    #[test]
    fn empty_reductions() {
        let v = Vector::<f32>::zeros(0);
        assert_eq!(v.mean(), 0.0);
        assert_eq!(v.minimum(), f32::INFINITY);
        assert_eq!(v.maximum(), f32::NEG_INFINITY);
    }

    #[test]
    fn element_wise_forms_agree() {
        let a = Matrix::from_row_major(vec![1.0f32, 2.0, 3.0, 4.0], 2, 2);
        let b = Matrix::from_row_major(vec![4.0f32, 3.0, 2.0, 1.0], 2, 2);
        let out = Matrix::zeros(2, 2);
        add(&a, &b, &out);
        assert_eq!(out.to_vec(), vec![5.0; 4]);
        assert!((&a + &b).is_equal(&out, 0.0));

        assert_eq!((&a - &b).to_vec(), vec![-3.0, -1.0, 1.0, 3.0]);
        assert_eq!(a.multiplied_elements(&b).to_vec(), vec![4.0, 6.0, 6.0, 4.0]);
        assert_eq!((&a / &b).to_vec(), vec![0.25, 2.0 / 3.0, 1.5, 4.0]);
        assert_eq!(a.lerped(&b, 0.5).to_vec(), vec![2.5; 4]);
        assert_eq!((2.0 * &a).to_vec(), vec![2.0, 4.0, 6.0, 8.0]);
        assert_eq!((&a - 1.0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!((-&a).to_vec(), vec![-1.0, -2.0, -3.0, -4.0]);
    }

    #[test]
    fn compound_assignment_writes_through_aliases() {
        let base = Vector::<f64>::zeros(6);
        base.ramp();
        let mut evens = base.slice(Slice::stepped(2));
        evens += 10.0;
        evens *= 2.0;
        assert_eq!(base.to_vec(), vec![20.0, 1.0, 24.0, 3.0, 28.0, 5.0]);

        let mut odds = base.slice(Slice::starting_step(1, 2));
        odds -= &evens;
        assert_eq!(base.get(5), -23.0);
        odds /= -1.0;
        assert_eq!(base.get(1), 19.0);
    }

    #[test]
    fn lerp_into_strided_output() {
        let a = Vector::from_vec(vec![0.0f64, 4.0, 8.0]);
        let b = Vector::from_vec(vec![4.0f64, 8.0, 0.0]);
        let target = Vector::<f64>::zeros(6);
        let odds = target.slice(Slice::starting_step(1, 2));
        lerp(&a, &b, 0.25, &odds);
        assert_eq!(target.to_vec(), vec![0.0, 1.0, 0.0, 5.0, 0.0, 6.0]);
        assert_eq!(Tensor::<f32>::zeros(&[2, 0]).mean(), 0.0);
    }

    #[test]
    fn vector_element_operators() {
        let a = Vector::from_vec(vec![2.0f64, 4.0, 8.0]);
        let b = Vector::from_vec(vec![1.0f64, 2.0, 4.0]);
        assert_eq!((&a * &b).to_vec(), vec![2.0, 8.0, 32.0]);
        assert_eq!((&a / &b).to_vec(), vec![2.0, 2.0, 2.0]);
        assert_eq!(a.scaled_added(0.5, &b, -1.0).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn mismatched_shapes_panic() {
        let _ = &Vector::<f32>::zeros(3) + &Vector::<f32>::zeros(4);
    }
}
