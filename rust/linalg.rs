//! Matrix products, inversion, least squares and polynomials.
//!
//! The dense kernels work on packed row-major buffers. Operands that are not compact are copied
//! first, and outputs that are strided or alias an input are computed into a scratch matrix and
//! assigned back, so every entry point accepts arbitrary views.
//!
//! Factorization failures are properties of the data and come back as [`LinalgError`]; shape
//! mismatches are contract violations and panic.
//!
//! ```rust
//! use nstrided::{Matrix, StridedView};
//!
//! let a = Matrix::from_row_major(vec![4.0f64, 7.0, 2.0, 6.0], 2, 2);
//! let inverse = a.inverted().unwrap();
//! let identity = &a * &inverse;
//! assert!(identity.is_equal(&Matrix::identity(2), 1e-9));
//! ```

extern crate alloc;

use alloc::vec;
use core::ops::Mul;

use tracing::debug;

use crate::backend::Kernels;
use crate::error::LinalgError;
use crate::matrix::Matrix;
use crate::storage::StorageAccess;
use crate::value::Value;
use crate::vector::Vector;
use crate::view::{with_linearized2, StridedView};

// region: Packing

/// `matrix` itself when compact, a packed copy otherwise.
pub(crate) fn packed<T: Kernels>(matrix: &Matrix<T>, operand: &'static str) -> Matrix<T> {
    if matrix.compact() {
        matrix.clone()
    } else {
        debug!(operand, rows = matrix.rows(), columns = matrix.columns(), "materializing non-compact operand");
        matrix.copy()
    }
}

/// `matrix` and its leading dimension when its rows are packed, else a packed copy.
pub(crate) fn row_packed<T: Kernels>(matrix: &Matrix<T>, operand: &'static str) -> (Matrix<T>, usize) {
    match matrix.with_storage_access(|access| access.leading_dimension()) {
        Some(leading) => (matrix.clone(), leading),
        None => {
            debug!(operand, rows = matrix.rows(), columns = matrix.columns(), "materializing strided rows");
            (matrix.copy(), matrix.columns())
        }
    }
}

/// Hands `body` a packed buffer with the shape of `output`, writing it back when it was a scratch copy.
pub(crate) fn with_packed_output<T: Kernels>(output: &Matrix<T>, aliased: bool, body: impl FnOnce(*mut T)) {
    if output.compact() && !aliased {
        output.with_storage_access(|access| body(access.base()))
    } else {
        debug!(aliased, rows = output.rows(), columns = output.columns(), "computing into scratch output");
        let scratch = Matrix::zeros(output.rows(), output.columns());
        scratch.with_storage_access(|access| body(access.base()));
        output.assign(&scratch);
    }
}

fn status_error(routine: &'static str, status: i32) -> Option<LinalgError> {
    match status {
        0 => None,
        s if s < 0 => Some(LinalgError::IllegalArgument {
            routine,
            index: s.unsigned_abs() as usize,
        }),
        s => Some(LinalgError::ZeroFactor { index: s as usize }),
    }
}

// endregion: Packing

// region: Products

/// `output = a · b`
#[track_caller]
pub fn multiply<T: Kernels>(a: &Matrix<T>, b: &Matrix<T>, output: &Matrix<T>) {
    assert_eq!(
        a.columns(),
        b.rows(),
        "cannot multiply {}×{} by {}×{}",
        a.rows(),
        a.columns(),
        b.rows(),
        b.columns()
    );
    assert_eq!(output.shape(), vec![a.rows(), b.columns()], "product output shape");

    let (m, n, k) = (a.rows(), b.columns(), a.columns());
    let aliased = output.aliases(a) || output.aliases(b);
    let ((a, lda), (b, ldb)) = (row_packed(a, "left"), row_packed(b, "right"));
    a.with_storage_access(|left| {
        b.with_storage_access(|right| {
            with_packed_output(output, aliased, |c| unsafe { T::gemm(m, n, k, left.base(), lda, right.base(), ldb, c, n) })
        })
    })
}

/// `output = a · v`
#[track_caller]
pub fn multiply_vector<T: Kernels>(a: &Matrix<T>, v: &Vector<T>, output: &Vector<T>) {
    multiply(a, &v.as_column(), &output.as_column())
}

/// Writes the transpose of `source` into `output`.
#[track_caller]
pub fn transpose<T: Kernels>(source: &Matrix<T>, output: &Matrix<T>) {
    assert_eq!(output.shape(), vec![source.columns(), source.rows()], "transpose output shape");
    let aliased = output.aliases(source);
    let (rows, columns) = (source.rows(), source.columns());
    let source = packed(source, "source");
    source.with_storage_access(|a| with_packed_output(output, aliased, |c| unsafe { T::mtrans(a.base(), rows, columns, c) }))
}

impl<T: Kernels> Mul<&Matrix<T>> for &Matrix<T> {
    type Output = Matrix<T>;

    #[track_caller]
    fn mul(self, rhs: &Matrix<T>) -> Matrix<T> {
        let output = Matrix::zeros(self.rows(), rhs.columns());
        multiply(self, rhs, &output);
        output
    }
}

impl<T: Kernels> Mul<&Vector<T>> for &Matrix<T> {
    type Output = Vector<T>;

    #[track_caller]
    fn mul(self, rhs: &Vector<T>) -> Vector<T> {
        let output = Vector::zeros(self.rows());
        multiply_vector(self, rhs, &output);
        output
    }
}

// endregion: Products

// region: Inversion

/// Writes the inverse of the square `input` into `output`.
#[track_caller]
pub fn invert<T: Kernels>(input: &Matrix<T>, output: &Matrix<T>) -> Result<(), LinalgError> {
    assert_eq!(input.rows(), input.columns(), "only square matrices can be inverted");
    assert_eq!(input.shape(), output.shape(), "inverse output shape");
    let n = input.rows();
    if n == 0 {
        return Ok(());
    }

    let factors = input.copy();
    let mut pivots = vec![0usize; n];
    let mut work = vec![T::ZERO; n * n + n];
    factors.with_storage_access(|access| {
        let status = unsafe { T::getrf(n, access.base(), n, pivots.as_mut_ptr()) };
        match status_error("getrf", status) {
            Some(LinalgError::ZeroFactor { .. }) => return Err(LinalgError::SingularMatrix),
            Some(err) => return Err(err),
            None => {}
        }
        let status = unsafe { T::getri(n, access.base(), n, pivots.as_ptr(), work.as_mut_ptr()) };
        match status_error("getri", status) {
            Some(LinalgError::ZeroFactor { .. }) => Err(LinalgError::SingularMatrix),
            Some(err) => Err(err),
            None => Ok(()),
        }
    })?;
    output.assign(&factors);
    Ok(())
}

impl<T: Kernels> Matrix<T> {
    pub fn inverted(&self) -> Result<Self, LinalgError> {
        let output = Self::zeros(self.rows(), self.columns());
        invert(self, &output)?;
        Ok(output)
    }
}

// endregion: Inversion

// region: Least squares

/// Result of [`solve`].
#[derive(Debug, Clone)]
pub struct Solution<T: Value> {
    /// `n × nrhs`, one column per right-hand side.
    pub solution: Matrix<T>,
    /// `1 × nrhs` residual sums of squares, only for over-determined systems.
    pub square_error: Option<Matrix<T>>,
}

/// Solves `a · x = b` for the `m × n` matrix `a` and the `m × nrhs` matrix `b`.
///
/// Over-determined systems (`m > n`) get the least-squares solution and its residuals;
/// under-determined ones (`m < n`) get the minimum-norm solution.
#[track_caller]
pub fn solve<T: Kernels>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Solution<T>, LinalgError> {
    assert_eq!(a.rows(), b.rows(), "right-hand sides must have one row per equation");
    let (m, n, nrhs) = (a.rows(), a.columns(), b.columns());
    let height = m.max(n);
    debug!(m, n, nrhs, "solving linear system");

    let factors = a.copy();
    let rhs = Matrix::zeros(height, nrhs);
    if m > 0 && nrhs > 0 {
        rhs.slice(..m as isize, ..).assign(b);
    }
    let mut work = vec![T::ZERO; 2 * m * n + 2 * height];

    let status = factors.with_storage_access(|fa| {
        rhs.with_storage_access(|fb| unsafe { T::gels(m, n, nrhs, fa.base(), n, fb.base(), nrhs, work.as_mut_ptr()) })
    });
    if let Some(err) = status_error("gels", status) {
        return Err(err);
    }

    let solution = Matrix::zeros(n, nrhs);
    if n > 0 && nrhs > 0 {
        solution.assign(&rhs.slice(..n as isize, ..));
    }
    let square_error = (m > n).then(|| {
        let errors = Matrix::zeros(1, nrhs);
        for j in 0..nrhs {
            let residuals = rhs.column_slice(n as isize.., j);
            let total = residuals.to_vec().into_iter().fold(T::ZERO, |sum, r| sum + r * r);
            errors.set(0, j, total);
        }
        errors
    });
    Ok(Solution { solution, square_error })
}

// endregion: Least squares

// region: Polynomials

/// `output[i] = Σₖ poly[k] · x[i]ᵏ` for same-shaped views of any rank.
#[track_caller]
pub fn polyval<V: StridedView>(poly: &Vector<V::Element>, x: &V, output: &V)
where
    V::Element: Kernels,
{
    poly.with_storage_access(|p| with_linearized2(x, output, |x, c| V::Element::vpoly(&p, &x, &c)))
        .unwrap_or_else(|err| panic!("{}", err))
}

/// Evaluates `poly`, lowest power first, at a single point.
pub fn polyval_scalar<T: Kernels>(poly: &Vector<T>, x: T) -> T {
    poly.to_vec().into_iter().rev().fold(T::ZERO, |sum, coefficient| sum * x + coefficient)
}

/// Least-squares polynomial of `degree` through the points `(x[i], y[i])`, lowest power first.
#[track_caller]
pub fn polyfit<T: Kernels>(x: &Vector<T>, y: &Vector<T>, degree: usize) -> Result<Vector<T>, LinalgError> {
    assert_eq!(x.size(), y.size(), "polyfit needs as many ordinates as abscissas");
    let xs = x.to_vec();
    let vandermonde = Matrix::from_fn(xs.len(), degree + 1, |i, k| {
        (0..k).fold(T::ONE, |power, _| power * xs[i])
    });
    let fit = solve(&vandermonde, &y.as_column())?;
    Ok(Vector::from_vec(fit.solution.column(0).to_vec()))
}

impl<T: Kernels> Vector<T> {
    /// This vector's coefficients evaluated at every element of `x`.
    #[track_caller]
    pub fn polyval<V: StridedView<Element = T>>(&self, x: &V) -> V {
        let output = x.like();
        polyval(self, x, &output);
        output
    }
}

// endregion: Polynomials

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::Slice;

    fn assert_almost_equal(left: f64, right: f64, tolerance: f64) {
        let lower = right - tolerance;
        let upper = right + tolerance;

        assert!(left >= lower && left <= upper, "{} is not within {} of {}", left, tolerance, right);
    }

    fn assert_all_close(left: &[f64], right: &[f64], tolerance: f64) {
        assert_eq!(left.len(), right.len());
        for (&l, &r) in left.iter().zip(right) {
            assert_almost_equal(l, r, tolerance);
        }
    }

    #[test]
    fn matrix_vector_product() {
        let m = Matrix::from_row_major(vec![1.0f64, 2.0, 3.0, 0.0, 0.0, 2.0, 2.0, 0.0, 2.0, 1.0, 1.0, 1.0], 4, 3);
        let v = Vector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!((&m * &v).to_vec(), vec![14.0, 6.0, 8.0, 6.0]);

        // reversed operands are packed first
        let flipped = v.slice(Slice::FLIP);
        assert_eq!((&m * &flipped).to_vec(), vec![10.0, 2.0, 8.0, 6.0]);
    }

    #[test]
    fn products_of_transposed_views() {
        let a = Matrix::from_row_major(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        let gram = &a * &a.t();
        assert_eq!(gram.to_vec(), vec![14.0, 32.0, 32.0, 77.0]);

        let output = Matrix::zeros(3, 2);
        transpose(&a, &output);
        assert!(output.is_equal(&a.t(), 0.0));

        // aliasing output goes through a scratch buffer
        let square = Matrix::from_row_major(vec![1.0f32, 1.0, 0.0, 1.0], 2, 2);
        multiply(&square, &square, &square);
        assert_eq!(square.to_vec(), vec![1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn products_of_column_blocks() {
        let wide = Matrix::from_row_major(vec![9.0f64, 1.0, 2.0, 9.0, 9.0, 3.0, 4.0, 9.0], 2, 4);
        let left = wide.slice(.., 1isize..3);
        let right = Matrix::from_row_major(vec![1.0f64, 0.0, 1.0, 1.0, 1.0, 0.0, 2.0, 1.0], 4, 2);
        let lower = right.slice(2isize.., ..);
        assert_eq!(left.with_storage_access(|access| access.leading_dimension()), Some(4));

        let output = Matrix::zeros(2, 2);
        multiply(&left, &lower, &output);
        assert_eq!(output.to_vec(), vec![5.0, 2.0, 11.0, 4.0]);

        // reversed rows have no leading dimension and get packed first
        let flipped = lower.slice(Slice::FLIP, ..);
        assert_eq!(flipped.with_storage_access(|access| access.leading_dimension()), None);
        assert_eq!((&left * &flipped).to_vec(), vec![4.0, 1.0, 10.0, 3.0]);
    }

    #[test]
    fn inverse_round_trip() {
        let a = Matrix::from_row_major(vec![2.0f64, 1.0, 1.0, 1.0, 3.0, 2.0, 1.0, 0.0, 0.0], 3, 3);
        let inverse = a.inverted().unwrap();
        assert!((&a * &inverse).is_equal(&Matrix::identity(3), 1e-9));
        assert!((&inverse * &a).is_equal(&Matrix::identity(3), 1e-9));

        let singular = Matrix::from_row_major(vec![1.0f64, 2.0, 2.0, 4.0], 2, 2);
        assert_eq!(singular.inverted().map(|m| m.len()), Err(LinalgError::SingularMatrix));
    }

    #[test]
    fn least_squares_and_minimum_norm() {
        let a = Matrix::from_row_major(vec![1.0f64, 2.0, 1.0, -2.0, 1.0, 3.0], 3, 2);
        let b = Matrix::from_row_major(vec![1.0f64, 2.0, 1.0, -2.0, 1.0, 3.0], 3, 2);
        let fit = solve(&a, &b).unwrap();
        assert_all_close(&fit.solution.to_vec(), &[1.0, 0.0, 0.0, 1.0], 1e-9);
        let errors = fit.square_error.unwrap();
        assert_eq!(errors.shape(), vec![1, 2]);
        assert_all_close(&errors.to_vec(), &[0.0, 0.0], 1e-9);

        let noisy = Matrix::from_row_major(vec![0.0f64, 1.0, 1.0], 3, 1);
        let line = Matrix::from_row_major(vec![1.0f64, 0.0, 1.0, 1.0, 1.0, 2.0], 3, 2);
        let fit = solve(&line, &noisy).unwrap();
        assert_all_close(&fit.solution.to_vec(), &[1.0 / 6.0, 0.5], 1e-9);
        assert_almost_equal(fit.square_error.unwrap().get(0, 0), 1.0 / 6.0, 1e-9);

        let under = Matrix::from_row_major(vec![1.0f64, 1.0], 1, 2);
        let fit = solve(&under, &Matrix::from_row_major(vec![2.0], 1, 1)).unwrap();
        assert_all_close(&fit.solution.to_vec(), &[1.0, 1.0], 1e-9);
        assert!(fit.square_error.is_none());
    }

    #[test]
    fn polynomials() {
        let poly = Vector::from_vec(vec![1.0f64, 0.0, 2.0]);
        assert_eq!(polyval_scalar(&poly, 3.0), 19.0);

        let grid = Matrix::from_row_major(vec![0.0f64, 1.0, 2.0, 3.0], 2, 2);
        assert_eq!(poly.polyval(&grid).to_vec(), vec![1.0, 3.0, 9.0, 19.0]);

        let x = Vector::linspace(-1.0f64, 1.0, 9);
        let y = poly.polyval(&x);
        let fit = polyfit(&x, &y, 2).unwrap();
        assert_all_close(&fit.to_vec(), &poly.to_vec(), 1e-9);
    }
}
