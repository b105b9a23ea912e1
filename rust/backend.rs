//! Bindings to the C99 numeric backend and the [`Kernels`] trait routing views to it.
//!
//! Span kernels take [`LinearAccess`] values and are safe: a span always addresses live storage.
//! Dense kernels take packed row-major buffers and are `unsafe`, the caller vouches for the
//! buffer sizes described in each `# Safety` section.
//!
//! Linear-algebra routines return LAPACK-style status codes:
//!
//! - `0` on success,
//! - `-i` when the i-th argument is illegal,
//! - `+i` when the i-th pivot or diagonal factor is exactly zero.
#![allow(clippy::too_many_arguments)]

use core::ffi::c_int;

use crate::storage::LinearAccess;
use crate::value::{Numeric, PlainValue};

extern "C" {
    fn ns_vadd_f32(a: *const f32, ia: isize, b: *const f32, ib: isize, c: *mut f32, ic: isize, n: usize);
    fn ns_vsub_f32(a: *const f32, ia: isize, b: *const f32, ib: isize, c: *mut f32, ic: isize, n: usize);
    fn ns_vmul_f32(a: *const f32, ia: isize, b: *const f32, ib: isize, c: *mut f32, ic: isize, n: usize);
    fn ns_vdiv_f32(a: *const f32, ia: isize, b: *const f32, ib: isize, c: *mut f32, ic: isize, n: usize);
    fn ns_vsadd_f32(a: *const f32, ia: isize, s: f32, c: *mut f32, ic: isize, n: usize);
    fn ns_vsmul_f32(a: *const f32, ia: isize, s: f32, c: *mut f32, ic: isize, n: usize);
    fn ns_vsmsma_f32(a: *const f32, ia: isize, sa: f32, b: *const f32, ib: isize, sb: f32, c: *mut f32, ic: isize, n: usize);
    fn ns_meanv_f32(a: *const f32, ia: isize, n: usize) -> f32;
    fn ns_measqv_f32(a: *const f32, ia: isize, n: usize) -> f32;
    fn ns_minv_f32(a: *const f32, ia: isize, n: usize) -> f32;
    fn ns_maxv_f32(a: *const f32, ia: isize, n: usize) -> f32;
    fn ns_vramp_f32(start: f32, step: f32, c: *mut f32, ic: isize, n: usize);
    fn ns_cumsum_f32(a: *const f32, ia: isize, c: *mut f32, ic: isize, n: usize);
    fn ns_conv_f32(a: *const f32, ia: isize, f: *const f32, if_: isize, c: *mut f32, ic: isize, n: usize, p: usize);
    fn ns_polyval_f32(p: *const f32, ip: isize, np: usize, x: *const f32, ix: isize, c: *mut f32, ic: isize, n: usize);
    fn ns_mtrans_f32(a: *const f32, rows: usize, columns: usize, c: *mut f32);
    fn ns_gemm_f32(m: usize, n: usize, k: usize, a: *const f32, lda: usize, b: *const f32, ldb: usize, c: *mut f32, ldc: usize);
    fn ns_conv2d_f32(
        input: *const f32,
        rows: usize,
        columns: usize,
        ldi: usize,
        kernel: *const f32,
        krows: usize,
        kcolumns: usize,
        output: *mut f32,
        ldo: usize,
    );
    fn ns_getrf_f32(n: usize, a: *mut f32, lda: usize, ipiv: *mut usize) -> c_int;
    fn ns_getri_f32(n: usize, a: *mut f32, lda: usize, ipiv: *const usize, work: *mut f32) -> c_int;
    fn ns_gels_f32(m: usize, n: usize, nrhs: usize, a: *mut f32, lda: usize, b: *mut f32, ldb: usize, work: *mut f32) -> c_int;

    fn ns_vadd_f64(a: *const f64, ia: isize, b: *const f64, ib: isize, c: *mut f64, ic: isize, n: usize);
    fn ns_vsub_f64(a: *const f64, ia: isize, b: *const f64, ib: isize, c: *mut f64, ic: isize, n: usize);
    fn ns_vmul_f64(a: *const f64, ia: isize, b: *const f64, ib: isize, c: *mut f64, ic: isize, n: usize);
    fn ns_vdiv_f64(a: *const f64, ia: isize, b: *const f64, ib: isize, c: *mut f64, ic: isize, n: usize);
    fn ns_vsadd_f64(a: *const f64, ia: isize, s: f64, c: *mut f64, ic: isize, n: usize);
    fn ns_vsmul_f64(a: *const f64, ia: isize, s: f64, c: *mut f64, ic: isize, n: usize);
    fn ns_vsmsma_f64(a: *const f64, ia: isize, sa: f64, b: *const f64, ib: isize, sb: f64, c: *mut f64, ic: isize, n: usize);
    fn ns_meanv_f64(a: *const f64, ia: isize, n: usize) -> f64;
    fn ns_measqv_f64(a: *const f64, ia: isize, n: usize) -> f64;
    fn ns_minv_f64(a: *const f64, ia: isize, n: usize) -> f64;
    fn ns_maxv_f64(a: *const f64, ia: isize, n: usize) -> f64;
    fn ns_vramp_f64(start: f64, step: f64, c: *mut f64, ic: isize, n: usize);
    fn ns_cumsum_f64(a: *const f64, ia: isize, c: *mut f64, ic: isize, n: usize);
    fn ns_conv_f64(a: *const f64, ia: isize, f: *const f64, if_: isize, c: *mut f64, ic: isize, n: usize, p: usize);
    fn ns_polyval_f64(p: *const f64, ip: isize, np: usize, x: *const f64, ix: isize, c: *mut f64, ic: isize, n: usize);
    fn ns_mtrans_f64(a: *const f64, rows: usize, columns: usize, c: *mut f64);
    fn ns_gemm_f64(m: usize, n: usize, k: usize, a: *const f64, lda: usize, b: *const f64, ldb: usize, c: *mut f64, ldc: usize);
    fn ns_conv2d_f64(
        input: *const f64,
        rows: usize,
        columns: usize,
        ldi: usize,
        kernel: *const f64,
        krows: usize,
        kcolumns: usize,
        output: *mut f64,
        ldo: usize,
    );
    fn ns_getrf_f64(n: usize, a: *mut f64, lda: usize, ipiv: *mut usize) -> c_int;
    fn ns_getri_f64(n: usize, a: *mut f64, lda: usize, ipiv: *const usize, work: *mut f64) -> c_int;
    fn ns_gels_f64(m: usize, n: usize, nrhs: usize, a: *mut f64, lda: usize, b: *mut f64, ldb: usize, work: *mut f64) -> c_int;
}

/// Floating-point element types with backend kernels.
pub trait Kernels: Numeric + PlainValue + core::ops::Neg<Output = Self> {
    const INFINITY: Self;
    const NEG_INFINITY: Self;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    /// `c = a + b`
    fn vadd(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>);
    /// `c = a - b`
    fn vsub(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>);
    /// `c = a * b`
    fn vmul(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>);
    /// `c = a / b`
    fn vdiv(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>);
    /// `c = a + s`
    fn vsadd(a: &LinearAccess<'_, Self>, s: Self, c: &LinearAccess<'_, Self>);
    /// `c = a * s`
    fn vsmul(a: &LinearAccess<'_, Self>, s: Self, c: &LinearAccess<'_, Self>);
    /// `c = a * sa + b * sb`
    fn vsmsma(a: &LinearAccess<'_, Self>, sa: Self, b: &LinearAccess<'_, Self>, sb: Self, c: &LinearAccess<'_, Self>);

    /// Mean of the span, zero when empty.
    fn meanv(a: &LinearAccess<'_, Self>) -> Self;
    /// Mean of the squares, zero when empty.
    fn measqv(a: &LinearAccess<'_, Self>) -> Self;
    /// Smallest element, `+inf` when empty.
    fn minv(a: &LinearAccess<'_, Self>) -> Self;
    /// Largest element, `-inf` when empty.
    fn maxv(a: &LinearAccess<'_, Self>) -> Self;

    /// `c[i] = start + i * step`
    fn vramp(start: Self, step: Self, c: &LinearAccess<'_, Self>);
    /// Running sum of `a` into `c`.
    fn vcumsum(a: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>);
    /// `c[i] = Σₖ a[i + k] · f[k]`, needs `a.count() >= c.count() + f.count() - 1`.
    fn vconv(a: &LinearAccess<'_, Self>, f: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>);
    /// `c[i] = Σₖ p[k] · x[i]ᵏ`
    fn vpoly(p: &LinearAccess<'_, Self>, x: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>);

    /// Packed transpose of a `rows × columns` matrix into `c`.
    ///
    /// # Safety
    ///
    /// `a` and `c` must each hold `rows * columns` elements and must not overlap.
    unsafe fn mtrans(a: *const Self, rows: usize, columns: usize, c: *mut Self);

    /// `C (m × n) = A (m × k) · B (k × n)`, all row-major with leading dimensions.
    ///
    /// # Safety
    ///
    /// Each buffer must cover its rows at its leading dimension, and `c` must not overlap `a` or `b`.
    unsafe fn gemm(m: usize, n: usize, k: usize, a: *const Self, lda: usize, b: *const Self, ldb: usize, c: *mut Self, ldc: usize);

    /// Same-size 2D correlation of `input` with an odd-sized packed kernel over a zero background.
    ///
    /// # Safety
    ///
    /// `input` and `output` must cover `rows` rows at their leading dimensions and must not overlap;
    /// `kernel` must hold `krows * kcolumns` elements.
    unsafe fn conv2d(
        input: *const Self,
        rows: usize,
        columns: usize,
        ldi: usize,
        kernel: *const Self,
        krows: usize,
        kcolumns: usize,
        output: *mut Self,
        ldo: usize,
    );

    /// LU factorization with partial pivoting, in place.
    ///
    /// # Safety
    ///
    /// `a` must cover `n` rows at leading dimension `lda`; `ipiv` must hold `n` entries.
    unsafe fn getrf(n: usize, a: *mut Self, lda: usize, ipiv: *mut usize) -> c_int;

    /// Inverse from the factors of [`getrf`](Self::getrf), in place.
    ///
    /// # Safety
    ///
    /// As for `getrf`, and `work` must hold `n * n + n` elements.
    unsafe fn getri(n: usize, a: *mut Self, lda: usize, ipiv: *const usize, work: *mut Self) -> c_int;

    /// Least squares (`m >= n`) or minimum norm (`m < n`) solution of `A · X = B`, into `b`.
    ///
    /// # Safety
    ///
    /// `a` must cover `m` rows at `lda`, `b` must cover `max(m, n)` rows at `ldb`, and `work` must
    /// hold `2 * m * n + 2 * max(m, n)` elements.
    unsafe fn gels(m: usize, n: usize, nrhs: usize, a: *mut Self, lda: usize, b: *mut Self, ldb: usize, work: *mut Self) -> c_int;
}

#[track_caller]
fn check_counts(expected: usize, got: usize) {
    assert_eq!(expected, got, "span lengths differ");
}

macro_rules! impl_kernels {
    ($t:ty, $vadd:ident, $vsub:ident, $vmul:ident, $vdiv:ident, $vsadd:ident, $vsmul:ident, $vsmsma:ident,
     $meanv:ident, $measqv:ident, $minv:ident, $maxv:ident, $vramp:ident, $cumsum:ident, $conv:ident,
     $polyval:ident, $mtrans:ident, $gemm:ident, $conv2d:ident, $getrf:ident, $getri:ident, $gels:ident) => {
        impl Kernels for $t {
            const INFINITY: Self = <$t>::INFINITY;
            const NEG_INFINITY: Self = <$t>::NEG_INFINITY;

            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn vadd(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                check_counts(c.count(), b.count());
                unsafe { $vadd(a.as_ptr(), a.stride(), b.as_ptr(), b.stride(), c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vsub(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                check_counts(c.count(), b.count());
                unsafe { $vsub(a.as_ptr(), a.stride(), b.as_ptr(), b.stride(), c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vmul(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                check_counts(c.count(), b.count());
                unsafe { $vmul(a.as_ptr(), a.stride(), b.as_ptr(), b.stride(), c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vdiv(a: &LinearAccess<'_, Self>, b: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                check_counts(c.count(), b.count());
                unsafe { $vdiv(a.as_ptr(), a.stride(), b.as_ptr(), b.stride(), c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vsadd(a: &LinearAccess<'_, Self>, s: Self, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                unsafe { $vsadd(a.as_ptr(), a.stride(), s, c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vsmul(a: &LinearAccess<'_, Self>, s: Self, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                unsafe { $vsmul(a.as_ptr(), a.stride(), s, c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vsmsma(a: &LinearAccess<'_, Self>, sa: Self, b: &LinearAccess<'_, Self>, sb: Self, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                check_counts(c.count(), b.count());
                unsafe {
                    $vsmsma(a.as_ptr(), a.stride(), sa, b.as_ptr(), b.stride(), sb, c.as_mut_ptr(), c.stride(), c.count())
                }
            }

            fn meanv(a: &LinearAccess<'_, Self>) -> Self {
                unsafe { $meanv(a.as_ptr(), a.stride(), a.count()) }
            }

            fn measqv(a: &LinearAccess<'_, Self>) -> Self {
                unsafe { $measqv(a.as_ptr(), a.stride(), a.count()) }
            }

            fn minv(a: &LinearAccess<'_, Self>) -> Self {
                unsafe { $minv(a.as_ptr(), a.stride(), a.count()) }
            }

            fn maxv(a: &LinearAccess<'_, Self>) -> Self {
                unsafe { $maxv(a.as_ptr(), a.stride(), a.count()) }
            }

            fn vramp(start: Self, step: Self, c: &LinearAccess<'_, Self>) {
                unsafe { $vramp(start, step, c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vcumsum(a: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), a.count());
                unsafe { $cumsum(a.as_ptr(), a.stride(), c.as_mut_ptr(), c.stride(), c.count()) }
            }

            fn vconv(a: &LinearAccess<'_, Self>, f: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>) {
                assert!(f.count() > 0, "empty convolution kernel");
                check_counts(c.count() + f.count() - 1, a.count());
                unsafe {
                    $conv(a.as_ptr(), a.stride(), f.as_ptr(), f.stride(), c.as_mut_ptr(), c.stride(), c.count(), f.count())
                }
            }

            fn vpoly(p: &LinearAccess<'_, Self>, x: &LinearAccess<'_, Self>, c: &LinearAccess<'_, Self>) {
                check_counts(c.count(), x.count());
                unsafe {
                    $polyval(p.as_ptr(), p.stride(), p.count(), x.as_ptr(), x.stride(), c.as_mut_ptr(), c.stride(), c.count())
                }
            }

            unsafe fn mtrans(a: *const Self, rows: usize, columns: usize, c: *mut Self) {
                $mtrans(a, rows, columns, c)
            }

            unsafe fn gemm(m: usize, n: usize, k: usize, a: *const Self, lda: usize, b: *const Self, ldb: usize, c: *mut Self, ldc: usize) {
                $gemm(m, n, k, a, lda, b, ldb, c, ldc)
            }

            unsafe fn conv2d(
                input: *const Self,
                rows: usize,
                columns: usize,
                ldi: usize,
                kernel: *const Self,
                krows: usize,
                kcolumns: usize,
                output: *mut Self,
                ldo: usize,
            ) {
                $conv2d(input, rows, columns, ldi, kernel, krows, kcolumns, output, ldo)
            }

            unsafe fn getrf(n: usize, a: *mut Self, lda: usize, ipiv: *mut usize) -> c_int {
                $getrf(n, a, lda, ipiv)
            }

            unsafe fn getri(n: usize, a: *mut Self, lda: usize, ipiv: *const usize, work: *mut Self) -> c_int {
                $getri(n, a, lda, ipiv, work)
            }

            unsafe fn gels(m: usize, n: usize, nrhs: usize, a: *mut Self, lda: usize, b: *mut Self, ldb: usize, work: *mut Self) -> c_int {
                $gels(m, n, nrhs, a, lda, b, ldb, work)
            }
        }
    };
}

impl_kernels!(
    f32, ns_vadd_f32, ns_vsub_f32, ns_vmul_f32, ns_vdiv_f32, ns_vsadd_f32, ns_vsmul_f32, ns_vsmsma_f32,
    ns_meanv_f32, ns_measqv_f32, ns_minv_f32, ns_maxv_f32, ns_vramp_f32, ns_cumsum_f32, ns_conv_f32,
    ns_polyval_f32, ns_mtrans_f32, ns_gemm_f32, ns_conv2d_f32, ns_getrf_f32, ns_getri_f32, ns_gels_f32
);

impl_kernels!(
    f64, ns_vadd_f64, ns_vsub_f64, ns_vmul_f64, ns_vdiv_f64, ns_vsadd_f64, ns_vsmul_f64, ns_vsmsma_f64,
    ns_meanv_f64, ns_measqv_f64, ns_minv_f64, ns_maxv_f64, ns_vramp_f64, ns_cumsum_f64, ns_conv_f64,
    ns_polyval_f64, ns_mtrans_f64, ns_gemm_f64, ns_conv2d_f64, ns_getrf_f64, ns_getri_f64, ns_gels_f64
);
