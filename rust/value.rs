//! Element types storable in views.
//!
//! - [`Value`]: anything a view can hold, including `bool` masks and `f16` buffers.
//! - [`Numeric`]: values with additive and multiplicative structure, used by ramps,
//!   tolerance comparisons and polynomial helpers.
//! - [`PlainValue`]: values that can be rebuilt from any byte pattern, used by the compact byte
//!   interchange.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use core::ops::{Add, Div, Mul, Sub};

use half::f16;

/// Base element type of every view.
///
/// `Default::default()` is the "none" value new storage is filled with.
pub trait Value: Copy + Default + PartialEq + core::fmt::Debug + 'static {
    /// Fixed-width text used when a whole view is printed.
    fn describe(&self) -> String;
}

/// Values supporting the four arithmetic operations and ordering.
pub trait Numeric:
    Value
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;

    /// Distance between two values, valid for unsigned types too.
    fn distance(self, other: Self) -> Self {
        if self > other {
            self - other
        } else {
            other - self
        }
    }
}

/// Values for which every `size_of::<Self>()` byte pattern is a valid instance.
///
/// # Safety
///
/// Implementors must have no padding, no invalid bit patterns and no interior pointers.
pub unsafe trait PlainValue: Value {}

macro_rules! impl_integer {
    ($($t:ty),*) => {$(
        impl Value for $t {
            fn describe(&self) -> String {
                format!("{:6}", self)
            }
        }

        impl Numeric for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;
        }

        unsafe impl PlainValue for $t {}
    )*};
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Value for $t {
            fn describe(&self) -> String {
                format!("{:6.3}", self)
            }
        }

        impl Numeric for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
        }

        unsafe impl PlainValue for $t {}
    )*};
}

impl_integer!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
impl_float!(f32, f64);

impl Value for f16 {
    fn describe(&self) -> String {
        format!("{:6.3}", self.to_f32())
    }
}

impl Numeric for f16 {
    const ZERO: Self = f16::ZERO;
    const ONE: Self = f16::ONE;
}

unsafe impl PlainValue for f16 {}

impl Value for bool {
    fn describe(&self) -> String {
        format!("{}", self)
    }
}
