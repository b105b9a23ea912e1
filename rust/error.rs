//! Error types for view construction, slicing and linear algebra.
//!
//! Malformed slices, mismatched shapes and non-coalesceable reshapes are contract violations:
//! the panicking entry points report them through [`ViewError`]'s `Display`, while the `try_*`
//! variants hand them back to the caller. Numeric failures of the linear-algebra backend are data
//! properties and always surface as [`LinalgError`].

extern crate alloc;

use alloc::vec::Vec;

// region: ShapeDescriptor

/// Shape descriptor for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeDescriptor {
    dims: Vec<usize>,
}

impl ShapeDescriptor {
    pub fn from_slice(shape: &[usize]) -> Self {
        Self {
            dims: shape.to_vec(),
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.dims
    }
}

impl core::fmt::Display for ShapeDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[")?;
        for (i, &d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

// endregion: ShapeDescriptor

// region: ViewError

/// Contract violations detected while resolving slices or deriving views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// A slice step of zero.
    ZeroStep,
    /// The slice addresses no element in its step direction.
    EmptySlice {
        start: isize,
        end: isize,
        step: isize,
    },
    /// A slice bound falls outside `[0, size)` once negative values are normalized.
    SliceOutOfBounds { index: isize, size: usize },
    /// Slicing an axis of length zero.
    EmptyAxis,
    /// Operand shapes differ.
    ShapeMismatch {
        expected: ShapeDescriptor,
        got: ShapeDescriptor,
    },
    /// The operation needs a single uniform stride across the whole view.
    NotCoalesceable,
    /// The operation needs packed row-major elements.
    NotCompact,
    /// A requested shape that cannot hold the view.
    InvalidShape {
        shape: Vec<isize>,
        reason: &'static str,
    },
    /// A byte blob whose length is not `element_count * size_of::<T>()`.
    ByteCountMismatch { expected: usize, got: usize },
    /// Coordinate outside the axis.
    IndexOutOfBounds { index: usize, size: usize },
}

impl std::error::Error for ViewError {}

impl core::fmt::Display for ViewError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ViewError::ZeroStep => write!(f, "slice step cannot be zero"),
            ViewError::EmptySlice { start, end, step } => {
                write!(f, "empty slice {}:{}:{}", start, end, step)
            }
            ViewError::SliceOutOfBounds { index, size } => {
                write!(f, "slice bound {} out of range for axis of size {}", index, size)
            }
            ViewError::EmptyAxis => write!(f, "cannot slice an axis of size 0"),
            ViewError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {}, got {}", expected, got)
            }
            ViewError::NotCoalesceable => {
                write!(f, "view is not coalesceable, copy it first")
            }
            ViewError::NotCompact => write!(f, "view is not compact"),
            ViewError::InvalidShape { shape, reason } => {
                write!(f, "invalid shape {:?}: {}", shape, reason)
            }
            ViewError::ByteCountMismatch { expected, got } => {
                write!(f, "expected {} bytes of compact data, got {}", expected, got)
            }
            ViewError::IndexOutOfBounds { index, size } => {
                write!(f, "index {} out of bounds for size {}", index, size)
            }
        }
    }
}

impl ViewError {
    pub(crate) fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        ViewError::ShapeMismatch {
            expected: ShapeDescriptor::from_slice(expected),
            got: ShapeDescriptor::from_slice(got),
        }
    }
}

// endregion: ViewError

// region: LinalgError

/// Failures reported by the factorization and least-squares kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinalgError {
    /// The backend rejected its `index`-th argument (1-based).
    IllegalArgument { routine: &'static str, index: usize },
    /// The triangular factor has an exact zero on its `index`-th diagonal entry (1-based).
    ZeroFactor { index: usize },
    /// The matrix cannot be inverted.
    SingularMatrix,
}

impl std::error::Error for LinalgError {}

impl core::fmt::Display for LinalgError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinalgError::IllegalArgument { routine, index } => {
                write!(f, "{}: illegal value for argument {}", routine, index)
            }
            LinalgError::ZeroFactor { index } => {
                write!(f, "zero diagonal factor at position {}", index)
            }
            LinalgError::SingularMatrix => write!(f, "matrix is singular"),
        }
    }
}

// endregion: LinalgError

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_error_display() {
        let err = ViewError::shape_mismatch(&[3, 4], &[4, 3]);
        assert_eq!(format!("{}", err), "shape mismatch: expected [3, 4], got [4, 3]");

        let err = ViewError::EmptySlice {
            start: 3,
            end: 3,
            step: 1,
        };
        assert_eq!(format!("{}", err), "empty slice 3:3:1");
    }

    #[test]
    fn linalg_error_display() {
        let err = LinalgError::IllegalArgument {
            routine: "gels",
            index: 5,
        };
        assert_eq!(format!("{}", err), "gels: illegal value for argument 5");
        assert_eq!(format!("{}", LinalgError::SingularMatrix), "matrix is singular");
    }
}
