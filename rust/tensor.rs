//! Rank-N views.
//!
//! This module provides:
//!
//! - [`Tensor`]: a view with any number of axes over shared storage
//! - [`Axis`](crate::Axis) selectors: keep, collapse, sub-range or insert an axis
//! - reshaping of coalesceable tensors, with one inferred `-1` dimension
//!
//! # Example
//!
//! ```rust
//! use nstrided::{Axis, StridedView, Tensor};
//!
//! let t = Tensor::<f32>::zeros(&[2, 2, 2]);
//! let picked = t.slice(&[Axis::All, Axis::Index(1), Axis::NewAxis, Axis::All, Axis::NewAxis]);
//! assert_eq!(picked.shape(), vec![2, 1, 2, 1]);
//! ```

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::error::ViewError;
use crate::layout::{GenericSlice, QuadraticSlice, ResolvedLayout};
use crate::matrix::Matrix;
use crate::slice::{Axis, ResolvedSlice};
use crate::storage::{GenericAccess, Storage};
use crate::value::{Numeric, Value};
use crate::vector::Vector;
use crate::view::{fmt_view, StridedView};

/// Resolves one optional `-1` in `shape` so that the dimensions multiply to `count`.
pub(crate) fn infer_shape(shape: &[isize], count: usize) -> Result<Vec<usize>, ViewError> {
    let invalid = |reason| ViewError::InvalidShape {
        shape: shape.to_vec(),
        reason,
    };
    if shape.is_empty() {
        return Err(invalid("at least one axis must remain"));
    }
    let wildcards = shape.iter().filter(|&&d| d == -1).count();
    if wildcards > 1 {
        return Err(invalid("only one dimension can be inferred"));
    }
    if shape.iter().any(|&d| d < -1) {
        return Err(invalid("negative dimension"));
    }
    let known: usize = shape.iter().filter(|&&d| d != -1).map(|&d| d as usize).product();
    let inferred = if wildcards == 1 {
        if known == 0 || count % known != 0 {
            return Err(invalid("element count is not divisible by the known dimensions"));
        }
        count / known
    } else {
        if known != count {
            return Err(invalid("element count does not match"));
        }
        0
    };
    Ok(shape
        .iter()
        .map(|&d| if d == -1 { inferred } else { d as usize })
        .collect())
}

/// Slice of a new length-1 axis inserted at `axis` of `components`.
fn new_axis_component(components: &[ResolvedSlice], axis: usize) -> ResolvedSlice {
    let step = match components.get(axis) {
        Some(next) => next.step() * next.count() as isize,
        None => components.last().map(ResolvedSlice::step).unwrap_or(1),
    };
    ResolvedSlice::new(0, 1, step)
}

/// An N-dimensional strided window over shared storage.
#[derive(Clone)]
pub struct Tensor<T> {
    storage: Rc<Storage<T>>,
    slice: GenericSlice,
}

impl<T: Value> StridedView for Tensor<T> {
    type Element = T;
    type Layout = GenericSlice;
    type Access<'a> = GenericAccess<'a, T>;
    type Rebind<U: Value> = Tensor<U>;

    fn from_parts(storage: Rc<Storage<T>>, layout: GenericSlice) -> Self {
        Self {
            storage,
            slice: layout,
        }
    }

    fn storage(&self) -> &Rc<Storage<T>> {
        &self.storage
    }

    fn layout(&self) -> &GenericSlice {
        &self.slice
    }

    fn with_storage_access<'s, R>(&'s self, body: impl FnOnce(GenericAccess<'s, T>) -> R) -> R {
        body(GenericAccess::new(&self.storage, &self.slice))
    }
}

impl<T: Value> Tensor<T> {
    pub fn new(shape: &[usize]) -> Self {
        Self::filled(T::default(), shape)
    }

    pub fn filled(value: T, shape: &[usize]) -> Self {
        Self::filled_shape(value, shape)
    }

    #[track_caller]
    pub fn from_row_major(values: Vec<T>, shape: &[usize]) -> Self {
        Self::try_from_row_major(values, shape).unwrap_or_else(|err| panic!("{}", err))
    }

    pub fn from_fn(shape: &[usize], mut generator: impl FnMut(&[usize]) -> T) -> Self {
        let layout = GenericSlice::packed(shape);
        let values = layout.indices().map(|index| generator(&index)).collect();
        Self::from_parts(Rc::new(Storage::from_vec(values)), layout)
    }

    pub(crate) fn from_components(storage: Rc<Storage<T>>, components: Vec<ResolvedSlice>) -> Self {
        Self::from_parts(storage, GenericSlice::new(components))
    }

    #[track_caller]
    pub fn get(&self, index: &[usize]) -> T {
        self.get_at(index)
    }

    #[track_caller]
    pub fn set(&self, index: &[usize], value: T) {
        self.set_at(index, value)
    }

    // region: Selection

    /// Applies one selector per axis; missing trailing selectors keep their axes.
    pub fn try_slice(&self, selectors: &[Axis]) -> Result<Self, ViewError> {
        let components = self.slice.as_slice();
        let consumed = selectors.iter().filter(|s| !matches!(s, Axis::NewAxis)).count();
        if consumed > components.len() {
            return Err(ViewError::InvalidShape {
                shape: self.shape().iter().map(|&d| d as isize).collect(),
                reason: "more selectors than axes",
            });
        }

        let mut kept = Vec::with_capacity(components.len());
        let mut new_axes = Vec::new();
        let mut offset = 0usize;
        let mut axis = 0usize;
        for selector in selectors {
            match *selector {
                Axis::NewAxis => {
                    new_axes.push(kept.len() + new_axes.len());
                    continue;
                }
                Axis::All => kept.push(components[axis]),
                Axis::Range(slice) => kept.push(slice.try_resolve_within(&components[axis])?),
                Axis::Index(index) => {
                    let size = components[axis].count();
                    let normalized = if index < 0 { index + size as isize } else { index };
                    if normalized < 0 || normalized as usize >= size {
                        return Err(ViewError::SliceOutOfBounds { index, size });
                    }
                    offset += components[axis].position(normalized as usize);
                }
            }
            axis += 1;
        }
        kept.extend_from_slice(&components[axis..]);

        for at in new_axes {
            let component = new_axis_component(&kept, at);
            kept.insert(at, component);
        }
        let first = kept.first_mut().ok_or(ViewError::InvalidShape {
            shape: Vec::new(),
            reason: "at least one axis must remain",
        })?;
        *first = ResolvedSlice::new(first.start() + offset, first.count(), first.step());
        Ok(Self::from_components(self.storage.clone(), kept))
    }

    #[track_caller]
    pub fn slice(&self, selectors: &[Axis]) -> Self {
        self.try_slice(selectors).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Same elements with a length-1 axis inserted before `axis`.
    pub fn try_inserting_new_axis(&self, axis: usize) -> Result<Self, ViewError> {
        let mut components = self.slice.components();
        if axis > components.len() {
            return Err(ViewError::IndexOutOfBounds {
                index: axis,
                size: components.len() + 1,
            });
        }
        let component = new_axis_component(&components, axis);
        components.insert(axis, component);
        Ok(Self::from_components(self.storage.clone(), components))
    }

    #[track_caller]
    pub fn inserting_new_axis(&self, axis: usize) -> Self {
        self.try_inserting_new_axis(axis).unwrap_or_else(|err| panic!("{}", err))
    }

    // endregion: Selection

    // region: Reshaping

    /// Same elements under `shape`, where one dimension may be `-1`.
    pub fn try_reshaping(&self, shape: &[isize]) -> Result<Self, ViewError> {
        if !self.coalesceable() {
            return Err(ViewError::NotCoalesceable);
        }
        let shape = infer_shape(shape, self.len())?;
        let step = self.slice.as_slice().last().map(ResolvedSlice::step).unwrap_or(1);
        let mut components = Vec::with_capacity(shape.len());
        let mut running = step;
        for &count in shape.iter().rev() {
            components.push(ResolvedSlice::new(0, count, running));
            running *= count as isize;
        }
        components.reverse();
        components[0] = ResolvedSlice::new(self.slice.base(), components[0].count(), components[0].step());
        Ok(Self::from_components(self.storage.clone(), components))
    }

    #[track_caller]
    pub fn reshaping(&self, shape: &[isize]) -> Self {
        self.try_reshaping(shape).unwrap_or_else(|err| panic!("{}", err))
    }

    /// The same view as a matrix, when it has two axes.
    pub fn try_as_matrix(&self) -> Result<Matrix<T>, ViewError> {
        match self.slice.as_slice() {
            [row, column] => Ok(Matrix::from_parts(self.storage.clone(), QuadraticSlice::new(*row, *column))),
            _ => Err(ViewError::shape_mismatch(&[self.len(), 1], &self.shape())),
        }
    }

    #[track_caller]
    pub fn as_matrix(&self) -> Matrix<T> {
        self.try_as_matrix().unwrap_or_else(|err| panic!("{}", err))
    }

    /// The same view as a vector, when it has one axis.
    pub fn try_as_vector(&self) -> Result<Vector<T>, ViewError> {
        match self.slice.as_slice() {
            [axis] => Ok(Vector::from_parts(self.storage.clone(), *axis)),
            _ => Err(ViewError::shape_mismatch(&[self.len()], &self.shape())),
        }
    }

    #[track_caller]
    pub fn as_vector(&self) -> Vector<T> {
        self.try_as_vector().unwrap_or_else(|err| panic!("{}", err))
    }

    // endregion: Reshaping
}

impl<T: Numeric> Tensor<T> {
    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(T::ZERO, shape)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::filled(T::ONE, shape)
    }
}

impl<T: Value> From<Vector<T>> for Tensor<T> {
    fn from(vector: Vector<T>) -> Self {
        vector.as_tensor()
    }
}

impl<T: Value> From<Matrix<T>> for Tensor<T> {
    fn from(matrix: Matrix<T>) -> Self {
        matrix.as_tensor()
    }
}

impl<T: Value> core::fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_view(self, f)
    }
}

impl<T: Value> core::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tensor")
            .field("slice", &self.slice)
            .field("values", &self.to_vec())
            .finish()
    }
}
