//! Rank-1 views.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::error::ViewError;
use crate::layout::QuadraticSlice;
use crate::matrix::Matrix;
use crate::slice::{ResolvedSlice, SliceExpression};
use crate::storage::{LinearAccess, Storage};
use crate::tensor::Tensor;
use crate::value::{Numeric, Value};
use crate::view::{fmt_view, StridedView};

/// A strided run of elements over shared storage.
///
/// ```rust
/// use nstrided::{Slice, StridedView, Vector};
///
/// let v = Vector::from_vec(vec![0.0f32, 1.0, 2.0, 3.0, 4.0]);
/// let odd = v.slice(Slice::starting_step(1, 2));
/// odd.fill(-1.0);
/// assert_eq!(v.to_vec(), vec![0.0, -1.0, 2.0, -1.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct Vector<T> {
    storage: Rc<Storage<T>>,
    slice: ResolvedSlice,
}

impl<T: Value> StridedView for Vector<T> {
    type Element = T;
    type Layout = ResolvedSlice;
    type Access<'a> = LinearAccess<'a, T>;
    type Rebind<U: Value> = Vector<U>;

    fn from_parts(storage: Rc<Storage<T>>, layout: ResolvedSlice) -> Self {
        Self {
            storage,
            slice: layout,
        }
    }

    fn storage(&self) -> &Rc<Storage<T>> {
        &self.storage
    }

    fn layout(&self) -> &ResolvedSlice {
        &self.slice
    }

    fn with_storage_access<'s, R>(&'s self, body: impl FnOnce(LinearAccess<'s, T>) -> R) -> R {
        body(LinearAccess::new(&self.storage, &self.slice))
    }
}

impl<T: Value> Vector<T> {
    /// `size` elements set to `T::default()`.
    pub fn new(size: usize) -> Self {
        Self::filled(T::default(), size)
    }

    pub fn filled(value: T, size: usize) -> Self {
        Self::filled_shape(value, &[size])
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        let slice = ResolvedSlice::full(values.len());
        Self::from_parts(Rc::new(Storage::from_vec(values)), slice)
    }

    pub fn from_fn(size: usize, generator: impl FnMut(usize) -> T) -> Self {
        Self::from_vec((0..size).map(generator).collect())
    }

    pub fn size(&self) -> usize {
        self.slice.count()
    }

    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        self.element(&index)
    }

    #[track_caller]
    pub fn set(&self, index: usize, value: T) {
        self.set_element(&index, value)
    }

    #[track_caller]
    pub fn first(&self) -> T {
        self.get(0)
    }

    #[track_caller]
    pub fn last(&self) -> T {
        self.get(self.size().wrapping_sub(1))
    }

    /// Same-storage view of the addressed sub-range.
    pub fn try_slice(&self, slice: impl SliceExpression) -> Result<Self, ViewError> {
        let resolved = slice.to_slice().try_resolve_within(&self.slice)?;
        Ok(Self::from_parts(self.storage.clone(), resolved))
    }

    #[track_caller]
    pub fn slice(&self, slice: impl SliceExpression) -> Self {
        self.try_slice(slice).unwrap_or_else(|err| panic!("{}", err))
    }

    /// `1 × size` matrix over the same elements.
    pub fn as_matrix(&self) -> Matrix<T> {
        let row = ResolvedSlice::new(0, 1, self.slice.step() * self.size().max(1) as isize);
        Matrix::from_parts(self.storage.clone(), QuadraticSlice::new(row, self.slice))
    }

    /// `size × 1` matrix over the same elements.
    pub fn as_column(&self) -> Matrix<T> {
        let column = ResolvedSlice::new(0, 1, self.slice.step());
        Matrix::from_parts(self.storage.clone(), QuadraticSlice::new(self.slice, column))
    }

    /// Rank-1 tensor over the same elements.
    pub fn as_tensor(&self) -> Tensor<T> {
        Tensor::from_components(self.storage.clone(), alloc::vec![self.slice])
    }

    /// Elements at `indices`, in order.
    pub fn try_gather_indices(&self, indices: &Vector<usize>) -> Result<Self, ViewError> {
        let indices = indices.to_vec();
        self.check_indices(&indices)?;
        Ok(Self::from_vec(indices.into_iter().map(|i| self.get(i)).collect()))
    }

    #[track_caller]
    pub fn gather_indices(&self, indices: &Vector<usize>) -> Self {
        self.try_gather_indices(indices).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Writes `values[k]` to element `indices[k]`.
    pub fn try_scatter_indices(&self, indices: &Vector<usize>, values: &Vector<T>) -> Result<(), ViewError> {
        let indices = indices.to_vec();
        if indices.len() != values.size() {
            return Err(ViewError::shape_mismatch(&[indices.len()], &[values.size()]));
        }
        self.check_indices(&indices)?;
        for (index, value) in indices.into_iter().zip(values.to_vec()) {
            self.set(index, value);
        }
        Ok(())
    }

    #[track_caller]
    pub fn scatter_indices(&self, indices: &Vector<usize>, values: &Vector<T>) {
        self.try_scatter_indices(indices, values).unwrap_or_else(|err| panic!("{}", err))
    }

    fn check_indices(&self, indices: &[usize]) -> Result<(), ViewError> {
        match indices.iter().find(|&&i| i >= self.size()) {
            Some(&index) => Err(ViewError::IndexOutOfBounds {
                index,
                size: self.size(),
            }),
            None => Ok(()),
        }
    }
}

impl<T: Numeric> Vector<T> {
    pub fn zeros(size: usize) -> Self {
        Self::filled(T::ZERO, size)
    }

    pub fn ones(size: usize) -> Self {
        Self::filled(T::ONE, size)
    }
}

impl<T: Value> From<Vec<T>> for Vector<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}

impl<T: Value> core::fmt::Display for Vector<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_view(self, f)
    }
}

impl<T: Value> core::fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Vector")
            .field("slice", &self.slice)
            .field("values", &self.to_vec())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ResolvedLayout;
    use crate::slice::Slice;

    #[test]
    fn slices_alias_storage() {
        let v = Vector::<f32>::zeros(10);
        v.ramp();
        let tail = v.slice(Slice::starting(-3));
        assert_eq!(tail.to_vec(), vec![7.0, 8.0, 9.0]);

        let reversed = v.slice(Slice::FLIP).slice(Slice::stepped(3));
        assert_eq!(reversed.to_vec(), vec![9.0, 6.0, 3.0, 0.0]);
        reversed.fill(-1.0);
        assert_eq!(v.get(6), -1.0);
        assert_eq!(v.last(), -1.0);
        assert_eq!(v.first(), -1.0);
        assert_eq!(v.get(1), 1.0);
    }

    #[test]
    fn bad_slices_are_reported() {
        let v = Vector::<f32>::zeros(4);
        assert!(v.try_slice(Slice::range(2, 2)).is_err());
        assert!(v.try_slice(Slice::stepped(0)).is_err());
        assert!(v.try_slice(4isize..).is_err());
    }

    #[test]
    fn as_matrix_shares_storage() {
        let v = Vector::<f64>::zeros(12);
        v.ramp();
        let m = v.slice(Slice::stepped(2)).as_matrix();
        assert_eq!(m.shape(), vec![1, 6]);
        assert!(m.coalesceable() && !m.compact());
        m.set(0, 5, 0.5);
        assert_eq!(v.get(10), 0.5);
    }

    #[test]
    fn as_column_round_trips_strided_vectors() {
        let v = Vector::<f64>::zeros(10);
        v.ramp();
        let every_third = v.slice(Slice::stepped(3));
        let column = every_third.as_column();
        assert_eq!(column.shape(), vec![4, 1]);
        assert!(column.coalesceable());
        assert_eq!(column.as_vector().to_vec(), vec![0.0, 3.0, 6.0, 9.0]);
        column.set(3, 0, -9.0);
        assert_eq!(v.get(9), -9.0);

        let empty = Vector::<f64>::zeros(0);
        let row = empty.as_matrix();
        assert_eq!(row.shape(), vec![1, 0]);
        assert_ne!(row.layout().steps()[0], 0);
        assert!(row.is_empty());
    }

    #[test]
    fn index_gather_scatter() {
        let v = Vector::from_vec(vec![10i32, 11, 12, 13]);
        let picks = Vector::from_vec(vec![3usize, 0, 3]);
        assert_eq!(v.gather_indices(&picks).to_vec(), vec![13, 10, 13]);

        let targets = Vector::from_vec(vec![1usize, 2]);
        v.scatter_indices(&targets, &Vector::from_vec(vec![0, -1]));
        assert_eq!(v.to_vec(), vec![10, 0, -1, 13]);
        assert_eq!(
            v.try_gather_indices(&Vector::from_vec(vec![4usize])).map(|g| g.size()),
            Err(ViewError::IndexOutOfBounds { index: 4, size: 4 })
        );
    }
}
