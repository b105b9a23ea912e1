//! Rank-2 views.
//!
//! Rows and columns of a [`Matrix`] are [`Vector`]s over the same storage, [`Matrix::t`] swaps the
//! two axes without moving data, and [`Matrix::reshaping`] reinterprets any coalesceable matrix
//! under a new `rows × columns` split.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::error::ViewError;
use crate::layout::{QuadraticIndex, QuadraticSlice};
use crate::slice::{ResolvedSlice, SliceExpression};
use crate::storage::{QuadraticAccess, Storage};
use crate::tensor::Tensor;
use crate::value::{Numeric, Value};
use crate::vector::Vector;
use crate::view::{fmt_view, StridedView};

/// A `rows × columns` strided window over shared storage.
#[derive(Clone)]
pub struct Matrix<T> {
    storage: Rc<Storage<T>>,
    slice: QuadraticSlice,
}

impl<T: Value> StridedView for Matrix<T> {
    type Element = T;
    type Layout = QuadraticSlice;
    type Access<'a> = QuadraticAccess<'a, T>;
    type Rebind<U: Value> = Matrix<U>;

    fn from_parts(storage: Rc<Storage<T>>, layout: QuadraticSlice) -> Self {
        Self {
            storage,
            slice: layout,
        }
    }

    fn storage(&self) -> &Rc<Storage<T>> {
        &self.storage
    }

    fn layout(&self) -> &QuadraticSlice {
        &self.slice
    }

    fn with_storage_access<'s, R>(&'s self, body: impl FnOnce(QuadraticAccess<'s, T>) -> R) -> R {
        body(QuadraticAccess::new(&self.storage, &self.slice))
    }
}

impl<T: Value> Matrix<T> {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::filled(T::default(), rows, columns)
    }

    pub fn filled(value: T, rows: usize, columns: usize) -> Self {
        Self::filled_shape(value, &[rows, columns])
    }

    #[track_caller]
    pub fn from_row_major(values: Vec<T>, rows: usize, columns: usize) -> Self {
        Self::try_from_row_major(values, &[rows, columns]).unwrap_or_else(|err| panic!("{}", err))
    }

    pub fn from_fn(rows: usize, columns: usize, mut generator: impl FnMut(usize, usize) -> T) -> Self {
        let values = (0..rows * columns).map(|i| generator(i / columns, i % columns)).collect();
        Self::from_parts(
            Rc::new(Storage::from_vec(values)),
            QuadraticSlice::packed(rows, columns),
        )
    }

    pub fn rows(&self) -> usize {
        self.slice.rows()
    }

    pub fn columns(&self) -> usize {
        self.slice.columns()
    }

    #[track_caller]
    pub fn get(&self, row: usize, column: usize) -> T {
        self.element(&QuadraticIndex::new(row, column))
    }

    #[track_caller]
    pub fn set(&self, row: usize, column: usize, value: T) {
        self.set_element(&QuadraticIndex::new(row, column), value)
    }

    // region: Slicing

    pub fn try_slice(&self, rows: impl SliceExpression, columns: impl SliceExpression) -> Result<Self, ViewError> {
        let row = rows.to_slice().try_resolve_within(&self.slice.row)?;
        let column = columns.to_slice().try_resolve_within(&self.slice.column)?;
        Ok(Self::from_parts(self.storage.clone(), QuadraticSlice::new(row, column)))
    }

    #[track_caller]
    pub fn slice(&self, rows: impl SliceExpression, columns: impl SliceExpression) -> Self {
        self.try_slice(rows, columns).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Row `index` as a vector over the same storage.
    #[track_caller]
    pub fn row(&self, index: usize) -> Vector<T> {
        assert!(index < self.rows(), "row {} out of bounds for {} rows", index, self.rows());
        let start = self.slice.row.position(index) + self.slice.column.start();
        Vector::from_parts(
            self.storage.clone(),
            ResolvedSlice::new(start, self.columns(), self.slice.column.step()),
        )
    }

    /// Column `index` as a vector over the same storage.
    #[track_caller]
    pub fn column(&self, index: usize) -> Vector<T> {
        assert!(index < self.columns(), "column {} out of bounds for {} columns", index, self.columns());
        let start = self.slice.row.start() + self.slice.column.position(index);
        Vector::from_parts(
            self.storage.clone(),
            ResolvedSlice::new(start, self.rows(), self.slice.row.step()),
        )
    }

    /// Part of row `index` selected by `columns`.
    #[track_caller]
    pub fn row_slice(&self, index: usize, columns: impl SliceExpression) -> Vector<T> {
        self.row(index).slice(columns)
    }

    /// Part of column `index` selected by `rows`.
    #[track_caller]
    pub fn column_slice(&self, rows: impl SliceExpression, index: usize) -> Vector<T> {
        self.column(index).slice(rows)
    }

    #[track_caller]
    pub fn set_row(&self, index: usize, values: &Vector<T>) {
        self.row(index).assign(values)
    }

    #[track_caller]
    pub fn set_column(&self, index: usize, values: &Vector<T>) {
        self.column(index).assign(values)
    }

    // endregion: Slicing

    // region: Reshaping

    /// Axes swapped over the same storage.
    pub fn t(&self) -> Self {
        Self::from_parts(self.storage.clone(), self.slice.transposed())
    }

    /// Packed copy of the transpose.
    pub fn transposed(&self) -> Self {
        self.t().copy()
    }

    /// All elements as one vector over the same storage.
    pub fn try_as_vector(&self) -> Result<Vector<T>, ViewError> {
        if !self.coalesceable() {
            return Err(ViewError::NotCoalesceable);
        }
        let start = self.slice.row.start() + self.slice.column.start();
        Ok(Vector::from_parts(
            self.storage.clone(),
            ResolvedSlice::new(start, self.len(), self.slice.column.step()),
        ))
    }

    #[track_caller]
    pub fn as_vector(&self) -> Vector<T> {
        self.try_as_vector().unwrap_or_else(|err| panic!("{}", err))
    }

    /// Same elements split into `rows × columns`; one of the two may be `-1`.
    pub fn try_reshaping(&self, rows: isize, columns: isize) -> Result<Self, ViewError> {
        if !self.coalesceable() {
            return Err(ViewError::NotCoalesceable);
        }
        let shape = crate::tensor::infer_shape(&[rows, columns], self.len())?;
        let (rows, columns) = (shape[0], shape[1]);
        let step = self.slice.column.step();
        let column = ResolvedSlice::new(self.slice.column.start(), columns, step);
        let row = ResolvedSlice::new(self.slice.row.start(), rows, step * columns as isize);
        Ok(Self::from_parts(self.storage.clone(), QuadraticSlice::new(row, column)))
    }

    #[track_caller]
    pub fn reshaping(&self, rows: isize, columns: isize) -> Self {
        self.try_reshaping(rows, columns).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Packed `1 × len` copy.
    pub fn flatten(&self) -> Self {
        self.copy().reshaping(1, -1)
    }

    /// Rank-2 tensor over the same storage.
    pub fn as_tensor(&self) -> Tensor<T> {
        Tensor::from_components(self.storage.clone(), alloc::vec![self.slice.row, self.slice.column])
    }

    // endregion: Reshaping

    // region: Coordinates

    /// Elements at the `(row, column)` pairs held by the rows of an `N × 2` matrix.
    pub fn try_gather_coordinates(&self, coordinates: &Matrix<usize>) -> Result<Vector<T>, ViewError> {
        let coordinates = self.check_coordinates(coordinates)?;
        Ok(Vector::from_vec(coordinates.into_iter().map(|(r, c)| self.get(r, c)).collect()))
    }

    #[track_caller]
    pub fn gather_coordinates(&self, coordinates: &Matrix<usize>) -> Vector<T> {
        self.try_gather_coordinates(coordinates).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Writes `values[k]` at the coordinates held by row `k`.
    pub fn try_scatter_coordinates(&self, coordinates: &Matrix<usize>, values: &Vector<T>) -> Result<(), ViewError> {
        let coordinates = self.check_coordinates(coordinates)?;
        if coordinates.len() != values.size() {
            return Err(ViewError::shape_mismatch(&[coordinates.len()], &[values.size()]));
        }
        for ((row, column), value) in coordinates.into_iter().zip(values.to_vec()) {
            self.set(row, column, value);
        }
        Ok(())
    }

    #[track_caller]
    pub fn scatter_coordinates(&self, coordinates: &Matrix<usize>, values: &Vector<T>) {
        self.try_scatter_coordinates(coordinates, values).unwrap_or_else(|err| panic!("{}", err))
    }

    fn check_coordinates(&self, coordinates: &Matrix<usize>) -> Result<Vec<(usize, usize)>, ViewError> {
        if coordinates.columns() != 2 {
            return Err(ViewError::shape_mismatch(&[coordinates.rows(), 2], &coordinates.shape()));
        }
        let pairs: Vec<(usize, usize)> = (0..coordinates.rows())
            .map(|k| (coordinates.get(k, 0), coordinates.get(k, 1)))
            .collect();
        for &(row, column) in &pairs {
            if row >= self.rows() {
                return Err(ViewError::IndexOutOfBounds {
                    index: row,
                    size: self.rows(),
                });
            }
            if column >= self.columns() {
                return Err(ViewError::IndexOutOfBounds {
                    index: column,
                    size: self.columns(),
                });
            }
        }
        Ok(pairs)
    }

    // endregion: Coordinates
}

impl<T: Numeric> Matrix<T> {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self::filled(T::ZERO, rows, columns)
    }

    pub fn ones(rows: usize, columns: usize) -> Self {
        Self::filled(T::ONE, rows, columns)
    }

    /// `size × size` identity.
    pub fn identity(size: usize) -> Self {
        Self::from_fn(size, size, |r, c| if r == c { T::ONE } else { T::ZERO })
    }
}

impl<T: Value> core::fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_view(self, f)
    }
}

impl<T: Value> core::fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Matrix")
            .field("slice", &self.slice)
            .field("values", &self.to_vec())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Arithmetic;
    use crate::slice::Slice;

    fn ramp(rows: usize, columns: usize) -> Matrix<f32> {
        let m = Matrix::zeros(rows, columns);
        m.ramp();
        m
    }

    #[test]
    fn strided_slice_set() {
        let m = Matrix::<f32>::zeros(3, 4);
        m.slice(Slice::range_step(0, 3, 2), Slice::range_step(0, 3, 2)).fill(1.5);
        for index in m.indices() {
            let expected = if index.row % 2 == 0 && index.column % 2 == 0 && index.column < 3 {
                1.5
            } else {
                0.0
            };
            assert_eq!(m.element(&index), expected, "{:?}", index);
        }
    }

    #[test]
    fn rows_and_columns_alias() {
        let m = ramp(3, 4);
        assert_eq!(m.row(1).to_vec(), vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(m.column(2).to_vec(), vec![2.0, 6.0, 10.0]);
        assert_eq!(m.row_slice(2, Slice::FLIP).to_vec(), vec![11.0, 10.0, 9.0, 8.0]);
        assert_eq!(m.column_slice(1isize.., 3).to_vec(), vec![7.0, 11.0]);

        m.set_column(0, &Vector::from_vec(vec![-1.0, -2.0, -3.0]));
        assert_eq!(m.get(2, 0), -3.0);
        m.t().set_row(3, &Vector::zeros(3));
        assert_eq!(m.column(3).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn reshaping_requires_coalesceable() {
        let v = Vector::<f32>::zeros(12);
        v.ramp();
        let m = v.as_matrix().reshaping(3, 4);
        assert!((v.mean() - 5.5).abs() < 1e-6);
        m.set(1, 3, 36.0);
        assert_eq!(v.get(7), 36.0);

        let wild = m.reshaping(-1, 6);
        assert_eq!(wild.shape(), vec![2, 6]);
        assert!(m.try_reshaping(5, -1).is_err());

        let block = ramp(3, 4).slice(.., 1isize..3);
        assert_eq!(block.try_reshaping(2, 3).map(|m| m.shape()), Err(ViewError::NotCoalesceable));
        assert_eq!(block.flatten().to_vec(), vec![1.0, 2.0, 5.0, 6.0, 9.0, 10.0]);
        assert_eq!(block.flatten().shape(), vec![1, 6]);
    }

    #[test]
    fn transpose_views() {
        let m = Matrix::from_row_major(
            vec![1.0f32, 2.0, 3.0, 1.0, -2.0, 3.0, 1.0, 2.0, 1.0, -1.0, 2.0, 1.0],
            4,
            3,
        );
        let picked = m.slice(Slice::range(0, 4), Slice::range_step(0, 3, 2)).transposed();
        assert!(picked.is_equal(&Matrix::from_row_major(vec![1.0, 1.0, 1.0, -1.0, 3.0, 3.0, 1.0, 1.0], 2, 4), 0.0));

        let soft = m.t();
        assert!(soft.aliases(&m) && !soft.coalesceable());
        assert!(soft.try_as_vector().is_err());
        assert_eq!(m.as_vector().size(), 12);
    }

    #[test]
    fn coordinate_gather() {
        let m = ramp(3, 3);
        let coordinates = Matrix::from_row_major(vec![0usize, 0, 2, 1, 1, 2], 3, 2);
        assert_eq!(m.gather_coordinates(&coordinates).to_vec(), vec![0.0, 7.0, 5.0]);
        m.scatter_coordinates(&coordinates, &Vector::ones(3));
        assert_eq!(m.get(2, 1), 1.0);
        let outside = Matrix::from_row_major(vec![3usize, 0], 1, 2);
        assert!(m.try_gather_coordinates(&outside).is_err());
    }
}
