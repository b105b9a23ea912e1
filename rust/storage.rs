//! Shared element buffers and scoped strided access to them.
//!
//! A [`Storage`] is a flat run of [`Cell`]s, either allocated here or borrowed from foreign memory
//! that an owner value keeps alive. Views hold it behind an `Rc`, so several views may alias the
//! same elements and every mutation goes through `&self`.
//!
//! Backends never see a view. They see an access value built for the extent of one call:
//!
//! - [`LinearAccess`]: one span `(base, stride, count)`.
//! - [`QuadraticAccess`]: rows and columns, each with its own stride.
//! - [`GenericAccess`]: any number of axes.
//!
//! All three implement [`StorageAccess`], whose [`linearized`](StorageAccess::linearized) splits
//! the addressed elements into as few [`LinearAccess`] spans as the strides allow.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::Cell;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::layout::{is_coalesceable, is_compact, GenericSlice, QuadraticSlice, ResolvedLayout};
use crate::slice::ResolvedSlice;
use crate::value::Value;

// region: Storage

enum Allocation<T> {
    Owned(Box<[Cell<T>]>),
    External {
        base: NonNull<T>,
        count: usize,
        _owner: Box<dyn Any>,
    },
}

/// Flat element buffer shared by every view created over it.
pub struct Storage<T> {
    allocation: Allocation<T>,
}

impl<T: Value> Storage<T> {
    /// `count` elements set to `T::default()`.
    pub fn new(count: usize) -> Self {
        Self::filled(count, T::default())
    }

    pub fn filled(count: usize, value: T) -> Self {
        Self {
            allocation: Allocation::Owned((0..count).map(|_| Cell::new(value)).collect()),
        }
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Self {
            allocation: Allocation::Owned(values.into_iter().map(Cell::new).collect()),
        }
    }

    /// Wraps `count` foreign elements starting at `base`, keeping `owner` alive until the storage
    /// is dropped. The memory itself is never freed here.
    ///
    /// # Safety
    ///
    /// `base` must be valid for reads and writes of `count` elements for as long as `owner` lives,
    /// and nothing outside this storage may access that memory while the storage exists.
    pub unsafe fn from_raw_parts(base: NonNull<T>, count: usize, owner: impl Any) -> Self {
        Self {
            allocation: Allocation::External {
                base,
                count,
                _owner: Box::new(owner),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.cells().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer was allocated by this storage.
    pub fn is_owned(&self) -> bool {
        matches!(self.allocation, Allocation::Owned(_))
    }

    pub fn cells(&self) -> &[Cell<T>] {
        match &self.allocation {
            Allocation::Owned(cells) => cells,
            // SAFETY: `Cell<T>` has the layout of `T`, and `from_raw_parts` guarantees the region.
            Allocation::External { base, count, .. } => unsafe {
                core::slice::from_raw_parts(base.as_ptr() as *const Cell<T>, *count)
            },
        }
    }

    #[inline]
    #[track_caller]
    pub fn get(&self, position: usize) -> T {
        self.cells()[position].get()
    }

    #[inline]
    #[track_caller]
    pub fn set(&self, position: usize, value: T) {
        self.cells()[position].set(value)
    }

    /// Runs `body` with the raw buffer. The pointer must not outlive the call.
    pub fn with_unsafe_access<R>(&self, body: impl FnOnce(RawAccess<'_, T>) -> R) -> R {
        body(RawAccess {
            base: self.base_ptr(),
            count: self.len(),
            _marker: PhantomData,
        })
    }

    pub(crate) fn base_ptr(&self) -> *mut T {
        self.cells().as_ptr() as *mut T
    }
}

impl<T: Value> core::fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Storage")
            .field("count", &self.len())
            .field("owned", &self.is_owned())
            .finish()
    }
}

/// Raw pointer and length of a whole [`Storage`], valid inside [`Storage::with_unsafe_access`].
#[derive(Debug, Clone, Copy)]
pub struct RawAccess<'a, T> {
    base: *mut T,
    count: usize,
    _marker: PhantomData<&'a [Cell<T>]>,
}

impl<'a, T> RawAccess<'a, T> {
    pub fn as_ptr(&self) -> *const T {
        self.base
    }

    pub fn as_mut_ptr(&self) -> *mut T {
        self.base
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// endregion: Storage

// region: StorageAccess

/// Strided window of a storage valid for `'a`.
pub trait StorageAccess<'a, T: Value> {
    /// Address of the first addressed element.
    fn base(&self) -> *mut T;

    /// Per-axis element counts, outermost first.
    fn counts(&self) -> Vec<usize>;

    /// Per-axis strides in elements, outermost first.
    fn strides(&self) -> Vec<isize>;

    fn element_count(&self) -> usize {
        self.counts().iter().product()
    }

    fn compact(&self) -> bool {
        is_compact(&self.counts(), &self.strides())
    }

    fn coalesceable(&self) -> bool {
        is_coalesceable(&self.counts(), &self.strides())
    }

    /// The addressed elements as one packed buffer, only when [`compact`](Self::compact).
    fn compact_buffer(&self) -> Option<&'a [Cell<T>]> {
        if !self.compact() {
            return None;
        }
        let count = self.element_count();
        if count == 0 {
            return Some(&[]);
        }
        // SAFETY: a compact access addresses `count` consecutive cells of a storage borrowed for 'a.
        Some(unsafe { core::slice::from_raw_parts(self.base() as *const Cell<T>, count) })
    }

    /// Splits the access into spans sharing the innermost stride.
    ///
    /// With `coalesce` and a coalesceable access this is a single span over every element,
    /// otherwise one span per innermost row. An empty access yields nothing.
    fn linearized(&self, coalesce: bool) -> Linearized<'a, T> {
        Linearized::new(self.base(), &self.counts(), &self.strides(), coalesce)
    }
}

/// One strided span of a storage.
#[derive(Debug, Clone, Copy)]
pub struct LinearAccess<'a, T> {
    base: *mut T,
    stride: isize,
    count: usize,
    _marker: PhantomData<&'a [Cell<T>]>,
}

impl<'a, T: Value> LinearAccess<'a, T> {
    pub(crate) fn new(storage: &'a Storage<T>, slice: &ResolvedSlice) -> Self {
        debug_assert!(slice.count() == 0 || slice.last() < storage.len());
        Self {
            base: storage.base_ptr().wrapping_add(slice.start()),
            stride: slice.step(),
            count: slice.count(),
            _marker: PhantomData,
        }
    }

    pub fn stride(&self) -> isize {
        self.stride
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_ptr(&self) -> *const T {
        self.base
    }

    pub fn as_mut_ptr(&self) -> *mut T {
        self.base
    }

    #[inline]
    #[track_caller]
    pub fn cell(&self, index: usize) -> &'a Cell<T> {
        assert!(index < self.count, "span index {} out of {}", index, self.count);
        // SAFETY: every position of the span lies inside the storage borrowed for 'a.
        unsafe { &*(self.base.wrapping_offset(index as isize * self.stride) as *const Cell<T>) }
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.cell(index).get()
    }

    #[inline]
    pub fn set(&self, index: usize, value: T) {
        self.cell(index).set(value)
    }

    pub fn cells(&self) -> impl Iterator<Item = &'a Cell<T>> + 'a
    where
        T: 'a,
    {
        let span = *self;
        (0..span.count).map(move |i| span.cell(i))
    }

    pub fn values(&self) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
    {
        self.cells().map(Cell::get)
    }
}

impl<'a, T: Value> StorageAccess<'a, T> for LinearAccess<'a, T> {
    fn base(&self) -> *mut T {
        self.base
    }

    fn counts(&self) -> Vec<usize> {
        alloc::vec![self.count]
    }

    fn strides(&self) -> Vec<isize> {
        alloc::vec![self.stride]
    }

    fn element_count(&self) -> usize {
        self.count
    }

    fn compact(&self) -> bool {
        self.stride == 1
    }

    fn coalesceable(&self) -> bool {
        true
    }
}

/// Rows and columns of a storage, each with its own stride.
#[derive(Debug, Clone, Copy)]
pub struct QuadraticAccess<'a, T> {
    base: *mut T,
    row_stride: isize,
    column_stride: isize,
    rows: usize,
    columns: usize,
    _marker: PhantomData<&'a [Cell<T>]>,
}

impl<'a, T: Value> QuadraticAccess<'a, T> {
    pub(crate) fn new(storage: &'a Storage<T>, slice: &QuadraticSlice) -> Self {
        debug_assert!(slice.element_count() == 0 || slice.base() < storage.len());
        Self {
            base: storage.base_ptr().wrapping_add(slice.base()),
            row_stride: slice.row.step(),
            column_stride: slice.column.step(),
            rows: slice.rows(),
            columns: slice.columns(),
            _marker: PhantomData,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn row_stride(&self) -> isize {
        self.row_stride
    }

    pub fn column_stride(&self) -> isize {
        self.column_stride
    }

    /// Leading dimension when rows are packed, i.e. the column stride is 1.
    pub fn leading_dimension(&self) -> Option<usize> {
        (self.column_stride == 1 && self.row_stride >= self.columns as isize)
            .then_some(self.row_stride as usize)
    }
}

impl<'a, T: Value> StorageAccess<'a, T> for QuadraticAccess<'a, T> {
    fn base(&self) -> *mut T {
        self.base
    }

    fn counts(&self) -> Vec<usize> {
        alloc::vec![self.rows, self.columns]
    }

    fn strides(&self) -> Vec<isize> {
        alloc::vec![self.row_stride, self.column_stride]
    }
}

/// Arbitrary-rank window of a storage.
#[derive(Debug, Clone)]
pub struct GenericAccess<'a, T> {
    base: *mut T,
    counts: Vec<usize>,
    strides: Vec<isize>,
    _marker: PhantomData<&'a [Cell<T>]>,
}

impl<'a, T: Value> GenericAccess<'a, T> {
    pub(crate) fn new(storage: &'a Storage<T>, slice: &GenericSlice) -> Self {
        debug_assert!(slice.element_count() == 0 || slice.base() < storage.len());
        Self {
            base: storage.base_ptr().wrapping_add(slice.base()),
            counts: slice.shape(),
            strides: slice.steps(),
            _marker: PhantomData,
        }
    }

    pub fn rank(&self) -> usize {
        self.counts.len()
    }
}

impl<'a, T: Value> StorageAccess<'a, T> for GenericAccess<'a, T> {
    fn base(&self) -> *mut T {
        self.base
    }

    fn counts(&self) -> Vec<usize> {
        self.counts.clone()
    }

    fn strides(&self) -> Vec<isize> {
        self.strides.clone()
    }
}

// endregion: StorageAccess

// region: Linearized

/// Spans of an access in row-major order, see [`StorageAccess::linearized`].
#[derive(Debug, Clone)]
pub struct Linearized<'a, T> {
    base: *mut T,
    outer_counts: Vec<usize>,
    outer_strides: Vec<isize>,
    counters: Vec<usize>,
    offset: isize,
    stride: isize,
    count: usize,
    remaining: usize,
    _marker: PhantomData<&'a [Cell<T>]>,
}

impl<'a, T> Linearized<'a, T> {
    fn new(base: *mut T, counts: &[usize], strides: &[isize], coalesce: bool) -> Self {
        let total: usize = counts.iter().product();
        let rank = counts.len();
        let stride = strides.last().copied().unwrap_or(1);

        let (outer_counts, outer_strides, count, remaining) = if total == 0 {
            (Vec::new(), Vec::new(), 0, 0)
        } else if rank <= 1 || (coalesce && is_coalesceable(counts, strides)) {
            (Vec::new(), Vec::new(), total, 1)
        } else {
            let outer = &counts[..rank - 1];
            (
                outer.to_vec(),
                strides[..rank - 1].to_vec(),
                counts[rank - 1],
                outer.iter().product(),
            )
        };

        Self {
            base,
            counters: alloc::vec![0; outer_counts.len()],
            outer_counts,
            outer_strides,
            offset: 0,
            stride,
            count,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Linearized<'a, T> {
    type Item = LinearAccess<'a, T>;

    fn next(&mut self) -> Option<LinearAccess<'a, T>> {
        if self.remaining == 0 {
            return None;
        }
        let span = LinearAccess {
            base: self.base.wrapping_offset(self.offset),
            stride: self.stride,
            count: self.count,
            _marker: PhantomData,
        };
        self.remaining -= 1;
        for axis in (0..self.outer_counts.len()).rev() {
            self.counters[axis] += 1;
            self.offset += self.outer_strides[axis];
            if self.counters[axis] < self.outer_counts[axis] {
                break;
            }
            self.offset -= self.outer_strides[axis] * self.outer_counts[axis] as isize;
            self.counters[axis] = 0;
        }
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Linearized<'a, T> {}

// endregion: Linearized

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;

    fn ramp(count: usize) -> Storage<f32> {
        Storage::from_vec((0..count).map(|i| i as f32).collect())
    }

    fn span_values(span: &LinearAccess<'_, f32>) -> Vec<f32> {
        span.values().collect()
    }

    #[test]
    fn storage_get_set() {
        let storage = Storage::<f64>::new(4);
        assert_eq!(storage.len(), 4);
        assert_eq!(storage.get(3), 0.0);
        storage.set(3, 2.5);
        assert_eq!(storage.get(3), 2.5);
        storage.with_unsafe_access(|raw| {
            assert_eq!(raw.len(), 4);
            // SAFETY: index 3 is inside the 4-element buffer.
            assert_eq!(unsafe { *raw.as_ptr().add(3) }, 2.5);
        });
    }

    #[test]
    fn external_storage_keeps_owner_alive() {
        let marker = Rc::new(());
        let mut values = vec![1.0f32, 2.0, 3.0];
        let base = NonNull::new(values.as_mut_ptr()).unwrap();
        let storage = unsafe { Storage::from_raw_parts(base, 3, (values, marker.clone())) };

        assert!(!storage.is_owned());
        assert_eq!(Rc::strong_count(&marker), 2);
        storage.set(1, 20.0);
        assert_eq!(storage.get(1), 20.0);

        drop(storage);
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn linear_access_walks_negative_strides() {
        let storage = ramp(10);
        let access = LinearAccess::new(&storage, &ResolvedSlice::new(9, 4, -3));
        assert_eq!(span_values(&access), vec![9.0, 6.0, 3.0, 0.0]);
        assert!(!access.compact());
        assert!(access.compact_buffer().is_none());

        let spans: Vec<_> = access.linearized(false).collect();
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn quadratic_access_splits_rows() {
        let storage = ramp(12);
        // columns 1..3 of a 3×4 matrix
        let block = QuadraticSlice::new(ResolvedSlice::new(0, 3, 4), ResolvedSlice::new(1, 2, 1));
        let access = QuadraticAccess::new(&storage, &block);
        assert!(!access.coalesceable());

        let rows: Vec<Vec<f32>> = access.linearized(true).map(|s| span_values(&s)).collect();
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![5.0, 6.0], vec![9.0, 10.0]]);
    }

    #[test]
    fn coalescing_needs_a_uniform_stride() {
        let storage = ramp(12);
        // every other element, seen as 2×3
        let strided = QuadraticSlice::new(ResolvedSlice::new(0, 2, 6), ResolvedSlice::new(0, 3, 2));
        let access = QuadraticAccess::new(&storage, &strided);
        assert!(access.coalesceable() && !access.compact());

        let single: Vec<_> = access.linearized(true).collect();
        assert_eq!(single.len(), 1);
        assert_eq!(span_values(&single[0]), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(access.linearized(false).count(), 2);
    }

    #[test]
    fn generic_access_counts_outer_rows() {
        let storage = ramp(24);
        let tensor = GenericSlice::packed(&[2, 3, 4]);
        let access = GenericAccess::new(&storage, &tensor);
        assert!(access.compact());
        assert_eq!(access.compact_buffer().map(<[_]>::len), Some(24));
        assert_eq!(access.linearized(false).len(), 6);

        let empty = GenericSlice::packed(&[2, 0, 4]);
        assert_eq!(GenericAccess::new(&storage, &empty).linearized(true).count(), 0);
    }
}
