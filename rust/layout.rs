//! Multi-axis resolved slices and row-major iteration.
//!
//! A layout is one [`ResolvedSlice`] per axis, outermost first. The flat storage position of a
//! coordinate is the sum of each axis' `position`, so a layout never needs a separate base
//! offset: collapsing an axis folds its offset into the `start` of a remaining one.
//!
//! Two classifications drive traversal:
//!
//! - compact: innermost step is 1 and every outer step is the product of the counts inside it.
//! - coalesceable: `step[i] == step[i + 1] * count[i + 1]` for all axes, so a single stride walks
//!   the whole view in row-major order.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::slice::ResolvedSlice;

// region: Classification

/// Canonical row-major steps for `shape`.
pub fn row_major_steps(shape: &[usize]) -> Vec<isize> {
    let mut steps = vec![1isize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        steps[axis] = steps[axis + 1] * shape[axis + 1] as isize;
    }
    steps
}

/// Whether `(count, step)` pairs, outermost first, describe a packed row-major block.
pub fn is_compact(counts: &[usize], steps: &[isize]) -> bool {
    let mut expected = 1isize;
    for (&count, &step) in counts.iter().zip(steps).rev() {
        if step != expected {
            return false;
        }
        expected *= count as isize;
    }
    true
}

/// Whether `(count, step)` pairs, outermost first, can be walked with the innermost step alone.
pub fn is_coalesceable(counts: &[usize], steps: &[isize]) -> bool {
    (0..counts.len().saturating_sub(1)).all(|i| steps[i] == steps[i + 1] * counts[i + 1] as isize)
}

// endregion: Classification

// region: ResolvedLayout

/// Shared behavior of the rank-1, rank-2 and rank-N resolved slices.
pub trait ResolvedLayout: Clone + Debug + PartialEq {
    /// Coordinate of one element.
    type Index: Clone + Debug;
    /// Row-major coordinate iterator.
    type Indices: Iterator<Item = Self::Index>;

    /// Packed layout for `shape`.
    ///
    /// # Panics
    ///
    /// If `shape` has the wrong rank for this layout.
    fn row_major(shape: &[usize]) -> Self;

    /// Per-axis slices, outermost first.
    fn components(&self) -> Vec<ResolvedSlice>;

    /// Flat storage position of `index`.
    fn position(&self, index: &Self::Index) -> usize;

    /// Whether every coordinate of `index` lies inside its axis.
    fn contains(&self, index: &Self::Index) -> bool;

    fn indices(&self) -> Self::Indices;

    fn shape(&self) -> Vec<usize> {
        self.components().iter().map(ResolvedSlice::count).collect()
    }

    fn rank(&self) -> usize {
        self.components().len()
    }

    fn element_count(&self) -> usize {
        self.components().iter().map(ResolvedSlice::count).product()
    }

    fn steps(&self) -> Vec<isize> {
        self.components().iter().map(ResolvedSlice::step).collect()
    }

    /// Position of the first element.
    fn base(&self) -> usize {
        self.components().iter().map(ResolvedSlice::start).sum()
    }

    fn compact(&self) -> bool {
        is_compact(&self.shape(), &self.steps())
    }

    fn coalesceable(&self) -> bool {
        is_coalesceable(&self.shape(), &self.steps())
    }

    /// Flat storage position of a coordinate list, `None` when its length differs from the rank or
    /// a coordinate falls outside its axis.
    fn position_of(&self, index: &[usize]) -> Option<usize> {
        let components = self.components();
        if index.len() != components.len() {
            return None;
        }
        components
            .iter()
            .zip(index)
            .map(|(component, &i)| (i < component.count()).then(|| component.position(i)))
            .sum()
    }

    /// Flat storage positions of all elements in row-major order.
    fn positions(&self) -> Positions {
        Positions::new(&self.components())
    }
}

impl ResolvedLayout for ResolvedSlice {
    type Index = usize;
    type Indices = core::ops::Range<usize>;

    #[track_caller]
    fn row_major(shape: &[usize]) -> Self {
        assert_eq!(shape.len(), 1, "vector layout needs a rank-1 shape");
        ResolvedSlice::full(shape[0])
    }

    fn components(&self) -> Vec<ResolvedSlice> {
        vec![*self]
    }

    fn position(&self, index: &usize) -> usize {
        ResolvedSlice::position(self, *index)
    }

    fn contains(&self, index: &usize) -> bool {
        *index < self.count()
    }

    fn indices(&self) -> Self::Indices {
        0..self.count()
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.count()]
    }

    fn element_count(&self) -> usize {
        self.count()
    }

    fn compact(&self) -> bool {
        self.step() == 1
    }

    fn coalesceable(&self) -> bool {
        true
    }
}

// endregion: ResolvedLayout

// region: QuadraticSlice

/// Coordinate inside a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QuadraticIndex {
    pub row: usize,
    pub column: usize,
}

impl QuadraticIndex {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl From<(usize, usize)> for QuadraticIndex {
    fn from((row, column): (usize, usize)) -> Self {
        Self { row, column }
    }
}

/// Rank-2 resolved slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuadraticSlice {
    pub row: ResolvedSlice,
    pub column: ResolvedSlice,
}

impl QuadraticSlice {
    pub const fn new(row: ResolvedSlice, column: ResolvedSlice) -> Self {
        Self { row, column }
    }

    /// Packed `rows × columns` layout.
    pub const fn packed(rows: usize, columns: usize) -> Self {
        Self {
            row: ResolvedSlice::new(0, rows, columns as isize),
            column: ResolvedSlice::new(0, columns, 1),
        }
    }

    pub fn rows(&self) -> usize {
        self.row.count()
    }

    pub fn columns(&self) -> usize {
        self.column.count()
    }

    #[inline]
    pub fn position_at(&self, row: usize, column: usize) -> usize {
        self.row.position(row) + self.column.position(column)
    }

    /// Axes swapped, same positions.
    pub fn transposed(&self) -> Self {
        Self {
            row: self.column,
            column: self.row,
        }
    }
}

impl ResolvedLayout for QuadraticSlice {
    type Index = QuadraticIndex;
    type Indices = QuadraticRange;

    #[track_caller]
    fn row_major(shape: &[usize]) -> Self {
        assert_eq!(shape.len(), 2, "matrix layout needs a rank-2 shape");
        Self::packed(shape[0], shape[1])
    }

    fn components(&self) -> Vec<ResolvedSlice> {
        vec![self.row, self.column]
    }

    fn position(&self, index: &QuadraticIndex) -> usize {
        self.position_at(index.row, index.column)
    }

    fn contains(&self, index: &QuadraticIndex) -> bool {
        index.row < self.rows() && index.column < self.columns()
    }

    fn indices(&self) -> QuadraticRange {
        QuadraticRange::new(self.rows(), self.columns())
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.rows(), self.columns()]
    }

    fn element_count(&self) -> usize {
        self.rows() * self.columns()
    }

    fn compact(&self) -> bool {
        self.row.step() == self.column.count() as isize && self.column.step() == 1
    }

    fn coalesceable(&self) -> bool {
        self.row.step() == self.column.count() as isize * self.column.step()
    }
}

/// Row-major `(row, column)` coordinates of a `rows × columns` matrix.
#[derive(Debug, Clone)]
pub struct QuadraticRange {
    rows: usize,
    columns: usize,
    next: QuadraticIndex,
}

impl QuadraticRange {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows: if columns == 0 { 0 } else { rows },
            columns,
            next: QuadraticIndex::default(),
        }
    }
}

impl Iterator for QuadraticRange {
    type Item = QuadraticIndex;

    fn next(&mut self) -> Option<QuadraticIndex> {
        if self.next.row >= self.rows {
            return None;
        }
        let current = self.next;
        self.next.column += 1;
        if self.next.column == self.columns {
            self.next.column = 0;
            self.next.row += 1;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.next.row >= self.rows {
            0
        } else {
            (self.rows - self.next.row) * self.columns - self.next.column
        };
        (left, Some(left))
    }
}

impl ExactSizeIterator for QuadraticRange {}

// endregion: QuadraticSlice

// region: GenericSlice

/// Rank-N resolved slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericSlice {
    components: Vec<ResolvedSlice>,
}

impl GenericSlice {
    pub fn new(components: Vec<ResolvedSlice>) -> Self {
        Self { components }
    }

    /// Packed row-major layout of `shape`.
    ///
    /// # Panics
    ///
    /// If `shape` is empty: every view has at least one axis.
    #[track_caller]
    pub fn packed(shape: &[usize]) -> Self {
        assert!(!shape.is_empty(), "tensor layout needs at least one axis");
        let steps = row_major_steps(shape);
        Self {
            components: shape
                .iter()
                .zip(steps)
                .map(|(&count, step)| ResolvedSlice::new(0, count, step))
                .collect(),
        }
    }

    pub fn component(&self, axis: usize) -> &ResolvedSlice {
        &self.components[axis]
    }

    pub fn as_slice(&self) -> &[ResolvedSlice] {
        &self.components
    }

    pub fn into_components(self) -> Vec<ResolvedSlice> {
        self.components
    }
}

impl ResolvedLayout for GenericSlice {
    type Index = Vec<usize>;
    type Indices = GenericRange;

    #[track_caller]
    fn row_major(shape: &[usize]) -> Self {
        Self::packed(shape)
    }

    fn components(&self) -> Vec<ResolvedSlice> {
        self.components.clone()
    }

    fn position(&self, index: &Vec<usize>) -> usize {
        debug_assert_eq!(index.len(), self.components.len());
        self.components
            .iter()
            .zip(index)
            .map(|(component, &i)| component.position(i))
            .sum()
    }

    fn contains(&self, index: &Vec<usize>) -> bool {
        index.len() == self.components.len()
            && self
                .components
                .iter()
                .zip(index)
                .all(|(component, &i)| i < component.count())
    }

    fn indices(&self) -> GenericRange {
        GenericRange::new(&self.shape())
    }

    fn rank(&self) -> usize {
        self.components.len()
    }
}

/// Row-major coordinates of an arbitrary shape, innermost axis fastest.
#[derive(Debug, Clone)]
pub struct GenericRange {
    shape: Vec<usize>,
    counters: Vec<usize>,
    remaining: usize,
}

impl GenericRange {
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            counters: vec![0; shape.len()],
            remaining: shape.iter().product(),
        }
    }
}

impl Iterator for GenericRange {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.counters.clone();
        self.remaining -= 1;
        for axis in (0..self.shape.len()).rev() {
            self.counters[axis] += 1;
            if self.counters[axis] < self.shape[axis] {
                break;
            }
            self.counters[axis] = 0;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GenericRange {}

// endregion: GenericSlice

// region: Positions

/// Flat storage positions of a layout in row-major order.
#[derive(Debug, Clone)]
pub struct Positions {
    counts: Vec<usize>,
    steps: Vec<isize>,
    counters: Vec<usize>,
    current: isize,
    remaining: usize,
}

impl Positions {
    pub fn new(components: &[ResolvedSlice]) -> Self {
        Self {
            counts: components.iter().map(ResolvedSlice::count).collect(),
            steps: components.iter().map(ResolvedSlice::step).collect(),
            counters: vec![0; components.len()],
            current: components.iter().map(|c| c.start() as isize).sum(),
            remaining: components.iter().map(ResolvedSlice::count).product(),
        }
    }
}

impl Iterator for Positions {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let position = self.current as usize;
        self.remaining -= 1;
        for axis in (0..self.counts.len()).rev() {
            self.counters[axis] += 1;
            self.current += self.steps[axis];
            if self.counters[axis] < self.counts[axis] {
                break;
            }
            self.current -= self.steps[axis] * self.counts[axis] as isize;
            self.counters[axis] = 0;
        }
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Positions {}

// endregion: Positions
