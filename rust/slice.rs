//! Slice expressions and their resolution against an axis.
//!
//! An unresolved [`Slice`] carries optional `start`, `end` and `step`, NumPy style (`end` is
//! excluded):
//!
//! - `2:` is everything from 2, `:3` everything before 3, `:` the whole axis.
//! - `0:6:2` addresses 0, 2, 4 and `3:0:-1` addresses 3, 2, 1.
//! - `3::-1` runs down to the first element inclusive: 3, 2, 1, 0.
//! - Negative bounds count from the end of the axis.
//!
//! Resolving against an axis of size `n` yields a [`ResolvedSlice`] `(start, count, step)`, and
//! resolved slices compose: slicing a slice never touches memory.
//!
//! ```rust
//! use nstrided::{ResolvedSlice, Slice};
//!
//! let parent = Slice::range_step(1, 9, 2).resolve(10); // 1, 3, 5, 7
//! let child = Slice::starting(1).resolve_within(&parent); // 3, 5, 7
//! assert_eq!(child, ResolvedSlice::new(3, 3, 2));
//! ```

use core::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo, RangeToInclusive};

use crate::error::ViewError;

// region: Slice

/// Unresolved slice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<isize>,
    pub end: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    /// The whole axis.
    pub const ALL: Slice = Slice::new(None, None, Some(1));
    /// The whole axis, reversed.
    pub const FLIP: Slice = Slice::new(None, None, Some(-1));

    pub const fn new(start: Option<isize>, end: Option<isize>, step: Option<isize>) -> Self {
        Self { start, end, step }
    }

    /// A single element, `[i, i + 1)`.
    pub const fn index(i: isize) -> Self {
        // keeps `-1` meaning "last" instead of the empty `[-1, 0)`
        if i == -1 {
            Self::new(Some(-1), None, Some(1))
        } else {
            Self::new(Some(i), Some(i + 1), Some(1))
        }
    }

    /// `start..end`
    pub const fn range(start: isize, end: isize) -> Self {
        Self::new(Some(start), Some(end), None)
    }

    /// `start..end` by `step`.
    pub const fn range_step(start: isize, end: isize, step: isize) -> Self {
        Self::new(Some(start), Some(end), Some(step))
    }

    /// `start..`
    pub const fn starting(start: isize) -> Self {
        Self::new(Some(start), None, None)
    }

    /// `..end`
    pub const fn until(end: isize) -> Self {
        Self::new(None, Some(end), None)
    }

    /// The whole axis by `step`.
    pub const fn stepped(step: isize) -> Self {
        Self::new(None, None, Some(step))
    }

    /// `start..` by `step`.
    pub const fn starting_step(start: isize, step: isize) -> Self {
        Self::new(Some(start), None, Some(step))
    }

    /// Resolves against an axis of `size` elements.
    ///
    /// # Panics
    ///
    /// When the expression is malformed for that axis, see [`Slice::try_resolve`].
    #[track_caller]
    pub fn resolve(&self, size: usize) -> ResolvedSlice {
        match self.try_resolve(size) {
            Ok(resolved) => resolved,
            Err(err) => panic!("{}", err),
        }
    }

    /// Resolves against an axis of `size` elements.
    ///
    /// An open end runs to the last element for a positive step and through index 0 inclusive
    /// for a negative one. Explicit bounds are never clamped: an `end` that would let the
    /// selection step past either edge of the axis is an error, so `0..100` fails on an axis of
    /// five elements.
    ///
    /// Fails on a zero step, an empty axis, a bound outside the axis or an empty selection.
    pub fn try_resolve(&self, size: usize) -> Result<ResolvedSlice, ViewError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ViewError::ZeroStep);
        }
        if size == 0 {
            return Err(ViewError::EmptyAxis);
        }
        let n = size as isize;
        let normalize = |bound: isize| if bound < 0 { bound + n } else { bound };

        let (start, end, sign) = if step > 0 {
            let start = self.start.map(normalize).unwrap_or(0);
            let end = self.end.map(normalize).unwrap_or(n);
            (start, end, 1)
        } else {
            let start = self.start.map(normalize).unwrap_or(n - 1);
            let end = self.end.map(normalize).unwrap_or(-1);
            (start, end, -1)
        };

        if start < 0 || start >= n {
            return Err(ViewError::SliceOutOfBounds { index: start, size });
        }
        if (step > 0 && end <= start) || (step < 0 && start <= end) {
            return Err(ViewError::EmptySlice { start, end, step });
        }

        let count = (end - sign - start) / step + 1;
        let last = start + (count - 1) * step;
        if last < 0 || last >= n {
            return Err(ViewError::SliceOutOfBounds { index: last, size });
        }

        Ok(ResolvedSlice::new(start as usize, count as usize, step))
    }

    /// Resolves against `parent.count()` and composes the result into the parent's address space.
    #[track_caller]
    pub fn resolve_within(&self, parent: &ResolvedSlice) -> ResolvedSlice {
        self.resolve(parent.count()).compose(parent)
    }

    pub fn try_resolve_within(&self, parent: &ResolvedSlice) -> Result<ResolvedSlice, ViewError> {
        Ok(self.try_resolve(parent.count())?.compose(parent))
    }
}

/// Anything usable as a slice subscript: [`Slice`], [`ResolvedSlice`] and the `isize` range types.
pub trait SliceExpression {
    fn to_slice(&self) -> Slice;
}

impl SliceExpression for Slice {
    fn to_slice(&self) -> Slice {
        *self
    }
}

impl SliceExpression for ResolvedSlice {
    fn to_slice(&self) -> Slice {
        Slice::new(
            Some(self.start as isize),
            if self.end() < 0 { None } else { Some(self.end()) },
            Some(self.step),
        )
    }
}

impl SliceExpression for Range<isize> {
    fn to_slice(&self) -> Slice {
        Slice::range(self.start, self.end)
    }
}

impl SliceExpression for RangeInclusive<isize> {
    fn to_slice(&self) -> Slice {
        if *self.end() == -1 {
            Slice::starting(*self.start())
        } else {
            Slice::range(*self.start(), *self.end() + 1)
        }
    }
}

impl SliceExpression for RangeFrom<isize> {
    fn to_slice(&self) -> Slice {
        Slice::starting(self.start)
    }
}

impl SliceExpression for RangeTo<isize> {
    fn to_slice(&self) -> Slice {
        Slice::until(self.end)
    }
}

impl SliceExpression for RangeToInclusive<isize> {
    fn to_slice(&self) -> Slice {
        if self.end == -1 {
            Slice::ALL
        } else {
            Slice::until(self.end + 1)
        }
    }
}

impl SliceExpression for RangeFull {
    fn to_slice(&self) -> Slice {
        Slice::ALL
    }
}

// endregion: Slice

// region: ResolvedSlice

/// A concrete `(start, count, step)` selection along one axis.
///
/// `start` and every addressed position lie in the parent's `[0, size)`; `step` is non-zero and
/// may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedSlice {
    start: usize,
    count: usize,
    step: isize,
}

impl ResolvedSlice {
    pub const fn new(start: usize, count: usize, step: isize) -> Self {
        Self { start, count, step }
    }

    /// `(0, size, 1)`, the whole axis in order.
    pub const fn full(size: usize) -> Self {
        Self::new(0, size, 1)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn step(&self) -> isize {
        self.step
    }

    /// Position of the last addressed element.
    pub fn last(&self) -> usize {
        self.position(self.count.saturating_sub(1))
    }

    /// Exclusive bound in the step direction, negative when a reversed slice ends past 0.
    pub fn end(&self) -> isize {
        self.start as isize + self.count as isize * self.step
    }

    /// Parent position of the `index`-th addressed element.
    #[inline]
    pub fn position(&self, index: usize) -> usize {
        debug_assert!(
            index < self.count || (index == 0 && self.count == 0),
            "index {} out of bounds for slice of {}",
            index,
            self.count
        );
        (self.start as isize + index as isize * self.step) as usize
    }

    /// Re-expresses `self`, defined over `parent`'s elements, in `parent`'s own address space.
    pub fn compose(&self, parent: &ResolvedSlice) -> ResolvedSlice {
        ResolvedSlice::new(
            parent.position(self.start),
            self.count,
            parent.step * self.step,
        )
    }

    /// Addressed positions in order.
    pub fn positions(&self) -> SlicePositions {
        SlicePositions {
            next: self.start as isize,
            step: self.step,
            remaining: self.count,
        }
    }
}

/// Iterator over the positions of a [`ResolvedSlice`].
#[derive(Debug, Clone)]
pub struct SlicePositions {
    next: isize,
    step: isize,
    remaining: usize,
}

impl Iterator for SlicePositions {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let position = self.next as usize;
        self.next += self.step;
        self.remaining -= 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SlicePositions {}

// endregion: ResolvedSlice

// region: Axis

/// One entry of a tensor subscript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Keep the whole axis.
    All,
    /// Select one coordinate and drop the axis. Negative values count from the end.
    Index(isize),
    /// Keep a sub-range of the axis.
    Range(Slice),
    /// Insert a new axis of length 1 at this position.
    NewAxis,
}

impl From<isize> for Axis {
    fn from(index: isize) -> Self {
        Axis::Index(index)
    }
}

impl From<Slice> for Axis {
    fn from(slice: Slice) -> Self {
        Axis::Range(slice)
    }
}

impl From<Range<isize>> for Axis {
    fn from(range: Range<isize>) -> Self {
        Axis::Range(range.to_slice())
    }
}

impl From<RangeFrom<isize>> for Axis {
    fn from(range: RangeFrom<isize>) -> Self {
        Axis::Range(range.to_slice())
    }
}

impl From<RangeTo<isize>> for Axis {
    fn from(range: RangeTo<isize>) -> Self {
        Axis::Range(range.to_slice())
    }
}

impl From<RangeFull> for Axis {
    fn from(_: RangeFull) -> Self {
        Axis::All
    }
}

// endregion: Axis

#[cfg(test)]
mod tests {
    use super::*;

    fn stepping_loop(start: isize, end: isize, step: isize) -> Vec<isize> {
        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < end) || (step < 0 && i > end) {
            out.push(i);
            i += step;
        }
        out
    }

    /// Positions the loop visits, or `None` when it visits nothing or leaves `[0, size)`.
    fn in_bounds(size: usize, visited: Vec<isize>) -> Option<Vec<usize>> {
        let inside = visited.iter().all(|&i| i >= 0 && (i as usize) < size);
        (inside && !visited.is_empty()).then(|| visited.into_iter().map(|i| i as usize).collect())
    }

    #[test]
    fn resolve_defaults() {
        assert_eq!(Slice::ALL.resolve(5), ResolvedSlice::new(0, 5, 1));
        assert_eq!(Slice::starting(2).resolve(5), ResolvedSlice::new(2, 3, 1));
        assert_eq!(Slice::until(3).resolve(5), ResolvedSlice::new(0, 3, 1));
        assert_eq!(Slice::index(4).resolve(5), ResolvedSlice::new(4, 1, 1));
        assert_eq!(Slice::range_step(0, 6, 2).resolve(10), ResolvedSlice::new(0, 3, 2));
    }

    #[test]
    fn resolve_negative_steps() {
        let explicit = Slice::range_step(3, 0, -1).resolve(5);
        assert_eq!(explicit.positions().collect::<Vec<_>>(), vec![3, 2, 1]);

        let open = Slice::starting_step(3, -1).resolve(5);
        assert_eq!(open.positions().collect::<Vec<_>>(), vec![3, 2, 1, 0]);

        let flipped = Slice::FLIP.resolve(4);
        assert_eq!(flipped.positions().collect::<Vec<_>>(), vec![3, 2, 1, 0]);
        assert_eq!(flipped.end(), -1);
    }

    #[test]
    fn resolve_negative_bounds() {
        assert_eq!(Slice::index(-1).resolve(10), ResolvedSlice::new(9, 1, 1));
        assert_eq!(Slice::range(-5, -1).resolve(10), ResolvedSlice::new(5, 4, 1));
        assert_eq!(
            Slice::starting_step(-1, -1).resolve(3).positions().collect::<Vec<_>>(),
            vec![2, 1, 0]
        );
    }

    #[test]
    fn resolve_failures() {
        assert_eq!(Slice::stepped(0).try_resolve(3), Err(ViewError::ZeroStep));
        assert_eq!(Slice::ALL.try_resolve(0), Err(ViewError::EmptyAxis));
        assert!(matches!(
            Slice::range(3, 3).try_resolve(5),
            Err(ViewError::EmptySlice { .. })
        ));
        assert!(matches!(
            Slice::starting(7).try_resolve(5),
            Err(ViewError::SliceOutOfBounds { index: 7, size: 5 })
        ));
    }

    #[test]
    fn resolve_matches_stepping_loop() {
        for size in 1..8usize {
            let n = size as isize;
            for start in 0..n {
                for step in [-3isize, -2, -1, 1, 2, 3] {
                    let open_end = if step > 0 { n } else { -1 };
                    let expected = in_bounds(size, stepping_loop(start, open_end, step));
                    let resolved = Slice::starting_step(start, step).try_resolve(size);
                    assert_eq!(resolved.ok().map(|r| r.positions().collect::<Vec<_>>()), expected);

                    for end in -(n + 3)..=(n + 3) {
                        let normalized = if end < 0 { end + n } else { end };
                        let expected = in_bounds(size, stepping_loop(start, normalized, step));
                        let slice = Slice::range_step(start, end, step);
                        match slice.try_resolve(size) {
                            Ok(resolved) => assert_eq!(
                                Some(resolved.positions().collect::<Vec<_>>()),
                                expected,
                                "{:?}",
                                slice
                            ),
                            Err(_) => assert!(expected.is_none(), "{:?} on {}", slice, size),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn explicit_ends_past_the_axis_fail() {
        assert!(matches!(
            Slice::range(0, 100).try_resolve(5),
            Err(ViewError::SliceOutOfBounds { index: 99, size: 5 })
        ));
        assert!(matches!(
            Slice::range_step(4, -10, -1).try_resolve(5),
            Err(ViewError::SliceOutOfBounds { index: -4, size: 5 })
        ));
        assert!(Slice::range(0, 6).try_resolve(5).is_err());
        // stepping over the end without landing past it is fine
        assert_eq!(Slice::range_step(0, 6, 4).resolve(5), ResolvedSlice::new(0, 2, 4));
    }

    #[test]
    fn composition_is_associative() {
        let size = 20;
        let a = Slice::range_step(1, 19, 2);
        let b = Slice::range_step(6, 0, -2);
        let c = Slice::starting(1);

        let ra = a.resolve(size);
        let rb = b.resolve_within(&ra);
        let rc = c.resolve_within(&rb);

        let direct: Vec<usize> = ra.positions().collect();
        let nested: Vec<usize> = b
            .resolve(ra.count())
            .positions()
            .map(|i| direct[i])
            .collect();
        assert_eq!(rb.positions().collect::<Vec<_>>(), nested);
        assert_eq!(rc.positions().collect::<Vec<_>>(), nested[1..].to_vec());
    }

    #[test]
    fn ranges_convert_to_slices() {
        assert_eq!((1isize..3).to_slice(), Slice::range(1, 3));
        assert_eq!((1isize..=3).to_slice(), Slice::range(1, 4));
        assert_eq!((..).to_slice(), Slice::ALL);
        assert_eq!(Axis::from(-1isize), Axis::Index(-1));
    }
}
