//! The [`StridedView`] trait shared by [`Vector`](crate::Vector), [`Matrix`](crate::Matrix) and
//! [`Tensor`](crate::Tensor), and the multi-view dispatch helpers built on storage accesses.
//!
//! A view is a reference-counted [`Storage`] plus a resolved layout. Cloning a view, slicing it
//! or reshaping it never copies elements; [`copy`](StridedView::copy) does.
//!
//! Operations over several views go through [`with_linearized2`] and friends: every operand must
//! have exactly the same shape, and the element spans handed to the body are either one span per
//! operand (when all operands are compact) or one span per innermost row, walked in lockstep.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use tracing::trace;

use crate::error::ViewError;
use crate::layout::ResolvedLayout;
use crate::storage::{LinearAccess, Storage, StorageAccess};
use crate::value::{Numeric, PlainValue, Value};
use crate::vector::Vector;

// region: StridedView

/// A shaped, strided window into shared storage.
pub trait StridedView: Clone + Sized {
    type Element: Value;
    type Layout: ResolvedLayout;
    /// Scoped access handed to backends.
    type Access<'a>: StorageAccess<'a, Self::Element>
    where
        Self: 'a;
    /// The same kind of view over another element type, used for masks and conversions.
    type Rebind<U: Value>: StridedView<Element = U, Layout = Self::Layout>;

    fn from_parts(storage: Rc<Storage<Self::Element>>, layout: Self::Layout) -> Self;

    fn storage(&self) -> &Rc<Storage<Self::Element>>;

    fn layout(&self) -> &Self::Layout;

    /// Runs `body` with an access to the addressed elements. The access must not escape.
    fn with_storage_access<'s, R>(&'s self, body: impl FnOnce(Self::Access<'s>) -> R) -> R;

    /// Fresh packed view of `shape` with every element set to `value`.
    #[track_caller]
    fn filled_shape(value: Self::Element, shape: &[usize]) -> Self {
        let layout = Self::Layout::row_major(shape);
        let storage = Storage::filled(layout.element_count(), value);
        Self::from_parts(Rc::new(storage), layout)
    }

    /// Fresh packed view of `shape` holding `values` in row-major order.
    fn try_from_row_major(values: Vec<Self::Element>, shape: &[usize]) -> Result<Self, ViewError> {
        if shape.is_empty() {
            return Err(ViewError::InvalidShape {
                shape: Vec::new(),
                reason: "at least one axis is required",
            });
        }
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(ViewError::InvalidShape {
                shape: shape.iter().map(|&d| d as isize).collect(),
                reason: "element count does not match the number of values",
            });
        }
        let layout = Self::Layout::row_major(shape);
        Ok(Self::from_parts(Rc::new(Storage::from_vec(values)), layout))
    }

    /// Fresh view of the same shape filled with `T::default()`.
    fn like(&self) -> Self {
        Self::filled_shape(Self::Element::default(), &self.shape())
    }

    // region: Shape

    fn shape(&self) -> Vec<usize> {
        self.layout().shape()
    }

    fn rank(&self) -> usize {
        self.layout().rank()
    }

    /// Number of addressed elements.
    fn len(&self) -> usize {
        self.layout().element_count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compact(&self) -> bool {
        self.layout().compact()
    }

    fn coalesceable(&self) -> bool {
        self.layout().coalesceable()
    }

    /// Whether both views share one storage.
    fn aliases<V: StridedView<Element = Self::Element>>(&self, other: &V) -> bool {
        Rc::ptr_eq(self.storage(), other.storage())
    }

    fn indices(&self) -> <Self::Layout as ResolvedLayout>::Indices {
        self.layout().indices()
    }

    // endregion: Shape

    // region: Elements

    #[track_caller]
    fn element(&self, index: &<Self::Layout as ResolvedLayout>::Index) -> Self::Element {
        assert!(self.layout().contains(index), "index {:?} out of bounds for {:?}", index, self.shape());
        self.storage().get(self.layout().position(index))
    }

    #[track_caller]
    fn set_element(&self, index: &<Self::Layout as ResolvedLayout>::Index, value: Self::Element) {
        assert!(self.layout().contains(index), "index {:?} out of bounds for {:?}", index, self.shape());
        self.storage().set(self.layout().position(index), value)
    }

    /// Element at a coordinate list, one coordinate per axis whatever the view's rank.
    ///
    /// # Panics
    ///
    /// If `index` has the wrong length or a coordinate falls outside its axis.
    #[track_caller]
    fn get_at(&self, index: &[usize]) -> Self::Element {
        assert_eq!(index.len(), self.rank(), "index {:?} has the wrong rank for {:?}", index, self.shape());
        match self.layout().position_of(index) {
            Some(position) => self.storage().get(position),
            None => panic!("index {:?} out of bounds for {:?}", index, self.shape()),
        }
    }

    /// Writes the element at a coordinate list, see [`StridedView::get_at`].
    #[track_caller]
    fn set_at(&self, index: &[usize], value: Self::Element) {
        assert_eq!(index.len(), self.rank(), "index {:?} has the wrong rank for {:?}", index, self.shape());
        match self.layout().position_of(index) {
            Some(position) => self.storage().set(position, value),
            None => panic!("index {:?} out of bounds for {:?}", index, self.shape()),
        }
    }

    /// Values in row-major order.
    fn to_vec(&self) -> Vec<Self::Element> {
        let storage = self.storage();
        self.layout().positions().map(|p| storage.get(p)).collect()
    }

    /// Independent packed copy.
    fn copy(&self) -> Self {
        let layout = Self::Layout::row_major(&self.shape());
        Self::from_parts(Rc::new(Storage::from_vec(self.to_vec())), layout)
    }

    fn fill(&self, value: Self::Element) {
        with_linearized(self, |span| span.cells().for_each(|cell| cell.set(value)));
    }

    /// Copies `source` into `self` element by element.
    fn try_assign<V: StridedView<Element = Self::Element>>(&self, source: &V) -> Result<(), ViewError> {
        with_linearized2(self, source, |destination, source| copy_span(&source, &destination))
    }

    /// # Panics
    ///
    /// If the shapes differ.
    #[track_caller]
    fn assign<V: StridedView<Element = Self::Element>>(&self, source: &V) {
        self.try_assign(source).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Overwrites the elements with `values` in row-major order.
    fn try_assign_row_major(&self, values: &[Self::Element]) -> Result<(), ViewError> {
        if values.len() != self.len() {
            return Err(ViewError::shape_mismatch(&self.shape(), &[values.len()]));
        }
        let storage = self.storage();
        for (position, &value) in self.layout().positions().zip(values) {
            storage.set(position, value);
        }
        Ok(())
    }

    #[track_caller]
    fn assign_row_major(&self, values: &[Self::Element]) {
        self.try_assign_row_major(values).unwrap_or_else(|err| panic!("{}", err))
    }

    /// New view of the same shape with `f` applied to every element.
    fn map<U: Value>(&self, mut f: impl FnMut(Self::Element) -> U) -> Self::Rebind<U> {
        let values = self.to_vec().into_iter().map(&mut f).collect();
        let layout = Self::Layout::row_major(&self.shape());
        <Self::Rebind<U>>::from_parts(Rc::new(Storage::from_vec(values)), layout)
    }

    /// New view combining `self` and `other` element by element.
    fn try_zip_map<V, U>(
        &self,
        other: &V,
        mut f: impl FnMut(Self::Element, V::Element) -> U,
    ) -> Result<Self::Rebind<U>, ViewError>
    where
        V: StridedView,
        U: Value,
    {
        check_shapes(self, other)?;
        let values = self
            .to_vec()
            .into_iter()
            .zip(other.to_vec())
            .map(|(a, b)| f(a, b))
            .collect();
        let layout = Self::Layout::row_major(&self.shape());
        Ok(<Self::Rebind<U>>::from_parts(Rc::new(Storage::from_vec(values)), layout))
    }

    // endregion: Elements

    // region: Masks

    /// Sets every element whose `mask` entry is true.
    fn try_fill_where(&self, value: Self::Element, mask: &Self::Rebind<bool>) -> Result<(), ViewError> {
        with_linearized2(self, mask, |destination, mask| {
            for i in 0..destination.count() {
                if mask.get(i) {
                    destination.set(i, value);
                }
            }
        })
    }

    #[track_caller]
    fn fill_where(&self, value: Self::Element, mask: &Self::Rebind<bool>) {
        self.try_fill_where(value, mask).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Elements under true `mask` entries, in row-major order.
    fn try_gather(&self, mask: &Self::Rebind<bool>) -> Result<Vector<Self::Element>, ViewError> {
        check_shapes(self, mask)?;
        let storage = self.storage();
        let mask_storage = mask.storage();
        let values: Vec<Self::Element> = self
            .layout()
            .positions()
            .zip(mask.layout().positions())
            .filter(|&(_, m)| mask_storage.get(m))
            .map(|(p, _)| storage.get(p))
            .collect();
        Ok(Vector::from_vec(values))
    }

    #[track_caller]
    fn gather(&self, mask: &Self::Rebind<bool>) -> Vector<Self::Element> {
        self.try_gather(mask).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Writes `values` to the elements under true `mask` entries, in row-major order.
    fn try_scatter(&self, mask: &Self::Rebind<bool>, values: &Vector<Self::Element>) -> Result<(), ViewError> {
        check_shapes(self, mask)?;
        let selected = true_count(mask);
        if values.len() != selected {
            return Err(ViewError::shape_mismatch(&[selected], &[values.len()]));
        }
        let storage = self.storage();
        let mask_storage = mask.storage();
        let targets = self
            .layout()
            .positions()
            .zip(mask.layout().positions())
            .filter(|&(_, m)| mask_storage.get(m))
            .map(|(p, _)| p);
        for (position, value) in targets.zip(values.to_vec()) {
            storage.set(position, value);
        }
        Ok(())
    }

    #[track_caller]
    fn scatter(&self, mask: &Self::Rebind<bool>, values: &Vector<Self::Element>) {
        self.try_scatter(mask, values).unwrap_or_else(|err| panic!("{}", err))
    }

    // endregion: Masks

    // region: Numeric

    /// Whether shapes match and every pair of elements is within `tolerance`.
    fn is_equal<V: StridedView<Element = Self::Element>>(&self, other: &V, tolerance: Self::Element) -> bool
    where
        Self::Element: Numeric,
    {
        self.shape() == other.shape()
            && self
                .to_vec()
                .into_iter()
                .zip(other.to_vec())
                .all(|(a, b)| a.distance(b) <= tolerance)
    }

    /// Fills with 0, 1, 2, ... in row-major order.
    fn ramp(&self)
    where
        Self::Element: Numeric,
    {
        let storage = self.storage();
        let mut value = Self::Element::ZERO;
        for position in self.layout().positions() {
            storage.set(position, value);
            value = value + Self::Element::ONE;
        }
    }

    #[track_caller]
    fn lt<V: StridedView<Element = Self::Element>>(&self, other: &V) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.try_zip_map(other, |a, b| a < b).unwrap_or_else(|err| panic!("{}", err))
    }

    #[track_caller]
    fn gt<V: StridedView<Element = Self::Element>>(&self, other: &V) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.try_zip_map(other, |a, b| a > b).unwrap_or_else(|err| panic!("{}", err))
    }

    #[track_caller]
    fn le<V: StridedView<Element = Self::Element>>(&self, other: &V) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.try_zip_map(other, |a, b| a <= b).unwrap_or_else(|err| panic!("{}", err))
    }

    #[track_caller]
    fn ge<V: StridedView<Element = Self::Element>>(&self, other: &V) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.try_zip_map(other, |a, b| a >= b).unwrap_or_else(|err| panic!("{}", err))
    }

    fn lt_scalar(&self, value: Self::Element) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.map(|a| a < value)
    }

    fn gt_scalar(&self, value: Self::Element) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.map(|a| a > value)
    }

    fn le_scalar(&self, value: Self::Element) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.map(|a| a <= value)
    }

    fn ge_scalar(&self, value: Self::Element) -> Self::Rebind<bool>
    where
        Self::Element: Numeric,
    {
        self.map(|a| a >= value)
    }

    fn eq_scalar(&self, value: Self::Element) -> Self::Rebind<bool> {
        self.map(|a| a == value)
    }

    // endregion: Numeric

    // region: Bytes

    /// Packed row-major bytes of the addressed elements.
    fn compact_data(&self) -> Vec<u8>
    where
        Self::Element: PlainValue,
    {
        let values = self.to_vec();
        let byte_count = values.len() * core::mem::size_of::<Self::Element>();
        // SAFETY: `PlainValue` types have no padding, so their storage is initialized bytes.
        unsafe { core::slice::from_raw_parts(values.as_ptr() as *const u8, byte_count) }.to_vec()
    }

    /// Fresh packed view of `shape` decoded from row-major bytes.
    fn try_from_compact_data(bytes: &[u8], shape: &[usize]) -> Result<Self, ViewError>
    where
        Self::Element: PlainValue,
    {
        let view = Self::filled_shape(Self::Element::default(), shape);
        view.set_compact_data(bytes)?;
        Ok(view)
    }

    #[track_caller]
    fn from_compact_data(bytes: &[u8], shape: &[usize]) -> Self
    where
        Self::Element: PlainValue,
    {
        Self::try_from_compact_data(bytes, shape).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Overwrites the elements from packed row-major bytes.
    fn set_compact_data(&self, bytes: &[u8]) -> Result<(), ViewError>
    where
        Self::Element: PlainValue,
    {
        let size = core::mem::size_of::<Self::Element>();
        let expected = self.len() * size;
        if bytes.len() != expected {
            return Err(ViewError::ByteCountMismatch {
                expected,
                got: bytes.len(),
            });
        }
        let values: Vec<Self::Element> = bytes
            .chunks_exact(size)
            // SAFETY: any byte pattern is a valid `PlainValue`, and the read tolerates misalignment.
            .map(|chunk| unsafe { core::ptr::read_unaligned(chunk.as_ptr() as *const Self::Element) })
            .collect();
        self.try_assign_row_major(&values)
    }

    // endregion: Bytes
}

/// Number of true entries of a boolean view.
pub fn true_count<V: StridedView<Element = bool>>(mask: &V) -> usize {
    let storage = mask.storage();
    mask.layout().positions().filter(|&p| storage.get(p)).count()
}

/// Element-wise negation of a boolean view.
pub fn not<V: StridedView<Element = bool>>(mask: &V) -> V::Rebind<bool> {
    mask.map(|m| !m)
}

// endregion: StridedView

// region: Dispatch

pub(crate) fn check_shapes<A: StridedView, B: StridedView>(a: &A, b: &B) -> Result<(), ViewError> {
    let (expected, got) = (a.shape(), b.shape());
    if expected == got {
        Ok(())
    } else {
        Err(ViewError::shape_mismatch(&expected, &got))
    }
}

/// Runs `body` with both accesses after checking the shapes match.
pub fn with_storage_access2<'a, 'b, A, B, R>(
    a: &'a A,
    b: &'b B,
    body: impl FnOnce(A::Access<'a>, B::Access<'b>) -> R,
) -> Result<R, ViewError>
where
    A: StridedView,
    B: StridedView,
{
    check_shapes(a, b)?;
    Ok(a.with_storage_access(|a| b.with_storage_access(|b| body(a, b))))
}

/// Runs `body` with three accesses after checking the shapes match.
pub fn with_storage_access3<'a, 'b, 'c, A, B, C, R>(
    a: &'a A,
    b: &'b B,
    c: &'c C,
    body: impl FnOnce(A::Access<'a>, B::Access<'b>, C::Access<'c>) -> R,
) -> Result<R, ViewError>
where
    A: StridedView,
    B: StridedView,
    C: StridedView,
{
    check_shapes(a, b)?;
    check_shapes(a, c)?;
    Ok(a.with_storage_access(|a| b.with_storage_access(|b| c.with_storage_access(|c| body(a, b, c)))))
}

/// Calls `body` on every span of `view`, coalescing whenever the strides allow.
pub fn with_linearized<V: StridedView>(view: &V, mut body: impl FnMut(LinearAccess<'_, V::Element>)) {
    view.with_storage_access(|access| access.linearized(true).for_each(&mut body))
}

/// Calls `body` on matching spans of two same-shaped views.
pub fn with_linearized2<A, B>(
    a: &A,
    b: &B,
    mut body: impl FnMut(LinearAccess<'_, A::Element>, LinearAccess<'_, B::Element>),
) -> Result<(), ViewError>
where
    A: StridedView,
    B: StridedView,
{
    with_storage_access2(a, b, |a, b| {
        let coalesce = a.compact() && b.compact();
        trace!(coalesce, "dispatching two views");
        for (a, b) in a.linearized(coalesce).zip(b.linearized(coalesce)) {
            body(a, b);
        }
    })
}

/// Calls `body` on matching spans of three same-shaped views.
pub fn with_linearized3<A, B, C>(
    a: &A,
    b: &B,
    c: &C,
    mut body: impl FnMut(LinearAccess<'_, A::Element>, LinearAccess<'_, B::Element>, LinearAccess<'_, C::Element>),
) -> Result<(), ViewError>
where
    A: StridedView,
    B: StridedView,
    C: StridedView,
{
    with_storage_access3(a, b, c, |a, b, c| {
        let coalesce = a.compact() && b.compact() && c.compact();
        trace!(coalesce, "dispatching three views");
        let spans = a.linearized(coalesce).zip(b.linearized(coalesce)).zip(c.linearized(coalesce));
        for ((a, b), c) in spans {
            body(a, b, c);
        }
    })
}

/// Calls `body` on matching spans of four same-shaped views.
#[allow(clippy::type_complexity)]
pub fn with_linearized4<A, B, C, D>(
    a: &A,
    b: &B,
    c: &C,
    d: &D,
    mut body: impl FnMut(
        LinearAccess<'_, A::Element>,
        LinearAccess<'_, B::Element>,
        LinearAccess<'_, C::Element>,
        LinearAccess<'_, D::Element>,
    ),
) -> Result<(), ViewError>
where
    A: StridedView,
    B: StridedView,
    C: StridedView,
    D: StridedView,
{
    check_shapes(a, d)?;
    with_storage_access3(a, b, c, |a, b, c| {
        d.with_storage_access(|d| {
            let coalesce = a.compact() && b.compact() && c.compact() && d.compact();
            trace!(coalesce, "dispatching four views");
            let spans = a
                .linearized(coalesce)
                .zip(b.linearized(coalesce))
                .zip(c.linearized(coalesce))
                .zip(d.linearized(coalesce));
            for (((a, b), c), d) in spans {
                body(a, b, c, d);
            }
        })
    })
}

/// Copies one span into another of the same length.
fn copy_span<T: Value>(source: &LinearAccess<'_, T>, destination: &LinearAccess<'_, T>) {
    debug_assert_eq!(source.count(), destination.count());
    if source.stride() == 1 && destination.stride() == 1 {
        // SAFETY: both spans hold `count` consecutive elements of live storages; `copy` allows overlap.
        unsafe { core::ptr::copy(source.as_ptr(), destination.as_mut_ptr(), source.count()) }
    } else {
        for i in 0..source.count() {
            destination.set(i, source.get(i));
        }
    }
}

// endregion: Dispatch

// region: Display

/// Writes `(d0×d1×…)` followed by nested bracketed rows.
pub(crate) fn fmt_view<V: StridedView>(view: &V, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let shape = view.shape();
    let dims: Vec<String> = shape.iter().map(|d| alloc::format!("{}", d)).collect();
    write!(f, "({})", dims.join("×"))?;
    let values = view.to_vec();
    if values.is_empty() {
        return write!(f, "[]");
    }
    fmt_level(&values, &shape, 0, f)
}

fn fmt_level<T: Value>(values: &[T], shape: &[usize], depth: usize, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let innermost = depth + 1 == shape.len();
    let chunk = values.len() / shape[depth];
    write!(f, "[")?;
    for i in 0..shape[depth] {
        if i > 0 {
            if innermost {
                write!(f, ", ")?;
            } else {
                let gap = if depth + 2 == shape.len() { "\n" } else { "\n\n" };
                write!(f, ",{}{:indent$}", gap, "", indent = depth + 1)?;
            }
        }
        if innermost {
            write!(f, "{}", values[i].describe())?;
        } else {
            fmt_level(&values[i * chunk..(i + 1) * chunk], shape, depth + 1, f)?;
        }
    }
    write!(f, "]")
}

// endregion: Display
