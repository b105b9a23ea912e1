//! Conversions to and from [`ndarray`] arrays, behind the `ndarray` feature.
//!
//! Both directions copy: views hand out interior-mutable storage, which cannot be lent to
//! `ndarray` as a plain slice.

use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::error::ViewError;
use crate::tensor::Tensor;
use crate::value::Value;
use crate::view::StridedView;

/// Owned dynamic-rank array holding the elements of `view`.
pub fn to_ndarray<V: StridedView>(view: &V) -> ArrayD<V::Element> {
    let mut values = view.to_vec().into_iter();
    ArrayD::from_shape_fn(IxDyn(&view.shape()), |_| values.next().unwrap_or_default())
}

impl<T: Value> Tensor<T> {
    /// Packed tensor with the shape and logical element order of `array`.
    pub fn try_from_ndarray<S, D>(array: &ArrayBase<S, D>) -> Result<Self, ViewError>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        Self::try_from_row_major(array.iter().copied().collect(), array.shape())
    }

    #[track_caller]
    pub fn from_ndarray<S, D>(array: &ArrayBase<S, D>) -> Self
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        Self::try_from_ndarray(array).unwrap_or_else(|err| panic!("{}", err))
    }

    pub fn to_ndarray(&self) -> ArrayD<T> {
        to_ndarray(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Matrix, Slice};
    use ndarray::{array, Axis};

    #[test]
    fn strided_views_export_in_logical_order() {
        let m = Matrix::from_row_major(vec![1i32, 2, 3, 4, 5, 6], 2, 3);
        let exported = to_ndarray(&m.t());
        assert_eq!(exported.shape(), &[3, 2]);
        assert_eq!(exported[[2, 0]], 3);

        let flipped = to_ndarray(&m.slice(Slice::FLIP, ..));
        assert_eq!(flipped.index_axis(Axis(0), 0).iter().copied().collect::<Vec<_>>(), vec![4, 5, 6]);
    }

    #[test]
    fn imports_follow_array_strides() {
        let source = array![[1.0f32, 2.0], [3.0, 4.0]];
        let transposed = source.t();
        let tensor = Tensor::from_ndarray(&transposed);
        assert_eq!(tensor.shape(), vec![2, 2]);
        assert_eq!(tensor.get(&[0, 1]), 3.0);
        assert!(tensor.compact());
        assert_eq!(tensor.to_ndarray(), transposed.into_dyn());
    }
}
