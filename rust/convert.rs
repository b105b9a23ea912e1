//! Element type and channel layout conversions between compact views.

use core::cell::Cell;

use half::f16;
use half::slice::HalfFloatSliceExt;
use tracing::trace;

use crate::error::ViewError;
use crate::storage::StorageAccess;
use crate::tensor::Tensor;
use crate::value::Value;
use crate::view::{check_shapes, StridedView};

fn compact_cells<'a, T: Value>(access: &impl StorageAccess<'a, T>) -> Result<&'a [Cell<T>], ViewError> {
    access.compact_buffer().ok_or(ViewError::NotCompact)
}

// region: Half precision

/// Widens every element of a compact `f16` view into a compact `f32` view of the same shape.
pub fn try_convert_f16_to_f32<S, D>(source: &S, result: &D) -> Result<(), ViewError>
where
    S: StridedView<Element = f16>,
    D: StridedView<Element = f32>,
{
    check_shapes(source, result)?;
    source.with_storage_access(|s| {
        result.with_storage_access(|d| {
            let (s, d) = (compact_cells(&s)?, compact_cells(&d)?);
            trace!(count = s.len(), "widening f16 to f32");
            // SAFETY: `Cell<T>` has the layout of `T`, and the storages differ in element type so they cannot overlap.
            let (s, d) = unsafe {
                (
                    core::slice::from_raw_parts(s.as_ptr() as *const f16, s.len()),
                    core::slice::from_raw_parts_mut(d.as_ptr() as *mut f32, d.len()),
                )
            };
            s.convert_to_f32_slice(d);
            Ok(())
        })
    })
}

#[track_caller]
pub fn convert_f16_to_f32<S, D>(source: &S, result: &D)
where
    S: StridedView<Element = f16>,
    D: StridedView<Element = f32>,
{
    try_convert_f16_to_f32(source, result).unwrap_or_else(|err| panic!("{}", err))
}

/// Rounds every element of a compact `f32` view into a compact `f16` view of the same shape.
pub fn try_convert_f32_to_f16<S, D>(source: &S, result: &D) -> Result<(), ViewError>
where
    S: StridedView<Element = f32>,
    D: StridedView<Element = f16>,
{
    check_shapes(source, result)?;
    source.with_storage_access(|s| {
        result.with_storage_access(|d| {
            let (s, d) = (compact_cells(&s)?, compact_cells(&d)?);
            trace!(count = s.len(), "narrowing f32 to f16");
            // SAFETY: as in `try_convert_f16_to_f32`.
            let (s, d) = unsafe {
                (
                    core::slice::from_raw_parts(s.as_ptr() as *const f32, s.len()),
                    core::slice::from_raw_parts_mut(d.as_ptr() as *mut f16, d.len()),
                )
            };
            d.convert_from_f32_slice(s);
            Ok(())
        })
    })
}

#[track_caller]
pub fn convert_f32_to_f16<S, D>(source: &S, result: &D)
where
    S: StridedView<Element = f32>,
    D: StridedView<Element = f16>,
{
    try_convert_f32_to_f16(source, result).unwrap_or_else(|err| panic!("{}", err))
}

/// `f32` copy of any `f16` view.
pub fn widened<V: StridedView<Element = f16>>(source: &V) -> V::Rebind<f32> {
    let source = if source.compact() { source.clone() } else { source.copy() };
    let result = <V::Rebind<f32> as StridedView>::filled_shape(0.0, &source.shape());
    convert_f16_to_f32(&source, &result);
    result
}

/// `f16` copy of any `f32` view.
pub fn narrowed<V: StridedView<Element = f32>>(source: &V) -> V::Rebind<f16> {
    let source = if source.compact() { source.clone() } else { source.copy() };
    let result = <V::Rebind<f16> as StridedView>::filled_shape(f16::ZERO, &source.shape());
    convert_f32_to_f16(&source, &result);
    result
}

// endregion: Half precision

// region: Channels

fn check_channel_shapes(interleaved: &[usize], planar: &[usize]) -> Result<(), ViewError> {
    let matches = interleaved.len() == planar.len()
        && interleaved.last() == Some(&4)
        && planar.first() == Some(&4)
        && interleaved[..interleaved.len() - 1] == planar[1..];
    if matches {
        Ok(())
    } else {
        Err(ViewError::shape_mismatch(interleaved, planar))
    }
}

/// Splits `[..., 4]` interleaved channels into `[4, ...]` planes; both tensors must be compact.
pub fn try_deinterleave4<T: Value>(source: &Tensor<T>, result: &Tensor<T>) -> Result<(), ViewError> {
    check_channel_shapes(&source.shape(), &result.shape())?;
    source.with_storage_access(|s| {
        result.with_storage_access(|d| {
            let (s, d) = (compact_cells(&s)?, compact_cells(&d)?);
            let plane = s.len() / 4;
            for (pixel, channels) in s.chunks_exact(4).enumerate() {
                for (channel, value) in channels.iter().enumerate() {
                    d[channel * plane + pixel].set(value.get());
                }
            }
            Ok(())
        })
    })
}

#[track_caller]
pub fn deinterleave4<T: Value>(source: &Tensor<T>, result: &Tensor<T>) {
    try_deinterleave4(source, result).unwrap_or_else(|err| panic!("{}", err))
}

/// Merges `[4, ...]` planes into `[..., 4]` interleaved channels; both tensors must be compact.
pub fn try_interleave4<T: Value>(source: &Tensor<T>, result: &Tensor<T>) -> Result<(), ViewError> {
    check_channel_shapes(&result.shape(), &source.shape())?;
    source.with_storage_access(|s| {
        result.with_storage_access(|d| {
            let (s, d) = (compact_cells(&s)?, compact_cells(&d)?);
            let plane = d.len() / 4;
            for (pixel, channels) in d.chunks_exact(4).enumerate() {
                for (channel, value) in channels.iter().enumerate() {
                    value.set(s[channel * plane + pixel].get());
                }
            }
            Ok(())
        })
    })
}

#[track_caller]
pub fn interleave4<T: Value>(source: &Tensor<T>, result: &Tensor<T>) {
    try_interleave4(source, result).unwrap_or_else(|err| panic!("{}", err))
}

// endregion: Channels

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Matrix, Slice, Vector};

    #[test]
    fn half_precision_round_trip() {
        let wide = Matrix::from_row_major(vec![0.5f32, -2.0, 1024.0, 0.1], 2, 2);
        let half = narrowed(&wide);
        assert_eq!(half.get(1, 0), f16::from_f32(1024.0));

        let back = widened(&half);
        assert_eq!(back.get(0, 1), -2.0);
        assert!(back.is_equal(&wide, 1e-3));

        // strided sources are packed first
        let reversed = widened(&half.t());
        assert_eq!(reversed.get(0, 1), 1024.0);
    }

    #[test]
    fn conversions_require_compact_views() {
        let wide = Vector::<f32>::zeros(6);
        let half = Vector::filled(f16::ZERO, 3);
        assert_eq!(
            try_convert_f32_to_f16(&wide.slice(Slice::stepped(2)), &half),
            Err(ViewError::NotCompact)
        );
        assert!(matches!(
            try_convert_f32_to_f16(&wide, &half),
            Err(ViewError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn channel_planes() {
        let rgba = Tensor::from_fn(&[2, 3, 4], |index| (index[0] * 100 + index[1] * 10 + index[2]) as u16);
        let planes = Tensor::new(&[4, 2, 3]);
        deinterleave4(&rgba, &planes);
        assert_eq!(planes.get(&[2, 1, 0]), 102);
        assert_eq!(planes.get(&[3, 0, 2]), 23);

        let merged = Tensor::new(&[2, 3, 4]);
        interleave4(&planes, &merged);
        assert_eq!(merged.to_vec(), rgba.to_vec());

        assert!(try_deinterleave4(&rgba, &Tensor::new(&[4, 3, 2])).is_err());
    }
}
