//! Row-major address arithmetic shared by the backends and views.

use smallvec::SmallVec;

use crate::errors::{DimensionError, HypercubeError, IndexError};

/// Dynamically sized index array, which avoids allocating for cubes of up
/// to five dimensions.
pub type DynIndex = SmallVec<[u64; 5]>;

/// Return the number of elements in a cube of the given shape.
pub fn size_of(shape: &[u64]) -> u64 {
    shape.iter().product()
}

/// Return the row-major offset of `indices` in a cube of shape `shape`.
///
/// Fails if the number of indices does not match the number of dimensions,
/// or if any index is out of range.
pub fn offset_of(shape: &[u64], indices: &[u64]) -> Result<u64, HypercubeError> {
    if indices.len() != shape.len() {
        return Err(DimensionError::CountMismatch {
            expected: shape.len(),
            actual: indices.len(),
        }
        .into());
    }
    let mut offset = 0;
    for (axis, (&index, &len)) in indices.iter().zip(shape).enumerate() {
        if index >= len {
            return Err(IndexError {
                axis: Some(axis),
                index,
                len,
            }
            .into());
        }
        offset = offset * len + index;
    }
    Ok(offset)
}

/// Return the row-major offset of `indices`, which must be valid for
/// `shape`.
#[inline]
pub fn offset_unchecked(shape: &[u64], indices: &[u64]) -> u64 {
    debug_assert_eq!(shape.len(), indices.len());
    indices
        .iter()
        .zip(shape)
        .fold(0, |offset, (&index, &len)| offset * len + index)
}

/// Decompose row-major `offset` into indices for a cube of shape `shape`.
///
/// The caller must ensure `offset < size_of(shape)`.
pub fn unravel(shape: &[u64], mut offset: u64, indices: &mut DynIndex) {
    indices.clear();
    indices.resize(shape.len(), 0);
    for axis in (0..shape.len()).rev() {
        let len = shape[axis];
        indices[axis] = offset % len;
        offset /= len;
    }
}

/// Advance `indices` to the next position in row-major order.
///
/// Returns false, leaving `indices` at all zeros, when the last position
/// has been passed.
pub fn advance(shape: &[u64], indices: &mut [u64]) -> bool {
    for axis in (0..shape.len()).rev() {
        indices[axis] += 1;
        if indices[axis] < shape[axis] {
            return true;
        }
        indices[axis] = 0;
    }
    false
}

/// Check that `len` elements starting at `pos` fit within `size`.
pub fn check_range(size: u64, pos: u64, len: usize) -> Result<(), IndexError> {
    let end = pos.checked_add(len as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(IndexError::flat(pos.saturating_add(len as u64), size)),
    }
}

/// Check that `pos` is a valid flat position in a cube of size `size`.
#[inline]
pub fn check_pos(size: u64, pos: u64) -> Result<(), IndexError> {
    if pos < size {
        Ok(())
    } else {
        Err(IndexError::flat(pos, size))
    }
}
