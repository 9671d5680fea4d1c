//! Whole-cube operations built on the bulk transfer methods of
//! [`Hypercube`].
//!
//! These work with any backend or view. Elements are moved through a staging
//! buffer of fixed size, so the memory used does not depend on the size of
//! the cube.

use crate::cube::Hypercube;
use crate::element::{CastFrom, Element};
use crate::errors::{DimensionError, HypercubeError};
use crate::storage::ArrayCube;

/// Number of elements moved per bulk transfer.
const BUF_LEN: usize = 1024;

/// Call `f` with consecutive blocks of the elements of `cube`, in row-major
/// order.
fn for_each_block<T: Element>(
    cube: &dyn Hypercube<T>,
    mut f: impl FnMut(&[T]) -> Result<(), HypercubeError>,
) -> Result<(), HypercubeError> {
    let size = cube.size();
    let mut buf = vec![T::NULL; (size as usize).min(BUF_LEN)];
    let mut pos = 0;
    while pos < size {
        let len = (size - pos).min(BUF_LEN as u64) as usize;
        cube.to_flattened(pos, &mut buf[..len])?;
        f(&buf[..len])?;
        pos += len as u64;
    }
    Ok(())
}

fn check_same_shape<T: Element, U: Element>(
    a: &dyn Hypercube<T>,
    b: &dyn Hypercube<U>,
) -> Result<(), HypercubeError> {
    if a.ndim() != b.ndim() {
        return Err(DimensionError::CountMismatch {
            expected: a.ndim(),
            actual: b.ndim(),
        }
        .into());
    }
    for (axis, (&expected, &actual)) in a.shape().iter().zip(b.shape()).enumerate() {
        if expected != actual {
            return Err(DimensionError::LengthMismatch {
                axis,
                expected,
                actual,
            }
            .into());
        }
    }
    Ok(())
}

/// Set every element of `cube` to `value`.
pub fn fill<T: Element>(cube: &dyn Hypercube<T>, value: T) -> Result<(), HypercubeError> {
    let size = cube.size();
    let buf = vec![value; (size as usize).min(BUF_LEN)];
    let mut pos = 0;
    while pos < size {
        let len = (size - pos).min(BUF_LEN as u64) as usize;
        cube.from_flattened(&buf[..len], pos)?;
        pos += len as u64;
    }
    Ok(())
}

/// Copy the elements of `src` into `dst`, which must have the same shape.
pub fn copy_from<T: Element>(
    dst: &dyn Hypercube<T>,
    src: &dyn Hypercube<T>,
) -> Result<(), HypercubeError> {
    check_same_shape(dst, src)?;
    let mut pos = 0;
    for_each_block(src, |block| {
        dst.from_flattened(block, pos)?;
        pos += block.len() as u64;
        Ok(())
    })
}

/// Copy `cube` into new dense storage with the same axes.
pub fn to_array<T: Element>(cube: &dyn Hypercube<T>) -> Result<ArrayCube<T>, HypercubeError> {
    let array = ArrayCube::with_dims(cube.dims().to_vec());
    copy_from(&array, cube)?;
    Ok(array)
}

/// Return the elements of `cube` in row-major order.
pub fn to_vec<T: Element>(cube: &dyn Hypercube<T>) -> Result<Vec<T>, HypercubeError> {
    let size = usize::try_from(cube.size()).map_err(|_| {
        HypercubeError::InvalidArgument(format!("{} elements do not fit in memory", cube.size()))
    })?;
    let mut data = vec![T::NULL; size];
    cube.to_flattened(0, &mut data)?;
    Ok(data)
}

/// Return true if `a` and `b` have the same shape and elements.
///
/// NaNs compare equal to each other, so a cube always equals itself.
pub fn content_equals<T: Element>(
    a: &dyn Hypercube<T>,
    b: &dyn Hypercube<T>,
) -> Result<bool, HypercubeError> {
    if a.shape() != b.shape() {
        return Ok(false);
    }
    let mut other = vec![T::NULL; (b.size() as usize).min(BUF_LEN)];
    let mut pos = 0;
    let mut equal = true;
    for_each_block(a, |block| {
        if equal {
            let other = &mut other[..block.len()];
            b.to_flattened(pos, other)?;
            equal = block.iter().zip(other.iter()).all(|(x, y)| x.same_as(*y));
        }
        pos += block.len() as u64;
        Ok(())
    })?;
    Ok(equal)
}

/// Return the sum of the elements of `cube` as an `f64`.
///
/// The sum of an empty cube is zero. Any NaN element makes the sum NaN.
pub fn sum<T: Element>(cube: &dyn Hypercube<T>) -> Result<f64, HypercubeError>
where
    f64: CastFrom<T>,
{
    let mut total = 0.;
    for_each_block(cube, |block| {
        total += block.iter().map(|&x| f64::cast_from(x)).sum::<f64>();
        Ok(())
    })?;
    Ok(total)
}

/// Fold the elements of `cube`, converted to `f64`, with `pick`.
///
/// NaN elements are not skipped: the result is NaN if any element is NaN.
fn extremum<T: Element>(
    cube: &dyn Hypercube<T>,
    pick: fn(f64, f64) -> f64,
) -> Result<Option<f64>, HypercubeError>
where
    f64: CastFrom<T>,
{
    let mut result: Option<f64> = None;
    for_each_block(cube, |block| {
        for &x in block {
            let x = f64::cast_from(x);
            result = Some(match result {
                None => x,
                Some(acc) if acc.is_nan() || x.is_nan() => f64::NAN,
                Some(acc) => pick(acc, x),
            });
        }
        Ok(())
    })?;
    Ok(result)
}

/// Return the smallest element of `cube`, or `None` if it is empty.
pub fn min<T: Element>(cube: &dyn Hypercube<T>) -> Result<Option<f64>, HypercubeError>
where
    f64: CastFrom<T>,
{
    extremum(cube, f64::min)
}

/// Return the largest element of `cube`, or `None` if it is empty.
pub fn max<T: Element>(cube: &dyn Hypercube<T>) -> Result<Option<f64>, HypercubeError>
where
    f64: CastFrom<T>,
{
    extremum(cube, f64::max)
}
