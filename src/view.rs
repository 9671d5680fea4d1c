//! Zero-copy views over another cube.
//!
//! A [`View`] wraps exactly one inner cube and applies a single coordinate
//! transform, described by [`Transform`]. Chains of views are built by the
//! view-producing methods of [`Cube`], which fold a new transform into an
//! existing view of the same kind where the algebra allows, so that chains
//! only grow when they must.
//!
//! Each view translates its own positions to positions of the inner cube.
//! Bulk transfers split the requested range into runs which are contiguous
//! in the inner cube, and hand each run to the inner cube's own bulk
//! transfer. A run ends at the earliest of:
//!
//! - the end of the requested range
//! - the end of the current row of the last axis
//! - the view's own discontinuity, such as the wrap-around point of a roll
//!
//! Transposed views of two or more dimensions reverse the order in which
//! the last axis is walked, so they transfer one element at a time.

use std::ops::Range;

use crate::accessor::{AxisAccess, IntoAccessors};
use crate::bit_set::BitSet;
use crate::cube::{Cube, Hypercube};
use crate::dimension::{shape_of, Dimension};
use crate::element::Element;
use crate::env::trace;
use crate::errors::{DimensionError, HypercubeError, ReshapeError, RollError, SliceError};
use crate::layout::{check_pos, check_range, offset_unchecked, size_of, unravel, DynIndex};

/// Coordinate transform applied by a [`View`].
#[derive(Clone, Debug, PartialEq)]
pub enum Transform {
    /// Reverse the order of the axes.
    Transposed,

    /// Select part of each inner axis. There is one entry per inner axis.
    /// Each range entry produces one axis of the view, in order.
    Sliced(Vec<SlicedAxis>),

    /// Circularly shift each axis. Position `i` of an axis with shift `s`
    /// shows inner position `i - s`, modulo the axis length. Shifts are in
    /// `[0, len)`.
    AxisRolled(Vec<u64>),

    /// Circularly shift the flattened element sequence. Flat position `i`
    /// shows inner flat position `i - s`, modulo the size.
    FlatRolled(u64),

    /// Select positions of the first axis. Position `i` of the first axis
    /// shows inner position `mapping[i]`.
    Masked(Vec<u64>),

    /// Present the inner elements, in the same order, with a different
    /// shape.
    Reshaped,
}

/// How a [`Transform::Sliced`] view addresses one inner axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlicedAxis {
    /// The axis is fixed at a coordinate and does not appear in the view.
    Fixed(u64),

    /// The view axis position `i` is inner position `start + i * step`.
    Range { start: u64, step: u64, count: u64 },
}

impl SlicedAxis {
    fn from_access(access: AxisAccess) -> Self {
        match access {
            AxisAccess::Fixed(coord) => SlicedAxis::Fixed(coord),
            AxisAccess::Range { start, step, count } => SlicedAxis::Range { start, step, count },
        }
    }
}

/// A cube which presents the elements of another cube through a
/// [`Transform`].
pub struct View<T: Element> {
    inner: Cube<T>,
    dims: Vec<Dimension>,
    shape: Vec<u64>,
    size: u64,
    transform: Transform,
}

impl<T: Element> View<T> {
    fn new_cube(inner: Cube<T>, dims: Vec<Dimension>, transform: Transform) -> Cube<T> {
        let shape = shape_of(&dims);
        let size = size_of(&shape);
        trace!(
            "creating {:?} view with shape {:?} over shape {:?}",
            transform_name(&transform),
            shape,
            inner.shape()
        );
        Cube::new(View {
            inner,
            dims,
            shape,
            size,
            transform,
        })
    }

    /// Return the cube this view wraps.
    pub fn inner(&self) -> &Cube<T> {
        &self.inner
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Translate coordinates of this view into coordinates of the inner
    /// cube.
    ///
    /// Not used for flat transforms, which translate flat positions
    /// directly.
    fn wrapped_indices(&self, local: &[u64], wrapped: &mut DynIndex) {
        wrapped.clear();
        match &self.transform {
            Transform::Transposed => wrapped.extend(local.iter().rev().copied()),
            Transform::Sliced(axes) => {
                let mut local_axis = 0;
                for axis in axes {
                    match *axis {
                        SlicedAxis::Fixed(coord) => wrapped.push(coord),
                        SlicedAxis::Range { start, step, .. } => {
                            wrapped.push(start + local[local_axis] * step);
                            local_axis += 1;
                        }
                    }
                }
            }
            Transform::AxisRolled(shifts) => {
                for ((&index, &shift), &len) in local.iter().zip(shifts).zip(&self.shape) {
                    wrapped.push(if index >= shift {
                        index - shift
                    } else {
                        index + len - shift
                    });
                }
            }
            Transform::Masked(mapping) => {
                wrapped.extend_from_slice(local);
                if let Some(first) = wrapped.first_mut() {
                    *first = mapping[*first as usize];
                }
            }
            Transform::FlatRolled(_) | Transform::Reshaped => wrapped.extend_from_slice(local),
        }
    }

    /// Translate flat position `pos` of this view into a flat position of
    /// the inner cube.
    ///
    /// For transforms that work on coordinates, this leaves the coordinates
    /// of `pos` in `local` and the inner coordinates in `wrapped`.
    fn wrapped_pos(&self, pos: u64, local: &mut DynIndex, wrapped: &mut DynIndex) -> u64 {
        match self.transform {
            Transform::FlatRolled(shift) => {
                if pos >= shift {
                    pos - shift
                } else {
                    pos + self.size - shift
                }
            }
            Transform::Reshaped => pos,
            _ => {
                unravel(&self.shape, pos, local);
                self.wrapped_indices(local, wrapped);
                offset_unchecked(self.inner.shape(), wrapped)
            }
        }
    }

    /// Return the inner position of `pos` and the length of the run
    /// starting there which is contiguous in the inner cube, capped at
    /// `left`.
    fn run_at(
        &self,
        pos: u64,
        left: u64,
        local: &mut DynIndex,
        wrapped: &mut DynIndex,
    ) -> (u64, u64) {
        let wrapped_pos = self.wrapped_pos(pos, local, wrapped);

        // Elements left in the current row of the view's last axis.
        let row_left = || match self.shape.len() {
            0 => left,
            n => left.min(self.shape[n - 1] - local[n - 1]),
        };

        let run = match &self.transform {
            Transform::FlatRolled(_) => left.min(self.size - wrapped_pos),
            Transform::Reshaped => left,
            Transform::Transposed => 1,
            Transform::AxisRolled(shifts) => match self.shape.len() {
                0 => left,
                n => {
                    let axis = n - 1;
                    let (index, shift) = (local[axis], shifts[axis]);
                    if shift == 0 || index >= shift {
                        row_left()
                    } else {
                        left.min(shift - index)
                    }
                }
            },
            Transform::Sliced(axes) => match axes.last() {
                Some(SlicedAxis::Fixed(_)) => 1,
                Some(SlicedAxis::Range { step: 1, .. }) => row_left(),
                Some(SlicedAxis::Range { .. }) => 1,
                None => left,
            },
            Transform::Masked(mapping) => {
                if self.shape.len() == 1 {
                    let start = pos as usize;
                    let mut end = start + 1;
                    while ((end - start) as u64) < left && mapping[end] == mapping[end - 1] + 1 {
                        end += 1;
                    }
                    (end - start) as u64
                } else {
                    row_left()
                }
            }
        };
        (wrapped_pos, run)
    }

    /// Split the range `[pos, pos + len)` into runs which are contiguous in
    /// the inner cube, and call `visit` with the inner start position and
    /// the offsets within the range of each run.
    fn for_each_run(
        &self,
        pos: u64,
        len: usize,
        mut visit: impl FnMut(u64, Range<usize>) -> Result<(), HypercubeError>,
    ) -> Result<(), HypercubeError> {
        let mut local = DynIndex::new();
        let mut wrapped = DynIndex::new();
        let mut done = 0;
        while done < len {
            let left = (len - done) as u64;
            let (wrapped_pos, run) = self.run_at(pos + done as u64, left, &mut local, &mut wrapped);
            let run = run as usize;
            visit(wrapped_pos, done..done + run)?;
            done += run;
        }
        Ok(())
    }

    fn inner_pos(&self, pos: u64) -> Result<u64, HypercubeError> {
        check_pos(self.size, pos)?;
        let mut local = DynIndex::new();
        let mut wrapped = DynIndex::new();
        Ok(self.wrapped_pos(pos, &mut local, &mut wrapped))
    }
}

fn transform_name(transform: &Transform) -> &'static str {
    match transform {
        Transform::Transposed => "transposed",
        Transform::Sliced(_) => "sliced",
        Transform::AxisRolled(_) => "axis-rolled",
        Transform::FlatRolled(_) => "flat-rolled",
        Transform::Masked(_) => "masked",
        Transform::Reshaped => "reshaped",
    }
}

impl<T: Element> Hypercube<T> for View<T> {
    fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn get_at(&self, pos: u64) -> Result<T, HypercubeError> {
        self.inner.get_at(self.inner_pos(pos)?)
    }

    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError> {
        self.inner.set_at(self.inner_pos(pos)?, value)
    }

    fn get_object_at(&self, pos: u64) -> Result<Option<T>, HypercubeError> {
        self.inner.get_object_at(self.inner_pos(pos)?)
    }

    fn set_object_at(&self, pos: u64, value: Option<T>) -> Result<(), HypercubeError> {
        self.inner.set_object_at(self.inner_pos(pos)?, value)
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        trace!(
            "flattening {} view: src_pos={} len={}",
            transform_name(&self.transform),
            src_pos,
            dst.len()
        );
        self.for_each_run(src_pos, dst.len(), |inner_pos, range| {
            self.inner.to_flattened(inner_pos, &mut dst[range])
        })
    }

    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        trace!(
            "unflattening {} view: dst_pos={} len={}",
            transform_name(&self.transform),
            dst_pos,
            src.len()
        );
        self.for_each_run(dst_pos, src.len(), |inner_pos, range| {
            self.inner.from_flattened(&src[range], inner_pos)
        })
    }

    fn to_flattened_objs(&self, src_pos: u64, dst: &mut [Option<T>]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        self.for_each_run(src_pos, dst.len(), |inner_pos, range| {
            self.inner.to_flattened_objs(inner_pos, &mut dst[range])
        })
    }

    fn from_flattened_objs(&self, src: &[Option<T>], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        self.for_each_run(dst_pos, src.len(), |inner_pos, range| {
            self.inner.from_flattened_objs(&src[range], inner_pos)
        })
    }

    fn flush(&self) -> Result<(), HypercubeError> {
        self.inner.flush()
    }

    fn as_view(&self) -> Option<&View<T>> {
        Some(self)
    }
}

/// Reduce `shift` modulo `len` to `[0, len)`.
fn normalize_shift(shift: i64, len: u64) -> u64 {
    if len == 0 {
        0
    } else {
        (shift as i128).rem_euclid(len as i128) as u64
    }
}

/// Add two shifts in `[0, len)` modulo `len`.
fn add_shifts(a: u64, b: u64, len: u64) -> u64 {
    if len == 0 {
        0
    } else {
        let sum = a + b;
        if sum >= len {
            sum - len
        } else {
            sum
        }
    }
}

impl<T: Element> Cube<T> {
    /// Return the view of an inner cube if this cube is a view with a
    /// transform matching `pred`.
    fn view_if(&self, pred: impl Fn(&Transform) -> bool) -> Option<&View<T>> {
        self.as_view().filter(|view| pred(view.transform()))
    }

    /// Return a view with the axes in reverse order.
    ///
    /// Cubes with fewer than two dimensions are returned unchanged, and
    /// transposing a transposed view returns the cube it wraps.
    pub fn transpose(&self) -> Cube<T> {
        if self.ndim() <= 1 {
            return self.clone();
        }
        if let Some(view) = self.view_if(|t| *t == Transform::Transposed) {
            return view.inner.clone();
        }
        let dims = self.dims().iter().rev().cloned().collect();
        View::new_cube(self.clone(), dims, Transform::Transposed)
    }

    /// Return a view which circularly shifts each axis by the corresponding
    /// entry in `shifts`, in the same direction as NumPy's `roll`.
    ///
    /// Shifts are reduced modulo the axis length. If all of them are zero,
    /// this cube is returned unchanged. Rolling a rolled view combines the
    /// shifts into a single view, returning the cube it wraps if they
    /// cancel out.
    pub fn roll(&self, shifts: &[i64]) -> Result<Cube<T>, HypercubeError> {
        if shifts.len() != self.ndim() {
            return Err(DimensionError::CountMismatch {
                expected: self.ndim(),
                actual: shifts.len(),
            }
            .into());
        }
        let shifts: Vec<u64> = shifts
            .iter()
            .zip(self.shape())
            .map(|(&shift, &len)| normalize_shift(shift, len))
            .collect();
        if shifts.iter().all(|&s| s == 0) {
            return Ok(self.clone());
        }

        if let Some(view) = self.as_view() {
            if let Transform::AxisRolled(current) = view.transform() {
                let combined: Vec<u64> = current
                    .iter()
                    .zip(&shifts)
                    .zip(self.shape())
                    .map(|((&a, &b), &len)| add_shifts(a, b, len))
                    .collect();
                if combined.iter().all(|&s| s == 0) {
                    return Ok(view.inner.clone());
                }
                return Ok(View::new_cube(
                    view.inner.clone(),
                    view.dims.clone(),
                    Transform::AxisRolled(combined),
                ));
            }
        }

        Ok(View::new_cube(
            self.clone(),
            self.dims().to_vec(),
            Transform::AxisRolled(shifts),
        ))
    }

    /// Return a view which shifts the axes in `axes` by the corresponding
    /// entries of `shifts`. Other axes are not shifted.
    pub fn roll_axes(&self, shifts: &[i64], axes: &[usize]) -> Result<Cube<T>, HypercubeError> {
        if shifts.len() != axes.len() {
            return Err(RollError::AxesMismatch.into());
        }
        let mut all_shifts = vec![0; self.ndim()];
        let mut seen = vec![false; self.ndim()];
        for (&shift, &axis) in shifts.iter().zip(axes) {
            if axis >= self.ndim() {
                return Err(RollError::InvalidAxis(axis).into());
            }
            if seen[axis] {
                return Err(RollError::DuplicateAxis(axis).into());
            }
            seen[axis] = true;
            all_shifts[axis] = shift;
        }
        self.roll(&all_shifts)
    }

    /// Return a view which circularly shifts the flattened elements by
    /// `shift`, keeping the shape.
    ///
    /// This is equivalent to NumPy's `roll` without an axis. A shift which
    /// is a multiple of the size returns this cube unchanged, and rolling a
    /// flat-rolled view combines the shifts.
    pub fn roll_flat(&self, shift: i64) -> Cube<T> {
        let size = self.size();
        let shift = normalize_shift(shift, size);
        if shift == 0 {
            return self.clone();
        }

        if let Some(view) = self.as_view() {
            if let Transform::FlatRolled(current) = *view.transform() {
                let combined = add_shifts(current, shift, size);
                if combined == 0 {
                    return view.inner.clone();
                }
                return View::new_cube(
                    view.inner.clone(),
                    view.dims.clone(),
                    Transform::FlatRolled(combined),
                );
            }
        }

        View::new_cube(
            self.clone(),
            self.dims().to_vec(),
            Transform::FlatRolled(shift),
        )
    }

    /// Return a view of part of this cube.
    ///
    /// `accessors` has one entry per leading axis. An index selects a single
    /// position and removes the axis from the view. A range keeps part of
    /// the axis. Axes without an entry are kept whole. If every axis is kept
    /// whole, this cube is returned unchanged. Slicing a sliced view
    /// produces a single view of the original cube.
    ///
    /// ```
    /// use hypercube::{ArrayCube, Cube, Hypercube};
    ///
    /// let data = (0..6).map(|x| x as f64).collect();
    /// let cube = Cube::new(ArrayCube::from_vec(&[2, 3], data).unwrap());
    ///
    /// let row = cube.slice(1).unwrap();
    /// assert_eq!(row.shape(), [3]);
    /// assert_eq!(row.get(&[2]).unwrap(), 5.);
    ///
    /// let col = cube.slice((.., 1)).unwrap();
    /// assert_eq!(col.shape(), [2]);
    /// assert_eq!(col.get(&[1]).unwrap(), 4.);
    /// ```
    pub fn slice<A: IntoAccessors>(&self, accessors: A) -> Result<Cube<T>, HypercubeError> {
        let accessors = accessors.into_accessors();
        let accessors = accessors.as_ref();
        if accessors.len() > self.ndim() {
            return Err(SliceError::TooManyDims.into());
        }

        let mut axes = Vec::with_capacity(self.ndim());
        for (axis, &len) in self.shape().iter().enumerate() {
            let access = match accessors.get(axis) {
                Some(accessor) => accessor.resolve(len)?,
                None => AxisAccess::Range {
                    start: 0,
                    step: 1,
                    count: len,
                },
            };
            axes.push(SlicedAxis::from_access(access));
        }

        let is_full = axes
            .iter()
            .zip(self.shape())
            .all(|(axis, &len)| *axis == SlicedAxis::Range { start: 0, step: 1, count: len });
        if is_full {
            return Ok(self.clone());
        }

        let (inner, axes) = match self.as_view().map(|view| (view, view.transform())) {
            Some((view, Transform::Sliced(inner_axes))) => {
                (view.inner.clone(), compose_slices(inner_axes, &axes))
            }
            _ => (self.clone(), axes),
        };

        let mut dims = Vec::new();
        for (dim, axis) in inner.dims().iter().zip(&axes) {
            match *axis {
                SlicedAxis::Fixed(_) => {}
                SlicedAxis::Range {
                    start,
                    step: 1,
                    count,
                } => dims.push(dim.sub(start, start + count)?),
                SlicedAxis::Range { start, step, count } => {
                    let mut mask = BitSet::new(dim.length());
                    for i in 0..count {
                        mask.insert(start + i * step);
                    }
                    dims.push(dim.masked(&mask));
                }
            }
        }

        Ok(View::new_cube(inner, dims, Transform::Sliced(axes)))
    }

    /// Return a view of the positions of the first axis which are set in
    /// `mask`.
    ///
    /// The mask must have one position per entry of the first axis. A mask
    /// with every position set returns this cube unchanged, and masking a
    /// masked view produces a single view of the original cube.
    pub fn mask(&self, mask: &BitSet) -> Result<Cube<T>, HypercubeError> {
        if self.ndim() == 0 {
            return Err(DimensionError::CountMismatch {
                expected: 1,
                actual: 0,
            }
            .into());
        }
        let len = self.shape()[0];
        if mask.size() != len {
            return Err(DimensionError::LengthMismatch {
                axis: 0,
                expected: len,
                actual: mask.size(),
            }
            .into());
        }
        if mask.is_full() {
            return Ok(self.clone());
        }

        let mut dims = self.dims().to_vec();
        dims[0] = dims[0].masked(mask);

        let (inner, mapping) = match self.as_view().map(|view| (view, view.transform())) {
            Some((view, Transform::Masked(current))) => (
                view.inner.clone(),
                mask.iter().map(|pos| current[pos as usize]).collect(),
            ),
            _ => (self.clone(), mask.iter().collect()),
        };

        Ok(View::new_cube(inner, dims, Transform::Masked(mapping)))
    }

    /// Variant of [`mask`](Cube::mask) which takes one boolean per position.
    pub fn mask_bools(&self, mask: &[bool]) -> Result<Cube<T>, HypercubeError> {
        self.mask(&BitSet::from_bools(mask))
    }

    /// Variant of [`mask`](Cube::mask) which takes the mask from a
    /// one-dimensional boolean cube.
    pub fn mask_by(&self, mask: &Cube<bool>) -> Result<Cube<T>, HypercubeError> {
        if mask.ndim() != 1 {
            return Err(DimensionError::CountMismatch {
                expected: 1,
                actual: mask.ndim(),
            }
            .into());
        }
        let mut bools = vec![false; mask.size() as usize];
        mask.to_flattened(0, &mut bools)?;
        self.mask_bools(&bools)
    }

    /// Return a view of the elements in the same row-major order with a new
    /// shape.
    ///
    /// The new shape must have the same number of elements. Reshaping to the
    /// current shape returns this cube unchanged, and reshaping a reshaped
    /// view reshapes the cube it wraps.
    pub fn reshape(&self, shape: &[u64]) -> Result<Cube<T>, HypercubeError> {
        if size_of(shape) != self.size() {
            return Err(ReshapeError::LengthMismatch.into());
        }
        if shape == self.shape() {
            return Ok(self.clone());
        }
        let inner = match self.view_if(|t| *t == Transform::Reshaped) {
            Some(view) => view.inner.clone(),
            None => self.clone(),
        };
        if shape == inner.shape() {
            return Ok(inner);
        }
        Ok(View::new_cube(inner, Dimension::of(shape), Transform::Reshaped))
    }
}

/// Combine the axes of a sliced view with a slice of that view into a
/// single slice of the view's inner cube.
///
/// `outer` has one entry per axis of the sliced view, which are the range
/// entries of `inner`, in order.
fn compose_slices(inner: &[SlicedAxis], outer: &[SlicedAxis]) -> Vec<SlicedAxis> {
    let mut outer_axis = 0;
    inner
        .iter()
        .map(|axis| match *axis {
            SlicedAxis::Fixed(coord) => SlicedAxis::Fixed(coord),
            SlicedAxis::Range { start, step, .. } => {
                let composed = match outer[outer_axis] {
                    SlicedAxis::Fixed(coord) => SlicedAxis::Fixed(start + coord * step),
                    SlicedAxis::Range {
                        start: outer_start,
                        step: outer_step,
                        count,
                    } => SlicedAxis::Range {
                        start: start + outer_start * step,
                        step: step * outer_step,
                        count,
                    },
                };
                outer_axis += 1;
                composed
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hypercube_testing::TestCases;

    use super::{SlicedAxis, Transform};
    use crate::accessor::{to_accessors, Accessor};
    use crate::bit_set::BitSet;
    use crate::cube::{Cube, Hypercube};
    use crate::errors::{DimensionError, HypercubeError, RollError, SliceError};
    use crate::layout::{size_of, unravel, DynIndex};
    use crate::ops::to_vec;
    use crate::storage::{ArrayCube, SparseCube};

    fn arange(shape: &[u64]) -> Cube<f64> {
        let data = (0..size_of(shape)).map(|x| x as f64).collect();
        Cube::new(ArrayCube::from_vec(shape, data).unwrap())
    }

    /// Like `arange`, but with storage split into chunks of `1 << chunk_shift`
    /// elements.
    fn arange_chunked(shape: &[u64], chunk_shift: u32) -> Cube<f64> {
        let cube = ArrayCube::with_chunk_shift(shape, chunk_shift);
        let data: Vec<f64> = (0..size_of(shape)).map(|x| x as f64).collect();
        cube.from_flattened(&data, 0).unwrap();
        Cube::new(cube)
    }

    /// Read every element of `cube` one at a time.
    fn elementwise(cube: &Cube<f64>) -> Vec<f64> {
        (0..cube.size()).map(|i| cube.get_at(i).unwrap()).collect()
    }

    #[test]
    fn test_concrete_scenario() {
        let cube = arange(&[2, 3]);

        let rolled = cube.roll(&[1, 0]).unwrap();
        assert_eq!(to_vec(&rolled).unwrap(), [3., 4., 5., 0., 1., 2.]);

        let transposed = cube.transpose();
        assert_eq!(transposed.shape(), [3, 2]);
        assert_eq!(transposed.get(&[1, 0]).unwrap(), 1.);
        assert_eq!(
            transposed.get(&[1, 0]).unwrap(),
            cube.get(&[0, 1]).unwrap()
        );

        let masked = cube.mask_bools(&[true, false]).unwrap();
        assert_eq!(masked.shape(), [1, 3]);
        assert_eq!(to_vec(&masked).unwrap(), [0., 1., 2.]);
    }

    #[test]
    fn test_transpose() {
        let cube = arange(&[2, 3, 4]);
        let transposed = cube.transpose();
        assert_eq!(transposed.shape(), [4, 3, 2]);
        for i in 0..4 {
            for j in 0..3 {
                for k in 0..2 {
                    assert_eq!(
                        transposed.get(&[i, j, k]).unwrap(),
                        cube.get(&[k, j, i]).unwrap()
                    );
                }
            }
        }
        assert_eq!(to_vec(&transposed).unwrap(), elementwise(&transposed));
    }

    #[test]
    fn test_roll() {
        #[derive(Debug)]
        struct Case {
            shape: Vec<u64>,
            shifts: Vec<i64>,
            expected: Vec<f64>,
        }

        let cases = [
            Case {
                shape: vec![5],
                shifts: vec![2],
                expected: vec![3., 4., 0., 1., 2.],
            },
            Case {
                shape: vec![5],
                shifts: vec![-1],
                expected: vec![1., 2., 3., 4., 0.],
            },
            Case {
                shape: vec![5],
                shifts: vec![7],
                expected: vec![3., 4., 0., 1., 2.],
            },
            Case {
                shape: vec![2, 3],
                shifts: vec![0, 1],
                expected: vec![2., 0., 1., 5., 3., 4.],
            },
            Case {
                shape: vec![2, 3],
                shifts: vec![1, 2],
                expected: vec![4., 5., 3., 1., 2., 0.],
            },
        ];

        cases.test_each(|case| {
            let cube = arange(&case.shape);
            let rolled = cube.roll(&case.shifts).unwrap();
            assert_eq!(to_vec(&rolled).unwrap(), case.expected);
            assert_eq!(elementwise(&rolled), case.expected);
        })
    }

    #[test]
    fn test_roll_axes() {
        let cube = arange(&[2, 3]);
        let rolled = cube.roll_axes(&[1], &[1]).unwrap();
        assert_eq!(to_vec(&rolled).unwrap(), [2., 0., 1., 5., 3., 4.]);

        assert!(matches!(
            cube.roll_axes(&[1, 1], &[0, 0]),
            Err(HypercubeError::Roll(RollError::DuplicateAxis(0)))
        ));
        assert!(matches!(
            cube.roll_axes(&[1], &[2]),
            Err(HypercubeError::Roll(RollError::InvalidAxis(2)))
        ));
        assert!(matches!(
            cube.roll_axes(&[1, 2], &[0]),
            Err(HypercubeError::Roll(RollError::AxesMismatch))
        ));
        assert!(matches!(
            cube.roll(&[1]),
            Err(HypercubeError::Dimension(DimensionError::CountMismatch {
                expected: 2,
                actual: 1
            }))
        ));
    }

    #[test]
    fn test_roll_flat() {
        let cube = arange(&[2, 3]);
        let rolled = cube.roll_flat(2);
        assert_eq!(rolled.shape(), [2, 3]);
        assert_eq!(to_vec(&rolled).unwrap(), [4., 5., 0., 1., 2., 3.]);
        assert_eq!(elementwise(&rolled), [4., 5., 0., 1., 2., 3.]);

        let rolled = cube.roll_flat(-1);
        assert_eq!(to_vec(&rolled).unwrap(), [1., 2., 3., 4., 5., 0.]);

        // Flat roll of a 1D cube is the same as an axis roll.
        let line = arange(&[7]);
        assert_eq!(
            to_vec(&line.roll_flat(3)).unwrap(),
            to_vec(&line.roll(&[3]).unwrap()).unwrap()
        );
    }

    #[test]
    fn test_slice() {
        let cube = arange(&[3, 4]);

        let sliced = cube.slice((1.., 1..3)).unwrap();
        assert_eq!(sliced.shape(), [2, 2]);
        assert_eq!(to_vec(&sliced).unwrap(), [5., 6., 9., 10.]);

        let row = cube.slice(2).unwrap();
        assert_eq!(row.shape(), [4]);
        assert_eq!(to_vec(&row).unwrap(), [8., 9., 10., 11.]);

        let col = cube.slice((.., -1)).unwrap();
        assert_eq!(col.shape(), [3]);
        assert_eq!(to_vec(&col).unwrap(), [3., 7., 11.]);

        let stepped = cube.slice((.., Accessor::range(0, None, 2))).unwrap();
        assert_eq!(stepped.shape(), [3, 2]);
        assert_eq!(to_vec(&stepped).unwrap(), [0., 2., 4., 6., 8., 10.]);
        assert_eq!(elementwise(&stepped), [0., 2., 4., 6., 8., 10.]);

        let scalar = cube.slice([1, 2]).unwrap();
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar.size(), 1);
        assert_eq!(scalar.get(&[]).unwrap(), 6.);

        let empty = cube.slice((1..1,)).unwrap();
        assert_eq!(empty.shape(), [0, 4]);
        assert!(to_vec(&empty).unwrap().is_empty());

        let items = to_accessors(&[Accessor::At(0), Accessor::full()]);
        let first = cube.slice(items.as_slice()).unwrap();
        assert_eq!(to_vec(&first).unwrap(), [0., 1., 2., 3.]);
    }

    #[test]
    fn test_slice_errors() {
        let cube = arange(&[3, 4]);
        assert!(matches!(
            cube.slice((0, 0, 0)),
            Err(HypercubeError::Slice(SliceError::TooManyDims))
        ));
        assert!(matches!(
            cube.slice(3),
            Err(HypercubeError::Slice(SliceError::InvalidIndex))
        ));
        assert!(matches!(
            cube.slice((.., 0..5)),
            Err(HypercubeError::Slice(SliceError::InvalidRange))
        ));
    }

    #[test]
    fn test_slice_dims_keep_keys() {
        use crate::index::{Index, MaskedIndex, NaturalIndex, SubIndex};

        let cube = arange(&[3, 6]);
        let sliced = cube.slice((1..3, Accessor::range(1, None, 2))).unwrap();
        let rows = sliced.dims()[0]
            .index_as::<SubIndex<NaturalIndex>>()
            .unwrap();
        assert_eq!(rows.key_of(0), Some(1));
        let cols = sliced.dims()[1]
            .index_as::<MaskedIndex<NaturalIndex>>()
            .unwrap();
        assert_eq!(cols.positions(), [1, 3, 5]);
    }

    #[test]
    fn test_mask() {
        let cube = arange(&[4, 2]);
        let masked = cube.mask_bools(&[false, true, false, true]).unwrap();
        assert_eq!(masked.shape(), [2, 2]);
        assert_eq!(to_vec(&masked).unwrap(), [2., 3., 6., 7.]);

        let line = arange(&[6]);
        let masked = line
            .mask_bools(&[true, true, false, true, true, true])
            .unwrap();
        assert_eq!(to_vec(&masked).unwrap(), [0., 1., 3., 4., 5.]);
        assert_eq!(elementwise(&masked), [0., 1., 3., 4., 5.]);

        let by_cube = Cube::new(
            ArrayCube::from_vec(&[6], vec![false, true, true, false, false, true]).unwrap(),
        );
        let masked = line.mask_by(&by_cube).unwrap();
        assert_eq!(to_vec(&masked).unwrap(), [1., 2., 5.]);

        assert!(matches!(
            cube.mask_bools(&[true]),
            Err(HypercubeError::Dimension(DimensionError::LengthMismatch {
                axis: 0,
                expected: 4,
                actual: 1
            }))
        ));
    }

    #[test]
    fn test_reshape() {
        let cube = arange(&[2, 3]);
        let reshaped = cube.reshape(&[3, 2]).unwrap();
        assert_eq!(reshaped.get(&[2, 1]).unwrap(), 5.);
        assert_eq!(to_vec(&reshaped).unwrap(), to_vec(&cube).unwrap());
        assert!(cube.reshape(&[4, 2]).is_err());

        let flat = reshaped.reshape(&[6]).unwrap();
        assert_eq!(flat.depth(), 1);
        assert!(reshaped.reshape(&[2, 3]).unwrap().ptr_eq(&cube));
    }

    #[test]
    fn test_no_op_collapsing() {
        let cube = arange(&[3, 4]);

        assert!(cube.roll(&[0, 0]).unwrap().ptr_eq(&cube));
        assert!(cube.roll(&[3, -4]).unwrap().ptr_eq(&cube));
        assert!(cube.transpose().transpose().ptr_eq(&cube));
        assert!(cube.roll_flat(12).ptr_eq(&cube));
        assert!(cube.slice(..).unwrap().ptr_eq(&cube));
        assert!(cube.slice((.., 0..4)).unwrap().ptr_eq(&cube));
        assert!(cube
            .mask_bools(&[true, true, true])
            .unwrap()
            .ptr_eq(&cube));
        assert!(cube.reshape(&[3, 4]).unwrap().ptr_eq(&cube));

        let line = arange(&[5]);
        assert!(line.transpose().ptr_eq(&line));

        // An all-zero roll of a transposed view returns the view itself.
        let transposed = cube.transpose();
        assert!(transposed.roll(&[0, 0]).unwrap().ptr_eq(&transposed));
    }

    #[test]
    fn test_roll_combines() {
        let cube = arange(&[3, 4]);
        let once = cube.roll(&[1, 1]).unwrap();
        let twice = once.roll(&[1, 2]).unwrap();
        assert_eq!(twice.depth(), 1);
        assert_eq!(
            twice.as_view().unwrap().transform(),
            &Transform::AxisRolled(vec![2, 3])
        );
        assert_eq!(
            to_vec(&twice).unwrap(),
            to_vec(&cube.roll(&[2, 3]).unwrap()).unwrap()
        );

        // Rolls which cancel out return the original cube.
        let back = once.roll(&[-1, 3]).unwrap();
        assert!(back.ptr_eq(&cube));

        let flat = cube.roll_flat(5).roll_flat(4);
        assert_eq!(flat.depth(), 1);
        assert_eq!(flat.as_view().unwrap().transform(), &Transform::FlatRolled(9));
        assert!(flat.roll_flat(3).ptr_eq(&cube));
    }

    #[test]
    fn test_slice_composes() {
        let cube = arange(&[4, 5, 6]);
        let once = cube.slice((1.., 2, Accessor::range(1, None, 2))).unwrap();
        assert_eq!(once.shape(), [3, 3]);
        let twice = once.slice((1..3, 1)).unwrap();
        assert_eq!(twice.shape(), [2]);
        assert_eq!(twice.depth(), 1);
        assert_eq!(
            twice.as_view().unwrap().transform(),
            &Transform::Sliced(vec![
                SlicedAxis::Range {
                    start: 2,
                    step: 1,
                    count: 2
                },
                SlicedAxis::Fixed(2),
                SlicedAxis::Fixed(3),
            ])
        );
        // Positions (2, 2, 3) and (3, 2, 3).
        assert_eq!(to_vec(&twice).unwrap(), [2. * 30. + 15., 3. * 30. + 15.]);
    }

    #[test]
    fn test_mask_composes() {
        let cube = arange(&[5, 2]);
        let once = cube
            .mask_bools(&[true, false, true, true, true])
            .unwrap();
        let twice = once.mask_bools(&[false, true, true, false]).unwrap();
        assert_eq!(twice.depth(), 1);
        assert_eq!(
            twice.as_view().unwrap().transform(),
            &Transform::Masked(vec![2, 3])
        );
        assert_eq!(to_vec(&twice).unwrap(), [4., 5., 6., 7.]);
    }

    #[test]
    fn test_round_trip_views() {
        let cube = arange(&[3, 7, 5]);
        let expected = to_vec(&cube).unwrap();

        let rolled = cube.roll(&[1, 3, 4]).unwrap();
        let unrolled = rolled.roll(&[-1, 4, 1]).unwrap();
        assert_eq!(to_vec(&unrolled).unwrap(), expected);

        let back = cube.transpose().transpose();
        assert_eq!(to_vec(&back).unwrap(), expected);

        // Rolls around the transpose do not collapse, but still invert.
        let mixed = cube.transpose().roll(&[2, 0, 1]).unwrap().transpose();
        let unmixed = mixed.roll(&[-1, 0, -2]).unwrap();
        assert_eq!(to_vec(&unmixed).unwrap(), expected);
    }

    #[test]
    fn test_slice_then_roll_matches_manual_translation() {
        let cube = arange(&[4, 6]);
        let view = cube
            .slice((1..4, Accessor::range(1, None, 2)))
            .unwrap()
            .roll(&[1, 2])
            .unwrap();
        assert_eq!(view.shape(), [3, 3]);

        for i in 0..3u64 {
            for j in 0..3u64 {
                // Undo the roll, then the slice.
                let si = (i + 3 - 1) % 3;
                let sj = (j + 3 - 2) % 3;
                let (ci, cj) = (1 + si, 1 + sj * 2);
                assert_eq!(
                    view.get(&[i, j]).unwrap(),
                    cube.get(&[ci, cj]).unwrap(),
                    "mismatch at {:?}",
                    (i, j)
                );
            }
        }
    }

    #[test]
    fn test_unflatten_through_views() {
        let storage = Cube::new(ArrayCube::<f64>::new(&[3, 4]));
        storage.from_flattened(&[0.; 12], 0).unwrap();
        let view = storage.transpose().roll(&[1, 1]).unwrap();
        let data: Vec<f64> = (0..12).map(|x| x as f64).collect();
        view.from_flattened(&data, 0).unwrap();
        assert_eq!(elementwise(&view), data);

        // Element (0, 0) of the view is element (3, 2) of the transpose.
        assert_eq!(storage.get(&[2, 3]).unwrap(), 0.);
    }

    #[test]
    fn test_nullable_transfers_through_views() {
        let sparse = Cube::new(SparseCube::<f64>::new(&[3, 3]));
        sparse.set(&[0, 1], 1.5).unwrap();
        sparse.set(&[2, 2], 2.5).unwrap();

        let view = sparse.roll(&[1, 0]).unwrap().slice((.., 1..)).unwrap();
        let mut objs = vec![Some(0.); 6];
        view.to_flattened_objs(0, &mut objs).unwrap();
        assert_eq!(objs, [None, Some(2.5), Some(1.5), None, None, None]);

        view.from_flattened_objs(&[Some(9.), None], 4).unwrap();
        assert_eq!(sparse.get_object(&[1, 1]).unwrap(), Some(9.));
        assert_eq!(sparse.get_object(&[1, 2]).unwrap(), None);
    }

    #[test]
    fn test_bulk_errors() {
        let view = arange(&[2, 3]).transpose();
        let mut buf = [0.; 4];
        assert!(matches!(
            view.to_flattened(3, &mut buf),
            Err(HypercubeError::Index(_))
        ));
        assert!(view.from_flattened(&buf, 3).is_err());
        assert!(view.get_at(6).is_err());
        assert!(view.get(&[0, 0, 0]).is_err());
    }

    /// Build a random chain of views over `cube`.
    fn random_view(rng: &mut fastrand::Rng, cube: &Cube<f64>, depth: usize) -> Cube<f64> {
        let mut view = cube.clone();
        for _ in 0..depth {
            if view.size() == 0 {
                break;
            }
            view = match rng.usize(0..6) {
                0 => view.transpose(),
                1 => {
                    let shifts: Vec<i64> = view
                        .shape()
                        .iter()
                        .map(|&len| rng.i64(-(len as i64)..=len as i64))
                        .collect();
                    view.roll(&shifts).unwrap()
                }
                2 => view.roll_flat(rng.i64(-20..20)),
                3 if view.ndim() > 0 => {
                    let bools: Vec<bool> = (0..view.shape()[0]).map(|_| rng.u8(0..4) > 0).collect();
                    view.mask_bools(&bools).unwrap()
                }
                4 => {
                    let accessors: Vec<Accessor> = view
                        .shape()
                        .iter()
                        .map(|&len| {
                            let len = len as isize;
                            match rng.u8(0..4) {
                                0 if len > 1 => Accessor::At(rng.isize(0..len)),
                                1 => {
                                    let start = rng.isize(0..=len);
                                    let end = rng.isize(start..=len);
                                    Accessor::range(start, Some(end), rng.isize(1..3))
                                }
                                _ => Accessor::full(),
                            }
                        })
                        .collect();
                    view.slice(accessors).unwrap()
                }
                _ => {
                    let size = view.size();
                    view.reshape(&[size]).unwrap()
                }
            };
        }
        view
    }

    #[test]
    fn test_bulk_transfers_match_elementwise() {
        let mut rng = fastrand::Rng::with_seed(1234);
        let shapes: [&[u64]; 5] = [&[7], &[3, 7, 5], &[4, 4], &[2, 3, 2, 3], &[5, 1, 6]];

        for i in 0..200 {
            let shape = shapes[i % shapes.len()];
            // Use tiny chunks so that runs cross chunk boundaries.
            let cube = arange_chunked(shape, 2);
            let view = random_view(&mut rng, &cube, 1 + i % 4);
            let size = view.size();
            if size == 0 {
                continue;
            }

            let expected = elementwise(&view);
            let start = rng.u64(0..size);
            let len = rng.u64(0..=size - start) as usize;
            let mut buf = vec![0.; len];
            view.to_flattened(start, &mut buf).unwrap();
            assert_eq!(
                buf,
                expected[start as usize..start as usize + len],
                "flatten mismatch for {:?}",
                view
            );

            let mut objs = vec![None; len];
            view.to_flattened_objs(start, &mut objs).unwrap();
            assert!(objs
                .iter()
                .zip(&buf)
                .all(|(obj, val)| *obj == Some(*val)));

            // Write negated values back and check them one at a time.
            let negated: Vec<f64> = buf.iter().map(|x| -x - 1.).collect();
            view.from_flattened(&negated, start).unwrap();
            for (offset, val) in negated.iter().enumerate() {
                assert_eq!(view.get_at(start + offset as u64).unwrap(), *val);
            }
        }
    }

    #[test]
    fn test_get_matches_manual_coordinates() {
        // Check per-element translation against coordinates computed by hand
        // for a chain of every coordinate transform.
        let cube = arange(&[4, 3, 5]);
        let view = cube
            .mask_bools(&[true, false, true, true])
            .unwrap()
            .roll(&[1, 0, 2])
            .unwrap()
            .transpose();
        assert_eq!(view.shape(), [5, 3, 3]);

        let mapping = [0, 2, 3];
        let mut local = DynIndex::new();
        for pos in 0..view.size() {
            unravel(view.shape(), pos, &mut local);
            let (k, j, i) = (local[0], local[1], local[2]);
            let i = mapping[((i + 3 - 1) % 3) as usize];
            let k = (k + 5 - 2) % 5;
            assert_eq!(view.get_at(pos).unwrap(), cube.get(&[i, j, k]).unwrap());
        }
    }

    #[test]
    fn test_mask_bit_set() {
        let cube = arange(&[70]);
        let mut mask = BitSet::new(70);
        mask.insert(0);
        mask.insert(64);
        mask.insert(65);
        let masked = cube.mask(&mask).unwrap();
        assert_eq!(to_vec(&masked).unwrap(), [0., 64., 65.]);
    }
}
