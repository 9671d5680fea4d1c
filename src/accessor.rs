//! Per-axis specifications for slicing a cube.

use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};

use smallvec::SmallVec;

use crate::errors::SliceError;

/// Specifies what to keep of one axis when slicing a cube.
///
/// Can be constructed from an index or range using `index_or_range.into()`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Accessor {
    /// Select a single coordinate. The axis is dropped from the sliced view.
    /// Negative values count back from the end of the axis.
    At(isize),

    /// Keep a subset of the axis.
    Range(SliceRange),
}

impl Accessor {
    /// Return an accessor that keeps the whole axis.
    #[inline]
    pub fn full() -> Self {
        (..).into()
    }

    /// Return an accessor that keeps part of an axis.
    #[inline]
    pub fn range(start: isize, end: Option<isize>, step: isize) -> Accessor {
        Accessor::Range(SliceRange::new(start, end, step))
    }

    /// Resolve the accessor against an axis of length `len`.
    pub(crate) fn resolve(&self, len: u64) -> Result<AxisAccess, SliceError> {
        match *self {
            Accessor::At(index) => {
                let resolved = resolve_index(index, len).ok_or(SliceError::InvalidIndex)?;
                if resolved >= len {
                    return Err(SliceError::InvalidIndex);
                }
                Ok(AxisAccess::Fixed(resolved))
            }
            Accessor::Range(range) => range.resolve(len),
        }
    }
}

// As in NumPy, a bare integer literal such as `cube.slice((0, ..))` needs
// one preferred conversion, which is the `i32` one.
macro_rules! impl_accessor_from_int {
    ($($type:ty),*) => {
        $(
            impl From<$type> for Accessor {
                #[inline]
                fn from(value: $type) -> Self {
                    Accessor::At(value as isize)
                }
            }
        )*
    };
}

impl_accessor_from_int!(i32, isize, usize, i64, u64);

impl<R> From<R> for Accessor
where
    R: Into<SliceRange>,
{
    fn from(value: R) -> Self {
        Accessor::Range(value.into())
    }
}

/// Resolution of an [`Accessor`] against a particular axis length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum AxisAccess {
    /// A single coordinate in `[0, len)`.
    Fixed(u64),

    /// `count` positions starting at `start` and advancing by `step`.
    Range { start: u64, step: u64, count: u64 },
}

/// Used to convert sequences of indices and/or ranges into a uniform
/// `[Accessor]` array that can be used to slice a cube.
///
/// This trait is implemented for:
///
///  - Individual indices and ranges (types satisfying `Into<Accessor>`)
///  - Arrays of indices or ranges
///  - Tuples of indices and/or ranges
///  - `[Accessor]` slices and `Vec<Accessor>`
///
/// Axes not covered by the sequence are kept whole.
pub trait IntoAccessors {
    type Array: AsRef<[Accessor]>;

    fn into_accessors(self) -> Self::Array;
}

impl<'a> IntoAccessors for &'a [Accessor] {
    type Array = &'a [Accessor];

    fn into_accessors(self) -> &'a [Accessor] {
        self
    }
}

impl IntoAccessors for Vec<Accessor> {
    type Array = Vec<Accessor>;

    fn into_accessors(self) -> Vec<Accessor> {
        self
    }
}

impl<const N: usize, T: Into<Accessor>> IntoAccessors for [T; N] {
    type Array = [Accessor; N];

    fn into_accessors(self) -> [Accessor; N] {
        self.map(|x| x.into())
    }
}

impl<T: Into<Accessor>> IntoAccessors for T {
    type Array = [Accessor; 1];

    fn into_accessors(self) -> [Accessor; 1] {
        [self.into()]
    }
}

impl<T1: Into<Accessor>> IntoAccessors for (T1,) {
    type Array = [Accessor; 1];

    fn into_accessors(self) -> [Accessor; 1] {
        [self.0.into()]
    }
}

impl<T1: Into<Accessor>, T2: Into<Accessor>> IntoAccessors for (T1, T2) {
    type Array = [Accessor; 2];

    fn into_accessors(self) -> [Accessor; 2] {
        [self.0.into(), self.1.into()]
    }
}

impl<T1: Into<Accessor>, T2: Into<Accessor>, T3: Into<Accessor>> IntoAccessors
    for (T1, T2, T3)
{
    type Array = [Accessor; 3];

    fn into_accessors(self) -> [Accessor; 3] {
        [self.0.into(), self.1.into(), self.2.into()]
    }
}

impl<T1: Into<Accessor>, T2: Into<Accessor>, T3: Into<Accessor>, T4: Into<Accessor>>
    IntoAccessors for (T1, T2, T3, T4)
{
    type Array = [Accessor; 4];

    fn into_accessors(self) -> [Accessor; 4] {
        [self.0.into(), self.1.into(), self.2.into(), self.3.into()]
    }
}

/// Dynamically sized array of [`Accessor`]s, which avoids allocating in the
/// common case where the length is small.
pub type DynAccessors = SmallVec<[Accessor; 5]>;

/// Convert a slice of indices or ranges into [`Accessor`]s.
pub fn to_accessors<T: Clone + Into<Accessor>>(items: &[T]) -> DynAccessors {
    items.iter().map(|x| x.clone().into()).collect()
}

/// A range of positions along an axis.
///
/// This differs from [`Range`] in two ways, both following NumPy:
///
/// - A step between kept positions can be given. It must be positive.
/// - The `start` and `end` can be negative, in which case they count back
///   from the end of the axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceRange {
    /// First index in range.
    pub start: isize,

    /// Last index (exclusive) in range, or None if the range extends to the
    /// end of the axis.
    pub end: Option<isize>,

    step: isize,
}

impl SliceRange {
    /// Create a new range from `start` (inclusive) to `end` (exclusive). If
    /// `end` is None the range extends to the end of the axis.
    ///
    /// A `step` which is not positive is reported when the range is used to
    /// slice a cube.
    #[inline]
    pub fn new(start: isize, end: Option<isize>, step: isize) -> SliceRange {
        SliceRange { start, end, step }
    }

    pub fn step(&self) -> isize {
        self.step
    }

    /// Resolve the range endpoints against an axis of length `len`.
    ///
    /// Endpoints must lie within `[-len, len]`. A range whose end precedes
    /// its start is empty.
    pub(crate) fn resolve(&self, len: u64) -> Result<AxisAccess, SliceError> {
        if self.step <= 0 {
            return Err(SliceError::InvalidStep);
        }
        let start = resolve_index(self.start, len).ok_or(SliceError::InvalidRange)?;
        let end = match self.end {
            Some(end) => resolve_index(end, len).ok_or(SliceError::InvalidRange)?,
            None => len,
        };
        if start > len || end > len {
            return Err(SliceError::InvalidRange);
        }
        let step = self.step as u64;
        let count = end.saturating_sub(start).div_ceil(step);
        Ok(AxisAccess::Range { start, step, count })
    }
}

/// Resolve a possibly negative index against an axis of length `len`.
fn resolve_index(index: isize, len: u64) -> Option<u64> {
    if index >= 0 {
        Some(index as u64)
    } else {
        len.checked_sub(index.unsigned_abs() as u64)
    }
}

/// Integer types which can be used as range endpoints.
pub trait RangeIndex: Copy {
    fn as_isize(self) -> isize;
}

macro_rules! impl_range_index {
    ($($type:ty),*) => {
        $(
            impl RangeIndex for $type {
                #[inline]
                fn as_isize(self) -> isize {
                    self as isize
                }
            }
        )*
    };
}

impl_range_index!(i32, isize, usize, i64, u64);

impl<T: RangeIndex> From<Range<T>> for SliceRange {
    fn from(r: Range<T>) -> SliceRange {
        SliceRange::new(r.start.as_isize(), Some(r.end.as_isize()), 1)
    }
}

impl<T: RangeIndex> From<RangeInclusive<T>> for SliceRange {
    fn from(r: RangeInclusive<T>) -> SliceRange {
        let end = r.end().as_isize();
        // `..=-1` includes the last element.
        let end = if end == -1 { None } else { Some(end + 1) };
        SliceRange::new(r.start().as_isize(), end, 1)
    }
}

impl<T: RangeIndex> From<RangeTo<T>> for SliceRange {
    fn from(r: RangeTo<T>) -> SliceRange {
        SliceRange::new(0, Some(r.end.as_isize()), 1)
    }
}

impl<T: RangeIndex> From<RangeFrom<T>> for SliceRange {
    fn from(r: RangeFrom<T>) -> SliceRange {
        SliceRange::new(r.start.as_isize(), None, 1)
    }
}

impl From<RangeFull> for SliceRange {
    #[inline]
    fn from(_: RangeFull) -> SliceRange {
        SliceRange::new(0, None, 1)
    }
}
