//! Error types that are reported by cube operations.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error when the number of indices, accessors or shifts supplied does not
/// match a cube's rank, or when two cubes' shapes are incompatible.
#[derive(Clone, Debug, PartialEq)]
pub enum DimensionError {
    /// Wrong number of dimensions.
    CountMismatch { expected: usize, actual: usize },

    /// The dimension counts match but the length of `axis` does not.
    LengthMismatch {
        axis: usize,
        expected: u64,
        actual: u64,
    },
}

impl Display for DimensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DimensionError::CountMismatch { expected, actual } => {
                write!(f, "expected {} dims but got {}", expected, actual)
            }
            DimensionError::LengthMismatch {
                axis,
                expected,
                actual,
            } => write!(
                f,
                "length of axis {} is {} but expected {}",
                axis, actual, expected
            ),
        }
    }
}

impl Error for DimensionError {}

/// Error when a coordinate or flat position is out of range.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexError {
    /// Axis of the coordinate, or `None` for a flat position.
    pub axis: Option<usize>,
    pub index: u64,
    pub len: u64,
}

impl IndexError {
    pub(crate) fn flat(index: u64, len: u64) -> Self {
        IndexError {
            axis: None,
            index,
            len,
        }
    }
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.axis {
            Some(axis) => write!(
                f,
                "index {} is out of bounds for axis {} with length {}",
                self.index, axis, self.len
            ),
            None => write!(
                f,
                "position {} is out of bounds for size {}",
                self.index, self.len
            ),
        }
    }
}

impl Error for IndexError {}

/// Errors that can occur when slicing a cube.
#[derive(Clone, Debug, PartialEq)]
pub enum SliceError {
    /// The slice has more accessors than the cube being sliced.
    TooManyDims,

    /// An index in the slice is out of bounds for the corresponding
    /// axis.
    InvalidIndex,

    /// A range in the slice is out of bounds for the corresponding axis.
    InvalidRange,

    /// The step of a slice range is zero.
    InvalidStep,
}

impl Display for SliceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceError::TooManyDims => write!(f, "slice has too many accessors"),
            SliceError::InvalidIndex => write!(f, "slice index is invalid"),
            SliceError::InvalidRange => write!(f, "slice range is invalid"),
            SliceError::InvalidStep => write!(f, "slice step is invalid"),
        }
    }
}

impl Error for SliceError {}

/// Errors that can occur when rolling along a list of axes.
#[derive(Clone, Debug, PartialEq)]
pub enum RollError {
    /// The number of shifts does not match the number of axes.
    AxesMismatch,

    /// An axis is out of range for the cube's rank.
    InvalidAxis(usize),

    /// The same axis was given more than once.
    DuplicateAxis(usize),
}

impl Display for RollError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RollError::AxesMismatch => write!(f, "shift and axis counts differ"),
            RollError::InvalidAxis(axis) => write!(f, "roll axis {} is invalid", axis),
            RollError::DuplicateAxis(axis) => {
                write!(f, "roll axis {} is given more than once", axis)
            }
        }
    }
}

impl Error for RollError {}

/// Errors that can occur while reshaping a cube.
#[derive(Clone, Debug, PartialEq)]
pub enum ReshapeError {
    /// The new shape has a different number of elements.
    LengthMismatch,
}

impl Display for ReshapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReshapeError::LengthMismatch => write!(f, "new shape has a different length"),
        }
    }
}

impl Error for ReshapeError {}

/// Errors that can occur when constructing a cube, dimension or index from
/// existing data.
#[derive(Clone, Debug, PartialEq)]
pub enum FromDataError {
    /// The storage length was expected to exactly match the product of the
    /// shape, and it did not.
    StorageLengthMismatch,

    /// The data is larger than a single storage chunk can hold.
    CapacityExceeded { len: u64, max: u64 },

    /// A dimension length was negative.
    NegativeLength(i64),

    /// A dimension length differs from the size of its index.
    IndexSizeMismatch { length: u64, index_size: u64 },

    /// A mapped index was given the same key twice.
    DuplicateKey,

    /// A mapped index was given no keys.
    EmptyIndex,

    /// A sub-range does not lie within its index.
    InvalidRange { start: u64, end: u64, size: u64 },

    /// Nested data does not have the same depth everywhere.
    InconsistentDepth,
}

impl Display for FromDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FromDataError::StorageLengthMismatch => write!(f, "data length mismatch"),
            FromDataError::CapacityExceeded { len, max } => {
                write!(f, "data length {} exceeds the chunk capacity {}", len, max)
            }
            FromDataError::NegativeLength(len) => write!(f, "negative dimension length {}", len),
            FromDataError::IndexSizeMismatch { length, index_size } => write!(
                f,
                "dimension length {} differs from index size {}",
                length, index_size
            ),
            FromDataError::DuplicateKey => write!(f, "index contains duplicate keys"),
            FromDataError::EmptyIndex => write!(f, "index has no keys"),
            FromDataError::InvalidRange { start, end, size } => write!(
                f,
                "range [{}, {}) is invalid for index of size {}",
                start, end, size
            ),
            FromDataError::InconsistentDepth => write!(f, "nested data has inconsistent depth"),
        }
    }
}

impl Error for FromDataError {}

/// Error type returned by the operations of [`Hypercube`](crate::Hypercube)
/// and the backends.
#[derive(Debug)]
pub enum HypercubeError {
    Dimension(DimensionError),
    Index(IndexError),
    Slice(SliceError),
    Roll(RollError),
    Reshape(ReshapeError),
    FromData(FromDataError),

    /// A write was attempted on read-only storage.
    ReadOnly,

    /// An argument was outside its documented domain.
    InvalidArgument(String),

    /// An I/O error from a file-backed cube.
    Io(std::io::Error),
}

impl Display for HypercubeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HypercubeError::Dimension(err) => write!(f, "dimension error: {}", err),
            HypercubeError::Index(err) => write!(f, "index error: {}", err),
            HypercubeError::Slice(err) => write!(f, "slice error: {}", err),
            HypercubeError::Roll(err) => write!(f, "roll error: {}", err),
            HypercubeError::Reshape(err) => write!(f, "reshape error: {}", err),
            HypercubeError::FromData(err) => write!(f, "invalid data: {}", err),
            HypercubeError::ReadOnly => write!(f, "cube is read-only"),
            HypercubeError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            HypercubeError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl Error for HypercubeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HypercubeError::Dimension(err) => Some(err),
            HypercubeError::Index(err) => Some(err),
            HypercubeError::Slice(err) => Some(err),
            HypercubeError::Roll(err) => Some(err),
            HypercubeError::Reshape(err) => Some(err),
            HypercubeError::FromData(err) => Some(err),
            HypercubeError::Io(err) => Some(err),
            HypercubeError::ReadOnly | HypercubeError::InvalidArgument(_) => None,
        }
    }
}

macro_rules! impl_from_error {
    ($err:ty, $variant:ident) => {
        impl From<$err> for HypercubeError {
            fn from(val: $err) -> HypercubeError {
                HypercubeError::$variant(val)
            }
        }
    };
}

impl_from_error!(DimensionError, Dimension);
impl_from_error!(IndexError, Index);
impl_from_error!(SliceError, Slice);
impl_from_error!(RollError, Roll);
impl_from_error!(ReshapeError, Reshape);
impl_from_error!(FromDataError, FromData);
impl_from_error!(std::io::Error, Io);
