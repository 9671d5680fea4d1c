use std::fmt;
use std::sync::Arc;

use crate::bit_set::BitSet;
use crate::errors::FromDataError;
use crate::index::{DimIndex, Index, NaturalIndex};

/// One axis of a cube: a length together with the index which labels its
/// positions.
///
/// Dimensions are immutable and cheap to clone, so they are shared freely
/// between a cube and the views built on top of it. Two dimensions compare
/// equal if they have the same length. The index is metadata and does not
/// take part in comparisons.
#[derive(Clone)]
pub struct Dimension {
    index: Arc<dyn DimIndex>,
}

impl Dimension {
    /// Create an axis of length `length` with a natural index.
    pub fn new(length: u64) -> Self {
        Self::from_index(NaturalIndex::new("D", length))
    }

    /// Create one naturally-indexed axis per entry in `shape`, named `D0`,
    /// `D1` and so on.
    pub fn of(shape: &[u64]) -> Vec<Dimension> {
        shape
            .iter()
            .enumerate()
            .map(|(axis, &len)| Self::from_index(NaturalIndex::new(format!("D{}", axis), len)))
            .collect()
    }

    /// Create an axis whose length is the size of `index`.
    pub fn from_index<I: Index + DimIndex>(index: I) -> Self {
        Dimension {
            index: Arc::new(index),
        }
    }

    /// Create an axis from an index and an expected length, failing if the
    /// length does not match the size of the index.
    pub fn with_length<I: Index + DimIndex>(index: I, length: u64) -> Result<Self, FromDataError> {
        let index_size = DimIndex::size(&index);
        if index_size != length {
            return Err(FromDataError::IndexSizeMismatch { length, index_size });
        }
        Ok(Self::from_index(index))
    }

    pub fn length(&self) -> u64 {
        self.index.size()
    }

    pub fn name(&self) -> &str {
        self.index.name()
    }

    pub fn index(&self) -> &dyn DimIndex {
        self.index.as_ref()
    }

    /// Return the index as a concrete type, if it is one.
    pub fn index_as<I: DimIndex + 'static>(&self) -> Option<&I> {
        self.index.as_any().downcast_ref()
    }

    /// Return an axis keeping the positions set in `mask`.
    pub fn masked(&self, mask: &BitSet) -> Dimension {
        Dimension {
            index: self.index.clone().masked(mask),
        }
    }

    /// Return an axis keeping the positions `[start, end)`.
    pub fn sub(&self, start: u64, end: u64) -> Result<Dimension, FromDataError> {
        let size = self.length();
        if start > end || end > size {
            return Err(FromDataError::InvalidRange { start, end, size });
        }
        Ok(Dimension {
            index: self.index.clone().sub(start, end),
        })
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.length() == other.length()
    }
}

impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name(), self.length())
    }
}

impl TryFrom<i64> for Dimension {
    type Error = FromDataError;

    fn try_from(length: i64) -> Result<Self, Self::Error> {
        u64::try_from(length)
            .map(Dimension::new)
            .map_err(|_| FromDataError::NegativeLength(length))
    }
}

/// Return the lengths of `dims`.
pub fn shape_of(dims: &[Dimension]) -> Vec<u64> {
    dims.iter().map(|d| d.length()).collect()
}
