use std::sync::RwLock;

use crate::cube::Hypercube;
use crate::dimension::Dimension;
use crate::element::Element;
use crate::errors::{FromDataError, HypercubeError};
use crate::layout::{advance, check_pos, check_range, size_of, unravel, DynIndex};
use crate::storage::{read_lock, write_lock};

/// Nested lists of elements, which need not all have the same length.
#[derive(Clone, Debug, PartialEq)]
pub enum Nested<T> {
    /// Innermost list of elements.
    Values(Vec<T>),

    /// List of nested lists, which must all have the same depth.
    Lists(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Return the number of nesting levels, and whether it is exact.
    ///
    /// Empty lists of lists only give a lower bound, since they are
    /// compatible with any deeper nesting.
    fn depth(&self) -> Result<(usize, bool), FromDataError> {
        match self {
            Nested::Values(_) => Ok((1, true)),
            Nested::Lists(items) => {
                let mut exact = None;
                let mut min_depth = 0;
                for item in items {
                    match item.depth()? {
                        (depth, true) => match exact {
                            Some(other) if other != depth => {
                                return Err(FromDataError::InconsistentDepth)
                            }
                            _ => exact = Some(depth),
                        },
                        (depth, false) => min_depth = min_depth.max(depth),
                    }
                }
                match exact {
                    Some(depth) if depth < min_depth => Err(FromDataError::InconsistentDepth),
                    Some(depth) => Ok((depth + 1, true)),
                    None => Ok((min_depth + 1, false)),
                }
            }
        }
    }

    /// Raise each entry of `shape`, from `level` down, to the longest list
    /// at that nesting level.
    fn max_lengths(&self, level: usize, shape: &mut [u64]) {
        let Some(len) = shape.get_mut(level) else {
            return;
        };
        match self {
            Nested::Values(values) => *len = (*len).max(values.len() as u64),
            Nested::Lists(items) => {
                *len = (*len).max(items.len() as u64);
                for item in items {
                    item.max_lengths(level + 1, shape);
                }
            }
        }
    }

    /// Return the element at `indices`, or `None` if it is missing.
    fn get(&self, indices: &[u64]) -> Option<&T> {
        let (&index, rest) = indices.split_first()?;
        match self {
            Nested::Values(values) if rest.is_empty() => values.get(index as usize),
            Nested::Lists(items) => items.get(index as usize)?.get(rest),
            Nested::Values(_) => None,
        }
    }

    fn get_mut(&mut self, indices: &[u64]) -> Option<&mut T> {
        let (&index, rest) = indices.split_first()?;
        match self {
            Nested::Values(values) if rest.is_empty() => values.get_mut(index as usize),
            Nested::Lists(items) => items.get_mut(index as usize)?.get_mut(rest),
            Nested::Values(_) => None,
        }
    }
}

impl<T> From<Vec<T>> for Nested<T> {
    fn from(values: Vec<T>) -> Self {
        Nested::Values(values)
    }
}

impl<T> From<Vec<Vec<T>>> for Nested<T> {
    fn from(lists: Vec<Vec<T>>) -> Self {
        Nested::Lists(lists.into_iter().map(Nested::from).collect())
    }
}

impl<T> From<Vec<Vec<Vec<T>>>> for Nested<T> {
    fn from(lists: Vec<Vec<Vec<T>>>) -> Self {
        Nested::Lists(lists.into_iter().map(Nested::from).collect())
    }
}

impl<T> From<Vec<Vec<Vec<Vec<T>>>>> for Nested<T> {
    fn from(lists: Vec<Vec<Vec<Vec<T>>>>) -> Self {
        Nested::Lists(lists.into_iter().map(Nested::from).collect())
    }
}

/// Cube which wraps nested lists supplied by the caller.
///
/// The shape is the length of the longest list at each nesting level.
/// Positions which fall outside a shorter list are holes. Holes read as
/// [`Element::NULL`], or `None` through the nullable accessors, and writes to
/// them are ignored.
pub struct RaggedCube<T: Element> {
    dims: Vec<Dimension>,
    shape: Vec<u64>,
    size: u64,
    data: RwLock<Nested<T>>,
}

impl<T: Element> RaggedCube<T> {
    /// Wrap `data`, which can be a `Vec` of elements or nested `Vec`s up to
    /// four levels deep, or a [`Nested`] value of any depth.
    ///
    /// Fails if lists at the same level have different depths.
    pub fn new(data: impl Into<Nested<T>>) -> Result<Self, FromDataError> {
        let data = data.into();
        let (depth, _) = data.depth()?;
        let mut shape = vec![0; depth];
        data.max_lengths(0, &mut shape);
        Ok(RaggedCube {
            dims: Dimension::of(&shape),
            size: size_of(&shape),
            shape,
            data: RwLock::new(data),
        })
    }

    /// Consume the cube and return the wrapped lists.
    pub fn into_nested(self) -> Nested<T> {
        self.data.into_inner().unwrap_or_else(|err| err.into_inner())
    }

    fn indices(&self, pos: u64) -> DynIndex {
        let mut indices = DynIndex::new();
        unravel(&self.shape, pos, &mut indices);
        indices
    }
}

impl<T: Element> Hypercube<T> for RaggedCube<T> {
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
        Ok(self.get_object_at(pos)?.unwrap_or(T::NULL))
    }

    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError> {
        check_pos(self.size, pos)?;
        let indices = self.indices(pos);
        if let Some(el) = write_lock(&self.data).get_mut(&indices) {
            *el = value;
        }
        Ok(())
    }

    fn get_object_at(&self, pos: u64) -> Result<Option<T>, HypercubeError> {
        check_pos(self.size, pos)?;
        let indices = self.indices(pos);
        Ok(read_lock(&self.data).get(&indices).copied())
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        if dst.is_empty() {
            return Ok(());
        }
        let data = read_lock(&self.data);
        let mut indices = self.indices(src_pos);
        for el in dst.iter_mut() {
            *el = data.get(&indices).copied().unwrap_or(T::NULL);
            advance(&self.shape, &mut indices);
        }
        Ok(())
    }

    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        if src.is_empty() {
            return Ok(());
        }
        let mut data = write_lock(&self.data);
        let mut indices = self.indices(dst_pos);
        for &value in src {
            if let Some(el) = data.get_mut(&indices) {
                *el = value;
            }
            advance(&self.shape, &mut indices);
        }
        Ok(())
    }

    fn to_flattened_objs(&self, src_pos: u64, dst: &mut [Option<T>]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        if dst.is_empty() {
            return Ok(());
        }
        let data = read_lock(&self.data);
        let mut indices = self.indices(src_pos);
        for el in dst.iter_mut() {
            *el = data.get(&indices).copied();
            advance(&self.shape, &mut indices);
        }
        Ok(())
    }
}
