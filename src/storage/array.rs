use std::sync::RwLock;

use crate::cube::Hypercube;
use crate::dimension::{shape_of, Dimension};
use crate::element::Element;
use crate::env::trace;
use crate::errors::{FromDataError, HypercubeError};
use crate::layout::{check_pos, check_range, size_of};
use crate::storage::{read_lock, write_lock};

/// Log2 of the number of elements per chunk used by [`ArrayCube::new`].
pub const DEFAULT_CHUNK_SHIFT: u32 = 30;

/// Dense cube which stores every element in memory.
///
/// Elements are held in row-major order, split into chunks of
/// `1 << chunk_shift` elements so that very large cubes do not need a single
/// contiguous allocation. Bulk transfers copy whole slices, splitting at
/// chunk boundaries.
pub struct ArrayCube<T: Element> {
    dims: Vec<Dimension>,
    shape: Vec<u64>,
    size: u64,
    chunk_shift: u32,
    chunks: Vec<RwLock<Vec<T>>>,
}

impl<T: Element> ArrayCube<T> {
    /// Create a cube of the given shape filled with [`Element::NULL`].
    pub fn new(shape: &[u64]) -> Self {
        Self::with_chunk_shift(shape, DEFAULT_CHUNK_SHIFT)
    }

    /// Create a cube with the given axes filled with [`Element::NULL`].
    pub fn with_dims(dims: Vec<Dimension>) -> Self {
        Self::with_dims_and_chunk_shift(dims, DEFAULT_CHUNK_SHIFT)
    }

    /// Create a cube whose storage is split into chunks of
    /// `1 << chunk_shift` elements.
    ///
    /// Shifts larger than the default chunk shift are clamped to it.
    pub fn with_chunk_shift(shape: &[u64], chunk_shift: u32) -> Self {
        Self::with_dims_and_chunk_shift(Dimension::of(shape), chunk_shift)
    }

    fn with_dims_and_chunk_shift(dims: Vec<Dimension>, chunk_shift: u32) -> Self {
        let shape = shape_of(&dims);
        let size = size_of(&shape);
        let chunk_shift = chunk_shift.min(DEFAULT_CHUNK_SHIFT);
        let chunk_len = 1u64 << chunk_shift;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < size {
            let len = chunk_len.min(size - start);
            chunks.push(RwLock::new(vec![T::NULL; len as usize]));
            start += len;
        }
        trace!(
            "allocated {} cube with shape {:?} in {} chunks",
            T::NAME,
            shape,
            chunks.len()
        );
        ArrayCube {
            dims,
            shape,
            size,
            chunk_shift,
            chunks,
        }
    }

    /// Create a cube of the given shape from elements in row-major order.
    pub fn from_vec(shape: &[u64], data: Vec<T>) -> Result<Self, FromDataError> {
        let size = size_of(shape);
        if data.len() as u64 != size {
            return Err(FromDataError::StorageLengthMismatch);
        }
        let chunk_len = 1usize << DEFAULT_CHUNK_SHIFT;
        let chunks = if data.len() <= chunk_len {
            vec![RwLock::new(data)]
        } else {
            data.chunks(chunk_len)
                .map(|chunk| RwLock::new(chunk.to_vec()))
                .collect()
        };
        Ok(ArrayCube {
            dims: Dimension::of(shape),
            shape: shape.to_vec(),
            size,
            chunk_shift: DEFAULT_CHUNK_SHIFT,
            chunks,
        })
    }

    /// Create a cube with the given axes which takes ownership of `data`
    /// without copying it.
    ///
    /// The data must fit in a single chunk.
    pub fn wrap(dims: Vec<Dimension>, data: Vec<T>) -> Result<Self, FromDataError> {
        let shape = shape_of(&dims);
        let size = size_of(&shape);
        let max = 1u64 << DEFAULT_CHUNK_SHIFT;
        if size > max {
            return Err(FromDataError::CapacityExceeded { len: size, max });
        }
        if data.len() as u64 != size {
            return Err(FromDataError::StorageLengthMismatch);
        }
        let chunks = if data.is_empty() {
            Vec::new()
        } else {
            vec![RwLock::new(data)]
        };
        Ok(ArrayCube {
            dims,
            shape,
            size,
            chunk_shift: DEFAULT_CHUNK_SHIFT,
            chunks,
        })
    }

    /// Consume the cube and return its elements in row-major order.
    pub fn into_vec(self) -> Vec<T> {
        let mut chunks = self
            .chunks
            .into_iter()
            .map(|chunk| chunk.into_inner().unwrap_or_else(|err| err.into_inner()));
        let Some(mut data) = chunks.next() else {
            return Vec::new();
        };
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        data
    }

    pub fn chunk_shift(&self) -> u32 {
        self.chunk_shift
    }

    /// Return the chunk holding `pos` and the offset of `pos` within it.
    #[inline]
    fn locate(&self, pos: u64) -> (usize, usize) {
        let chunk = (pos >> self.chunk_shift) as usize;
        let offset = (pos & ((1u64 << self.chunk_shift) - 1)) as usize;
        (chunk, offset)
    }

    /// Call `f` with each chunk overlapping `len` elements starting at `pos`,
    /// the offset within the chunk and the range of the transfer it covers.
    fn for_each_chunk(
        &self,
        pos: u64,
        len: usize,
        mut f: impl FnMut(&RwLock<Vec<T>>, usize, std::ops::Range<usize>),
    ) {
        let mut done = 0;
        while done < len {
            let (chunk, offset) = self.locate(pos + done as u64);
            let chunk_start = (chunk as u64) << self.chunk_shift;
            let chunk_len = (1u64 << self.chunk_shift).min(self.size - chunk_start) as usize;
            let n = (chunk_len - offset).min(len - done);
            f(&self.chunks[chunk], offset, done..done + n);
            done += n;
        }
    }
}

impl<T: Element> Hypercube<T> for ArrayCube<T> {
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
        check_pos(self.size, pos)?;
        let (chunk, offset) = self.locate(pos);
        Ok(read_lock(&self.chunks[chunk])[offset])
    }

    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError> {
        check_pos(self.size, pos)?;
        let (chunk, offset) = self.locate(pos);
        write_lock(&self.chunks[chunk])[offset] = value;
        Ok(())
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        self.for_each_chunk(src_pos, dst.len(), |chunk, offset, range| {
            let data = read_lock(chunk);
            let n = range.len();
            dst[range].copy_from_slice(&data[offset..offset + n]);
        });
        Ok(())
    }

    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        self.for_each_chunk(dst_pos, src.len(), |chunk, offset, range| {
            let mut data = write_lock(chunk);
            let n = range.len();
            data[offset..offset + n].copy_from_slice(&src[range]);
        });
        Ok(())
    }

    fn to_flattened_objs(&self, src_pos: u64, dst: &mut [Option<T>]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        self.for_each_chunk(src_pos, dst.len(), |chunk, offset, range| {
            let data = read_lock(chunk);
            for (el, &value) in dst[range].iter_mut().zip(&data[offset..]) {
                *el = Some(value);
            }
        });
        Ok(())
    }

    fn from_flattened_objs(&self, src: &[Option<T>], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        self.for_each_chunk(dst_pos, src.len(), |chunk, offset, range| {
            let mut data = write_lock(chunk);
            for (el, value) in data[offset..].iter_mut().zip(&src[range]) {
                *el = value.unwrap_or(T::NULL);
            }
        });
        Ok(())
    }
}
