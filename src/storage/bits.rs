use std::sync::RwLock;

use crate::bit_set::BitSet;
use crate::cube::Hypercube;
use crate::dimension::{shape_of, Dimension};
use crate::errors::{FromDataError, HypercubeError};
use crate::layout::{check_pos, check_range, size_of};
use crate::storage::{read_lock, write_lock};

/// Boolean cube which packs its elements into a [`BitSet`], one bit per
/// element. New cubes are all `false`.
pub struct BitSetCube {
    dims: Vec<Dimension>,
    shape: Vec<u64>,
    size: u64,
    bits: RwLock<BitSet>,
}

impl BitSetCube {
    pub fn new(shape: &[u64]) -> Self {
        Self::with_dims(Dimension::of(shape))
    }

    pub fn with_dims(dims: Vec<Dimension>) -> Self {
        let shape = shape_of(&dims);
        let size = size_of(&shape);
        BitSetCube {
            dims,
            shape,
            size,
            bits: RwLock::new(BitSet::new(size)),
        }
    }

    /// Create a cube of the given shape from a bit set of the same size.
    pub fn from_bits(shape: &[u64], bits: BitSet) -> Result<Self, HypercubeError> {
        let size = size_of(shape);
        if bits.size() != size {
            return Err(FromDataError::StorageLengthMismatch.into());
        }
        Ok(BitSetCube {
            dims: Dimension::of(shape),
            shape: shape.to_vec(),
            size,
            bits: RwLock::new(bits),
        })
    }

    /// Return the number of `true` elements.
    pub fn count(&self) -> u64 {
        read_lock(&self.bits).len()
    }

    /// Consume the cube and return its bits in row-major order.
    pub fn into_bits(self) -> BitSet {
        self.bits.into_inner().unwrap_or_else(|err| err.into_inner())
    }
}

impl Hypercube<bool> for BitSetCube {
    fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn get_at(&self, pos: u64) -> Result<bool, HypercubeError> {
        check_pos(self.size, pos)?;
        Ok(read_lock(&self.bits).get(pos))
    }

    fn set_at(&self, pos: u64, value: bool) -> Result<(), HypercubeError> {
        check_pos(self.size, pos)?;
        write_lock(&self.bits).set(pos, value);
        Ok(())
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [bool]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        let bits = read_lock(&self.bits);
        for (pos, el) in (src_pos..).zip(dst.iter_mut()) {
            *el = bits.get(pos);
        }
        Ok(())
    }

    fn from_flattened(&self, src: &[bool], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        let mut bits = write_lock(&self.bits);
        for (pos, &el) in (dst_pos..).zip(src) {
            bits.set(pos, el);
        }
        Ok(())
    }
}
