use std::sync::RwLock;

use rustc_hash::FxHashMap;

use crate::cube::Hypercube;
use crate::dimension::{shape_of, Dimension};
use crate::element::Element;
use crate::errors::HypercubeError;
use crate::layout::{check_pos, check_range, size_of};
use crate::storage::{read_lock, write_lock};

/// Smallest initial capacity of the entry map.
const MIN_CAPACITY: u64 = 13;

/// Largest initial capacity of the entry map. More entries are allocated as
/// the map grows.
const MAX_INITIAL_CAPACITY: u64 = 1 << 24;

/// Options for creating a [`SparseCube`].
#[derive(Clone, Copy, Debug)]
pub struct SparseOptions<T> {
    /// Value of positions without an entry. Writing this value to a position
    /// removes its entry.
    pub null_value: T,

    /// Expected fraction of positions which will hold an entry, used to size
    /// the map. Values outside `[0, 1]` are clamped.
    pub loading: f64,
}

impl<T: Element> Default for SparseOptions<T> {
    fn default() -> Self {
        SparseOptions {
            null_value: T::NULL,
            loading: 0.1,
        }
    }
}

/// Cube which only stores elements that differ from a null value.
///
/// Entries are kept in a hash map from flat position to the element's bit
/// pattern. Positions without an entry read as the null value, or as `None`
/// through the nullable accessors. Writing the null value, or `None`,
/// removes the entry for a position.
pub struct SparseCube<T: Element> {
    dims: Vec<Dimension>,
    shape: Vec<u64>,
    size: u64,
    null_value: T,
    entries: RwLock<FxHashMap<u64, u64>>,
}

impl<T: Element> SparseCube<T> {
    /// Create an empty cube of the given shape with default options.
    pub fn new(shape: &[u64]) -> Self {
        Self::build(Dimension::of(shape), SparseOptions::default())
    }

    /// Create an empty cube with the given axes and options.
    ///
    /// Fails if `options.loading` is NaN.
    pub fn with_options(
        dims: Vec<Dimension>,
        options: SparseOptions<T>,
    ) -> Result<Self, HypercubeError> {
        if options.loading.is_nan() {
            return Err(HypercubeError::InvalidArgument(
                "sparse loading is NaN".to_string(),
            ));
        }
        Ok(Self::build(dims, options))
    }

    fn build(dims: Vec<Dimension>, options: SparseOptions<T>) -> Self {
        let shape = shape_of(&dims);
        let size = size_of(&shape);
        let wanted = (size as f64 * options.loading.clamp(0., 1.)) as u64;
        let capacity = wanted.clamp(MIN_CAPACITY, MAX_INITIAL_CAPACITY);
        let entries =
            FxHashMap::with_capacity_and_hasher(capacity as usize, Default::default());
        SparseCube {
            dims,
            shape,
            size,
            null_value: options.null_value,
            entries: RwLock::new(entries),
        }
    }

    pub fn null_value(&self) -> T {
        self.null_value
    }

    /// Return the number of stored entries.
    pub fn len(&self) -> usize {
        read_lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.entries).is_empty()
    }

    /// Return the number of entries the map can hold without reallocating.
    pub fn capacity(&self) -> usize {
        read_lock(&self.entries).capacity()
    }

    fn lookup(entries: &FxHashMap<u64, u64>, pos: u64) -> Option<T> {
        entries.get(&pos).map(|&bits| T::from_bits(bits))
    }

    fn store(&self, entries: &mut FxHashMap<u64, u64>, pos: u64, value: Option<T>) {
        match value {
            Some(value) if !value.same_as(self.null_value) => {
                entries.insert(pos, value.to_bits());
            }
            _ => {
                entries.remove(&pos);
            }
        }
    }
}

impl<T: Element> Hypercube<T> for SparseCube<T> {
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
        Ok(Self::lookup(&read_lock(&self.entries), pos).unwrap_or(self.null_value))
    }

    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError> {
        check_pos(self.size, pos)?;
        self.store(&mut write_lock(&self.entries), pos, Some(value));
        Ok(())
    }

    fn get_object_at(&self, pos: u64) -> Result<Option<T>, HypercubeError> {
        check_pos(self.size, pos)?;
        Ok(Self::lookup(&read_lock(&self.entries), pos))
    }

    fn set_object_at(&self, pos: u64, value: Option<T>) -> Result<(), HypercubeError> {
        check_pos(self.size, pos)?;
        self.store(&mut write_lock(&self.entries), pos, value);
        Ok(())
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        let entries = read_lock(&self.entries);
        for (pos, el) in (src_pos..).zip(dst.iter_mut()) {
            *el = Self::lookup(&entries, pos).unwrap_or(self.null_value);
        }
        Ok(())
    }

    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        let mut entries = write_lock(&self.entries);
        for (pos, &el) in (dst_pos..).zip(src) {
            self.store(&mut entries, pos, Some(el));
        }
        Ok(())
    }

    fn to_flattened_objs(&self, src_pos: u64, dst: &mut [Option<T>]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        let entries = read_lock(&self.entries);
        for (pos, el) in (src_pos..).zip(dst.iter_mut()) {
            *el = Self::lookup(&entries, pos);
        }
        Ok(())
    }

    fn from_flattened_objs(&self, src: &[Option<T>], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        let mut entries = write_lock(&self.entries);
        for (pos, &el) in (dst_pos..).zip(src) {
            self.store(&mut entries, pos, el);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SparseCube, SparseOptions};
    use crate::cube::Hypercube;
    use crate::dimension::Dimension;
    use crate::errors::HypercubeError;

    #[test]
    fn test_missing_entries_read_as_null() {
        let cube = SparseCube::<f64>::new(&[4, 4]);
        for i in 0..4 {
            for j in 0..4 {
                assert!(cube.get(&[i, j]).unwrap().is_nan());
                assert_eq!(cube.get_object(&[i, j]).unwrap(), None);
            }
        }
        assert!(cube.is_empty());
    }

    #[test]
    fn test_writing_null_removes_entry() {
        let cube = SparseCube::<f64>::new(&[10]);
        cube.set_at(3, 1.5).unwrap();
        cube.set_at(4, 2.5).unwrap();
        assert_eq!(cube.len(), 2);
        assert_eq!(cube.get_at(3).unwrap(), 1.5);

        cube.set_at(3, f64::NAN).unwrap();
        assert_eq!(cube.len(), 1);
        cube.set_object_at(4, None).unwrap();
        assert!(cube.is_empty());
        assert!(cube.get_at(4).unwrap().is_nan());
    }

    #[test]
    fn test_custom_null_value() {
        let options = SparseOptions {
            null_value: -1,
            loading: 0.5,
        };
        let cube = SparseCube::<i32>::with_options(Dimension::of(&[2, 3]), options).unwrap();
        assert_eq!(cube.null_value(), -1);
        assert_eq!(cube.get(&[1, 2]).unwrap(), -1);

        // Zero is an ordinary value when it is not the null value.
        cube.set(&[1, 2], 0).unwrap();
        assert_eq!(cube.len(), 1);
        assert_eq!(cube.get_object(&[1, 2]).unwrap(), Some(0));

        cube.set(&[1, 2], -1).unwrap();
        assert!(cube.is_empty());
    }

    #[test]
    fn test_capacity() {
        let cube = SparseCube::<f64>::new(&[2]);
        assert!(cube.capacity() >= 13);
        assert!(cube.capacity() >= cube.len());

        let options = SparseOptions {
            null_value: f64::NAN,
            loading: 5.,
        };
        let cube = SparseCube::with_options(Dimension::of(&[100]), options).unwrap();
        assert!(cube.capacity() >= 100);

        cube.from_flattened(&[1.; 100], 0).unwrap();
        assert_eq!(cube.len(), 100);
        assert!(cube.capacity() >= cube.len());
    }

    #[test]
    fn test_nan_loading_is_rejected() {
        let options = SparseOptions {
            null_value: 0i64,
            loading: f64::NAN,
        };
        let result = SparseCube::with_options(Dimension::of(&[3]), options);
        assert!(matches!(result, Err(HypercubeError::InvalidArgument(_))));
    }

    #[test]
    fn test_bulk_transfers() {
        let cube = SparseCube::<i64>::new(&[3, 3]);
        cube.from_flattened(&[0, 5, 0, 7], 2).unwrap();
        assert_eq!(cube.len(), 2);

        let mut dst = [9; 9];
        cube.to_flattened(0, &mut dst).unwrap();
        assert_eq!(dst, [0, 0, 0, 5, 0, 7, 0, 0, 0]);

        let mut objs = [Some(1); 4];
        cube.to_flattened_objs(2, &mut objs).unwrap();
        assert_eq!(objs, [None, Some(5), None, Some(7)]);

        cube.from_flattened_objs(&[None, Some(3)], 3).unwrap();
        assert_eq!(cube.get_object_at(3).unwrap(), None);
        assert_eq!(cube.get_at(4).unwrap(), 3);

        assert!(cube.to_flattened(8, &mut dst).is_err());
    }
}
