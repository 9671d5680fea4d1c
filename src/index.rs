//! Indices map the positions of an axis to key values.
//!
//! Every [`Dimension`](crate::Dimension) carries an index. The simplest is
//! [`NaturalIndex`], whose keys are the positions themselves. A
//! [`MappedIndex`] labels positions with arbitrary keys. Masking and slicing
//! an axis produce a [`MaskedIndex`] or [`SubIndex`] over the original index,
//! which renumber the surviving positions densely from zero.

use std::any::Any;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::bit_set::BitSet;
use crate::errors::FromDataError;

/// A bijection between the positions `[0, size)` and a sequence of keys.
///
/// For every valid position `i`, `index_of(&key_of(i)?) == Some(i)`.
pub trait Index: Debug + Send + Sync + 'static {
    /// Key type.
    type Key: Clone + PartialEq + Debug;

    /// Return the name of the index.
    fn name(&self) -> &str;

    /// Return the number of positions.
    fn size(&self) -> u64;

    /// Return the position of `key`, or `None` if it is not in the index.
    fn index_of(&self, key: &Self::Key) -> Option<u64>;

    /// Return the key at `index`, or `None` if `index >= size`.
    fn key_of(&self, index: u64) -> Option<Self::Key>;
}

/// Type-erased view of an [`Index`], as stored in a dimension.
///
/// Masking or sub-ranging an index always produces a [`MaskedIndex`] or
/// [`SubIndex`] over a base (natural or mapped) index, rather than nesting
/// derived indices inside each other.
pub trait DimIndex: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn size(&self) -> u64;

    /// Return an index keeping only the positions set in `mask`.
    fn masked(self: Arc<Self>, mask: &BitSet) -> Arc<dyn DimIndex>;

    /// Return an index keeping positions `[start, end)`.
    ///
    /// The caller must ensure `start <= end <= self.size()`.
    fn sub(self: Arc<Self>, start: u64, end: u64) -> Arc<dyn DimIndex>;

    fn as_any(&self) -> &dyn Any;
}

/// Implement [`DimIndex`] for a base index type.
macro_rules! impl_base_dim_index {
    ($type:ty $(, [$($generics:tt)*])?) => {
        impl<$($($generics)*)?> DimIndex for $type {
            fn name(&self) -> &str {
                Index::name(self)
            }

            fn size(&self) -> u64 {
                Index::size(self)
            }

            fn masked(self: Arc<Self>, mask: &BitSet) -> Arc<dyn DimIndex> {
                Arc::new(MaskedIndex::new(self, mask))
            }

            fn sub(self: Arc<Self>, start: u64, end: u64) -> Arc<dyn DimIndex> {
                Arc::new(SubIndex::new_unchecked(self, start, end))
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

/// Identity index whose keys are the positions `0..size`.
#[derive(Clone, Debug, PartialEq)]
pub struct NaturalIndex {
    name: String,
    size: u64,
}

impl NaturalIndex {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        NaturalIndex {
            name: name.into(),
            size,
        }
    }
}

impl Index for NaturalIndex {
    type Key = u64;

    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn index_of(&self, key: &u64) -> Option<u64> {
        (*key < self.size).then_some(*key)
    }

    fn key_of(&self, index: u64) -> Option<u64> {
        (index < self.size).then_some(index)
    }
}

impl_base_dim_index!(NaturalIndex);

/// Index over an explicit list of unique keys.
#[derive(Clone, Debug)]
pub struct MappedIndex<K> {
    name: String,
    keys: Vec<K>,
    positions: FxHashMap<K, u64>,
}

impl<K: Clone + Eq + Hash> MappedIndex<K> {
    /// Create an index whose `i`th key is `keys[i]`.
    ///
    /// Fails if `keys` is empty or contains duplicates.
    pub fn new(name: impl Into<String>, keys: Vec<K>) -> Result<Self, FromDataError> {
        if keys.is_empty() {
            return Err(FromDataError::EmptyIndex);
        }
        let mut positions = FxHashMap::default();
        positions.reserve(keys.len());
        for (pos, key) in keys.iter().enumerate() {
            if positions.insert(key.clone(), pos as u64).is_some() {
                return Err(FromDataError::DuplicateKey);
            }
        }
        Ok(MappedIndex {
            name: name.into(),
            keys,
            positions,
        })
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K> Index for MappedIndex<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    type Key = K;

    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.keys.len() as u64
    }

    fn index_of(&self, key: &K) -> Option<u64> {
        self.positions.get(key).copied()
    }

    fn key_of(&self, index: u64) -> Option<K> {
        self.keys.get(usize::try_from(index).ok()?).cloned()
    }
}

impl_base_dim_index!(MappedIndex<K>, [K: Clone + Eq + Hash + Debug + Send + Sync + 'static]);

/// Index over the positions of a base index which are set in a mask.
#[derive(Debug)]
pub struct MaskedIndex<I> {
    name: String,
    base: Arc<I>,

    /// Base positions that are kept, in ascending order.
    positions: Vec<u64>,
}

impl<I: Index> MaskedIndex<I> {
    /// Create an index keeping the positions of `base` that are set in
    /// `mask`. Mask bits beyond the end of `base` are ignored.
    pub fn new(base: Arc<I>, mask: &BitSet) -> Self {
        let size = base.size();
        let positions = mask.iter().take_while(|pos| *pos < size).collect();
        MaskedIndex {
            name: format!("{}[mask]", base.name()),
            base,
            positions,
        }
    }

    pub fn base(&self) -> &I {
        &self.base
    }

    /// Return the base position of each position in this index.
    pub fn positions(&self) -> &[u64] {
        &self.positions
    }
}

impl<I: Index> Index for MaskedIndex<I> {
    type Key = I::Key;

    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.positions.len() as u64
    }

    fn index_of(&self, key: &I::Key) -> Option<u64> {
        let base_pos = self.base.index_of(key)?;
        self.positions
            .binary_search(&base_pos)
            .ok()
            .map(|pos| pos as u64)
    }

    fn key_of(&self, index: u64) -> Option<I::Key> {
        let base_pos = *self.positions.get(usize::try_from(index).ok()?)?;
        self.base.key_of(base_pos)
    }
}

impl<I: Index> DimIndex for MaskedIndex<I> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.positions.len() as u64
    }

    fn masked(self: Arc<Self>, mask: &BitSet) -> Arc<dyn DimIndex> {
        let positions = self
            .positions
            .iter()
            .enumerate()
            .filter(|(pos, _)| mask.get(*pos as u64))
            .map(|(_, base_pos)| *base_pos)
            .collect();
        Arc::new(MaskedIndex {
            name: format!("{}[mask]", self.name),
            base: self.base.clone(),
            positions,
        })
    }

    fn sub(self: Arc<Self>, start: u64, end: u64) -> Arc<dyn DimIndex> {
        Arc::new(MaskedIndex {
            name: format!("{}[{}:{}]", self.name, start, end),
            base: self.base.clone(),
            positions: self.positions[start as usize..end as usize].to_vec(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Index over a contiguous range of positions of a base index.
#[derive(Debug)]
pub struct SubIndex<I> {
    name: String,
    base: Arc<I>,
    start: u64,
    end: u64,
}

impl<I: Index> SubIndex<I> {
    /// Create an index over positions `[start, end)` of `base`.
    pub fn new(base: Arc<I>, start: u64, end: u64) -> Result<Self, FromDataError> {
        let size = base.size();
        if start > end || end > size {
            return Err(FromDataError::InvalidRange { start, end, size });
        }
        Ok(Self::new_unchecked(base, start, end))
    }

    fn new_unchecked(base: Arc<I>, start: u64, end: u64) -> Self {
        SubIndex {
            name: format!("{}[{}:{}]", base.name(), start, end),
            base,
            start,
            end,
        }
    }

    pub fn base(&self) -> &I {
        &self.base
    }

    /// Return the range of base positions covered by this index.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }
}

/// Sub-indices are equal if they cover the same range of the same base.
impl<I> PartialEq for SubIndex<I> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.base, &other.base) && self.start == other.start && self.end == other.end
    }
}

impl<I: Index> Index for SubIndex<I> {
    type Key = I::Key;

    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.end - self.start
    }

    fn index_of(&self, key: &I::Key) -> Option<u64> {
        let base_pos = self.base.index_of(key)?;
        (self.start..self.end)
            .contains(&base_pos)
            .then(|| base_pos - self.start)
    }

    fn key_of(&self, index: u64) -> Option<I::Key> {
        if index >= Index::size(self) {
            return None;
        }
        self.base.key_of(self.start + index)
    }
}

impl<I: Index> DimIndex for SubIndex<I> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.end - self.start
    }

    fn masked(self: Arc<Self>, mask: &BitSet) -> Arc<dyn DimIndex> {
        let positions = (self.start..self.end)
            .filter(|base_pos| mask.get(base_pos - self.start))
            .collect();
        Arc::new(MaskedIndex {
            name: format!("{}[mask]", self.name),
            base: self.base.clone(),
            positions,
        })
    }

    fn sub(self: Arc<Self>, start: u64, end: u64) -> Arc<dyn DimIndex> {
        Arc::new(SubIndex {
            name: format!("{}[{}:{}]", self.name, start, end),
            base: self.base.clone(),
            start: self.start + start,
            end: self.start + end,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DimIndex, Index, MappedIndex, MaskedIndex, NaturalIndex, SubIndex};
    use crate::bit_set::BitSet;
    use crate::errors::FromDataError;

    fn check_bijection<I: Index>(index: &I) {
        for i in 0..index.size() {
            let key = index.key_of(i).unwrap();
            assert_eq!(index.index_of(&key), Some(i));
        }
        assert_eq!(index.key_of(index.size()), None);
    }

    #[test]
    fn test_natural_index() {
        let index = NaturalIndex::new("D0", 4);
        assert_eq!(Index::name(&index), "D0");
        assert_eq!(index.index_of(&3), Some(3));
        assert_eq!(index.index_of(&4), None);
        assert_eq!(index.key_of(4), None);
        check_bijection(&index);
    }

    #[test]
    fn test_mapped_index() {
        let index = MappedIndex::new("fruit", vec!["apple", "pear", "fig"]).unwrap();
        assert_eq!(Index::size(&index), 3);
        assert_eq!(index.index_of(&"pear"), Some(1));
        assert_eq!(index.index_of(&"kiwi"), None);
        assert_eq!(index.key_of(2), Some("fig"));
        check_bijection(&index);

        assert_eq!(
            MappedIndex::new("dup", vec![1, 2, 1]).err(),
            Some(FromDataError::DuplicateKey)
        );
        assert_eq!(
            MappedIndex::<i32>::new("empty", vec![]).err(),
            Some(FromDataError::EmptyIndex)
        );
    }

    #[test]
    fn test_mapped_index_as_dim_index() {
        let base: Arc<dyn DimIndex> =
            Arc::new(MappedIndex::new("day", vec!["mon", "tue", "wed", "thu"]).unwrap());
        assert_eq!(base.name(), "day");
        assert_eq!(base.size(), 4);

        let sub = base.clone().sub(1, 3);
        let sub = sub
            .as_any()
            .downcast_ref::<SubIndex<MappedIndex<&str>>>()
            .unwrap();
        assert_eq!(sub.key_of(0), Some("tue"));
        assert_eq!(sub.index_of(&"wed"), Some(1));

        let masked = base.masked(&BitSet::from_bools(&[true, false, false, true]));
        let masked = masked
            .as_any()
            .downcast_ref::<MaskedIndex<MappedIndex<&str>>>()
            .unwrap();
        assert_eq!(masked.key_of(1), Some("thu"));
    }

    #[test]
    fn test_masked_index() {
        let base = Arc::new(MappedIndex::new("k", vec!['a', 'b', 'c', 'd', 'e']).unwrap());
        let mask = BitSet::from_bools(&[true, false, true, false, true]);
        let index = MaskedIndex::new(base, &mask);

        assert_eq!(Index::size(&index), 3);
        assert_eq!(index.positions(), [0, 2, 4]);
        assert_eq!(index.key_of(1), Some('c'));
        assert_eq!(index.index_of(&'e'), Some(2));
        assert_eq!(index.index_of(&'b'), None);
        check_bijection(&index);
    }

    #[test]
    fn test_sub_index() {
        let base = Arc::new(NaturalIndex::new("D0", 10));
        let index = SubIndex::new(base.clone(), 3, 7).unwrap();
        assert_eq!(Index::size(&index), 4);
        assert_eq!(index.key_of(0), Some(3));
        assert_eq!(index.index_of(&6), Some(3));
        assert_eq!(index.index_of(&7), None);
        assert_eq!(index.index_of(&2), None);
        check_bijection(&index);

        let same = SubIndex::new(base.clone(), 3, 7).unwrap();
        assert_eq!(index, same);

        assert_eq!(
            SubIndex::new(base, 5, 11).err(),
            Some(FromDataError::InvalidRange {
                start: 5,
                end: 11,
                size: 10
            })
        );
    }

    #[test]
    fn test_derived_indices_do_not_nest() {
        let base: Arc<dyn DimIndex> = Arc::new(NaturalIndex::new("D0", 8));

        let sub = base.sub(2, 8);
        assert_eq!(sub.size(), 6);
        let sub_sub = sub.clone().sub(1, 4);
        let sub_sub = sub_sub
            .as_any()
            .downcast_ref::<SubIndex<NaturalIndex>>()
            .unwrap();
        assert_eq!(sub_sub.range(), 3..6);

        // Mask positions 1 and 3 of the sub-range, ie. base positions 3 and 5.
        let mask = BitSet::from_bools(&[false, true, false, true, false, false]);
        let masked = sub.masked(&mask);
        let masked_typed = masked
            .as_any()
            .downcast_ref::<MaskedIndex<NaturalIndex>>()
            .unwrap();
        assert_eq!(masked_typed.positions(), [3, 5]);

        let masked_sub = masked.sub(1, 2);
        let masked_sub = masked_sub
            .as_any()
            .downcast_ref::<MaskedIndex<NaturalIndex>>()
            .unwrap();
        assert_eq!(masked_sub.positions(), [5]);
        assert_eq!(masked_sub.key_of(0), Some(5));
    }
}
