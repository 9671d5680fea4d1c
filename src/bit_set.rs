/// A fixed-size set of bit positions, used to mask cube axes.
///
/// Unlike a `Vec<bool>` this stores 64 positions per word, so masks over
/// very long axes stay small.
#[derive(Clone, Default, PartialEq)]
pub struct BitSet {
    words: Vec<u64>,
    size: u64,
}

impl BitSet {
    const WORD_BITS: u64 = u64::BITS as u64;

    /// Return a bit set with `size` positions, none of which are set.
    pub fn new(size: u64) -> Self {
        let n_words = size.div_ceil(Self::WORD_BITS) as usize;
        BitSet {
            words: vec![0; n_words],
            size,
        }
    }

    /// Return a bit set with `size` positions, all of which are set.
    pub fn ones(size: u64) -> Self {
        let mut set = Self::new(size);
        for word in &mut set.words {
            *word = u64::MAX;
        }
        set.clear_tail();
        set
    }

    /// Return a bit set with one position per entry in `bools`.
    pub fn from_bools(bools: &[bool]) -> Self {
        let mut set = Self::new(bools.len() as u64);
        for (pos, &value) in bools.iter().enumerate() {
            if value {
                set.insert(pos as u64);
            }
        }
        set
    }

    /// Number of positions in the set, whether set or not.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Set the bit at position `pos`.
    ///
    /// Panics if `pos` is not less than [`size`](BitSet::size).
    pub fn insert(&mut self, pos: u64) {
        assert!(pos < self.size, "bit position out of range");
        self.words[(pos / Self::WORD_BITS) as usize] |= 1 << (pos % Self::WORD_BITS);
    }

    /// Unset the bit at position `pos`.
    ///
    /// Panics if `pos` is not less than [`size`](BitSet::size).
    pub fn delete(&mut self, pos: u64) {
        assert!(pos < self.size, "bit position out of range");
        self.words[(pos / Self::WORD_BITS) as usize] &= !(1 << (pos % Self::WORD_BITS));
    }

    /// Set or unset position `pos`.
    pub fn set(&mut self, pos: u64, value: bool) {
        if value {
            self.insert(pos)
        } else {
            self.delete(pos)
        }
    }

    /// Return true if position `pos` is set. Positions beyond the end are
    /// never set.
    pub fn get(&self, pos: u64) -> bool {
        if pos >= self.size {
            return false;
        }
        self.words[(pos / Self::WORD_BITS) as usize] & (1 << (pos % Self::WORD_BITS)) != 0
    }

    /// Return the number of bits set.
    pub fn len(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Return true if no bits are set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Return true if every position is set.
    pub fn is_full(&self) -> bool {
        self.len() == self.size
    }

    /// Return an iterator over the indices of set positions, in ascending
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_idx, &word)| {
                let base = word_idx as u64 * Self::WORD_BITS;
                SetBits(word).map(move |bit| base + bit)
            })
    }

    /// Unset the unused bits of the last word.
    fn clear_tail(&mut self) {
        let tail = self.size % Self::WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << tail) - 1;
            }
        }
    }
}

/// Iterator over the positions of set bits in a word.
struct SetBits(u64);

impl Iterator for SetBits {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as u64;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for pos in 0..self.size {
            write!(f, "{}", if self.get(pos) { 1 } else { 0 })?;
        }
        Ok(())
    }
}
