//! Dependency sets over cell slots
//!
//! Every cell in a sheet owns a dense slot index assigned at declaration. A
//! [`DependencySet`] is a fixed-capacity bit vector over those slots, used both
//! for "which inputs contributed to this value" and "which cells are affected".

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub};

const WORD_BITS: usize = 64;
const WORDS: usize = DependencySet::CAPACITY / WORD_BITS;

/// Fixed-capacity set of cell slots
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DependencySet {
    words: [u64; WORDS],
}

impl DependencySet {
    /// Maximum number of slots a set can hold, and therefore the maximum
    /// number of cells a sheet can declare
    pub const CAPACITY: usize = 1024;

    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set holding a single slot
    pub fn single(slot: usize) -> Self {
        let mut set = Self::new();
        set.set(slot);
        set
    }

    /// Add a slot to the set
    ///
    /// Slots at or beyond [`Self::CAPACITY`] are never handed out by a sheet;
    /// passing one is a logic error and panics.
    pub fn set(&mut self, slot: usize) {
        assert!(
            slot < Self::CAPACITY,
            "slot {} beyond dependency set capacity",
            slot
        );
        self.words[slot / WORD_BITS] |= 1 << (slot % WORD_BITS);
    }

    /// Remove a slot from the set
    pub fn reset(&mut self, slot: usize) {
        if slot < Self::CAPACITY {
            self.words[slot / WORD_BITS] &= !(1 << (slot % WORD_BITS));
        }
    }

    /// Check whether a slot is in the set
    pub fn test(&self, slot: usize) -> bool {
        slot < Self::CAPACITY && self.words[slot / WORD_BITS] & (1 << (slot % WORD_BITS)) != 0
    }

    /// Remove every slot
    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    /// True if the set is empty
    pub fn none(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// True if the set holds at least one slot
    pub fn any(&self) -> bool {
        !self.none()
    }

    /// Number of slots in the set
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set union
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out |= *other;
        out
    }

    /// Set intersection
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = *self;
        out &= *other;
        out
    }

    /// Slots in `self` that are not in `other`
    pub fn difference(&self, other: &Self) -> Self {
        let mut out = *self;
        for (w, o) in out.words.iter_mut().zip(other.words.iter()) {
            *w &= !o;
        }
        out
    }

    /// True if the two sets share a slot
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Iterate slots in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(index, word)| {
                let word = *word;
                (0..WORD_BITS)
                    .filter(move |bit| word & (1 << bit) != 0)
                    .map(move |bit| index * WORD_BITS + bit)
            })
    }
}

impl BitOr for DependencySet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(&rhs)
    }
}

impl BitOrAssign for DependencySet {
    fn bitor_assign(&mut self, rhs: Self) {
        for (w, r) in self.words.iter_mut().zip(rhs.words.iter()) {
            *w |= r;
        }
    }
}

impl BitAnd for DependencySet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersect(&rhs)
    }
}

impl BitAndAssign for DependencySet {
    fn bitand_assign(&mut self, rhs: Self) {
        for (w, r) in self.words.iter_mut().zip(rhs.words.iter()) {
            *w &= r;
        }
    }
}

impl Sub for DependencySet {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(&rhs)
    }
}

impl FromIterator<usize> for DependencySet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for slot in iter {
            set.set(slot);
        }
        set
    }
}

impl fmt::Debug for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_set_and_test() {
        let mut set = DependencySet::new();
        assert!(set.none());

        set.set(0);
        set.set(63);
        set.set(64);
        set.set(DependencySet::CAPACITY - 1);

        assert!(set.test(0));
        assert!(set.test(63));
        assert!(set.test(64));
        assert!(set.test(DependencySet::CAPACITY - 1));
        assert!(!set.test(1));
        assert!(!set.test(DependencySet::CAPACITY));
        assert_eq!(set.count(), 4);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![0, 63, 64, DependencySet::CAPACITY - 1]
        );

        set.reset(63);
        assert!(!set.test(63));
    }

    #[test]
    #[should_panic(expected = "beyond dependency set capacity")]
    fn test_set_beyond_capacity_panics() {
        DependencySet::new().set(DependencySet::CAPACITY);
    }

    #[test]
    fn test_debug_lists_slots() {
        let set: DependencySet = [3, 1].into_iter().collect();
        assert_eq!(format!("{:?}", set), "{1, 3}");
    }

    fn slots() -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(0..DependencySet::CAPACITY, 0..40)
    }

    proptest! {
        #[test]
        fn union_contains_both(a in slots(), b in slots()) {
            let sa: DependencySet = a.iter().copied().collect();
            let sb: DependencySet = b.iter().copied().collect();
            let u = sa | sb;
            for slot in a.iter().chain(b.iter()) {
                prop_assert!(u.test(*slot));
            }
            prop_assert_eq!(u.count(), sa.count() + sb.count() - (sa & sb).count());
        }

        #[test]
        fn difference_and_intersection_partition(a in slots(), b in slots()) {
            let sa: DependencySet = a.iter().copied().collect();
            let sb: DependencySet = b.iter().copied().collect();
            let diff = sa - sb;
            let common = sa & sb;
            prop_assert!(!diff.intersects(&sb));
            prop_assert_eq!(diff | common, sa);
            prop_assert_eq!(common.any(), sa.intersects(&sb));
        }

        #[test]
        fn iter_round_trips(a in slots()) {
            let sa: DependencySet = a.iter().copied().collect();
            let again: DependencySet = sa.iter().collect();
            prop_assert_eq!(again, sa);
            let mut sorted = a.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sa.iter().collect::<Vec<_>>(), sorted);
        }
    }
}
