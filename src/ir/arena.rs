//! Arena allocator for IR nodes.
//!
//! The arena provides:
//! - **O(1) allocation**: Bump allocation with no per-node deallocation
//! - **Cache-friendly**: Nodes are contiguous in memory
//! - **Zero-cost IDs**: An ID is just an index into the arena
//!
//! Node identity (the arena slot) is load-bearing in this IR: barrier nodes
//! are deduplicated by identity, never by structure, so IDs are the only
//! name a node ever has.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

// =============================================================================
// Typed ID
// =============================================================================

/// A type-safe identifier for arena-allocated items.
///
/// The generic parameter `T` ensures IDs from different arenas cannot be
/// mixed up. Traits are implemented manually so `Id<T>` is always
/// Copy/Clone/Hash/Eq regardless of `T`.
pub struct Id<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Id<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> std::hash::Hash for Id<T> {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Id<T> {
    /// Create a new ID from a raw index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Id {
            index,
            _marker: PhantomData,
        }
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Get the index as usize.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.index as usize
    }
}

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

// =============================================================================
// Arena
// =============================================================================

/// A simple arena allocator for homogeneous items.
///
/// Items are stored contiguously and accessed by ID. Individual items are
/// never deallocated; dead nodes are flagged and skipped, and the whole
/// arena is freed with the compilation session.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Arena<T> {
    /// Create a new empty arena.
    #[inline]
    pub fn new() -> Self {
        Arena { items: Vec::new() }
    }

    /// Create a new arena with the given initial capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Allocate a new item and return its ID.
    #[inline]
    pub fn alloc(&mut self, item: T) -> Id<T> {
        let index = self.items.len() as u32;
        self.items.push(item);
        Id::new(index)
    }

    /// Get a reference to an item by ID.
    #[inline]
    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.items.get(id.as_usize())
    }

    /// Get a mutable reference to an item by ID.
    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.items.get_mut(id.as_usize())
    }

    /// Get the number of items in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the arena is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over all items with their IDs.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (Id::new(i as u32), item))
    }

    /// Iterate over all IDs.
    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = Id<T>> {
        (0..self.items.len() as u32).map(Id::new)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: Id<T>) -> &Self::Output {
        &self.items[id.as_usize()]
    }
}

impl<T> IndexMut<Id<T>> for Arena<T> {
    #[inline]
    fn index_mut(&mut self, id: Id<T>) -> &mut Self::Output {
        &mut self.items[id.as_usize()]
    }
}

// =============================================================================
// Secondary Map
// =============================================================================

/// A secondary map that associates additional data with arena items.
///
/// Used for computed per-node properties (use chains, lattice values)
/// without widening the node structure itself.
#[derive(Debug, Clone)]
pub struct SecondaryMap<K, V> {
    values: Vec<V>,
    _marker: PhantomData<K>,
}

impl<K, V: Default + Clone> SecondaryMap<K, V> {
    /// Create a new empty secondary map.
    pub fn new() -> Self {
        SecondaryMap {
            values: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Ensure the map can hold up to the given index.
    pub fn resize(&mut self, len: usize) {
        if len > self.values.len() {
            self.values.resize(len, V::default());
        }
    }

    /// Get a value by ID.
    pub fn get(&self, id: Id<K>) -> Option<&V> {
        self.values.get(id.as_usize())
    }

    /// Get a mutable value by ID.
    pub fn get_mut(&mut self, id: Id<K>) -> Option<&mut V> {
        self.values.get_mut(id.as_usize())
    }

    /// Set a value by ID, growing the map if needed.
    pub fn set(&mut self, id: Id<K>, value: V) {
        let idx = id.as_usize();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, V::default());
        }
        self.values[idx] = value;
    }
}

impl<K, V: Default + Clone> Default for SecondaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Bit Set
// =============================================================================

/// A compact bit set for tracking node properties during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSet {
    bits: Vec<u64>,
}

impl BitSet {
    /// Create a new empty bit set.
    pub fn new() -> Self {
        BitSet { bits: Vec::new() }
    }

    /// Create a new bit set with capacity for `n` bits.
    pub fn with_capacity(n: usize) -> Self {
        let words = n.div_ceil(64);
        BitSet {
            bits: vec![0; words],
        }
    }

    /// Ensure the bit set can hold at least `n` bits.
    pub fn ensure_capacity(&mut self, n: usize) {
        let words = n.div_ceil(64);
        if words > self.bits.len() {
            self.bits.resize(words, 0);
        }
    }

    /// Set a bit.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        self.ensure_capacity(index + 1);
        self.bits[index / 64] |= 1 << (index % 64);
    }

    /// Check if a bit is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let word = index / 64;
        if word < self.bits.len() {
            (self.bits[word] & (1 << (index % 64))) != 0
        } else {
            false
        }
    }

    /// Count the number of set bits.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl Default for BitSet {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        value: i32,
    }

    #[test]
    fn test_arena_alloc() {
        let mut arena: Arena<TestNode> = Arena::new();

        let id1 = arena.alloc(TestNode { value: 10 });
        let id2 = arena.alloc(TestNode { value: 20 });

        assert_eq!(id1.index(), 0);
        assert_eq!(id2.index(), 1);
        assert_eq!(arena[id1].value, 10);
        assert_eq!(arena[id2].value, 20);

        arena[id2].value = 200;
        assert_eq!(arena[id2].value, 200);
    }

    #[test]
    fn test_arena_iter() {
        let mut arena: Arena<TestNode> = Arena::new();

        arena.alloc(TestNode { value: 1 });
        arena.alloc(TestNode { value: 2 });
        arena.alloc(TestNode { value: 3 });

        let values: Vec<_> = arena.iter().map(|(_, n)| n.value).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_id_distinct_slots() {
        let mut arena: Arena<TestNode> = Arena::new();
        let a = arena.alloc(TestNode { value: 7 });
        let b = arena.alloc(TestNode { value: 7 });

        // Structurally equal items still get distinct identities.
        assert_ne!(a, b);
    }

    #[test]
    fn test_secondary_map() {
        let mut arena: Arena<TestNode> = Arena::new();
        let id1 = arena.alloc(TestNode { value: 10 });
        let id2 = arena.alloc(TestNode { value: 20 });

        let mut map: SecondaryMap<TestNode, String> = SecondaryMap::new();
        map.set(id1, "first".to_string());
        map.set(id2, "second".to_string());

        assert_eq!(map.get(id1).unwrap(), "first");
        assert_eq!(map.get(id2).unwrap(), "second");
    }

    #[test]
    fn test_bit_set() {
        let mut set = BitSet::new();

        set.insert(0);
        set.insert(63);
        set.insert(64);
        set.insert(100);

        assert!(set.contains(0));
        assert!(set.contains(63));
        assert!(set.contains(64));
        assert!(set.contains(100));
        assert!(!set.contains(1));
        assert!(!set.contains(65));
        assert_eq!(set.count(), 4);
    }
}
