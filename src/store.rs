use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A sparse array of per-vertex displacements.
///
/// Entries are keyed by vertex index and held in ascending order, so
/// iteration only ever visits populated indices. An index with no entry
/// simply means "no displacement" - reads return [None] rather than
/// erroring, and callers treat that as the zero vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweakArray {
    entries: Vec<(u32, Vec3)>,
}

impl TweakArray {
    pub fn new() -> Self {
        TweakArray {
            entries: Vec::new(),
        }
    }

    /// The displacement at `index`, or [None] if the index is unpopulated.
    pub fn get(&self, index: u32) -> Option<Vec3> {
        self.entries
            .binary_search_by_key(&index, |&(i, _)| i)
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Iterates the populated `(index, displacement)` pairs in ascending
    /// index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Vec3)> + '_ {
        self.entries.iter().copied()
    }

    /// The number of populated entries, not the highest index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a [TweakArray] in one pass.
///
/// The store is always rebuilt wholesale rather than patched, so the builder
/// only supports appending at strictly increasing indices.
#[derive(Debug, Default)]
pub struct TweakArrayBuilder {
    entries: Vec<(u32, Vec3)>,
}

impl TweakArrayBuilder {
    pub fn new() -> Self {
        TweakArrayBuilder {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TweakArrayBuilder {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an entry. `index` must be greater than every index pushed
    /// so far.
    pub fn push(&mut self, index: u32, delta: Vec3) {
        if let Some(&(last, _)) = self.entries.last() {
            assert!(
                index > last,
                "tweak entries must be appended in ascending index order ({index} after {last})"
            );
        }
        self.entries.push((index, delta));
    }

    pub fn build(self) -> TweakArray {
        TweakArray {
            entries: self.entries,
        }
    }
}
