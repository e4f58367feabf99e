use glam::Mat3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The host-written table of per-vertex inversion matrices.
///
/// Logical indices can be sparse; anything the host never wrote is an
/// implicit identity. The table itself is the persisted form - dense
/// lookups go through [MatrixCache].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixTable {
    entries: Vec<(u32, Mat3)>,
}

impl MatrixTable {
    pub fn new() -> Self {
        MatrixTable {
            entries: Vec::new(),
        }
    }

    /// Writes one slot, replacing any previous value at that index.
    pub fn set(&mut self, index: u32, matrix: Mat3) {
        match self.entries.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(pos) => self.entries[pos].1 = matrix,
            Err(pos) => self.entries.insert(pos, (index, matrix)),
        }
    }

    /// Replaces the whole table.
    pub fn replace_all(&mut self, mut entries: Vec<(u32, Mat3)>) {
        entries.sort_unstable_by_key(|&(i, _)| i);
        self.entries = entries;
    }

    /// Iterates populated `(index, matrix)` slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Mat3)> + '_ {
        self.entries.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A lazily rebuilt dense view of a [MatrixTable].
///
/// The table is read far more often than it changes, and unlike the tweak
/// stores it usually holds a value for every vertex, so the dense copy is
/// built once and handed out until a matrix write invalidates it. Gaps in
/// the table are filled with the identity so the result is index-addressable
/// in O(1); indices past the end are "no inversion available yet" and read
/// as identity too.
#[derive(Debug, Clone, Default)]
pub struct MatrixCache {
    dense: Option<Vec<Mat3>>,
}

impl MatrixCache {
    pub fn new() -> Self {
        MatrixCache { dense: None }
    }

    /// Discards the cached copy. The next [Self::matrices] call rebuilds it;
    /// nothing is recomputed eagerly.
    pub fn invalidate(&mut self) {
        self.dense = None;
    }

    pub fn is_valid(&self) -> bool {
        self.dense.is_some()
    }

    /// The dense matrix sequence, rebuilding it from `table` if a write
    /// invalidated the previous copy.
    pub fn matrices(&mut self, table: &MatrixTable) -> &[Mat3] {
        if self.dense.is_none() {
            let mut dense = Vec::new();
            for (index, matrix) in table.iter() {
                // Fill any gap up to this slot. The table is usually dense,
                // so this rarely runs.
                while dense.len() < index as usize {
                    dense.push(Mat3::IDENTITY);
                }
                dense.push(matrix);
            }

            debug!(matrices = dense.len(), "rebuilt inversion matrix cache");
            self.dense = Some(dense);
        }

        self.dense.as_deref().unwrap()
    }
}
