pub mod convert;
pub mod estimate;

use bytemuck::cast_slice_mut;
use glam::{Mat3, Vec3};
use tracing::trace;

use crate::{
    data::DeformerState,
    matrix::{MatrixCache, MatrixTable},
    store::TweakArray,
};

use self::convert::{invert_tweaks, recover_tweak_at, recover_tweaks};

/// Which of the two displacement stores was written last and is currently
/// the source of truth. The other one is always re-derived through the
/// matrix cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Tweaks,
    InvertedTweaks,
}

/// One sculptable inverted blend shape instance.
///
/// The artist sculpts the final posed mesh; those edits arrive here as
/// posed-space tweaks and are immediately re-expressed in the base mesh's
/// local frame through the per-vertex inversion matrices, so the correction
/// stays valid as the pose changes. The base-space store is what the host
/// persists and what deforms the output geometry; the posed-space store is
/// transient and can always be rebuilt from it.
#[derive(Debug, Clone)]
pub struct InvertedBlendShape {
    matrix_table: MatrixTable,
    cache: MatrixCache,
    tweaks: TweakArray,
    inverted_tweaks: TweakArray,
    authority: Authority,
}

impl InvertedBlendShape {
    pub fn new() -> Self {
        InvertedBlendShape {
            matrix_table: MatrixTable::new(),
            cache: MatrixCache::new(),
            tweaks: TweakArray::new(),
            inverted_tweaks: TweakArray::new(),
            authority: Authority::InvertedTweaks,
        }
    }

    /// Rebuilds a deformer from persisted state and re-derives the transient
    /// posed-space store from it.
    pub fn from_state(state: DeformerState) -> Self {
        let mut shape = InvertedBlendShape {
            matrix_table: state.inversion_matrices,
            cache: MatrixCache::new(),
            tweaks: TweakArray::new(),
            inverted_tweaks: state.inverted_tweaks,
            authority: Authority::InvertedTweaks,
        };
        shape.recalculate_tweaks();
        shape
    }

    /// The slice of this deformer the host persists. The posed-space store
    /// is deliberately absent; it is derived data.
    pub fn state(&self) -> DeformerState {
        DeformerState {
            inverted_tweaks: self.inverted_tweaks.clone(),
            inversion_matrices: self.matrix_table.clone(),
        }
    }

    /// The dense per-vertex inversion matrices, rebuilt lazily after a
    /// matrix write.
    pub fn matrices(&mut self) -> &[Mat3] {
        self.cache.matrices(&self.matrix_table)
    }

    pub fn invalidate_matrix_cache(&mut self) {
        self.cache.invalidate();
    }

    /// Writes one slot of the matrix table. The dense cache is discarded,
    /// never patched.
    pub fn set_matrix(&mut self, index: u32, matrix: Mat3) {
        self.matrix_table.set(index, matrix);
        self.cache.invalidate();
    }

    /// Replaces the whole matrix table, discarding the dense cache.
    pub fn set_matrices(&mut self, entries: Vec<(u32, Mat3)>) {
        self.matrix_table.replace_all(entries);
        self.cache.invalidate();
    }

    /// Receives a posed-space sculpt from the host. This is the only path
    /// that writes the inverted store: the incoming tweaks immediately
    /// replace it wholesale through the forward conversion.
    pub fn set_tweaks(&mut self, tweaks: TweakArray) {
        self.tweaks = tweaks;
        self.authority = Authority::Tweaks;

        let matrices = self.cache.matrices(&self.matrix_table);
        self.inverted_tweaks = invert_tweaks(&self.tweaks, matrices);
        trace!(
            tweaks = self.tweaks.len(),
            inverted = self.inverted_tweaks.len(),
            "inverted sculpted tweaks"
        );
    }

    /// One-shot "recalculate" request: overwrites the posed-space store from
    /// the inverted store and the current matrices. Invoked after the
    /// inversion matrices change so downstream posed values reflect the new
    /// inversion without the artist re-sculpting. With no underlying data
    /// this is a no-op producing an empty store, not an error.
    pub fn recalculate_tweaks(&mut self) {
        let matrices = self.cache.matrices(&self.matrix_table);
        self.tweaks = recover_tweaks(&self.inverted_tweaks, matrices);
        self.authority = Authority::InvertedTweaks;
    }

    /// The derived posed-space value for a single vertex.
    pub fn tweak_at(&mut self, index: u32) -> Vec3 {
        let matrices = self.cache.matrices(&self.matrix_table);
        recover_tweak_at(&self.inverted_tweaks, matrices, index)
    }

    pub fn tweaks(&self) -> &TweakArray {
        &self.tweaks
    }

    pub fn inverted_tweaks(&self) -> &TweakArray {
        &self.inverted_tweaks
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// Applies the stored base-space deltas to input geometry as a relative
    /// tweak. The store is usually much sparser than the mesh, so this walks
    /// the store rather than the points; indices past the end of `points`
    /// are ignored.
    pub fn deform(&self, points: &mut [Vec3]) {
        for (index, delta) in self.inverted_tweaks.iter() {
            let Some(point) = points.get_mut(index as usize) else {
                break;
            };
            *point += delta;
        }
    }

    /// [Self::deform] over a packed `x y z x y z ...` host array.
    ///
    /// Panics if the slice length is not a multiple of 3.
    pub fn deform_packed(&self, points: &mut [f32]) {
        self.deform(cast_slice_mut(points));
    }
}

impl Default for InvertedBlendShape {
    fn default() -> Self {
        Self::new()
    }
}
