use serde::{Deserialize, Serialize};

use crate::{matrix::MatrixTable, store::TweakArray};

/// The persisted slice of a deformer instance.
///
/// Only the base-space store and the matrix table are saved. The posed-space
/// tweak store is never serialized - it is always re-derivable from these
/// two, and [crate::InvertedBlendShape::from_state] rebuilds it on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeformerState {
    pub inverted_tweaks: TweakArray,
    pub inversion_matrices: MatrixTable,
}
