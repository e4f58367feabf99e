use glam::{Mat3, Vec3};

use crate::{
    math::{inverse_or_identity, row_mul},
    store::{TweakArray, TweakArrayBuilder},
};

/// Posed-space tweaks with every component smaller than this are dropped by
/// the forward conversion.
pub const TWEAK_EPSILON: f32 = 0.001;

fn matrix_for(matrices: &[Mat3], index: u32) -> Mat3 {
    matrices
        .get(index as usize)
        .copied()
        .unwrap_or(Mat3::IDENTITY)
}

fn below_epsilon(delta: Vec3) -> bool {
    delta.abs().cmplt(Vec3::splat(TWEAK_EPSILON)).all()
}

/// Converts posed-space tweaks into base-space inverted tweaks, `v · M[i]`.
///
/// The result is a full rebuild: entries in an older inverted store that no
/// longer have a live tweak do not survive. Most sculpts touch a small,
/// local part of the mesh, so near-zero tweaks are skipped to keep the
/// store sparse and the output deformation pass cheap.
///
/// Index 0 is always emitted first, even when its value is zero - the host's
/// change notification for the inverted array only fires once the array has
/// at least one populated element.
pub fn invert_tweaks(tweaks: &TweakArray, matrices: &[Mat3]) -> TweakArray {
    let mut builder = TweakArrayBuilder::with_capacity(tweaks.len() + 1);

    let first = match tweaks.get(0) {
        Some(delta) if !below_epsilon(delta) => row_mul(delta, &matrix_for(matrices, 0)),
        _ => Vec3::ZERO,
    };
    builder.push(0, first);

    for (index, delta) in tweaks.iter() {
        if index == 0 || below_epsilon(delta) {
            continue;
        }

        builder.push(index, row_mul(delta, &matrix_for(matrices, index)));
    }

    builder.build()
}

/// Converts base-space inverted tweaks back into posed space, `v · M[i]⁻¹`.
///
/// No epsilon filter on this side: a zero inverted tweak just round-trips to
/// a zero tweak, which is harmless.
pub fn recover_tweaks(inverted: &TweakArray, matrices: &[Mat3]) -> TweakArray {
    let mut builder = TweakArrayBuilder::with_capacity(inverted.len());

    for (index, delta) in inverted.iter() {
        let inverse = inverse_or_identity(&matrix_for(matrices, index));
        builder.push(index, row_mul(delta, &inverse));
    }

    builder.build()
}

/// The derived value for a single vertex, without rebuilding a whole store:
/// `v · M[i]`, or zero when the inverted store has no entry at `index`.
pub fn recover_tweak_at(inverted: &TweakArray, matrices: &[Mat3], index: u32) -> Vec3 {
    let Some(delta) = inverted.get(index) else {
        return Vec3::ZERO;
    };

    row_mul(delta, &matrix_for(matrices, index))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use glam::vec3;

    use crate::math::mat3_from_rows;

    use super::*;

    fn skewed() -> Vec<Mat3> {
        // A fixed, invertible matrix per vertex.
        (0..8)
            .map(|i| {
                mat3_from_rows(
                    vec3(1.0 + i as f32 * 0.25, 0.0, 0.5),
                    vec3(0.0, 2.0, 0.0),
                    vec3(0.25, 0.0, 1.5),
                )
            })
            .collect()
    }

    fn tweaks_of(entries: &[(u32, Vec3)]) -> TweakArray {
        let mut builder = TweakArrayBuilder::new();
        for &(index, delta) in entries {
            builder.push(index, delta);
        }
        builder.build()
    }

    #[test]
    fn round_trips_through_both_conversions() {
        let matrices = skewed();
        let tweaks = tweaks_of(&[
            (1, vec3(0.5, -0.25, 1.0)),
            (4, vec3(-2.0, 0.125, 0.0625)),
            (7, vec3(0.001, 0.001, 0.001)),
        ]);

        let inverted = invert_tweaks(&tweaks, &matrices);
        let recovered = recover_tweaks(&inverted, &matrices);

        for (index, delta) in tweaks.iter() {
            let back = recovered.get(index).unwrap();
            assert_abs_diff_eq!(back.x, delta.x, epsilon = 1e-6);
            assert_abs_diff_eq!(back.y, delta.y, epsilon = 1e-6);
            assert_abs_diff_eq!(back.z, delta.z, epsilon = 1e-6);
        }
    }

    #[test]
    fn near_zero_tweaks_are_filtered() {
        let matrices = skewed();
        let tweaks = tweaks_of(&[(3, vec3(0.0005, 0.0, 0.0))]);

        let inverted = invert_tweaks(&tweaks, &matrices);

        assert_eq!(inverted.get(3), None);
        // Only the mandatory index 0 remains.
        assert_eq!(inverted.len(), 1);
    }

    #[test]
    fn a_single_large_component_is_kept() {
        let matrices = vec![Mat3::IDENTITY; 4];
        let tweaks = tweaks_of(&[(2, vec3(0.0, 0.0, 0.01))]);

        let inverted = invert_tweaks(&tweaks, &matrices);
        assert_eq!(inverted.get(2), Some(vec3(0.0, 0.0, 0.01)));
    }

    #[test]
    fn index_zero_is_always_emitted_first() {
        let inverted = invert_tweaks(&TweakArray::new(), &[]);

        let collected: Vec<_> = inverted.iter().collect();
        assert_eq!(collected, vec![(0, Vec3::ZERO)]);
    }

    #[test]
    fn a_real_tweak_at_index_zero_wins_over_the_placeholder() {
        let matrices = vec![Mat3::from_diagonal(vec3(2.0, 2.0, 2.0))];
        let tweaks = tweaks_of(&[(0, vec3(1.0, 0.0, 0.0))]);

        let inverted = invert_tweaks(&tweaks, &matrices);
        assert_eq!(inverted.len(), 1);
        assert_eq!(inverted.get(0), Some(vec3(2.0, 0.0, 0.0)));
    }

    #[test]
    fn conversion_is_a_rebuild_not_a_merge() {
        let matrices = skewed();

        let first = invert_tweaks(&tweaks_of(&[(2, Vec3::ONE), (5, Vec3::ONE)]), &matrices);
        assert!(first.get(5).is_some());

        // Vertex 5 was smoothed back out; its old entry must not survive.
        let second = invert_tweaks(&tweaks_of(&[(2, Vec3::ONE)]), &matrices);
        assert!(second.get(5).is_none());
    }

    #[test]
    fn indices_past_the_cache_fall_back_to_identity() {
        let tweaks = tweaks_of(&[(5, vec3(1.0, 2.0, 3.0))]);

        let inverted = invert_tweaks(&tweaks, &[]);
        assert_eq!(inverted.get(5), Some(vec3(1.0, 2.0, 3.0)));

        assert_eq!(
            recover_tweak_at(&inverted, &[], 5),
            vec3(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn point_query_of_an_absent_index_is_zero() {
        let inverted = invert_tweaks(&TweakArray::new(), &[]);
        assert_eq!(recover_tweak_at(&inverted, &[], 9), Vec3::ZERO);
    }
}
