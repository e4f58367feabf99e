use glam::{Mat3, Vec3};
use thiserror::Error;
use tracing::debug;

use crate::math::{inverse_or_identity, mat3_from_rows};

use super::InvertedBlendShape;

/// Probe displacements smaller than this on every component count as "no
/// observable effect".
const NO_EFFECT_EPSILON: f32 = 0.001;

/// Displacing the base mesh produced no movement on the posed mesh, so there
/// is nothing to invert. The scene needs fixing (the chain re-enabled or
/// re-wired) before the estimate is retried; the previous matrices are left
/// untouched.
#[derive(Error, Debug)]
#[error("displacing the base mesh did not move the posed mesh; the deformation chain downstream appears to be inactive")]
pub struct InactiveChainError;

/// The host-side deformation chain between the base mesh and the posed mesh.
///
/// Whatever sits in between (skinning, blend shape composition) is opaque
/// here. The estimator only needs to nudge the base points, observe where
/// the posed points land, and temporarily park the sculpt deformer itself so
/// its own output doesn't contaminate the baseline.
pub trait DeformChain {
    /// Current posed-mesh point positions, object space.
    fn posed_points(&self) -> Vec<Vec3>;

    /// Displaces every base-mesh point by `offset`, relative, object space.
    fn displace_base(&mut self, offset: Vec3);

    /// Enables or disables the sculpt deformer's own contribution to the
    /// chain.
    fn set_chain_enabled(&mut self, enabled: bool);
}

/// Estimates one inversion matrix per vertex by finite differences and
/// installs the result on `shape`.
///
/// The chain is probed four times: once at rest, then once per axis with
/// every base point pushed one unit along that axis. The three posed-space
/// deltas per vertex are the rows of a numerical Jacobian of the
/// deformation, sampled at the current pose; its inverse is the matrix that
/// carries posed-space edits back to the base mesh. The approximation
/// assumes the chain is locally linear around the current pose, so the host
/// re-runs this whenever the pose meaningfully changes.
///
/// On success the posed-space tweaks are recalculated immediately, so
/// downstream values reflect the new inversion without re-sculpting.
pub fn estimate_inversion<C: DeformChain>(
    chain: &mut C,
    shape: &mut InvertedBlendShape,
) -> Result<(), InactiveChainError> {
    chain.set_chain_enabled(false);
    let probes = probe_axes(chain);
    chain.set_chain_enabled(true);

    let [base, x, y, z] = probes?;

    let mut entries = Vec::with_capacity(base.len());
    for i in 0..base.len() {
        let jacobian = mat3_from_rows(x[i] - base[i], y[i] - base[i], z[i] - base[i]);
        entries.push((i as u32, inverse_or_identity(&jacobian)));
    }

    debug!(vertices = entries.len(), "estimated inversion matrices");
    shape.set_matrices(entries);
    shape.recalculate_tweaks();

    Ok(())
}

/// Samples the posed mesh at rest and under a unit displacement along each
/// axis, undoing every displacement before the next.
fn probe_axes<C: DeformChain>(chain: &mut C) -> Result<[Vec<Vec3>; 4], InactiveChainError> {
    let base = chain.posed_points();

    chain.displace_base(Vec3::X);
    let x = chain.posed_points();
    chain.displace_base(-Vec3::X);

    // If pushing the whole base mesh sideways didn't move the posed mesh,
    // nothing downstream is evaluating and every matrix would come out
    // degenerate. Bail out before sampling the other axes.
    if let (Some(b), Some(moved)) = (base.first(), x.first()) {
        if (*moved - *b).abs().cmplt(Vec3::splat(NO_EFFECT_EPSILON)).all() {
            return Err(InactiveChainError);
        }
    }

    chain.displace_base(Vec3::Y);
    let y = chain.posed_points();
    chain.displace_base(-Vec3::Y);

    chain.displace_base(Vec3::Z);
    let z = chain.posed_points();
    chain.displace_base(-Vec3::Z);

    Ok([base, x, y, z])
}
