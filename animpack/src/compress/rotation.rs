//! Rotation storage-shape conversion.

use crate::formats::RotationFormat;
use crate::stream::BoneStreams;

/// Rewrites every rotation sample into the storage shape of `format`.
///
/// Drop-w formats canonicalize the hemisphere so the reconstructed w is
/// non-negative. Quat_48 keeps the original hemisphere in `w_flipped` so the
/// decoder can restore it; the other narrow formats encode q and -q
/// identically.
pub(crate) fn convert_rotation_streams(streams: &mut [BoneStreams], format: RotationFormat) {
    if !format.drops_w() {
        return;
    }
    let keep_sign = matches!(format, RotationFormat::Quat48);
    for bone in streams.iter_mut() {
        for (sample, flipped) in bone.rotations.iter_mut().zip(&mut bone.w_flipped) {
            if sample[3] < 0.0 {
                for component in sample.iter_mut() {
                    *component = -*component;
                }
                if keep_sign {
                    *flipped = true;
                }
            }
        }
    }
}
