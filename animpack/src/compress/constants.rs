//! Default and constant track detection.

use crate::stream::BoneStreams;
use glam::DVec3;

/// Tolerance for default and constant classification.
pub(crate) const CONSTANT_THRESHOLD: f64 = 1.0e-5;

/// Default test: the quaternion dot with identity reduces to w.
fn rotation_is_default(sample: [f64; 4], threshold: f64) -> bool {
    sample[3] >= 1.0 - threshold
}

fn rotations_near(a: [f64; 4], b: [f64; 4], threshold: f64) -> bool {
    (0..4).all(|component| (a[component] - b[component]).abs() <= threshold)
}

fn translations_near(a: DVec3, b: DVec3, threshold: f64) -> bool {
    (a - b).abs().max_element() <= threshold
}

/// Classifies every track as default, constant, or animated and drops the
/// redundant samples. Default wins over constant; default tracks keep no
/// samples, constant tracks keep one.
pub(crate) fn compact_constant_streams(streams: &mut [BoneStreams], threshold: f64) {
    for bone in streams.iter_mut() {
        if bone
            .rotations
            .iter()
            .all(|&sample| rotation_is_default(sample, threshold))
        {
            bone.rotation_default = true;
            bone.rotations.clear();
            bone.w_flipped.clear();
        } else {
            let first = bone.rotations[0];
            if bone
                .rotations
                .iter()
                .all(|&sample| rotations_near(sample, first, threshold))
            {
                bone.rotation_constant = true;
                bone.rotations.truncate(1);
                bone.w_flipped.truncate(1);
            }
        }

        if bone
            .translations
            .iter()
            .all(|&sample| translations_near(sample, DVec3::ZERO, threshold))
        {
            bone.translation_default = true;
            bone.translations.clear();
        } else {
            let first = bone.translations[0];
            if bone
                .translations
                .iter()
                .all(|&sample| translations_near(sample, first, threshold))
            {
                bone.translation_constant = true;
                bone.translations.truncate(1);
            }
        }
    }
}

/// Track census taken after compaction.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TrackCounts {
    pub constant_rotations: u32,
    pub constant_translations: u32,
    pub animated_rotations: u32,
    pub animated_translations: u32,
}

pub(crate) fn count_tracks(streams: &[BoneStreams]) -> TrackCounts {
    let mut counts = TrackCounts::default();
    for bone in streams {
        if bone.rotation_constant {
            counts.constant_rotations += 1;
        } else if bone.rotation_is_animated() {
            counts.animated_rotations += 1;
        }
        if bone.translation_constant {
            counts.constant_translations += 1;
        } else if bone.translation_is_animated() {
            counts.animated_translations += 1;
        }
    }
    counts
}
