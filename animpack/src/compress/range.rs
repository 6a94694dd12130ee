//! Per-clip range reduction.
//!
//! Animated samples are rewritten to [0, 1] per component; the (min, extent)
//! pair that undoes the mapping lands in the range-data region at full
//! precision. Constant and default tracks are left alone.

use crate::formats::{RangeReduction, RotationFormat};
use crate::stream::{BoneStreams, TrackRange};

pub(crate) fn normalize_rotation_streams(
    streams: &mut [BoneStreams],
    range_reduction: RangeReduction,
    format: RotationFormat,
) {
    if !range_reduction.reduces_rotations() {
        return;
    }
    let num_components = format.num_components();
    for bone in streams.iter_mut() {
        if !bone.rotation_is_animated() {
            continue;
        }
        let mut min = [0.0; 4];
        let mut extent = [0.0; 4];
        for component in 0..num_components {
            let lo = bone
                .rotations
                .iter()
                .map(|sample| sample[component])
                .fold(f64::INFINITY, f64::min);
            let hi = bone
                .rotations
                .iter()
                .map(|sample| sample[component])
                .fold(f64::NEG_INFINITY, f64::max);
            min[component] = lo;
            extent[component] = hi - lo;
        }
        for sample in &mut bone.rotations {
            for component in 0..num_components {
                sample[component] = if extent[component] == 0.0 {
                    0.0
                } else {
                    (sample[component] - min[component]) / extent[component]
                };
            }
        }
        bone.rotation_normalized = true;
        bone.rotation_range = Some(TrackRange { min, extent });
    }
}

pub(crate) fn normalize_translation_streams(
    streams: &mut [BoneStreams],
    range_reduction: RangeReduction,
) {
    if !range_reduction.reduces_translations() {
        return;
    }
    for bone in streams.iter_mut() {
        if !bone.translation_is_animated() {
            continue;
        }
        let mut min = [0.0; 4];
        let mut extent = [0.0; 4];
        for component in 0..3 {
            let lo = bone
                .translations
                .iter()
                .map(|sample| sample[component])
                .fold(f64::INFINITY, f64::min);
            let hi = bone
                .translations
                .iter()
                .map(|sample| sample[component])
                .fold(f64::NEG_INFINITY, f64::max);
            min[component] = lo;
            extent[component] = hi - lo;
        }
        for sample in &mut bone.translations {
            for component in 0..3 {
                sample[component] = if extent[component] == 0.0 {
                    0.0
                } else {
                    (sample[component] - min[component]) / extent[component]
                };
            }
        }
        bone.translation_normalized = true;
        bone.translation_range = Some(TrackRange { min, extent });
    }
}

/// Bytes of range data the artifact will carry: one f32 (min, extent) pair
/// per component of every reduced animated track.
pub(crate) fn range_data_size(
    streams: &[BoneStreams],
    range_reduction: RangeReduction,
    rotation_format: RotationFormat,
) -> u32 {
    let mut size = 0usize;
    for bone in streams {
        if range_reduction.reduces_rotations() && bone.rotation_is_animated() {
            size += rotation_format.num_components() * 4 * 2;
        }
        if range_reduction.reduces_translations() && bone.translation_is_animated() {
            size += 3 * 4 * 2;
        }
    }
    size as u32
}
