//! Columnar per-bone track streams used by the compression pipeline.

use crate::model::AnimationClip;
use glam::DVec3;

/// Per-track (min, extent) captured by range reduction, in storage shape.
/// Unused high components are zero.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TrackRange {
    pub min: [f64; 4],
    pub extent: [f64; 4],
}

/// One bone's tracks in the canonical columnar form the pipeline mutates.
///
/// Rotations are carried as x/y/z/w tuples regardless of the target format.
/// The conversion pass canonicalizes the storage hemisphere; `w_flipped`
/// remembers per-sample flips for formats that keep a sign bit.
#[derive(Clone, Debug)]
pub(crate) struct BoneStreams {
    pub rotations: Vec<[f64; 4]>,
    pub w_flipped: Vec<bool>,
    pub translations: Vec<DVec3>,

    pub rotation_default: bool,
    pub rotation_constant: bool,
    pub translation_default: bool,
    pub translation_constant: bool,

    pub rotation_normalized: bool,
    pub translation_normalized: bool,
    pub rotation_range: Option<TrackRange>,
    pub translation_range: Option<TrackRange>,

    pub packed_rotations: Vec<u8>,
    pub packed_translations: Vec<u8>,
}

impl BoneStreams {
    pub fn rotation_is_animated(&self) -> bool {
        !self.rotation_default && !self.rotation_constant
    }

    pub fn translation_is_animated(&self) -> bool {
        !self.translation_default && !self.translation_constant
    }
}

/// Converts a clip into per-bone columnar streams. Every stream starts out
/// classified as animated; the reduction passes refine that.
pub(crate) fn convert_clip_to_streams(clip: &AnimationClip) -> Vec<BoneStreams> {
    clip.bones()
        .iter()
        .map(|tracks| BoneStreams {
            rotations: tracks
                .rotations
                .iter()
                .map(|q| [q.x, q.y, q.z, q.w])
                .collect(),
            w_flipped: vec![false; tracks.rotations.len()],
            translations: tracks.translations.clone(),
            rotation_default: false,
            rotation_constant: false,
            translation_default: false,
            translation_constant: false,
            rotation_normalized: false,
            translation_normalized: false,
            rotation_range: None,
            translation_range: None,
            packed_rotations: Vec::new(),
            packed_translations: Vec::new(),
        })
        .collect()
}
