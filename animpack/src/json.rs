//! JSON clip frontend.
//!
//! Reads a self-contained document holding a skeleton and one uniformly
//! sampled clip into the model types. Bones name their parent; tracks name
//! their bone. Bones without a track stay at the canonical pose.
//!
//! ```json
//! {
//!   "skeleton": {
//!     "bones": [
//!       { "name": "root" },
//!       { "name": "spine", "parent": "root", "bind_translation": [0, 1, 0] }
//!     ]
//!   },
//!   "clip": {
//!     "name": "wave",
//!     "num_samples": 2,
//!     "sample_rate": 30,
//!     "tracks": [
//!       {
//!         "bone": "spine",
//!         "rotations": [[0, 0, 0, 1], [0, 0.7071, 0, 0.7071]],
//!         "translations": [[0, 1, 0], [0, 1.5, 0]]
//!       }
//!     ]
//!   }
//! }
//! ```

use std::collections::HashMap;

use glam::{DQuat, DVec3};
use serde::Deserialize;

use crate::error::Error;
use crate::model::{AnimationClip, RigidBone, RigidSkeleton};

#[derive(Deserialize)]
struct RawDocument {
    skeleton: RawSkeleton,
    clip: RawClip,
}

#[derive(Deserialize)]
struct RawSkeleton {
    bones: Vec<RawBone>,
}

#[derive(Deserialize)]
struct RawBone {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default = "identity_rotation")]
    bind_rotation: [f64; 4],
    #[serde(default)]
    bind_translation: [f64; 3],
}

#[derive(Deserialize)]
struct RawClip {
    #[serde(default)]
    name: String,
    num_samples: u32,
    sample_rate: u32,
    #[serde(default)]
    tracks: Vec<RawTrack>,
}

#[derive(Deserialize)]
struct RawTrack {
    bone: String,
    #[serde(default)]
    rotations: Vec<[f64; 4]>,
    #[serde(default)]
    translations: Vec<[f64; 3]>,
}

fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// Parses a clip document into a skeleton and its clip.
pub fn read_clip(text: &str) -> Result<(RigidSkeleton, AnimationClip), Error> {
    let raw: RawDocument = serde_json::from_str(text).map_err(|error| Error::JsonParse {
        message: error.to_string(),
    })?;

    let mut bone_indices: HashMap<String, u16> = HashMap::new();
    let mut bones = Vec::with_capacity(raw.skeleton.bones.len());
    for bone in &raw.skeleton.bones {
        if bone_indices.contains_key(&bone.name) {
            return Err(Error::JsonDuplicateBone {
                bone: bone.name.clone(),
            });
        }
        let parent = match &bone.parent {
            None => None,
            Some(parent) => Some(*bone_indices.get(parent).ok_or_else(|| {
                Error::JsonUnknownBoneParent {
                    bone: bone.name.clone(),
                    parent: parent.clone(),
                }
            })?),
        };
        bone_indices.insert(bone.name.clone(), bones.len() as u16);
        bones.push(RigidBone {
            name: bone.name.clone(),
            parent,
            bind_rotation: DQuat::from_xyzw(
                bone.bind_rotation[0],
                bone.bind_rotation[1],
                bone.bind_rotation[2],
                bone.bind_rotation[3],
            ),
            bind_translation: DVec3::from_array(bone.bind_translation),
        });
    }
    let skeleton = RigidSkeleton::new(bones)?;

    let mut clip = AnimationClip::new(
        &skeleton,
        raw.clip.name,
        raw.clip.num_samples,
        raw.clip.sample_rate,
    )?;
    for (track_index, track) in raw.clip.tracks.iter().enumerate() {
        let bone =
            *bone_indices
                .get(&track.bone)
                .ok_or_else(|| Error::JsonUnknownTrackBone {
                    track: track_index,
                    bone: track.bone.clone(),
                })?;
        if !track.rotations.is_empty() && track.rotations.len() != raw.clip.num_samples as usize {
            return Err(Error::JsonSampleCountMismatch {
                bone: track.bone.clone(),
                kind: "rotation",
                actual: track.rotations.len(),
                expected: raw.clip.num_samples,
            });
        }
        if !track.translations.is_empty()
            && track.translations.len() != raw.clip.num_samples as usize
        {
            return Err(Error::JsonSampleCountMismatch {
                bone: track.bone.clone(),
                kind: "translation",
                actual: track.translations.len(),
                expected: raw.clip.num_samples,
            });
        }
        for (sample, rotation) in track.rotations.iter().enumerate() {
            clip.set_rotation_sample(
                bone,
                sample as u32,
                DQuat::from_xyzw(rotation[0], rotation[1], rotation[2], rotation[3]),
            )?;
        }
        for (sample, translation) in track.translations.iter().enumerate() {
            clip.set_translation_sample(bone, sample as u32, DVec3::from_array(*translation))?;
        }
    }

    Ok((skeleton, clip))
}
