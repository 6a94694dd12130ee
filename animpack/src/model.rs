//! Skeleton and clip data model.
//!
//! Compression and error measurement run at f64; the decoder reconstructs at
//! f32 working precision.

use crate::error::Error;
use glam::{DQuat, DVec3, Quat, Vec3};

/// One bone of a rigid skeleton. The root carries no parent; parents always
/// precede their children in the bone order.
#[derive(Clone, Debug)]
pub struct RigidBone {
    pub name: String,
    pub parent: Option<u16>,
    pub bind_rotation: DQuat,
    pub bind_translation: DVec3,
}

impl RigidBone {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            bind_rotation: DQuat::IDENTITY,
            bind_translation: DVec3::ZERO,
        }
    }

    pub fn child_of(name: impl Into<String>, parent: u16) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            bind_rotation: DQuat::IDENTITY,
            bind_translation: DVec3::ZERO,
        }
    }
}

/// An ordered bone hierarchy, immutable after construction.
#[derive(Clone, Debug)]
pub struct RigidSkeleton {
    bones: Vec<RigidBone>,
}

impl RigidSkeleton {
    pub fn new(bones: Vec<RigidBone>) -> Result<Self, Error> {
        if bones.is_empty() {
            return Err(Error::precondition("skeleton has no bones"));
        }
        if bones.len() > u16::MAX as usize {
            return Err(Error::precondition(format!(
                "skeleton has {} bones, the format supports at most {}",
                bones.len(),
                u16::MAX
            )));
        }
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent as usize >= index {
                    return Err(Error::precondition(format!(
                        "bone '{}' has parent index {} that does not precede it",
                        bone.name, parent
                    )));
                }
            }
        }
        Ok(Self { bones })
    }

    pub fn num_bones(&self) -> u16 {
        self.bones.len() as u16
    }

    pub fn bones(&self) -> &[RigidBone] {
        &self.bones
    }

    pub fn bone(&self, index: u16) -> &RigidBone {
        &self.bones[index as usize]
    }
}

/// A rotation + translation pair at compression precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DTransform {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl DTransform {
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Applies `child` in the space of `self`.
    pub fn mul_transform(&self, child: &DTransform) -> DTransform {
        DTransform {
            rotation: (self.rotation * child.rotation).normalize(),
            translation: self.rotation * child.translation + self.translation,
        }
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }
}

/// A decoded pose transform at working precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn as_dtransform(&self) -> DTransform {
        DTransform {
            rotation: self.rotation.as_dquat(),
            translation: self.translation.as_dvec3(),
        }
    }
}

/// Rotation and translation samples of one bone, `num_samples` of each.
#[derive(Clone, Debug)]
pub struct BoneTracks {
    pub rotations: Vec<DQuat>,
    pub translations: Vec<DVec3>,
}

/// A pose sequence uniformly sampled at a fixed rate, bound to a skeleton's
/// bone count.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    name: String,
    num_samples: u32,
    sample_rate: u32,
    bones: Vec<BoneTracks>,
}

impl AnimationClip {
    /// Creates a clip with every track at the canonical pose (identity
    /// rotations, zero translations).
    pub fn new(
        skeleton: &RigidSkeleton,
        name: impl Into<String>,
        num_samples: u32,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        if num_samples == 0 {
            return Err(Error::precondition("clip has no samples"));
        }
        if sample_rate == 0 {
            return Err(Error::precondition("clip sample rate is zero"));
        }
        let bones = (0..skeleton.num_bones())
            .map(|_| BoneTracks {
                rotations: vec![DQuat::IDENTITY; num_samples as usize],
                translations: vec![DVec3::ZERO; num_samples as usize],
            })
            .collect();
        Ok(Self {
            name: name.into(),
            num_samples,
            sample_rate,
            bones,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_bones(&self) -> u16 {
        self.bones.len() as u16
    }

    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> f64 {
        (self.num_samples - 1) as f64 / self.sample_rate as f64
    }

    pub fn set_rotation_sample(
        &mut self,
        bone: u16,
        sample: u32,
        rotation: DQuat,
    ) -> Result<(), Error> {
        self.check_indices(bone, sample)?;
        if !rotation.is_finite() {
            return Err(Error::precondition(format!(
                "rotation sample {sample} of bone {bone} is not finite"
            )));
        }
        if (rotation.length() - 1.0).abs() > 1.0e-4 {
            return Err(Error::precondition(format!(
                "rotation sample {sample} of bone {bone} is not normalized"
            )));
        }
        self.bones[bone as usize].rotations[sample as usize] = rotation;
        Ok(())
    }

    pub fn set_translation_sample(
        &mut self,
        bone: u16,
        sample: u32,
        translation: DVec3,
    ) -> Result<(), Error> {
        self.check_indices(bone, sample)?;
        if !translation.is_finite() {
            return Err(Error::precondition(format!(
                "translation sample {sample} of bone {bone} is not finite"
            )));
        }
        self.bones[bone as usize].translations[sample as usize] = translation;
        Ok(())
    }

    fn check_indices(&self, bone: u16, sample: u32) -> Result<(), Error> {
        if bone >= self.num_bones() {
            return Err(Error::precondition(format!(
                "bone index {bone} out of range ({} bones)",
                self.num_bones()
            )));
        }
        if sample >= self.num_samples {
            return Err(Error::precondition(format!(
                "sample index {sample} out of range ({} samples)",
                self.num_samples
            )));
        }
        Ok(())
    }

    pub fn bone_tracks(&self, bone: u16) -> &BoneTracks {
        &self.bones[bone as usize]
    }

    pub(crate) fn bones(&self) -> &[BoneTracks] {
        &self.bones
    }

    /// Samples the raw (uncompressed) clip at `time`, writing every bone of
    /// the pose. `out` must hold one transform per bone.
    pub fn sample_pose(&self, time: f64, out: &mut [DTransform]) {
        assert!(
            out.len() >= self.bones.len(),
            "pose buffer holds {} transforms, the clip has {} bones",
            out.len(),
            self.bones.len()
        );
        let (frame0, frame1, alpha) =
            interpolation_keys(self.num_samples, self.sample_rate, time);
        for (bone, tracks) in self.bones.iter().enumerate() {
            out[bone] = sample_tracks(tracks, frame0, frame1, alpha);
        }
    }

    /// Samples a single bone of the raw clip.
    pub fn sample_bone(&self, time: f64, bone: u16) -> DTransform {
        let (frame0, frame1, alpha) =
            interpolation_keys(self.num_samples, self.sample_rate, time);
        sample_tracks(&self.bones[bone as usize], frame0, frame1, alpha)
    }

    /// Full-precision f32 footprint of the pose stream, used for compression
    /// ratios.
    pub fn raw_size(&self) -> u32 {
        self.num_bones() as u32 * self.num_samples * (16 + 12)
    }
}

fn sample_tracks(tracks: &BoneTracks, frame0: u32, frame1: u32, alpha: f64) -> DTransform {
    let rotation = if frame0 == frame1 {
        tracks.rotations[frame0 as usize]
    } else {
        nlerp64(
            tracks.rotations[frame0 as usize],
            tracks.rotations[frame1 as usize],
            alpha,
        )
    };
    let translation = tracks.translations[frame0 as usize].lerp(
        tracks.translations[frame1 as usize],
        alpha,
    );
    DTransform {
        rotation,
        translation,
    }
}

/// Clamps `time` to the clip and returns the bracketing frames and the
/// interpolation alpha between them.
pub(crate) fn interpolation_keys(
    num_samples: u32,
    sample_rate: u32,
    time: f64,
) -> (u32, u32, f64) {
    let duration = (num_samples - 1) as f64 / sample_rate as f64;
    let position = time.clamp(0.0, duration) * sample_rate as f64;
    let frame0 = (position.floor() as u32).min(num_samples - 1);
    let frame1 = (frame0 + 1).min(num_samples - 1);
    (frame0, frame1, position - frame0 as f64)
}

/// Normalized lerp with hemisphere selection: `to` is negated when the
/// inputs lie in opposite hemispheres.
pub(crate) fn nlerp64(from: DQuat, to: DQuat, alpha: f64) -> DQuat {
    let to = if from.dot(to) < 0.0 { -to } else { to };
    DQuat::from_xyzw(
        from.x + (to.x - from.x) * alpha,
        from.y + (to.y - from.y) * alpha,
        from.z + (to.z - from.z) * alpha,
        from.w + (to.w - from.w) * alpha,
    )
    .normalize()
}

pub(crate) fn nlerp32(from: Quat, to: Quat, alpha: f32) -> Quat {
    let to = if from.dot(to) < 0.0 { -to } else { to };
    Quat::from_xyzw(
        from.x + (to.x - from.x) * alpha,
        from.y + (to.y - from.y) * alpha,
        from.z + (to.z - from.z) * alpha,
        from.w + (to.w - from.w) * alpha,
    )
    .normalize()
}
