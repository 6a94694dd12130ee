//! Algorithm façade: a compression-settings choice bundled with the
//! compress and decompress entry points.

use std::io::{self, Write};

use glam::{Quat, Vec3};

use crate::artifact::{ClipView, CompressedClip};
use crate::decode::{self, OutputWriter};
use crate::error::Error;
use crate::formats::{RangeReduction, RotationFormat, TranslationFormat};
use crate::memory::Allocator;
use crate::model::{AnimationClip, RigidSkeleton};

/// Wire tag identifying the compression algorithm inside an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    UniformlySampled,
}

impl AlgorithmKind {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::UniformlySampled => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::UniformlySampled),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UniformlySampled => "UniformlySampled",
        }
    }
}

/// Format and range-reduction choices for one compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionSettings {
    pub rotation_format: RotationFormat,
    pub translation_format: TranslationFormat,
    pub range_reduction: RangeReduction,
}

impl CompressionSettings {
    pub fn new(
        rotation_format: RotationFormat,
        translation_format: TranslationFormat,
        range_reduction: RangeReduction,
    ) -> Self {
        Self {
            rotation_format,
            translation_format,
            range_reduction,
        }
    }
}

/// The uniformly-sampled algorithm: every bone carries one sample per frame
/// at a fixed rate, minus the default and constant tracks the pipeline
/// strips.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformlySampled {
    settings: CompressionSettings,
}

impl UniformlySampled {
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompressionSettings {
        &self.settings
    }

    /// Compresses `clip` into a self-describing artifact whose buffer comes
    /// from `allocator`. Fails without allocating when a precondition does
    /// not hold.
    pub fn compress_clip(
        &self,
        allocator: &dyn Allocator,
        clip: &AnimationClip,
        skeleton: &RigidSkeleton,
    ) -> Result<CompressedClip, Error> {
        crate::compress::compress_clip(allocator, clip, skeleton, &self.settings)
    }

    /// See [`decode::decompress_pose`].
    pub fn decompress_pose<W: OutputWriter>(
        &self,
        clip: &ClipView<'_>,
        time: f32,
        writer: &mut W,
    ) {
        decode::decompress_pose(clip, time, writer);
    }

    /// See [`decode::decompress_bone`].
    pub fn decompress_bone(&self, clip: &ClipView<'_>, time: f32, bone_index: u16) -> (Quat, Vec3) {
        decode::decompress_bone(clip, time, bone_index)
    }

    /// Writes human-readable diagnostics about an artifact. The exact output
    /// is not part of the format contract.
    pub fn print_stats(&self, clip: &ClipView<'_>, out: &mut dyn Write) -> io::Result<()> {
        let header = clip.header();
        let num_animated_tracks =
            header.num_animated_rotation_tracks + header.num_animated_translation_tracks;
        let num_constant_tracks =
            clip.num_constant_rotation_tracks() + clip.num_constant_translation_tracks();
        writeln!(out, "Clip algorithm: {}", AlgorithmKind::UniformlySampled.name())?;
        writeln!(out, "Clip rotation format: {}", header.rotation_format)?;
        writeln!(out, "Clip translation format: {}", header.translation_format)?;
        writeln!(
            out,
            "Clip range reduction: {}",
            header.range_reduction.describe()
        )?;
        writeln!(out, "Clip num samples: {}", header.num_samples)?;
        writeln!(out, "Clip sample rate: {}", header.sample_rate)?;
        writeln!(out, "Clip num animated tracks: {num_animated_tracks}")?;
        writeln!(out, "Clip num constant tracks: {num_constant_tracks}")?;
        writeln!(out, "Clip compressed size (bytes): {}", clip.total_size())?;
        Ok(())
    }
}
