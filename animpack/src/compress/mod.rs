//! The compression pipeline.
//!
//! Stages run in a strict sequence: streams, rotation conversion, constant
//! compaction, optional range reduction, quantization, layout, region
//! writes, finalization. Every stage observes the full output of its
//! predecessor.

pub(crate) mod constants;
pub(crate) mod quantize;
pub(crate) mod range;
pub(crate) mod rotation;
pub(crate) mod writer;

use crate::algorithm::CompressionSettings;
use crate::artifact::{self, ClipHeader, CompressedClip, INVALID_OFFSET};
use crate::error::Error;
use crate::formats::{RangeReduction, TranslationFormat};
use crate::memory::{Allocator, DEFAULT_ALIGNMENT};
use crate::model::{AnimationClip, RigidSkeleton};
use crate::stream::convert_clip_to_streams;

pub(crate) fn compress_clip(
    allocator: &dyn Allocator,
    clip: &AnimationClip,
    skeleton: &RigidSkeleton,
    settings: &CompressionSettings,
) -> Result<CompressedClip, Error> {
    let num_bones = clip.num_bones();
    let num_samples = clip.num_samples();

    if num_bones == 0 {
        return Err(Error::precondition("clip has no bones"));
    }
    if num_samples == 0 {
        return Err(Error::precondition("clip has no samples"));
    }
    if num_bones != skeleton.num_bones() {
        return Err(Error::precondition(format!(
            "clip has {} bones, the skeleton has {}",
            num_bones,
            skeleton.num_bones()
        )));
    }
    if settings.translation_format != TranslationFormat::Vector3_96
        && !settings.range_reduction.reduces_translations()
    {
        return Err(Error::precondition(format!(
            "translation format {} requires per-clip translation range reduction",
            settings.translation_format
        )));
    }

    let mut streams = convert_clip_to_streams(clip);
    rotation::convert_rotation_streams(&mut streams, settings.rotation_format);
    constants::compact_constant_streams(&mut streams, constants::CONSTANT_THRESHOLD);

    let mut range_data_size = 0;
    if settings.range_reduction.contains(RangeReduction::PER_CLIP) {
        range::normalize_rotation_streams(
            &mut streams,
            settings.range_reduction,
            settings.rotation_format,
        );
        range::normalize_translation_streams(&mut streams, settings.range_reduction);
        range_data_size =
            range::range_data_size(&streams, settings.range_reduction, settings.rotation_format);
    }

    quantize::quantize_rotation_streams(&mut streams, settings.rotation_format);
    quantize::quantize_translation_streams(&mut streams, settings.translation_format);

    let counts = constants::count_tracks(&streams);
    let layout = writer::compute_layout(
        num_bones,
        num_samples,
        &counts,
        settings.rotation_format,
        settings.translation_format,
        range_data_size,
    );

    let mut buffer = allocator.allocate(layout.total_size as usize, DEFAULT_ALIGNMENT)?;
    let bytes = buffer.as_mut_slice();

    let header = ClipHeader {
        num_bones,
        rotation_format: settings.rotation_format,
        translation_format: settings.translation_format,
        range_reduction: settings.range_reduction,
        num_samples,
        sample_rate: clip.sample_rate(),
        num_animated_rotation_tracks: counts.animated_rotations,
        num_animated_translation_tracks: counts.animated_translations,
        bitset_offset: layout.bitset_offset,
        constant_data_offset: if layout.constant_data_size > 0 {
            layout.constant_data_offset
        } else {
            INVALID_OFFSET
        },
        range_data_offset: if layout.range_data_size > 0 {
            layout.range_data_offset
        } else {
            INVALID_OFFSET
        },
        animated_data_offset: if layout.animated_data_size > 0 {
            layout.animated_data_offset
        } else {
            INVALID_OFFSET
        },
    };

    artifact::write_artifact_header(bytes, &header, layout.total_size);
    writer::write_bitsets(bytes, &layout, &streams);
    if layout.constant_data_size > 0 {
        writer::write_constant_data(bytes, &layout, &streams);
    }
    if layout.range_data_size > 0 {
        writer::write_range_data(
            bytes,
            &layout,
            &streams,
            settings.range_reduction,
            settings.rotation_format,
        );
    }
    if layout.animated_data_size > 0 {
        writer::write_animated_data(bytes, &layout, &streams);
    }
    artifact::finalize(bytes);

    Ok(CompressedClip::new(buffer))
}
