//! Artifact layout and region writers.
//!
//! Region order: default bitset, constant bitset, constant data, (align 4)
//! range data, (align 4) animated data. All regions are bone-major; the
//! animated region keeps each track's samples contiguous (frame-major within
//! bone) so the decoder can seek one bone without touching the rest.

use byteorder::{ByteOrder, LittleEndian};

use crate::artifact::FIXED_SIZE;
use crate::bitset;
use crate::compress::constants::TrackCounts;
use crate::formats::{RangeReduction, RotationFormat, TranslationFormat};
use crate::stream::BoneStreams;

fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Byte layout of one artifact, blob-relative. Offsets are always computed;
/// the header substitutes the sentinel for empty regions.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Layout {
    pub bitset_words: usize,
    pub bitset_offset: u32,
    pub constant_data_offset: u32,
    pub constant_data_size: u32,
    pub range_data_offset: u32,
    pub range_data_size: u32,
    pub animated_data_offset: u32,
    pub animated_data_size: u32,
    pub total_size: u32,
}

pub(crate) fn compute_layout(
    num_bones: u16,
    num_samples: u32,
    counts: &TrackCounts,
    rotation_format: RotationFormat,
    translation_format: TranslationFormat,
    range_data_size: u32,
) -> Layout {
    let rotation_size = rotation_format.packed_size() as u32;
    let translation_size = translation_format.packed_size() as u32;
    let bitset_words = bitset::num_words(num_bones as usize * bitset::TRACKS_PER_BONE);

    let constant_data_size =
        rotation_size * counts.constant_rotations + 12 * counts.constant_translations;
    let animated_data_size = (rotation_size * counts.animated_rotations
        + translation_size * counts.animated_translations)
        * num_samples;

    let bitset_offset = FIXED_SIZE as u32;
    let constant_data_offset = bitset_offset + 2 * 4 * bitset_words as u32;
    let range_data_offset = align_to(constant_data_offset + constant_data_size, 4);
    let animated_data_offset = align_to(range_data_offset + range_data_size, 4);
    let total_size = animated_data_offset + animated_data_size;

    Layout {
        bitset_words,
        bitset_offset,
        constant_data_offset,
        constant_data_size,
        range_data_offset,
        range_data_size,
        animated_data_offset,
        animated_data_size,
        total_size,
    }
}

pub(crate) fn write_bitsets(buffer: &mut [u8], layout: &Layout, streams: &[BoneStreams]) {
    let mut default_words = vec![0u32; layout.bitset_words];
    let mut constant_words = vec![0u32; layout.bitset_words];
    for (bone, stream) in streams.iter().enumerate() {
        bitset::set(
            &mut default_words,
            bitset::rotation_bit(bone),
            stream.rotation_default,
        );
        bitset::set(
            &mut default_words,
            bitset::translation_bit(bone),
            stream.translation_default,
        );
        bitset::set(
            &mut constant_words,
            bitset::rotation_bit(bone),
            stream.rotation_constant,
        );
        bitset::set(
            &mut constant_words,
            bitset::translation_bit(bone),
            stream.translation_constant,
        );
    }

    let mut cursor = layout.bitset_offset as usize;
    for word in default_words.iter().chain(constant_words.iter()) {
        LittleEndian::write_u32(&mut buffer[cursor..], *word);
        cursor += 4;
    }
}

/// Constant region: one packed sample per constant track, bone-major,
/// rotation before translation.
pub(crate) fn write_constant_data(buffer: &mut [u8], layout: &Layout, streams: &[BoneStreams]) {
    let mut cursor = layout.constant_data_offset as usize;
    for stream in streams {
        if stream.rotation_constant {
            buffer[cursor..cursor + stream.packed_rotations.len()]
                .copy_from_slice(&stream.packed_rotations);
            cursor += stream.packed_rotations.len();
        }
        if stream.translation_constant {
            buffer[cursor..cursor + stream.packed_translations.len()]
                .copy_from_slice(&stream.packed_translations);
            cursor += stream.packed_translations.len();
        }
    }
    debug_assert_eq!(
        cursor,
        (layout.constant_data_offset + layout.constant_data_size) as usize
    );
}

/// Range region: f32 (min, extent) pairs for every reduced animated track,
/// bone-major, rotation before translation.
pub(crate) fn write_range_data(
    buffer: &mut [u8],
    layout: &Layout,
    streams: &[BoneStreams],
    range_reduction: RangeReduction,
    rotation_format: RotationFormat,
) {
    let mut cursor = layout.range_data_offset as usize;
    for stream in streams {
        if range_reduction.reduces_rotations() && stream.rotation_is_animated() {
            let range = stream
                .rotation_range
                .expect("animated rotation stream is missing its range");
            let components = rotation_format.num_components();
            write_components(buffer, &mut cursor, &range.min, components);
            write_components(buffer, &mut cursor, &range.extent, components);
        }
        if range_reduction.reduces_translations() && stream.translation_is_animated() {
            let range = stream
                .translation_range
                .expect("animated translation stream is missing its range");
            write_components(buffer, &mut cursor, &range.min, 3);
            write_components(buffer, &mut cursor, &range.extent, 3);
        }
    }
    debug_assert_eq!(
        cursor,
        (layout.range_data_offset + layout.range_data_size) as usize
    );
}

fn write_components(buffer: &mut [u8], cursor: &mut usize, values: &[f64; 4], count: usize) {
    for value in &values[..count] {
        LittleEndian::write_f32(&mut buffer[*cursor..], *value as f32);
        *cursor += 4;
    }
}

/// Animated region: each animated track's samples contiguous, bone-major,
/// rotation before translation.
pub(crate) fn write_animated_data(buffer: &mut [u8], layout: &Layout, streams: &[BoneStreams]) {
    let mut cursor = layout.animated_data_offset as usize;
    for stream in streams {
        if stream.rotation_is_animated() {
            buffer[cursor..cursor + stream.packed_rotations.len()]
                .copy_from_slice(&stream.packed_rotations);
            cursor += stream.packed_rotations.len();
        }
        if stream.translation_is_animated() {
            buffer[cursor..cursor + stream.packed_translations.len()]
                .copy_from_slice(&stream.packed_translations);
            cursor += stream.packed_translations.len();
        }
    }
    debug_assert_eq!(
        cursor,
        (layout.animated_data_offset + layout.animated_data_size) as usize
    );
}
