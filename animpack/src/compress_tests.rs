use std::cell::Cell;

use byteorder::{ByteOrder, LittleEndian};
use glam::{DQuat, DVec3};

use crate::{
    calculate_skeleton_error, AlignedBuf, Allocator, AnimationClip, CompressionSettings,
    DTransform, Error, HeapAllocator, PoseWriter, RangeReduction, RigidBone, RigidSkeleton,
    RotationFormat, Transform, TranslationFormat, UniformlySampled, INVALID_OFFSET,
};

fn single_bone_skeleton() -> RigidSkeleton {
    RigidSkeleton::new(vec![RigidBone::root("root")]).expect("skeleton")
}

fn chain_skeleton(num_bones: u16) -> RigidSkeleton {
    let mut bones = vec![RigidBone::root("bone_0")];
    for index in 1..num_bones {
        bones.push(RigidBone::child_of(format!("bone_{index}"), index - 1));
    }
    RigidSkeleton::new(bones).expect("skeleton")
}

fn settings(
    rotation_format: RotationFormat,
    translation_format: TranslationFormat,
    range_reduction: RangeReduction,
) -> CompressionSettings {
    CompressionSettings::new(rotation_format, translation_format, range_reduction)
}

fn compress(
    clip: &AnimationClip,
    skeleton: &RigidSkeleton,
    settings: CompressionSettings,
) -> crate::CompressedClip {
    UniformlySampled::new(settings)
        .compress_clip(&HeapAllocator, clip, skeleton)
        .expect("compression succeeds")
}

/// Allocator that counts how many buffers it handed out.
struct CountingAllocator {
    allocations: Cell<usize>,
}

impl CountingAllocator {
    fn new() -> Self {
        Self {
            allocations: Cell::new(0),
        }
    }
}

impl Allocator for CountingAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> Result<AlignedBuf, Error> {
        self.allocations.set(self.allocations.get() + 1);
        Ok(AlignedBuf::zeroed(size, alignment))
    }
}

#[test]
fn identity_clip_compresses_to_bitsets_only() {
    let skeleton = single_bone_skeleton();
    let clip = AnimationClip::new(&skeleton, "identity", 2, 30).expect("clip");
    let compressed = compress(&clip, &skeleton, CompressionSettings::default());

    assert_eq!(compressed.size(), 64);
    let view = compressed.view().expect("valid artifact");
    let header = view.header();
    assert_eq!(header.num_bones, 1);
    assert_eq!(header.num_samples, 2);
    assert_eq!(header.sample_rate, 30);
    assert_eq!(header.num_animated_rotation_tracks, 0);
    assert_eq!(header.num_animated_translation_tracks, 0);
    assert_eq!(view.num_constant_rotation_tracks(), 0);
    assert_eq!(view.num_constant_translation_tracks(), 0);
    assert_eq!(header.bitset_offset, 56);
    assert_eq!(header.constant_data_offset, INVALID_OFFSET);
    assert_eq!(header.range_data_offset, INVALID_OFFSET);
    assert_eq!(header.animated_data_offset, INVALID_OFFSET);

    let bytes = compressed.as_bytes();
    let default_word = LittleEndian::read_u32(&bytes[56..]);
    let constant_word = LittleEndian::read_u32(&bytes[60..]);
    assert_eq!(default_word, 0xC000_0000, "rotation and translation default");
    assert_eq!(constant_word, 0);
}

#[test]
fn constant_tracks_keep_one_full_width_sample() {
    let skeleton = single_bone_skeleton();
    let mut clip = AnimationClip::new(&skeleton, "constant", 2, 30).expect("clip");
    let rotation = DQuat::from_xyzw(0.7071, 0.0, 0.0, 0.7071);
    let translation = DVec3::new(1.0, 2.0, 3.0);
    for sample in 0..2 {
        clip.set_rotation_sample(0, sample, rotation).expect("set");
        clip.set_translation_sample(0, sample, translation)
            .expect("set");
    }
    let compressed = compress(&clip, &skeleton, CompressionSettings::default());

    // 16 bytes of rotation + 12 of translation after the fixed part.
    assert_eq!(compressed.size(), 64 + 16 + 12);
    let view = compressed.view().expect("valid artifact");
    let header = view.header();
    assert_eq!(header.constant_data_offset, 64);
    assert_eq!(header.range_data_offset, INVALID_OFFSET);
    assert_eq!(header.animated_data_offset, INVALID_OFFSET);
    assert_eq!(header.num_animated_rotation_tracks, 0);
    assert_eq!(header.num_animated_translation_tracks, 0);
    assert_eq!(view.num_constant_rotation_tracks(), 1);
    assert_eq!(view.num_constant_translation_tracks(), 1);

    let bytes = compressed.as_bytes();
    assert_eq!(LittleEndian::read_u32(&bytes[56..]), 0, "no default tracks");
    assert_eq!(
        LittleEndian::read_u32(&bytes[60..]),
        0xC000_0000,
        "both tracks constant"
    );

    let mut pose = [Transform::IDENTITY];
    crate::decompress_pose(&view, 0.0, &mut PoseWriter::new(&mut pose));
    assert!((pose[0].rotation.x - 0.7071).abs() < 1.0e-6);
    assert!((pose[0].rotation.w - 0.7071).abs() < 1.0e-6);
    assert_eq!(pose[0].translation.x, 1.0);
    assert_eq!(pose[0].translation.y, 2.0);
    assert_eq!(pose[0].translation.z, 3.0);
}

#[test]
fn default_wins_over_constant() {
    let skeleton = single_bone_skeleton();
    let mut clip = AnimationClip::new(&skeleton, "mixed", 3, 30).expect("clip");
    // Rotation stays identity; translation is constant non-zero.
    for sample in 0..3 {
        clip.set_translation_sample(0, sample, DVec3::new(0.0, 5.0, 0.0))
            .expect("set");
    }
    let compressed = compress(&clip, &skeleton, CompressionSettings::default());
    let bytes = compressed.as_bytes();
    let default_word = LittleEndian::read_u32(&bytes[56..]);
    let constant_word = LittleEndian::read_u32(&bytes[60..]);
    assert_eq!(default_word, 0x8000_0000, "rotation default only");
    assert_eq!(constant_word, 0x4000_0000, "translation constant only");
    // One Vector3_96 sample.
    assert_eq!(compressed.size(), 64 + 12);
}

#[test]
fn range_reduction_records_min_and_extent() {
    let skeleton = chain_skeleton(2);
    let mut clip = AnimationClip::new(&skeleton, "slide", 3, 2).expect("clip");
    for (sample, x) in [0.0, 1.0, 2.0].into_iter().enumerate() {
        clip.set_translation_sample(1, sample as u32, DVec3::new(x, 0.0, 0.0))
            .expect("set");
    }
    let compressed = compress(
        &clip,
        &skeleton,
        settings(
            RotationFormat::Quat128,
            TranslationFormat::Vector3_48,
            RangeReduction::PER_CLIP | RangeReduction::TRANSLATIONS,
        ),
    );
    let view = compressed.view().expect("valid artifact");
    let header = view.header();
    assert_eq!(header.num_animated_rotation_tracks, 0);
    assert_eq!(header.num_animated_translation_tracks, 1);
    assert_ne!(header.range_data_offset, INVALID_OFFSET);

    // One translation range entry: three f32 of min, three of extent.
    let bytes = compressed.as_bytes();
    let range = header.range_data_offset as usize;
    let mut values = [0.0f32; 6];
    for (index, value) in values.iter_mut().enumerate() {
        *value = LittleEndian::read_f32(&bytes[range + index * 4..]);
    }
    assert_eq!(values[..3], [0.0, 0.0, 0.0], "min");
    assert_eq!(values[3..], [2.0, 0.0, 0.0], "extent");

    // Reconstruction error within one 16-bit step over the extent.
    let tolerance = 2.0 / 65535.0 + 1.0e-6;
    for (frame, expected) in [0.0f32, 1.0, 2.0].into_iter().enumerate() {
        let (_, translation) = crate::decompress_bone(&view, frame as f32 * 0.5, 1);
        assert!(
            (translation.x - expected).abs() < tolerance,
            "frame {frame}: {} vs {expected}",
            translation.x
        );
        assert_eq!(translation.y, 0.0);
        assert_eq!(translation.z, 0.0);
    }
}

#[test]
fn quantized_translations_require_range_reduction() {
    let skeleton = single_bone_skeleton();
    let clip = AnimationClip::new(&skeleton, "clip", 2, 30).expect("clip");
    let allocator = CountingAllocator::new();
    let algorithm = UniformlySampled::new(settings(
        RotationFormat::Quat128,
        TranslationFormat::Vector3_48,
        RangeReduction::empty(),
    ));
    let result = algorithm.compress_clip(&allocator, &clip, &skeleton);
    assert!(matches!(result, Err(Error::Precondition { .. })));
    assert_eq!(allocator.allocations.get(), 0, "no artifact allocated");
}

#[test]
fn bone_count_mismatch_is_a_precondition() {
    let one = single_bone_skeleton();
    let two = chain_skeleton(2);
    let clip = AnimationClip::new(&one, "clip", 2, 30).expect("clip");
    let result =
        UniformlySampled::default().compress_clip(&HeapAllocator, &clip, &two);
    assert!(matches!(result, Err(Error::Precondition { .. })));
}

#[test]
fn empty_clips_cannot_be_built() {
    let skeleton = single_bone_skeleton();
    assert!(matches!(
        AnimationClip::new(&skeleton, "empty", 0, 30),
        Err(Error::Precondition { .. })
    ));
    assert!(matches!(
        AnimationClip::new(&skeleton, "no rate", 2, 0),
        Err(Error::Precondition { .. })
    ));
    assert!(matches!(
        RigidSkeleton::new(Vec::new()),
        Err(Error::Precondition { .. })
    ));
}

fn mixed_clip() -> (RigidSkeleton, AnimationClip) {
    let skeleton = chain_skeleton(3);
    let mut clip = AnimationClip::new(&skeleton, "mixed", 4, 2).expect("clip");
    // bone 0: default everything.
    // bone 1: constant rotation, animated translation.
    // bone 2: animated rotation, constant translation.
    let constant_rotation = DQuat::from_axis_angle(DVec3::X, 0.5);
    for sample in 0..4 {
        clip.set_rotation_sample(1, sample, constant_rotation)
            .expect("set");
        clip.set_translation_sample(1, sample, DVec3::new(sample as f64, 0.5, -1.0))
            .expect("set");
        clip.set_rotation_sample(2, sample, DQuat::from_axis_angle(DVec3::Z, 0.2 * sample as f64))
            .expect("set");
        clip.set_translation_sample(2, sample, DVec3::new(0.25, -0.75, 0.5))
            .expect("set");
    }
    (skeleton, clip)
}

#[test]
fn header_regions_are_ordered_aligned_and_sized() {
    let (skeleton, clip) = mixed_clip();
    for (rotation_format, translation_format, range_reduction) in [
        (
            RotationFormat::Quat128,
            TranslationFormat::Vector3_96,
            RangeReduction::empty(),
        ),
        (
            RotationFormat::Quat48,
            TranslationFormat::Vector3_32,
            RangeReduction::PER_CLIP | RangeReduction::ROTATIONS | RangeReduction::TRANSLATIONS,
        ),
        (
            RotationFormat::Quat32,
            TranslationFormat::Vector3_48,
            RangeReduction::PER_CLIP | RangeReduction::TRANSLATIONS,
        ),
    ] {
        let compressed = compress(
            &clip,
            &skeleton,
            settings(rotation_format, translation_format, range_reduction),
        );
        let view = compressed.view().expect("valid artifact");
        let header = view.header();
        let total = compressed.size();

        assert_eq!(header.num_animated_rotation_tracks, 1);
        assert_eq!(header.num_animated_translation_tracks, 1);
        assert_eq!(view.num_constant_rotation_tracks(), 1);
        assert_eq!(view.num_constant_translation_tracks(), 1);

        let mut previous = 56u32;
        for offset in [
            header.bitset_offset,
            header.constant_data_offset,
            header.range_data_offset,
            header.animated_data_offset,
        ] {
            if offset == INVALID_OFFSET {
                continue;
            }
            assert_eq!(offset % 4, 0, "offset {offset} aligned");
            assert!(offset >= 56 && offset <= total, "offset {offset} in bounds");
            assert!(offset >= previous, "regions in order");
            previous = offset;
        }

        // 3 bones * 2 tracks = 6 bits, one word per bitset. The constant
        // region holds one rotation at the packed width plus one full-width
        // translation.
        let align4 = |value: usize| (value + 3) & !3;
        let constant_offset = 56 + 2 * 4;
        assert_eq!(header.constant_data_offset, constant_offset as u32);
        let constant_end = constant_offset + rotation_format.packed_size() + 12;
        let range_size = range_size_for(range_reduction, rotation_format);
        let animated_offset = if range_size > 0 {
            let range_offset = align4(constant_end);
            assert_eq!(header.range_data_offset, range_offset as u32);
            align4(range_offset + range_size)
        } else {
            assert_eq!(header.range_data_offset, INVALID_OFFSET);
            align4(constant_end)
        };
        assert_eq!(header.animated_data_offset, animated_offset as u32);

        let animated_size =
            (rotation_format.packed_size() + translation_format.packed_size()) * 4;
        assert_eq!(total as usize, animated_offset + animated_size);
    }
}

fn range_size_for(range_reduction: RangeReduction, rotation_format: RotationFormat) -> usize {
    let mut size = 0;
    if range_reduction.reduces_rotations() {
        size += if rotation_format == RotationFormat::Quat128 {
            32
        } else {
            24
        };
    }
    if range_reduction.reduces_translations() {
        size += 24;
    }
    size
}

#[test]
fn quat48_restores_the_source_hemisphere() {
    let skeleton = single_bone_skeleton();
    let mut clip = AnimationClip::new(&skeleton, "flip", 2, 30).expect("clip");
    let rotation = DQuat::from_xyzw(0.5, 0.5, 0.5, -0.5);
    for sample in 0..2 {
        clip.set_rotation_sample(0, sample, rotation).expect("set");
    }
    let compressed = compress(
        &clip,
        &skeleton,
        settings(
            RotationFormat::Quat48,
            TranslationFormat::Vector3_96,
            RangeReduction::empty(),
        ),
    );
    let view = compressed.view().expect("valid artifact");
    let (decoded, _) = crate::decompress_bone(&view, 0.0, 0);
    assert!(decoded.w < 0.0, "w sign survives: {}", decoded.w);
    for (actual, expected) in [
        (decoded.x, 0.5),
        (decoded.y, 0.5),
        (decoded.z, 0.5),
        (decoded.w, -0.5),
    ] {
        assert!(
            (actual - expected).abs() < 1.0e-3,
            "{actual} vs {expected}"
        );
    }
}

fn max_skeleton_error(
    clip: &AnimationClip,
    skeleton: &RigidSkeleton,
    settings: CompressionSettings,
) -> f64 {
    let algorithm = UniformlySampled::new(settings);
    let compressed = algorithm
        .compress_clip(&HeapAllocator, clip, skeleton)
        .expect("compression succeeds");
    let view = compressed.view().expect("valid artifact");

    let num_bones = skeleton.num_bones() as usize;
    let mut raw = vec![DTransform::IDENTITY; num_bones];
    let mut lossy = vec![Transform::IDENTITY; num_bones];
    let mut max_error = 0.0f64;
    for sample in 0..clip.num_samples() {
        let time = sample as f64 / clip.sample_rate() as f64;
        clip.sample_pose(time, &mut raw);
        crate::decompress_pose(&view, time as f32, &mut PoseWriter::new(&mut lossy));
        max_error = max_error.max(calculate_skeleton_error(skeleton, &raw, &lossy));
    }
    max_error
}

fn wiggle_clip() -> (RigidSkeleton, AnimationClip) {
    let skeleton = chain_skeleton(2);
    let mut clip = AnimationClip::new(&skeleton, "wiggle", 5, 2).expect("clip");
    for sample in 0..5 {
        let phase = sample as f64 * 0.37;
        clip.set_rotation_sample(0, sample, DQuat::from_axis_angle(DVec3::Y, phase))
            .expect("set");
        clip.set_rotation_sample(
            1,
            sample,
            DQuat::from_axis_angle(DVec3::new(1.0, 1.0, 0.0).normalize(), 0.8 - phase),
        )
        .expect("set");
        clip.set_translation_sample(0, sample, DVec3::new(phase, -phase, 0.1))
            .expect("set");
        clip.set_translation_sample(1, sample, DVec3::new(0.3, phase * 2.0, -3.0 + phase))
            .expect("set");
    }
    (skeleton, clip)
}

#[test]
fn narrower_rotation_formats_never_reduce_error() {
    let (skeleton, clip) = wiggle_clip();
    let formats = [
        RotationFormat::Quat128,
        RotationFormat::Quat96,
        RotationFormat::Quat48,
        RotationFormat::Quat32,
    ];
    let errors: Vec<f64> = formats
        .iter()
        .map(|&format| {
            max_skeleton_error(
                &clip,
                &skeleton,
                settings(
                    format,
                    TranslationFormat::Vector3_96,
                    RangeReduction::empty(),
                ),
            )
        })
        .collect();
    for pair in errors.windows(2) {
        assert!(
            pair[1] + 1.0e-9 >= pair[0],
            "narrower format lost less: {errors:?}"
        );
    }
}

#[test]
fn narrower_translation_formats_never_reduce_error() {
    let (skeleton, clip) = wiggle_clip();
    let formats = [
        TranslationFormat::Vector3_96,
        TranslationFormat::Vector3_48,
        TranslationFormat::Vector3_32,
    ];
    let errors: Vec<f64> = formats
        .iter()
        .map(|&format| {
            max_skeleton_error(
                &clip,
                &skeleton,
                settings(
                    RotationFormat::Quat128,
                    format,
                    RangeReduction::PER_CLIP | RangeReduction::TRANSLATIONS,
                ),
            )
        })
        .collect();
    for pair in errors.windows(2) {
        assert!(
            pair[1] + 1.0e-9 >= pair[0],
            "narrower format lost less: {errors:?}"
        );
    }
}

#[test]
fn bitsets_span_multiple_words_for_large_skeletons() {
    // 17 bones * 2 tracks = 34 bits, two words per bitset.
    let skeleton = chain_skeleton(17);
    let mut clip = AnimationClip::new(&skeleton, "large", 2, 30).expect("clip");
    for sample in 0..2 {
        clip.set_translation_sample(16, sample, DVec3::new(0.0, sample as f64, 0.0))
            .expect("set");
    }
    let compressed = compress(&clip, &skeleton, CompressionSettings::default());
    let view = compressed.view().expect("valid artifact");
    let header = view.header();
    assert_eq!(header.num_animated_translation_tracks, 1);

    let bytes = compressed.as_bytes();
    // Bone 16's translation is bit 33, the second bit of the second word.
    let default_word1 = LittleEndian::read_u32(&bytes[56 + 4..]);
    assert_eq!(default_word1 & 0x4000_0000, 0, "bone 16 translation not default");
    assert_eq!(default_word1 & 0x8000_0000, 0x8000_0000, "bone 16 rotation default");

    let mut pose = vec![Transform::IDENTITY; 17];
    crate::decompress_pose(&view, 1.0 / 30.0, &mut PoseWriter::new(&mut pose));
    assert!((pose[16].translation.y - 1.0).abs() < 1.0e-6);
    for bone in 0..16 {
        assert_eq!(pose[bone], Transform::IDENTITY);
    }
}
