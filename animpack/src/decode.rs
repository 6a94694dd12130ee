//! Pose reconstruction from a compressed artifact.
//!
//! The decoder allocates nothing: it walks a validated [`ClipView`] in place
//! and hands each reconstructed track to the caller's writer. Bones are
//! delivered in index order today, but callers must not rely on any
//! particular order.

use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec3};

use crate::artifact::{ClipHeader, ClipView};
use crate::bitset;
use crate::formats::{RotationFormat, TranslationFormat};
use crate::model::{interpolation_keys, nlerp32, Transform};
use crate::packing::{unpack_scalar_signed, unpack_scalar_unsigned, unpack_triple_32, QUAT48_SIGN_BIT};

/// Receives reconstructed tracks, one call per bone per kind, in no
/// particular bone order.
pub trait OutputWriter {
    fn write_bone_rotation(&mut self, bone_index: u16, rotation: Quat);
    fn write_bone_translation(&mut self, bone_index: u16, translation: Vec3);
}

/// Writer that stores the pose into a caller-provided transform slice.
pub struct PoseWriter<'a> {
    transforms: &'a mut [Transform],
}

impl<'a> PoseWriter<'a> {
    pub fn new(transforms: &'a mut [Transform]) -> Self {
        Self { transforms }
    }
}

impl OutputWriter for PoseWriter<'_> {
    fn write_bone_rotation(&mut self, bone_index: u16, rotation: Quat) {
        self.transforms[bone_index as usize].rotation = rotation;
    }

    fn write_bone_translation(&mut self, bone_index: u16, translation: Vec3) {
        self.transforms[bone_index as usize].translation = translation;
    }
}

/// Reconstructs the full pose at `time` (clamped to the clip) and delivers
/// it through `writer`.
pub fn decompress_pose<W: OutputWriter>(clip: &ClipView<'_>, time: f32, writer: &mut W) {
    let num_bones = clip.header().num_bones;
    let mut decoder = Decoder::new(clip, time);
    for bone in 0..num_bones {
        let rotation = decoder.decode_rotation(bone as usize);
        let translation = decoder.decode_translation(bone as usize);
        writer.write_bone_rotation(bone, rotation);
        writer.write_bone_translation(bone, translation);
    }
}

/// Reconstructs a single bone at `time`. Equals the same bone of
/// [`decompress_pose`] bit-exactly.
pub fn decompress_bone(clip: &ClipView<'_>, time: f32, bone_index: u16) -> (Quat, Vec3) {
    let num_bones = clip.header().num_bones;
    assert!(
        bone_index < num_bones,
        "bone index {bone_index} out of range ({num_bones} bones)"
    );
    let mut decoder = Decoder::new(clip, time);
    for bone in 0..bone_index as usize {
        decoder.skip_bone(bone);
    }
    let rotation = decoder.decode_rotation(bone_index as usize);
    let translation = decoder.decode_translation(bone_index as usize);
    (rotation, translation)
}

#[derive(Default)]
struct Cursors {
    constant: usize,
    range: usize,
    animated: usize,
}

/// Bone-major walk over the constant, range, and animated regions.
struct Decoder<'a> {
    header: &'a ClipHeader,
    default_bitset: &'a [u8],
    constant_bitset: &'a [u8],
    constant_data: &'a [u8],
    range_data: &'a [u8],
    animated_data: &'a [u8],
    frame0: u32,
    frame1: u32,
    alpha: f32,
    cursors: Cursors,
}

impl<'a> Decoder<'a> {
    fn new(clip: &'a ClipView<'a>, time: f32) -> Self {
        let header = clip.header();
        let (frame0, frame1, alpha) =
            interpolation_keys(header.num_samples, header.sample_rate, time as f64);
        Self {
            header,
            default_bitset: clip.default_bitset(),
            constant_bitset: clip.constant_bitset(),
            constant_data: clip.region_from(header.constant_data_offset),
            range_data: clip.region_from(header.range_data_offset),
            animated_data: clip.region_from(header.animated_data_offset),
            frame0,
            frame1,
            alpha: alpha as f32,
            cursors: Cursors::default(),
        }
    }

    fn rotation_size(&self) -> usize {
        self.header.rotation_format.packed_size()
    }

    fn translation_size(&self) -> usize {
        self.header.translation_format.packed_size()
    }

    fn rotation_range_size(&self) -> usize {
        self.header.rotation_format.num_components() * 8
    }

    fn decode_rotation(&mut self, bone: usize) -> Quat {
        let bit = bitset::rotation_bit(bone);
        if bitset::test_bytes(self.default_bitset, bit) {
            return Quat::IDENTITY;
        }

        let format = self.header.rotation_format;
        let size = self.rotation_size();
        if bitset::test_bytes(self.constant_bitset, bit) {
            let bytes = &self.constant_data[self.cursors.constant..self.cursors.constant + size];
            self.cursors.constant += size;
            return unpack_rotation(bytes, format, None);
        }

        let range = if self.header.range_reduction.reduces_rotations() {
            let components = format.num_components();
            let bytes = &self.range_data[self.cursors.range..];
            self.cursors.range += self.rotation_range_size();
            Some(read_range(bytes, components))
        } else {
            None
        };

        let track = &self.animated_data[self.cursors.animated..];
        self.cursors.animated += size * self.header.num_samples as usize;
        let sample0 = &track[self.frame0 as usize * size..][..size];
        let first = unpack_rotation(sample0, format, range.as_ref());
        if self.frame0 == self.frame1 || self.alpha == 0.0 {
            return first;
        }
        let sample1 = &track[self.frame1 as usize * size..][..size];
        let second = unpack_rotation(sample1, format, range.as_ref());
        nlerp32(first, second, self.alpha)
    }

    fn decode_translation(&mut self, bone: usize) -> Vec3 {
        let bit = bitset::translation_bit(bone);
        if bitset::test_bytes(self.default_bitset, bit) {
            return Vec3::ZERO;
        }

        if bitset::test_bytes(self.constant_bitset, bit) {
            // Constant translations are always stored at full width.
            let bytes = &self.constant_data[self.cursors.constant..self.cursors.constant + 12];
            self.cursors.constant += 12;
            return unpack_translation(bytes, TranslationFormat::Vector3_96, None);
        }

        let format = self.header.translation_format;
        let size = self.translation_size();
        let range = if self.header.range_reduction.reduces_translations() {
            let bytes = &self.range_data[self.cursors.range..];
            self.cursors.range += 24;
            Some(read_range(bytes, 3))
        } else {
            None
        };

        let track = &self.animated_data[self.cursors.animated..];
        self.cursors.animated += size * self.header.num_samples as usize;
        let sample0 = &track[self.frame0 as usize * size..][..size];
        let first = unpack_translation(sample0, format, range.as_ref());
        if self.frame0 == self.frame1 || self.alpha == 0.0 {
            return first;
        }
        let sample1 = &track[self.frame1 as usize * size..][..size];
        let second = unpack_translation(sample1, format, range.as_ref());
        first.lerp(second, self.alpha)
    }

    /// Advances every cursor past `bone` without reconstructing it.
    fn skip_bone(&mut self, bone: usize) {
        let num_samples = self.header.num_samples as usize;

        let bit = bitset::rotation_bit(bone);
        if !bitset::test_bytes(self.default_bitset, bit) {
            if bitset::test_bytes(self.constant_bitset, bit) {
                self.cursors.constant += self.rotation_size();
            } else {
                if self.header.range_reduction.reduces_rotations() {
                    self.cursors.range += self.rotation_range_size();
                }
                self.cursors.animated += self.rotation_size() * num_samples;
            }
        }

        let bit = bitset::translation_bit(bone);
        if !bitset::test_bytes(self.default_bitset, bit) {
            if bitset::test_bytes(self.constant_bitset, bit) {
                self.cursors.constant += 12;
            } else {
                if self.header.range_reduction.reduces_translations() {
                    self.cursors.range += 24;
                }
                self.cursors.animated += self.translation_size() * num_samples;
            }
        }
    }
}

/// (min, extent) pairs as stored: `components` f32 of min, then extent.
fn read_range(bytes: &[u8], components: usize) -> ([f32; 4], [f32; 4]) {
    let mut min = [0.0f32; 4];
    let mut extent = [0.0f32; 4];
    for component in 0..components {
        min[component] = LittleEndian::read_f32(&bytes[component * 4..]);
        extent[component] = LittleEndian::read_f32(&bytes[(components + component) * 4..]);
    }
    (min, extent)
}

fn reconstruct_w(x: f32, y: f32, z: f32) -> f32 {
    (1.0 - x * x - y * y - z * z).max(0.0).sqrt()
}

/// Dequantizes one rotation sample. `range` is present exactly when the
/// track was range reduced; constant tracks always pass `None`.
fn unpack_rotation(
    bytes: &[u8],
    format: RotationFormat,
    range: Option<&([f32; 4], [f32; 4])>,
) -> Quat {
    match format {
        RotationFormat::Quat128 => {
            let mut components = [0.0f32; 4];
            for (index, component) in components.iter_mut().enumerate() {
                *component = LittleEndian::read_f32(&bytes[index * 4..]);
            }
            if let Some((min, extent)) = range {
                for (index, component) in components.iter_mut().enumerate() {
                    *component = min[index] + extent[index] * *component;
                }
            }
            Quat::from_xyzw(components[0], components[1], components[2], components[3])
        }
        RotationFormat::Quat96 => {
            let mut components = [0.0f32; 3];
            for (index, component) in components.iter_mut().enumerate() {
                *component = LittleEndian::read_f32(&bytes[index * 4..]);
            }
            if let Some((min, extent)) = range {
                for (index, component) in components.iter_mut().enumerate() {
                    *component = min[index] + extent[index] * *component;
                }
            }
            let w = reconstruct_w(components[0], components[1], components[2]);
            Quat::from_xyzw(components[0], components[1], components[2], w)
        }
        RotationFormat::Quat48 => {
            let words = [
                LittleEndian::read_u16(&bytes[0..]),
                LittleEndian::read_u16(&bytes[2..]),
                LittleEndian::read_u16(&bytes[4..]),
            ];
            let flipped = words[0] & QUAT48_SIGN_BIT != 0;
            let mut components = [0.0f32; 3];
            for (index, component) in components.iter_mut().enumerate() {
                let raw = (words[index] & !QUAT48_SIGN_BIT) as u32;
                *component = match range {
                    Some((min, extent)) => {
                        min[index] + extent[index] * unpack_scalar_unsigned(raw, 15)
                    }
                    None => unpack_scalar_signed(raw, 15),
                };
            }
            let w = reconstruct_w(components[0], components[1], components[2]);
            let rotation = Quat::from_xyzw(components[0], components[1], components[2], w);
            if flipped {
                -rotation
            } else {
                rotation
            }
        }
        RotationFormat::Quat32 => {
            let (x, y, z) = unpack_triple_32(LittleEndian::read_u32(bytes));
            let unpack = |raw: u32, bits: u32, index: usize| match range {
                Some((min, extent)) => {
                    min[index] + extent[index] * unpack_scalar_unsigned(raw, bits)
                }
                None => unpack_scalar_signed(raw, bits),
            };
            let x = unpack(x, 11, 0);
            let y = unpack(y, 11, 1);
            let z = unpack(z, 10, 2);
            Quat::from_xyzw(x, y, z, reconstruct_w(x, y, z))
        }
    }
}

fn unpack_translation(
    bytes: &[u8],
    format: TranslationFormat,
    range: Option<&([f32; 4], [f32; 4])>,
) -> Vec3 {
    let mut components = [0.0f32; 3];
    match format {
        TranslationFormat::Vector3_96 => {
            for (index, component) in components.iter_mut().enumerate() {
                *component = LittleEndian::read_f32(&bytes[index * 4..]);
            }
        }
        TranslationFormat::Vector3_48 => {
            for (index, component) in components.iter_mut().enumerate() {
                let raw = LittleEndian::read_u16(&bytes[index * 2..]) as u32;
                *component = unpack_scalar_unsigned(raw, 16);
            }
        }
        TranslationFormat::Vector3_32 => {
            let (x, y, z) = unpack_triple_32(LittleEndian::read_u32(bytes));
            components[0] = unpack_scalar_unsigned(x, 11);
            components[1] = unpack_scalar_unsigned(y, 11);
            components[2] = unpack_scalar_unsigned(z, 10);
        }
    }
    if let Some((min, extent)) = range {
        for (index, component) in components.iter_mut().enumerate() {
            *component = min[index] + extent[index] * *component;
        }
    }
    Vec3::new(components[0], components[1], components[2])
}
