//! Sample packing at the chosen widths.

use byteorder::{ByteOrder, LittleEndian};

use crate::formats::{RotationFormat, TranslationFormat};
use crate::packing::{
    pack_scalar_signed, pack_scalar_unsigned, pack_triple_32, QUAT48_SIGN_BIT,
};
use crate::stream::BoneStreams;

/// Packs every surviving rotation sample into the byte shape of `format`.
///
/// Range-reduced components are in [0, 1]; everything else quantizes over
/// the native [-1, 1]. Constant tracks are never range reduced.
pub(crate) fn quantize_rotation_streams(streams: &mut [BoneStreams], format: RotationFormat) {
    for bone in streams.iter_mut() {
        if bone.rotation_default {
            continue;
        }
        let normalized = bone.rotation_normalized;
        let mut bytes = Vec::with_capacity(bone.rotations.len() * format.packed_size());
        for (index, sample) in bone.rotations.iter().enumerate() {
            match format {
                RotationFormat::Quat128 => {
                    let mut packed = [0u8; 16];
                    for component in 0..4 {
                        LittleEndian::write_f32(
                            &mut packed[component * 4..],
                            sample[component] as f32,
                        );
                    }
                    bytes.extend_from_slice(&packed);
                }
                RotationFormat::Quat96 => {
                    let mut packed = [0u8; 12];
                    for component in 0..3 {
                        LittleEndian::write_f32(
                            &mut packed[component * 4..],
                            sample[component] as f32,
                        );
                    }
                    bytes.extend_from_slice(&packed);
                }
                RotationFormat::Quat48 => {
                    let quantize = |value: f64| {
                        if normalized {
                            pack_scalar_unsigned(value, 15)
                        } else {
                            pack_scalar_signed(value, 15)
                        }
                    };
                    let mut packed = [0u8; 6];
                    for component in 0..3 {
                        let mut word = quantize(sample[component]) as u16;
                        if component == 0 && bone.w_flipped[index] {
                            word |= QUAT48_SIGN_BIT;
                        }
                        LittleEndian::write_u16(&mut packed[component * 2..], word);
                    }
                    bytes.extend_from_slice(&packed);
                }
                RotationFormat::Quat32 => {
                    let quantize = |value: f64, bits: u32| {
                        if normalized {
                            pack_scalar_unsigned(value, bits)
                        } else {
                            pack_scalar_signed(value, bits)
                        }
                    };
                    let word = pack_triple_32(
                        quantize(sample[0], 11),
                        quantize(sample[1], 11),
                        quantize(sample[2], 10),
                    );
                    let mut packed = [0u8; 4];
                    LittleEndian::write_u32(&mut packed, word);
                    bytes.extend_from_slice(&packed);
                }
            }
        }
        bone.packed_rotations = bytes;
    }
}

/// Packs every surviving translation sample. Constant tracks keep their one
/// sample at full width regardless of `format`; narrower animated samples
/// are guaranteed normalized by the compression preconditions.
pub(crate) fn quantize_translation_streams(
    streams: &mut [BoneStreams],
    format: TranslationFormat,
) {
    for bone in streams.iter_mut() {
        if bone.translation_default {
            continue;
        }
        let effective = if bone.translation_constant {
            TranslationFormat::Vector3_96
        } else {
            format
        };
        let mut bytes =
            Vec::with_capacity(bone.translations.len() * effective.packed_size());
        for sample in &bone.translations {
            match effective {
                TranslationFormat::Vector3_96 => {
                    let mut packed = [0u8; 12];
                    for component in 0..3 {
                        LittleEndian::write_f32(
                            &mut packed[component * 4..],
                            sample[component] as f32,
                        );
                    }
                    bytes.extend_from_slice(&packed);
                }
                TranslationFormat::Vector3_48 => {
                    let mut packed = [0u8; 6];
                    for component in 0..3 {
                        let word = pack_scalar_unsigned(sample[component], 16) as u16;
                        LittleEndian::write_u16(&mut packed[component * 2..], word);
                    }
                    bytes.extend_from_slice(&packed);
                }
                TranslationFormat::Vector3_32 => {
                    let word = pack_triple_32(
                        pack_scalar_unsigned(sample[0], 11),
                        pack_scalar_unsigned(sample[1], 11),
                        pack_scalar_unsigned(sample[2], 10),
                    );
                    let mut packed = [0u8; 4];
                    LittleEndian::write_u32(&mut packed, word);
                    bytes.extend_from_slice(&packed);
                }
            }
        }
        bone.packed_translations = bytes;
    }
}
