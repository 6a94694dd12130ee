//! The compressed artifact: preamble, header, and validated access.
//!
//! The artifact is a single contiguous little-endian buffer. The header is
//! the only navigational structure; region offsets are blob-relative byte
//! offsets, with `INVALID_OFFSET` marking an empty region.

use byteorder::{ByteOrder, LittleEndian};

use crate::algorithm::AlgorithmKind;
use crate::bitset;
use crate::error::{Error, MalformedKind};
use crate::formats::{RangeReduction, RotationFormat, TranslationFormat};
use crate::memory::AlignedBuf;

pub(crate) const CLIP_MAGIC: u32 = u32::from_le_bytes(*b"ANPK");
pub(crate) const CLIP_VERSION: u16 = 1;

/// Bytes before the header: magic, version, algorithm, total size, CRC.
pub(crate) const PREAMBLE_SIZE: usize = 16;
pub(crate) const HEADER_SIZE: usize = 40;
pub(crate) const FIXED_SIZE: usize = PREAMBLE_SIZE + HEADER_SIZE;

/// Sentinel stored in a region offset when the region is empty.
pub const INVALID_OFFSET: u32 = u32::MAX;

/// Fixed per-clip header stored after the preamble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipHeader {
    pub num_bones: u16,
    pub rotation_format: RotationFormat,
    pub translation_format: TranslationFormat,
    pub range_reduction: RangeReduction,
    pub num_samples: u32,
    pub sample_rate: u32,
    pub num_animated_rotation_tracks: u32,
    pub num_animated_translation_tracks: u32,
    /// Start of the default-track bitset; the constant-track bitset follows
    /// immediately after it.
    pub bitset_offset: u32,
    pub constant_data_offset: u32,
    pub range_data_offset: u32,
    pub animated_data_offset: u32,
}

impl ClipHeader {
    /// 32-bit words per bitset.
    pub fn bitset_words(&self) -> usize {
        bitset::num_words(self.num_bones as usize * bitset::TRACKS_PER_BONE)
    }

    pub fn duration(&self) -> f32 {
        (self.num_samples - 1) as f32 / self.sample_rate as f32
    }
}

/// Stamps the preamble and header into a freshly allocated artifact buffer.
/// The CRC field is filled by [`finalize`] once every region is written.
pub(crate) fn write_artifact_header(buffer: &mut [u8], header: &ClipHeader, total_size: u32) {
    LittleEndian::write_u32(&mut buffer[0..], CLIP_MAGIC);
    LittleEndian::write_u16(&mut buffer[4..], CLIP_VERSION);
    buffer[6] = AlgorithmKind::UniformlySampled.tag();
    buffer[7] = 0;
    LittleEndian::write_u32(&mut buffer[8..], total_size);

    LittleEndian::write_u16(&mut buffer[16..], header.num_bones);
    buffer[18] = header.rotation_format.tag();
    buffer[19] = header.translation_format.tag();
    buffer[20] = header.range_reduction.bits();
    // bytes 21..24 stay zero
    LittleEndian::write_u32(&mut buffer[24..], header.num_samples);
    LittleEndian::write_u32(&mut buffer[28..], header.sample_rate);
    LittleEndian::write_u32(&mut buffer[32..], header.num_animated_rotation_tracks);
    LittleEndian::write_u32(&mut buffer[36..], header.num_animated_translation_tracks);
    LittleEndian::write_u32(&mut buffer[40..], header.bitset_offset);
    LittleEndian::write_u32(&mut buffer[44..], header.constant_data_offset);
    LittleEndian::write_u32(&mut buffer[48..], header.range_data_offset);
    LittleEndian::write_u32(&mut buffer[52..], header.animated_data_offset);
}

/// Computes the payload checksum and stamps it into the preamble.
pub(crate) fn finalize(buffer: &mut [u8]) {
    let crc = crc32fast::hash(&buffer[PREAMBLE_SIZE..]);
    LittleEndian::write_u32(&mut buffer[12..], crc);
}

/// An owned compressed artifact, produced by compression. The backing buffer
/// is released through the allocator that produced it (or by drop).
#[derive(Debug)]
pub struct CompressedClip {
    buffer: AlignedBuf,
}

impl CompressedClip {
    pub(crate) fn new(buffer: AlignedBuf) -> Self {
        Self { buffer }
    }

    pub fn size(&self) -> u32 {
        self.buffer.len() as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Re-validates and returns a read-only view suitable for decoding.
    pub fn view(&self) -> Result<ClipView<'_>, Error> {
        ClipView::parse(self.as_bytes())
    }

    /// Hands the backing buffer back, for return to an allocator.
    pub fn into_buffer(self) -> AlignedBuf {
        self.buffer
    }
}

/// Bounds-checked little-endian cursor over an artifact buffer.
struct BlobInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BlobInput<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        if self.cursor >= self.bytes.len() {
            return Err(Error::malformed(MalformedKind::Truncated));
        }
        let value = self.bytes[self.cursor];
        self.cursor += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        if self.bytes.len() - self.cursor < 2 {
            return Err(Error::malformed(MalformedKind::Truncated));
        }
        let value = LittleEndian::read_u16(&self.bytes[self.cursor..]);
        self.cursor += 2;
        Ok(value)
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        if self.bytes.len() - self.cursor < 4 {
            return Err(Error::malformed(MalformedKind::Truncated));
        }
        let value = LittleEndian::read_u32(&self.bytes[self.cursor..]);
        self.cursor += 4;
        Ok(value)
    }

    fn skip(&mut self, count: usize) {
        self.cursor += count;
    }
}

/// A validated read-only view over a compressed artifact.
///
/// Construction performs the full integrity check: magic, version, algorithm
/// tag, declared size, payload CRC, format tags, and the region table. A
/// view that parses is safe to decode without further bounds checks.
#[derive(Clone, Copy, Debug)]
pub struct ClipView<'a> {
    bytes: &'a [u8],
    header: ClipHeader,
    constant_rotation_tracks: u32,
    constant_translation_tracks: u32,
}

impl<'a> ClipView<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < FIXED_SIZE {
            return Err(Error::malformed(MalformedKind::Truncated));
        }

        let mut input = BlobInput::new(bytes);
        if input.read_u32()? != CLIP_MAGIC {
            return Err(Error::malformed(MalformedKind::BadMagic));
        }
        if input.read_u16()? != CLIP_VERSION {
            return Err(Error::malformed(MalformedKind::BadVersion));
        }
        let algorithm = input.read_u8()?;
        if AlgorithmKind::from_tag(algorithm).is_none() {
            return Err(Error::malformed(MalformedKind::BadAlgorithm));
        }
        input.skip(1); // reserved
        let total_size = input.read_u32()?;
        if total_size as usize != bytes.len() {
            return Err(Error::malformed(MalformedKind::BadSize));
        }
        let stored_crc = input.read_u32()?;
        if crc32fast::hash(&bytes[PREAMBLE_SIZE..]) != stored_crc {
            return Err(Error::malformed(MalformedKind::BadCrc));
        }

        let num_bones = input.read_u16()?;
        if num_bones == 0 {
            return Err(Error::malformed(MalformedKind::BadCounts));
        }
        let rotation_format = RotationFormat::from_tag(input.read_u8()?)
            .ok_or(Error::malformed(MalformedKind::BadFormat))?;
        let translation_format = TranslationFormat::from_tag(input.read_u8()?)
            .ok_or(Error::malformed(MalformedKind::BadFormat))?;
        let range_reduction = RangeReduction::from_bits(input.read_u8()?)
            .ok_or(Error::malformed(MalformedKind::BadFormat))?;
        if translation_format != TranslationFormat::Vector3_96
            && !range_reduction.reduces_translations()
        {
            // Quantized translations only reconstruct through a range.
            return Err(Error::malformed(MalformedKind::BadFormat));
        }
        input.skip(3); // padding
        let num_samples = input.read_u32()?;
        let sample_rate = input.read_u32()?;
        if num_samples == 0 || sample_rate == 0 {
            return Err(Error::malformed(MalformedKind::BadCounts));
        }
        let num_animated_rotation_tracks = input.read_u32()?;
        let num_animated_translation_tracks = input.read_u32()?;
        let bitset_offset = input.read_u32()?;
        let constant_data_offset = input.read_u32()?;
        let range_data_offset = input.read_u32()?;
        let animated_data_offset = input.read_u32()?;

        let header = ClipHeader {
            num_bones,
            rotation_format,
            translation_format,
            range_reduction,
            num_samples,
            sample_rate,
            num_animated_rotation_tracks,
            num_animated_translation_tracks,
            bitset_offset,
            constant_data_offset,
            range_data_offset,
            animated_data_offset,
        };

        let (constant_rotation_tracks, constant_translation_tracks) =
            validate_regions(bytes, &header)?;
        Ok(Self {
            bytes,
            header,
            constant_rotation_tracks,
            constant_translation_tracks,
        })
    }

    pub fn header(&self) -> &ClipHeader {
        &self.header
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn total_size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Constant rotation tracks, counted from the track bitsets at parse
    /// time.
    pub fn num_constant_rotation_tracks(&self) -> u32 {
        self.constant_rotation_tracks
    }

    /// Constant translation tracks, counted from the track bitsets at parse
    /// time.
    pub fn num_constant_translation_tracks(&self) -> u32 {
        self.constant_translation_tracks
    }

    pub(crate) fn default_bitset(&self) -> &'a [u8] {
        let start = self.header.bitset_offset as usize;
        &self.bytes[start..start + self.header.bitset_words() * 4]
    }

    pub(crate) fn constant_bitset(&self) -> &'a [u8] {
        let start = self.header.bitset_offset as usize + self.header.bitset_words() * 4;
        &self.bytes[start..start + self.header.bitset_words() * 4]
    }

    /// Region starting at `offset`, running to the end of the buffer; the
    /// decoder walks it with its own cursors. Empty for the sentinel.
    pub(crate) fn region_from(&self, offset: u32) -> &'a [u8] {
        if offset == INVALID_OFFSET {
            &[]
        } else {
            &self.bytes[offset as usize..]
        }
    }
}

/// Checks every region offset against the sizes implied by the header and
/// the track bitsets: aligned, in order, in bounds, no overlap. Returns the
/// constant-track census the check derives along the way.
fn validate_regions(bytes: &[u8], header: &ClipHeader) -> Result<(u32, u32), Error> {
    let total_size = bytes.len();
    let bitset_bytes = header.bitset_words() * 4;

    if header.bitset_offset as usize != FIXED_SIZE {
        return Err(Error::malformed(MalformedKind::BadOffset));
    }
    let mut cursor = FIXED_SIZE + 2 * bitset_bytes;
    if cursor > total_size {
        return Err(Error::malformed(MalformedKind::BadOffset));
    }

    // The bitsets are now known to be in bounds; census them.
    let default_bitset = &bytes[FIXED_SIZE..FIXED_SIZE + bitset_bytes];
    let constant_bitset = &bytes[FIXED_SIZE + bitset_bytes..FIXED_SIZE + 2 * bitset_bytes];
    let mut constant_rotations = 0u32;
    let mut constant_translations = 0u32;
    let mut animated_rotations = 0u32;
    let mut animated_translations = 0u32;
    for bone in 0..header.num_bones as usize {
        for (bit, constants, animated) in [
            (
                bitset::rotation_bit(bone),
                &mut constant_rotations,
                &mut animated_rotations,
            ),
            (
                bitset::translation_bit(bone),
                &mut constant_translations,
                &mut animated_translations,
            ),
        ] {
            if bitset::test_bytes(default_bitset, bit) {
                continue;
            }
            if bitset::test_bytes(constant_bitset, bit) {
                *constants += 1;
            } else {
                *animated += 1;
            }
        }
    }
    if animated_rotations != header.num_animated_rotation_tracks
        || animated_translations != header.num_animated_translation_tracks
    {
        return Err(Error::malformed(MalformedKind::BadCounts));
    }

    let rotation_size = header.rotation_format.packed_size();
    let translation_size = header.translation_format.packed_size();
    let constant_size =
        rotation_size * constant_rotations as usize + 12 * constant_translations as usize;
    let mut range_size = 0usize;
    if header.range_reduction.reduces_rotations() {
        range_size += header.rotation_format.num_components() * 8 * animated_rotations as usize;
    }
    if header.range_reduction.reduces_translations() {
        range_size += 24 * animated_translations as usize;
    }
    let animated_size = (rotation_size * animated_rotations as usize
        + translation_size * animated_translations as usize)
        * header.num_samples as usize;

    for (offset, size) in [
        (header.constant_data_offset, constant_size),
        (header.range_data_offset, range_size),
        (header.animated_data_offset, animated_size),
    ] {
        if size == 0 {
            if offset != INVALID_OFFSET {
                return Err(Error::malformed(MalformedKind::BadOffset));
            }
            continue;
        }
        let offset = offset as usize;
        if offset == INVALID_OFFSET as usize
            || offset % 4 != 0
            || offset < cursor
            || offset.checked_add(size).map_or(true, |end| end > total_size)
        {
            return Err(Error::malformed(MalformedKind::BadOffset));
        }
        cursor = offset + size;
    }
    Ok((constant_rotations, constant_translations))
}
