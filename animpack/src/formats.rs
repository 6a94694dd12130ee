//! Storage formats for rotation and translation samples.

use bitflags::bitflags;

/// Storage format of rotation samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationFormat {
    /// Four raw f32 components.
    #[default]
    Quat128,
    /// x, y, z as raw f32; w reconstructed from unit length.
    Quat96,
    /// x, y, z at 15 bits each plus the sign of the dropped w.
    Quat48,
    /// x, y, z packed 11/11/10 into one 32-bit word.
    Quat32,
}

impl RotationFormat {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Quat128 => 0,
            Self::Quat96 => 1,
            Self::Quat48 => 2,
            Self::Quat32 => 3,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Quat128),
            1 => Some(Self::Quat96),
            2 => Some(Self::Quat48),
            3 => Some(Self::Quat32),
            _ => None,
        }
    }

    /// Bytes per packed sample.
    pub fn packed_size(self) -> usize {
        match self {
            Self::Quat128 => 16,
            Self::Quat96 => 12,
            Self::Quat48 => 6,
            Self::Quat32 => 4,
        }
    }

    /// Components carried by the storage shape; w is present only at full
    /// width.
    pub(crate) fn num_components(self) -> usize {
        if self.drops_w() {
            3
        } else {
            4
        }
    }

    pub(crate) fn drops_w(self) -> bool {
        !matches!(self, Self::Quat128)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Quat128 => "Quat_128",
            Self::Quat96 => "Quat_96",
            Self::Quat48 => "Quat_48",
            Self::Quat32 => "Quat_32",
        }
    }
}

impl std::fmt::Display for RotationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage format of translation samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationFormat {
    /// Three raw f32 components.
    #[default]
    Vector3_96,
    /// Three 16-bit unsigned normalized components.
    Vector3_48,
    /// 11/11/10 bits packed into one 32-bit word.
    Vector3_32,
}

impl TranslationFormat {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Vector3_96 => 0,
            Self::Vector3_48 => 1,
            Self::Vector3_32 => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Vector3_96),
            1 => Some(Self::Vector3_48),
            2 => Some(Self::Vector3_32),
            _ => None,
        }
    }

    /// Bytes per packed sample.
    pub fn packed_size(self) -> usize {
        match self {
            Self::Vector3_96 => 12,
            Self::Vector3_48 => 6,
            Self::Vector3_32 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vector3_96 => "Vector3_96",
            Self::Vector3_48 => "Vector3_48",
            Self::Vector3_32 => "Vector3_32",
        }
    }
}

impl std::fmt::Display for TranslationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Per-clip range reduction selection.
    ///
    /// A track kind is reduced only when `PER_CLIP` and its own flag are
    /// both present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RangeReduction: u8 {
        const PER_CLIP = 0b0000_0001;
        const ROTATIONS = 0b0000_0010;
        const TRANSLATIONS = 0b0000_0100;
    }
}

impl RangeReduction {
    pub fn reduces_rotations(self) -> bool {
        self.contains(Self::PER_CLIP | Self::ROTATIONS)
    }

    pub fn reduces_translations(self) -> bool {
        self.contains(Self::PER_CLIP | Self::TRANSLATIONS)
    }

    pub fn describe(self) -> String {
        if self.is_empty() {
            return "None".to_string();
        }
        let mut parts = Vec::new();
        if self.contains(Self::PER_CLIP) {
            parts.push("PerClip");
        }
        if self.contains(Self::ROTATIONS) {
            parts.push("Rotations");
        }
        if self.contains(Self::TRANSLATIONS) {
            parts.push("Translations");
        }
        parts.join("|")
    }
}
