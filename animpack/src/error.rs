use thiserror::Error;

/// Why a compressed clip was rejected at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// The buffer is too small to hold the fixed preamble and header.
    Truncated,
    BadMagic,
    BadVersion,
    BadAlgorithm,
    /// The declared total size disagrees with the buffer length.
    BadSize,
    BadCrc,
    /// An unknown rotation, translation, or range-reduction tag.
    BadFormat,
    /// A region offset is misaligned, out of bounds, out of order, or
    /// inconsistent with the declared region sizes.
    BadOffset,
    /// The animated track counts disagree with the track bitsets.
    BadCounts,
}

impl std::fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Truncated => "truncated buffer",
            Self::BadMagic => "bad magic",
            Self::BadVersion => "unsupported version",
            Self::BadAlgorithm => "unknown algorithm tag",
            Self::BadSize => "total size mismatch",
            Self::BadCrc => "checksum mismatch",
            Self::BadFormat => "unknown format tag",
            Self::BadOffset => "invalid region offset",
            Self::BadCounts => "inconsistent track counts",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("precondition violated: {message}")]
    Precondition { message: String },

    #[error("allocation of {size} bytes (alignment {alignment}) failed")]
    Allocation { size: usize, alignment: usize },

    #[error("malformed compressed clip: {kind}")]
    Malformed { kind: MalformedKind },

    #[cfg(feature = "json")]
    #[error("failed to parse clip JSON: {message}")]
    JsonParse { message: String },

    #[cfg(feature = "json")]
    #[error("unknown parent bone '{parent}' for bone '{bone}'")]
    JsonUnknownBoneParent { bone: String, parent: String },

    #[cfg(feature = "json")]
    #[error("bone '{bone}' appears more than once in the skeleton")]
    JsonDuplicateBone { bone: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by track {track}")]
    JsonUnknownTrackBone { track: usize, bone: String },

    #[cfg(feature = "json")]
    #[error(
        "track for bone '{bone}' has {actual} {kind} samples, the clip declares {expected}"
    )]
    JsonSampleCountMismatch {
        bone: String,
        kind: &'static str,
        actual: usize,
        expected: u32,
    },
}

impl Error {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(kind: MalformedKind) -> Self {
        Self::Malformed { kind }
    }
}
