//! Extended payload length.
//!
//! The 7-bit base length either carries the payload length directly or
//! announces a big-endian extension: 126 means two more bytes, 127 means
//! eight. Encoding always picks the smallest form, using the same
//! thresholds as decoding.

use crate::error::ProtocolError;

use super::header::FrameHeader;

/// Base length sentinel announcing a 16-bit extension.
pub const EXTENDED_16: u8 = 126;
/// Base length sentinel announcing a 64-bit extension.
pub const EXTENDED_64: u8 = 127;

const DIRECT_LIMIT: u64 = EXTENDED_16 as u64;
const EXTENDED_16_LIMIT: u64 = 1 << 16;

/// Resolved payload length of one frame, in its wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedLength {
    /// Length below 126, carried in the base length field itself.
    Direct(u8),
    /// Big-endian 16-bit length following a base length of 126.
    Extended16([u8; 2]),
    /// Big-endian 64-bit length following a base length of 127.
    Extended64([u8; 8]),
}

impl ExtendedLength {
    /// Reads the length announced by `header` from the bytes following it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedLength`] if `remaining` is shorter
    /// than the extension the header announces.
    pub fn read(header: FrameHeader, remaining: &[u8]) -> Result<Self, ProtocolError> {
        match header.base_length() {
            EXTENDED_16 => remaining
                .first_chunk::<2>()
                .map(|bytes| Self::Extended16(*bytes))
                .ok_or(ProtocolError::MalformedLength {
                    needed: 2,
                    available: remaining.len(),
                }),
            EXTENDED_64 => remaining
                .first_chunk::<8>()
                .map(|bytes| Self::Extended64(*bytes))
                .ok_or(ProtocolError::MalformedLength {
                    needed: 8,
                    available: remaining.len(),
                }),
            direct => Ok(Self::Direct(direct)),
        }
    }

    /// The true payload length.
    #[must_use]
    pub const fn value(&self) -> u64 {
        match self {
            Self::Direct(n) => *n as u64,
            Self::Extended16(bytes) => u16::from_be_bytes(*bytes) as u64,
            Self::Extended64(bytes) => u64::from_be_bytes(*bytes),
        }
    }

    /// The value to place in the header's 7-bit length field.
    #[must_use]
    pub const fn base_length(&self) -> u8 {
        match self {
            Self::Direct(n) => *n,
            Self::Extended16(_) => EXTENDED_16,
            Self::Extended64(_) => EXTENDED_64,
        }
    }

    /// The bytes written after the fixed header (empty for `Direct`).
    #[must_use]
    pub fn extra_bytes(&self) -> &[u8] {
        match self {
            Self::Direct(_) => &[],
            Self::Extended16(bytes) => bytes.as_slice(),
            Self::Extended64(bytes) => bytes.as_slice(),
        }
    }
}

/// Resolves the true payload length of a frame.
///
/// Returns the length and the number of bytes of `remaining` it occupied.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedLength`] if fewer than the required
/// extension bytes remain.
pub fn resolve_length(
    header: FrameHeader,
    remaining: &[u8],
) -> Result<(u64, usize), ProtocolError> {
    let length = ExtendedLength::read(header, remaining)?;
    Ok((length.value(), length.extra_bytes().len()))
}

/// Picks the smallest wire representation for `true_length`.
#[must_use]
pub fn choose_length_encoding(true_length: u64) -> ExtendedLength {
    // The narrowing casts are exact below each threshold.
    if true_length < DIRECT_LIMIT {
        ExtendedLength::Direct(true_length as u8)
    } else if true_length < EXTENDED_16_LIMIT {
        ExtendedLength::Extended16((true_length as u16).to_be_bytes())
    } else {
        ExtendedLength::Extended64(true_length.to_be_bytes())
    }
}
