//! Fixed two-byte frame header.
//!
//! ```text
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
//! +-+-+-+-+-------+-+-------------+
//! |F|R|R|R| opcode|M| base length |
//! |I|S|S|S|  (4)  |A|     (7)     |
//! |N|V|V|V|       |S|             |
//! | |1|2|3|       |K|             |
//! +-+-+-+-+-------+-+-------------+
//! ```
//!
//! The word is read and written big-endian and every field is extracted
//! with explicit shifts and masks.

use std::fmt;

use crate::error::ProtocolError;

/// Number of bytes in the fixed header.
pub const HEADER_LEN: usize = 2;

/// Frame opcodes. Only the names are modeled; no control-frame semantics.
pub mod opcode {
    /// Continuation of a fragmented message.
    pub const CONTINUATION: u8 = 0x0;
    /// UTF-8 text payload.
    pub const TEXT: u8 = 0x1;
    /// Binary payload.
    pub const BINARY: u8 = 0x2;
    /// Connection close.
    pub const CLOSE: u8 = 0x8;
    /// Ping.
    pub const PING: u8 = 0x9;
    /// Pong.
    pub const PONG: u8 = 0xA;
}

const FIN_BIT: u16 = 0x8000;
const RSV1_BIT: u16 = 0x4000;
const RSV2_BIT: u16 = 0x2000;
const RSV3_BIT: u16 = 0x1000;
const OPCODE_SHIFT: u16 = 8;
const OPCODE_MASK: u16 = 0x0F;
const MASK_BIT: u16 = 0x0080;
const BASE_LENGTH_MASK: u16 = 0x007F;

/// The 16-bit control word at the start of every frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameHeader(u16);

impl FrameHeader {
    /// Packs the header fields. `opcode` keeps its low 4 bits and
    /// `base_length` its low 7 bits; reserved bits are cleared.
    #[must_use]
    pub const fn new(fin: bool, opcode: u8, mask: bool, base_length: u8) -> Self {
        let mut bits = ((opcode as u16) & OPCODE_MASK) << OPCODE_SHIFT;
        bits |= (base_length as u16) & BASE_LENGTH_MASK;
        if fin {
            bits |= FIN_BIT;
        }
        if mask {
            bits |= MASK_BIT;
        }
        Self(bits)
    }

    /// Wraps a raw big-endian control word.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns the raw control word.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns the header as it appears on the wire.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; HEADER_LEN] {
        self.0.to_be_bytes()
    }

    /// Final fragment flag.
    #[must_use]
    pub const fn fin(self) -> bool {
        self.0 & FIN_BIT != 0
    }

    /// First reserved bit.
    #[must_use]
    pub const fn rsv1(self) -> bool {
        self.0 & RSV1_BIT != 0
    }

    /// Second reserved bit.
    #[must_use]
    pub const fn rsv2(self) -> bool {
        self.0 & RSV2_BIT != 0
    }

    /// Third reserved bit.
    #[must_use]
    pub const fn rsv3(self) -> bool {
        self.0 & RSV3_BIT != 0
    }

    /// 4-bit opcode, see [`opcode`].
    #[must_use]
    pub const fn opcode(self) -> u8 {
        ((self.0 >> OPCODE_SHIFT) & OPCODE_MASK) as u8
    }

    /// Whether a 4-byte mask key follows the length field.
    #[must_use]
    pub const fn mask(self) -> bool {
        self.0 & MASK_BIT != 0
    }

    /// 7-bit length field: the payload length itself below 126, otherwise
    /// the sentinel announcing a 2-byte (126) or 8-byte (127) extension.
    #[must_use]
    pub const fn base_length(self) -> u8 {
        (self.0 & BASE_LENGTH_MASK) as u8
    }

    /// Returns a copy with the mask flag replaced.
    #[must_use]
    pub const fn with_mask(self, mask: bool) -> Self {
        if mask {
            Self(self.0 | MASK_BIT)
        } else {
            Self(self.0 & !MASK_BIT)
        }
    }

    /// Returns a copy with the 7-bit length field replaced.
    #[must_use]
    pub const fn with_base_length(self, base_length: u8) -> Self {
        Self((self.0 & !BASE_LENGTH_MASK) | ((base_length as u16) & BASE_LENGTH_MASK))
    }
}

impl fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHeader")
            .field("fin", &self.fin())
            .field("rsv1", &self.rsv1())
            .field("rsv2", &self.rsv2())
            .field("rsv3", &self.rsv3())
            .field("opcode", &self.opcode())
            .field("mask", &self.mask())
            .field("base_length", &self.base_length())
            .finish()
    }
}

/// Decodes the fixed header from the first two bytes of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedHeader`] if fewer than two bytes are
/// supplied.
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, ProtocolError> {
    let Some((word, _)) = bytes.split_first_chunk::<HEADER_LEN>() else {
        return Err(ProtocolError::TruncatedHeader {
            available: bytes.len(),
        });
    };
    Ok(FrameHeader::from_bits(u16::from_be_bytes(*word)))
}

/// Packs the header fields into their wire form. Reserved bits are zero.
#[must_use]
pub const fn encode_header(
    fin: bool,
    opcode: u8,
    mask: bool,
    base_length: u8,
) -> [u8; HEADER_LEN] {
    FrameHeader::new(fin, opcode, mask, base_length).to_bytes()
}
