//! Whole-frame decode and encode.
//!
//! A frame on the wire is the fixed header, 0, 2 or 8 extended length
//! bytes, an optional 4-byte mask key and the payload. [`Frame`] keeps the
//! payload unmasked; the mask key is applied on the way in and out.

use crate::error::ProtocolError;

use super::header::{FrameHeader, HEADER_LEN, decode_header, opcode};
use super::length::{ExtendedLength, choose_length_encoding};
use super::mask::{MASK_KEY_LEN, MaskKey, apply_mask, apply_mask_in_place};

/// One decoded or to-be-encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    length: ExtendedLength,
    mask_key: Option<MaskKey>,
    payload: Vec<u8>,
}

impl Frame {
    /// Builds a final, unmasked frame with the given opcode.
    #[must_use]
    pub fn new(opcode: u8, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let length = choose_length_encoding(payload.len() as u64);
        Self {
            header: FrameHeader::new(true, opcode, false, length.base_length()),
            length,
            mask_key: None,
            payload,
        }
    }

    /// Builds a final, unmasked text frame.
    #[must_use]
    pub fn text(payload: impl Into<String>) -> Self {
        Self::new(opcode::TEXT, payload.into().into_bytes())
    }

    /// Builds a final, unmasked binary frame.
    #[must_use]
    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(opcode::BINARY, payload)
    }

    /// Returns this frame masked with `key`, the way a client sends it.
    #[must_use]
    pub fn masked(mut self, key: MaskKey) -> Self {
        self.header = self.header.with_mask(true);
        self.mask_key = Some(key);
        self
    }

    /// Decodes one frame from the start of `bytes`.
    ///
    /// Returns the frame, with its payload unmasked, and the number of
    /// bytes it occupied. Bytes past the frame are left untouched.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::TruncatedHeader`] if fewer than two bytes remain.
    /// - [`ProtocolError::MalformedLength`] if the extended length is cut
    ///   short.
    /// - [`ProtocolError::TruncatedFrame`] if the mask key or the payload is
    ///   cut short.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ProtocolError> {
        let header = decode_header(bytes)?;
        let mut rest = bytes.get(HEADER_LEN..).unwrap_or_default();

        let length = ExtendedLength::read(header, rest)?;
        let mut consumed = HEADER_LEN + length.extra_bytes().len();
        rest = rest.get(length.extra_bytes().len()..).unwrap_or_default();

        let mask_key = if header.mask() {
            let Some((key, after)) = rest.split_first_chunk::<MASK_KEY_LEN>() else {
                return Err(ProtocolError::TruncatedFrame {
                    needed: MASK_KEY_LEN,
                    available: rest.len(),
                });
            };
            rest = after;
            consumed += MASK_KEY_LEN;
            Some(MaskKey::new(*key))
        } else {
            None
        };

        let payload_len = usize::try_from(length.value()).unwrap_or(usize::MAX);
        let Some(raw) = rest.get(..payload_len) else {
            return Err(ProtocolError::TruncatedFrame {
                needed: payload_len,
                available: rest.len(),
            });
        };
        consumed += payload_len;

        let payload = match mask_key {
            Some(key) => apply_mask(raw, key),
            None => raw.to_vec(),
        };

        Ok((
            Self {
                header,
                length,
                mask_key,
                payload,
            },
            consumed,
        ))
    }

    /// Encodes the frame into its wire form.
    ///
    /// The header's length field is recomputed from the payload; `fin`, the
    /// reserved bits and the opcode are written verbatim.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let length = choose_length_encoding(self.payload.len() as u64);
        let header = self
            .header
            .with_mask(self.mask_key.is_some())
            .with_base_length(length.base_length());

        let mut out = Vec::with_capacity(
            HEADER_LEN + length.extra_bytes().len() + MASK_KEY_LEN + self.payload.len(),
        );
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(length.extra_bytes());
        match self.mask_key {
            Some(key) => {
                out.extend_from_slice(key.as_bytes());
                let start = out.len();
                out.extend_from_slice(&self.payload);
                if let Some(tail) = out.get_mut(start..) {
                    apply_mask_in_place(tail, key);
                }
            }
            None => out.extend_from_slice(&self.payload),
        }
        out
    }

    /// The fixed header.
    #[must_use]
    pub const fn header(&self) -> FrameHeader {
        self.header
    }

    /// The resolved payload length.
    #[must_use]
    pub const fn length(&self) -> ExtendedLength {
        self.length
    }

    /// The mask key, if the frame carried one.
    #[must_use]
    pub const fn mask_key(&self) -> Option<MaskKey> {
        self.mask_key
    }

    /// The unmasked payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the frame, returning the unmasked payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
