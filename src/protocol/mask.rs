//! Payload masking.
//!
//! Byte `i` of a masked payload is XORed with byte `i % 4` of the key. The
//! transform is its own inverse, so the same functions mask and unmask.

/// Length of a mask key on the wire.
pub const MASK_KEY_LEN: usize = 4;

/// Four-byte masking key carried by client-to-server frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskKey([u8; MASK_KEY_LEN]);

impl MaskKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn new(bytes: [u8; MASK_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the key as it appears on the wire.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MASK_KEY_LEN] {
        &self.0
    }
}

impl From<[u8; MASK_KEY_LEN]> for MaskKey {
    fn from(bytes: [u8; MASK_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

/// Returns a masked (or unmasked) copy of `payload`.
#[must_use]
pub fn apply_mask(payload: &[u8], key: MaskKey) -> Vec<u8> {
    payload
        .iter()
        .zip(key.0.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// Masks (or unmasks) `payload` in place.
pub fn apply_mask_in_place(payload: &mut [u8], key: MaskKey) {
    for (byte, k) in payload.iter_mut().zip(key.0.iter().cycle()) {
        *byte ^= k;
    }
}
