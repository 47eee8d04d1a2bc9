//! Protocol layer: handshake negotiation and the frame codec.
//!
//! Everything here is pure: no I/O, no tasks. The session layer in
//! [`crate::ws`] drives these functions with bytes read from a connection.

pub mod frame;
pub mod handshake;
pub mod header;
pub mod http;
pub mod length;
pub mod mask;

pub use frame::Frame;
pub use handshake::{build_handshake_response, compute_accept_key};
pub use header::{FrameHeader, decode_header, encode_header, opcode};
pub use http::{HandshakeRequest, HttparseParser, RequestParser};
pub use length::{ExtendedLength, choose_length_encoding, resolve_length};
pub use mask::{MaskKey, apply_mask, apply_mask_in_place};
