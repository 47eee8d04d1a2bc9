//! Opening handshake (server side).
//!
//! ```http
//! HTTP/1.1 101 Switching Protocols
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! ```

use std::collections::HashMap;

use base64::Engine;
use sha1::{Digest, Sha1};

use crate::error::ProtocolError;

/// GUID appended to the client key before hashing.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Request header carrying the client's nonce. Looked up case-sensitively.
pub const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";

/// Derives the `Sec-WebSocket-Accept` value for a client key:
/// Base64 of the SHA-1 digest of the key followed by [`WS_GUID`].
#[must_use]
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Renders the `101 Switching Protocols` response for an upgrade request.
///
/// # Errors
///
/// Returns [`ProtocolError::MissingHandshakeKey`] if the
/// `Sec-WebSocket-Key` header is absent or empty.
pub fn build_handshake_response(
    headers: &HashMap<String, String>,
) -> Result<Vec<u8>, ProtocolError> {
    let client_key = headers
        .get(SEC_WEBSOCKET_KEY)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(ProtocolError::MissingHandshakeKey)?;

    Ok(format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        compute_accept_key(client_key)
    )
    .into_bytes())
}
