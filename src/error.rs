//! Protocol error types with a stable kind mapping.
//!
//! [`ProtocolError`] is the central error type for the engine. Every variant
//! maps to an [`ErrorKind`], which is what the dispatch sink receives when a
//! handshake, a frame or the heartbeat fails on a connection.

use std::fmt;

/// Failure of the outbound byte path of a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport was closed locally or by its writer task.
    #[error("transport is closed")]
    Closed,

    /// The peer is not draining its outbound queue.
    #[error("outbound queue is full")]
    Full,

    /// The underlying stream reported an I/O failure.
    #[error("transport i/o error: {0}")]
    Io(String),
}

/// Engine-side error enum with [`ErrorKind`] mapping.
///
/// All errors are connection-local: none of them is retried, and the
/// connection driver closes the connection after any of them.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Fewer than the two bytes of the fixed frame header were available.
    #[error("truncated frame header: need 2 bytes, got {available}")]
    TruncatedHeader {
        /// Number of bytes that were available.
        available: usize,
    },

    /// The extended payload length field was cut short.
    #[error("malformed extended length: need {needed} bytes, got {available}")]
    MalformedLength {
        /// Number of extended length bytes the header announced.
        needed: usize,
        /// Number of bytes that were available.
        available: usize,
    },

    /// The mask key or the payload was cut short.
    #[error("truncated frame: need {needed} bytes, got {available}")]
    TruncatedFrame {
        /// Number of bytes the frame still required.
        needed: usize,
        /// Number of bytes that were available.
        available: usize,
    },

    /// The upgrade request had no usable `Sec-WebSocket-Key` header.
    #[error("missing Sec-WebSocket-Key header")]
    MissingHandshakeKey,

    /// The upgrade request could not be parsed as HTTP.
    #[error("malformed http request: {0}")]
    MalformedHttp(String),

    /// The heartbeat task could not write to the transport.
    #[error("heartbeat write failed: {0}")]
    HeartbeatWriteFailure(#[source] TransportError),

    /// Writing the handshake response failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bytes arrived after the session was torn down.
    #[error("session is closed")]
    SessionClosed,
}

/// Payload-free discriminant of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ProtocolError::TruncatedHeader`].
    TruncatedHeader,
    /// See [`ProtocolError::MalformedLength`].
    MalformedLength,
    /// See [`ProtocolError::TruncatedFrame`].
    TruncatedFrame,
    /// See [`ProtocolError::MissingHandshakeKey`].
    MissingHandshakeKey,
    /// See [`ProtocolError::MalformedHttp`].
    MalformedHttp,
    /// See [`ProtocolError::HeartbeatWriteFailure`].
    HeartbeatWriteFailure,
    /// See [`ProtocolError::Transport`].
    Transport,
    /// See [`ProtocolError::SessionClosed`].
    SessionClosed,
}

impl ErrorKind {
    /// Returns a stable snake_case name, suitable for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TruncatedHeader => "truncated_header",
            Self::MalformedLength => "malformed_length",
            Self::TruncatedFrame => "truncated_frame",
            Self::MissingHandshakeKey => "missing_handshake_key",
            Self::MalformedHttp => "malformed_http",
            Self::HeartbeatWriteFailure => "heartbeat_write_failure",
            Self::Transport => "transport",
            Self::SessionClosed => "session_closed",
        }
    }

    /// Returns `true` for errors raised while decoding a frame.
    #[must_use]
    pub const fn is_frame_error(self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader | Self::MalformedLength | Self::TruncatedFrame
        )
    }

    /// Returns `true` for errors raised while negotiating the upgrade.
    #[must_use]
    pub const fn is_handshake_error(self) -> bool {
        matches!(self, Self::MissingHandshakeKey | Self::MalformedHttp)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProtocolError {
    /// Returns the [`ErrorKind`] for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TruncatedHeader { .. } => ErrorKind::TruncatedHeader,
            Self::MalformedLength { .. } => ErrorKind::MalformedLength,
            Self::TruncatedFrame { .. } => ErrorKind::TruncatedFrame,
            Self::MissingHandshakeKey => ErrorKind::MissingHandshakeKey,
            Self::MalformedHttp(_) => ErrorKind::MalformedHttp,
            Self::HeartbeatWriteFailure(_) => ErrorKind::HeartbeatWriteFailure,
            Self::Transport(_) => ErrorKind::Transport,
            Self::SessionClosed => ErrorKind::SessionClosed,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            ProtocolError::TruncatedHeader { available: 1 }.kind(),
            ErrorKind::TruncatedHeader
        );
        assert_eq!(
            ProtocolError::MalformedLength {
                needed: 8,
                available: 3
            }
            .kind(),
            ErrorKind::MalformedLength
        );
        assert_eq!(
            ProtocolError::HeartbeatWriteFailure(TransportError::Closed).kind(),
            ErrorKind::HeartbeatWriteFailure
        );
        assert_eq!(
            ProtocolError::from(TransportError::Closed).kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn kind_categories() {
        assert!(ErrorKind::MalformedLength.is_frame_error());
        assert!(!ErrorKind::MalformedLength.is_handshake_error());
        assert!(ErrorKind::MissingHandshakeKey.is_handshake_error());
        assert!(!ErrorKind::SessionClosed.is_frame_error());
    }

    #[test]
    fn display_includes_counts() {
        let err = ProtocolError::TruncatedFrame {
            needed: 19,
            available: 4,
        };
        assert_eq!(err.to_string(), "truncated frame: need 19 bytes, got 4");
        assert_eq!(ErrorKind::TruncatedFrame.to_string(), "truncated_frame");
    }
}
