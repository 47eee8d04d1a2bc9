//! Upstream sink for decoded payloads and connection errors.

use std::fmt;

use crate::domain::ConnectionId;
use crate::error::ErrorKind;

/// Receives what the engine decodes, and what goes wrong, per connection.
pub trait Dispatch: fmt::Debug + Send + Sync {
    /// Called once per successfully decoded inbound frame.
    fn on_payload(&self, connection_id: ConnectionId, payload: &[u8]);

    /// Called for every handshake, frame or heartbeat failure.
    fn on_error(&self, connection_id: ConnectionId, kind: ErrorKind);
}

/// [`Dispatch`] that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatch;

impl Dispatch for LoggingDispatch {
    fn on_payload(&self, connection_id: ConnectionId, payload: &[u8]) {
        tracing::info!(
            %connection_id,
            len = payload.len(),
            payload = %String::from_utf8_lossy(payload),
            "received data"
        );
    }

    fn on_error(&self, connection_id: ConnectionId, kind: ErrorKind) {
        tracing::warn!(%connection_id, error = %kind, "connection error");
    }
}
