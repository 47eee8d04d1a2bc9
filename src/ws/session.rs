//! Per-connection session state machine.
//!
//! ```text
//! AwaitingHandshake ──handshake ok──▶ Open ──disconnect──▶ Closed
//!         │                                                  ▲
//!         └───────────────────disconnect─────────────────────┘
//! ```
//!
//! A rejected handshake leaves the session in `AwaitingHandshake`; the
//! caller decides whether to close the connection. `Closed` is terminal.

use std::sync::Arc;
use std::time::Duration;

use super::dispatch::Dispatch;
use super::heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, Heartbeat};
use super::transport::Transport;
use crate::domain::ConnectionId;
use crate::error::ProtocolError;
use crate::protocol::{Frame, HttparseParser, RequestParser, build_handshake_response};

/// Lifecycle phase of a [`ConnectionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the HTTP upgrade request.
    AwaitingHandshake,
    /// Upgraded: inbound bytes are frames, the heartbeat is running.
    Open,
    /// Torn down. No way back.
    Closed,
}

/// Protocol state of one connection.
///
/// Owned exclusively by the task that reads the connection; the heartbeat
/// task shares only the transport and the dispatch sink.
#[derive(Debug)]
pub struct ConnectionSession {
    id: ConnectionId,
    phase: Phase,
    transport: Arc<dyn Transport>,
    dispatch: Arc<dyn Dispatch>,
    parser: Arc<dyn RequestParser>,
    heartbeat_interval: Duration,
    heartbeat: Option<Heartbeat>,
}

impl ConnectionSession {
    /// Creates a session in [`Phase::AwaitingHandshake`] using the default
    /// request parser and heartbeat interval.
    #[must_use]
    pub fn new(
        id: ConnectionId,
        transport: Arc<dyn Transport>,
        dispatch: Arc<dyn Dispatch>,
    ) -> Self {
        Self {
            id,
            phase: Phase::AwaitingHandshake,
            transport,
            dispatch,
            parser: Arc::new(HttparseParser),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat: None,
        }
    }

    /// Replaces the heartbeat interval. Zero is ignored.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.heartbeat_interval = interval;
        }
        self
    }

    /// Replaces the upgrade request parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn RequestParser>) -> Self {
        self.parser = parser;
        self
    }

    /// The connection this session belongs to.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` while a heartbeat task is attached.
    #[must_use]
    pub const fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Feeds bytes read from the connection into the session.
    ///
    /// Before the upgrade the bytes must hold the complete HTTP request;
    /// afterwards they must hold whole frames, which are decoded in order
    /// and handed to the dispatch sink. Every error is also reported to the
    /// dispatch sink. Opening the session spawns the heartbeat task, so
    /// the handshake must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MalformedHttp`] or
    ///   [`ProtocolError::MissingHandshakeKey`] for a rejected handshake.
    ///   Nothing is written and the phase is unchanged.
    /// - [`ProtocolError::Transport`] if the handshake response could not be
    ///   queued.
    /// - [`ProtocolError::TruncatedHeader`],
    ///   [`ProtocolError::MalformedLength`] or
    ///   [`ProtocolError::TruncatedFrame`] for an undecodable frame. Frames
    ///   before it have been dispatched; the rest of the bytes are dropped.
    /// - [`ProtocolError::SessionClosed`] if the session is closed.
    pub fn on_data(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let result = match self.phase {
            Phase::AwaitingHandshake => self.finalise_handshake(data),
            Phase::Open => self.receive_frames(data),
            Phase::Closed => Err(ProtocolError::SessionClosed),
        };
        if let Err(err) = &result {
            self.dispatch.on_error(self.id, err.kind());
        }
        result
    }

    /// Tears the session down after the connection is lost.
    ///
    /// Cancels the heartbeat if one is running and closes the transport if it
    /// is still open. Calling it again is a no-op.
    pub fn on_disconnect(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        tracing::info!(
            connection_id = %self.id,
            peer = self.transport.peer_identity().as_deref().unwrap_or("unknown"),
            "connection closed"
        );
        self.phase = Phase::Closed;
        if let Some(heartbeat) = self.heartbeat.take() {
            // The task observes the signal at its next suspension point.
            drop(heartbeat.cancel());
        }
        if !self.transport.is_closed() {
            self.transport.close();
        }
    }

    fn finalise_handshake(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let request = self.parser.parse(data)?;
        let response = build_handshake_response(&request.headers)?;
        self.transport.write(response)?;

        self.phase = Phase::Open;
        self.heartbeat = Some(Heartbeat::spawn(
            self.id,
            Arc::clone(&self.transport),
            Arc::clone(&self.dispatch),
            self.heartbeat_interval,
        ));
        tracing::info!(
            connection_id = %self.id,
            request = %request.request_line(),
            "handshake completed"
        );
        Ok(())
    }

    fn receive_frames(&self, data: &[u8]) -> Result<(), ProtocolError> {
        let mut rest = data;
        while !rest.is_empty() {
            let (frame, consumed) = Frame::decode(rest)?;
            tracing::debug!(
                connection_id = %self.id,
                header = ?frame.header(),
                "frame received"
            );
            self.dispatch.on_payload(self.id, frame.payload());
            rest = rest.get(consumed..).unwrap_or_default();
        }
        Ok(())
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            drop(heartbeat.cancel());
        }
    }
}
