//! In-memory transport and dispatch doubles shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::domain::ConnectionId;
use crate::error::{ErrorKind, TransportError};

use super::dispatch::Dispatch;
use super::transport::Transport;

#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    writes: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every later write fails as if the peer had gone away.
    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn write(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) || self.is_closed() {
            return Err(TransportError::Closed);
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(bytes);
        }
        Ok(())
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn peer_identity(&self) -> Option<String> {
        Some("test-peer".to_string())
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingDispatch {
    payloads: Mutex<Vec<(ConnectionId, Vec<u8>)>>,
    errors: Mutex<Vec<(ConnectionId, ErrorKind)>>,
}

impl RecordingDispatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads
            .lock()
            .map(|p| p.iter().map(|(_, bytes)| bytes.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn errors(&self) -> Vec<ErrorKind> {
        self.errors
            .lock()
            .map(|e| e.iter().map(|(_, kind)| *kind).collect())
            .unwrap_or_default()
    }
}

impl Dispatch for RecordingDispatch {
    fn on_payload(&self, connection_id: ConnectionId, payload: &[u8]) {
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push((connection_id, payload.to_vec()));
        }
    }

    fn on_error(&self, connection_id: ConnectionId, kind: ErrorKind) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push((connection_id, kind));
        }
    }
}
