//! Outbound byte path of a connection.
//!
//! The session and its heartbeat task both write to the same connection, so
//! [`StreamTransport`] funnels every write through a bounded channel into a
//! single writer task that owns the stream's write half. Each `write`
//! enqueues one complete frame, so frames never interleave on the wire.
//! A peer that stops reading fills the queue and further writes fail with
//! [`TransportError::Full`].

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TransportError;

/// Frames that may wait for the writer task before writes are refused.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// What the engine needs from a connection's outbound side.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Queues `bytes` for delivery as one unit.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the transport is closed and
    /// [`TransportError::Full`] when the bytes cannot be queued.
    fn write(&self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Closes the transport. Safe to call more than once.
    fn close(&self);

    /// Returns `true` once the transport no longer accepts writes.
    fn is_closed(&self) -> bool;

    /// Returns the peer address, if known.
    fn peer_identity(&self) -> Option<String>;
}

/// [`Transport`] over any [`AsyncWrite`], serialised by a writer task.
#[derive(Debug)]
pub struct StreamTransport {
    outbound: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    peer: Option<String>,
}

impl StreamTransport {
    /// Spawns the writer task for `writer` and returns the transport handle
    /// together with the task.
    ///
    /// The task drains queued writes, shuts the writer down after
    /// [`Transport::close`], and stops accepting writes on the first I/O
    /// error. Must be called from within a tokio runtime.
    pub fn spawn<W>(writer: W, peer: Option<String>) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let task = tokio::spawn(write_loop(writer, rx, peer.clone()));
        let transport = Self {
            outbound: Mutex::new(Some(tx)),
            peer,
        };
        (transport, task)
    }

    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::Sender<Vec<u8>>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for StreamTransport {
    fn write(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let guard = self.outbound();
        let Some(tx) = guard.as_ref() else {
            return Err(TransportError::Closed);
        };
        tx.try_send(bytes).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => TransportError::Full,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn close(&self) {
        // Dropping the sender lets the writer task flush and shut down.
        drop(self.outbound().take());
    }

    fn is_closed(&self) -> bool {
        self.outbound().as_ref().is_none_or(mpsc::Sender::is_closed)
    }

    fn peer_identity(&self) -> Option<String> {
        self.peer.clone()
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<Vec<u8>>,
    peer: Option<String>,
) where
    W: AsyncWrite + Unpin,
{
    let peer = peer.as_deref().unwrap_or("unknown");
    while let Some(bytes) = rx.recv().await {
        if let Err(err) = writer.write_all(&bytes).await {
            tracing::warn!(peer, error = %err, "transport write failed");
            // Senders observe the closed channel as TransportError::Closed.
            rx.close();
            return;
        }
    }
    if let Err(err) = writer.shutdown().await {
        tracing::debug!(peer, error = %err, "transport shutdown failed");
    }
}
