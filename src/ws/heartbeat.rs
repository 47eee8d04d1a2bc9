//! Periodic outbound status frame.
//!
//! Once a session is open, a heartbeat task writes a text frame right away
//! and then once per interval. It watches a cancellation signal at every
//! suspension point and never writes after observing it. A failed write
//! tears the connection down: the task reports the error, closes the
//! transport and exits.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::dispatch::Dispatch;
use super::transport::Transport;
use crate::domain::ConnectionId;
use crate::error::ProtocolError;
use crate::protocol::Frame;

/// Default time between two heartbeat frames.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Renders the heartbeat text: `server message: <unix seconds>.<micros>`.
#[must_use]
pub fn heartbeat_message(now: DateTime<Utc>) -> String {
    format!(
        "server message: {}.{:06}",
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}

/// Handle to a running heartbeat task.
#[derive(Debug)]
pub struct Heartbeat {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawns the heartbeat task. Must be called from within a tokio runtime.
    ///
    /// A zero `interval` falls back to [`DEFAULT_HEARTBEAT_INTERVAL`].
    /// Dropping the returned handle also stops the task.
    pub fn spawn(
        connection_id: ConnectionId,
        transport: Arc<dyn Transport>,
        dispatch: Arc<dyn Dispatch>,
        interval: Duration,
    ) -> Self {
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(run(connection_id, transport, dispatch, interval, cancelled));
        Self { cancel, task }
    }

    /// Signals the task to stop and returns its handle. The task performs no
    /// further writes once it observes the signal.
    pub fn cancel(self) -> JoinHandle<()> {
        // Fails only if the task already exited.
        let _ = self.cancel.send(true);
        self.task
    }
}

async fn run(
    connection_id: ConnectionId,
    transport: Arc<dyn Transport>,
    dispatch: Arc<dyn Dispatch>,
    period: Duration,
    mut cancelled: watch::Receiver<bool>,
) {
    let period = if period.is_zero() {
        DEFAULT_HEARTBEAT_INTERVAL
    } else {
        period
    };
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancelled.changed() => {
                tracing::debug!(%connection_id, "heartbeat cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        let frame = Frame::text(heartbeat_message(Utc::now()));
        if let Err(source) = transport.write(frame.encode()) {
            let err = ProtocolError::HeartbeatWriteFailure(source);
            tracing::error!(
                %connection_id,
                error = %err,
                "heartbeat failed, closing connection"
            );
            dispatch.on_error(connection_id, err.kind());
            transport.close();
            return;
        }
    }
}
