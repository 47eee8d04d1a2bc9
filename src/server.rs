//! TCP listener loop.
//!
//! Accepts connections until the shutdown future resolves and runs each one
//! on its own task via [`serve_connection`].

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app_state::ServerState;
use crate::config::ServerConfig;
use crate::ws::Dispatch;
use crate::ws::handler::serve_connection;

/// WebSocket server: one engine instance per accepted connection.
#[derive(Debug, Clone)]
pub struct Server {
    state: ServerState,
}

impl Server {
    /// Creates a server with an empty connection registry.
    #[must_use]
    pub fn new(config: ServerConfig, dispatch: Arc<dyn Dispatch>) -> Self {
        Self {
            state: ServerState::new(config, dispatch),
        }
    }

    /// Shared state, including the registry of active connections.
    #[must_use]
    pub const fn state(&self) -> &ServerState {
        &self.state
    }

    /// Accepts connections on `listener` until `shutdown` resolves.
    ///
    /// Accept failures are logged and do not stop the loop. Connections
    /// still open at shutdown keep running on their own tasks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener's local address cannot be read.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "server listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    let active = self.state.registry.len().await;
                    tracing::info!(%addr, active, "server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(err) = stream.set_nodelay(true) {
                            tracing::debug!(%peer, error = %err, "failed to set TCP_NODELAY");
                        }
                        let state = self.state.clone();
                        tokio::spawn(serve_connection(stream, Some(peer.to_string()), state));
                    }
                    Err(err) => {
                        tracing::warn!(%addr, error = %err, "failed to accept connection");
                    }
                },
            }
        }
    }
}
