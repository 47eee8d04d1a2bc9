//! Shared server state handed to every connection task.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::domain::ConnectionRegistry;
use crate::protocol::{HttparseParser, RequestParser};
use crate::ws::Dispatch;

/// State shared by the listener and all connection tasks.
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Active connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Sink for decoded payloads and connection errors.
    pub dispatch: Arc<dyn Dispatch>,
    /// Parser for upgrade requests, shared by every session.
    pub parser: Arc<dyn RequestParser>,
}

impl ServerState {
    /// Creates state with an empty registry and the `httparse` parser.
    #[must_use]
    pub fn new(config: ServerConfig, dispatch: Arc<dyn Dispatch>) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            dispatch,
            parser: Arc::new(HttparseParser),
        }
    }
}
