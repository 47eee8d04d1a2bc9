//! # sockit
//!
//! Minimal server-side implementation of the WebSocket wire protocol.
//!
//! The crate upgrades an inbound HTTP connection, decodes client frames
//! (masking and extended lengths included), encodes server frames, and
//! keeps every open connection alive with a periodic heartbeat frame.
//!
//! ## Architecture
//!
//! ```text
//! TcpListener (server)
//!     │
//!     ├── serve_connection (ws/handler)       one task per connection
//!     │       │
//!     │       ├── ConnectionSession (ws/)     AwaitingHandshake → Open → Closed
//!     │       │       ├── handshake (protocol/)
//!     │       │       ├── Frame codec (protocol/)
//!     │       │       └── Heartbeat task (ws/)
//!     │       │
//!     │       ├── StreamTransport (ws/)       single writer task
//!     │       └── Dispatch sink (ws/)
//!     │
//!     └── ConnectionRegistry (domain/)
//! ```

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod server;
pub mod ws;
