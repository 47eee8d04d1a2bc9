//! WebSocket session layer: per-connection state machine, heartbeat,
//! transport and dispatch seams, and the connection driver.
//!
//! Each accepted connection gets its own [`ConnectionSession`]. Bytes read
//! from the socket go through [`handler::serve_connection`] into the
//! session, decoded payloads come out through a [`Dispatch`] sink, and all
//! outbound bytes go through a [`Transport`].

pub mod dispatch;
pub mod handler;
pub mod heartbeat;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{Dispatch, LoggingDispatch};
pub use heartbeat::Heartbeat;
pub use session::{ConnectionSession, Phase};
pub use transport::{StreamTransport, Transport};
