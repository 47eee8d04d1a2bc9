//! Per-connection driver: reads the socket and feeds the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use super::session::ConnectionSession;
use super::transport::{StreamTransport, Transport};
use crate::app_state::ServerState;
use crate::domain::{ConnectionId, ConnectionInfo};
use crate::error::ProtocolError;

/// How long queued frames may take to drain after the session closes.
pub const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one connection from accept to teardown.
///
/// Registers the connection, then feeds every read into a
/// [`ConnectionSession`]. The connection is closed on EOF, on a read error,
/// on any error returned by the session (a rejected handshake or an
/// undecodable frame), or as soon as the outbound side fails, for example
/// after a heartbeat write failure. The peer has to reconnect.
pub async fn serve_connection<S>(stream: S, peer: Option<String>, state: ServerState)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = ConnectionId::new();
    state
        .registry
        .insert(id, ConnectionInfo::new(peer.clone()))
        .await;
    tracing::info!(
        connection_id = %id,
        peer = peer.as_deref().unwrap_or("unknown"),
        "connection accepted"
    );

    let (mut reader, writer) = tokio::io::split(stream);
    let (transport, mut writer_task) = StreamTransport::spawn(writer, peer);
    let transport: Arc<dyn Transport> = Arc::new(transport);
    let mut session = ConnectionSession::new(id, transport, Arc::clone(&state.dispatch))
        .with_parser(Arc::clone(&state.parser))
        .with_heartbeat_interval(state.config.heartbeat_interval);

    let mut buf = vec![0u8; state.config.read_buffer_size.max(1)];
    let mut writer_done = false;
    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    let data = buf.get(..n).unwrap_or_default();
                    if let Err(err) = session.on_data(data) {
                        log_session_error(id, &err);
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(connection_id = %id, error = %err, "read failed");
                    break;
                }
            },
            joined = &mut writer_task => {
                writer_done = true;
                if let Err(err) = joined {
                    tracing::error!(connection_id = %id, error = %err, "writer task failed");
                }
                tracing::info!(connection_id = %id, "outbound side closed");
                break;
            }
        }
    }

    session.on_disconnect();
    if !writer_done {
        drain_writer(id, writer_task).await;
    }
    if let Some(info) = state.registry.remove(id).await {
        let lifetime = chrono::Utc::now() - info.connected_at;
        tracing::debug!(
            connection_id = %id,
            lifetime_ms = lifetime.num_milliseconds(),
            "connection deregistered"
        );
    }
}

fn log_session_error(id: ConnectionId, err: &ProtocolError) {
    let kind = err.kind();
    if kind.is_handshake_error() {
        tracing::info!(connection_id = %id, %kind, error = %err, "handshake rejected");
    } else if kind.is_frame_error() {
        tracing::warn!(connection_id = %id, %kind, error = %err, "undecodable frame");
    } else {
        tracing::warn!(connection_id = %id, %kind, error = %err, "closing connection");
    }
}

/// Lets queued writes drain, giving up on a peer that stopped reading.
async fn drain_writer(id: ConnectionId, mut writer_task: tokio::task::JoinHandle<()>) {
    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::error!(connection_id = %id, error = %err, "writer task failed");
        }
        Err(_) => {
            tracing::warn!(connection_id = %id, "outbound queue did not drain, dropping it");
            writer_task.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::config::ServerConfig;
    use crate::protocol::{Frame, MaskKey};
    use crate::ws::dispatch::Dispatch;
    use crate::ws::testing::RecordingDispatch;

    const UPGRADE: &[u8] = b"GET / HTTP/1.1\r\n\
        Host: localhost\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    fn state_with(dispatch: &Arc<RecordingDispatch>) -> ServerState {
        let config = ServerConfig {
            heartbeat_interval: Duration::from_secs(3600),
            ..ServerConfig::default()
        };
        ServerState::new(config, Arc::clone(dispatch) as Arc<dyn Dispatch>)
    }

    const RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";

    async fn read_exact(client: &mut tokio::io::DuplexStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        if client.read_exact(&mut buf).await.is_err() {
            panic!("server closed before sending {len} bytes");
        }
        buf
    }

    #[tokio::test]
    async fn upgrades_then_dispatches_frames() {
        let dispatch = Arc::new(RecordingDispatch::new());
        let state = state_with(&dispatch);
        let (mut client, server) = tokio::io::duplex(4096);
        let peer = Some("duplex".to_string());
        let task = tokio::spawn(serve_connection(server, peer, state.clone()));

        tokio_test::assert_ok!(client.write_all(UPGRADE).await);
        assert_eq!(read_exact(&mut client, RESPONSE.len()).await, RESPONSE);

        // The first heartbeat follows the upgrade immediately.
        let mut heartbeat = read_exact(&mut client, 2).await;
        let Some(&len_byte) = heartbeat.get(1) else {
            panic!("header has two bytes");
        };
        heartbeat.extend(read_exact(&mut client, usize::from(len_byte & 0x7F)).await);
        let Ok((frame, _)) = Frame::decode(&heartbeat) else {
            panic!("heartbeat should be a frame");
        };
        assert!(frame.payload().starts_with(b"server message: "));
        assert_eq!(state.registry.len().await, 1);

        let hello = Frame::text("hello").masked(MaskKey::new([1, 2, 3, 4])).encode();
        tokio_test::assert_ok!(client.write_all(&hello).await);
        drop(client);

        tokio_test::assert_ok!(task.await);
        assert_eq!(dispatch.payloads(), vec![b"hello".to_vec()]);
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn rejected_handshake_closes_connection() {
        let dispatch = Arc::new(RecordingDispatch::new());
        let state = state_with(&dispatch);
        let (mut client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(server, None, state.clone()));

        tokio_test::assert_ok!(client.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await);

        // No upgrade response: the server just hangs up.
        let mut rest = Vec::new();
        tokio_test::assert_ok!(client.read_to_end(&mut rest).await);
        assert!(rest.is_empty());

        tokio_test::assert_ok!(task.await);
        assert_eq!(
            dispatch.errors(),
            vec![crate::error::ErrorKind::MissingHandshakeKey]
        );
        assert!(state.registry.is_empty().await);
    }

    /// Accepts `budget` bytes, then fails every write.
    #[derive(Debug)]
    struct FailAfter {
        budget: usize,
    }

    impl AsyncWrite for FailAfter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.budget == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Never completes a write, like a peer that stopped reading.
    #[derive(Debug)]
    struct Stalled;

    impl AsyncWrite for Stalled {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    #[tokio::test]
    async fn failed_outbound_side_tears_connection_down() {
        let dispatch = Arc::new(RecordingDispatch::new());
        let state = state_with(&dispatch);
        let (mut client, server) = tokio::io::duplex(4096);
        // The handshake response goes through; the first heartbeat does not.
        let stream = tokio::io::join(server, FailAfter { budget: RESPONSE.len() });
        let task = tokio::spawn(serve_connection(stream, None, state.clone()));

        tokio_test::assert_ok!(client.write_all(UPGRADE).await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let late = Frame::text("after failure").masked(MaskKey::new([9, 8, 7, 6])).encode();
        // The server may already have dropped its end.
        let _ = client.write_all(&late).await;

        let finished = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert!(matches!(finished, Ok(Ok(()))), "connection task kept running");
        assert!(dispatch.payloads().is_empty());
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_peer_is_released_after_drain_timeout() {
        let dispatch = Arc::new(RecordingDispatch::new());
        let state = state_with(&dispatch);
        let (mut client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(
            tokio::io::join(server, Stalled),
            None,
            state.clone(),
        ));

        tokio_test::assert_ok!(client.write_all(UPGRADE).await);
        tokio_test::assert_ok!(client.shutdown().await);

        let started = tokio::time::Instant::now();
        let finished = tokio::time::timeout(Duration::from_secs(60), task).await;
        assert!(matches!(finished, Ok(Ok(()))), "connection task kept running");
        assert!(started.elapsed() >= WRITER_DRAIN_TIMEOUT);
        assert!(state.registry.is_empty().await);
    }
}
