//! Upgrade request parsing.
//!
//! The engine only needs "bytes in, request line and header map out". That
//! contract is the [`RequestParser`] trait; [`HttparseParser`] is the
//! default implementation.

use std::collections::HashMap;
use std::fmt;

use crate::error::ProtocolError;

/// Upper bound on headers accepted in an upgrade request.
pub const MAX_HEADERS: usize = 64;

/// A parsed HTTP upgrade request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeRequest {
    /// Request method, e.g. `GET`.
    pub method: String,
    /// Request target, e.g. `/chat`.
    pub path: String,
    /// Minor HTTP version (`1` for HTTP/1.1).
    pub version: u8,
    /// Header values keyed by name exactly as sent (case-sensitive).
    /// When a name repeats, the first occurrence wins.
    pub headers: HashMap<String, String>,
}

impl HandshakeRequest {
    /// Returns the value of header `name` (case-sensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Reassembles the request line, e.g. `GET /chat HTTP/1.1`.
    #[must_use]
    pub fn request_line(&self) -> String {
        format!("{} {} HTTP/1.{}", self.method, self.path, self.version)
    }
}

/// Turns raw bytes into a [`HandshakeRequest`].
pub trait RequestParser: fmt::Debug + Send + Sync {
    /// Parses one complete request.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedHttp`] if the bytes are not a
    /// complete, well-formed HTTP/1.x request.
    fn parse(&self, raw: &[u8]) -> Result<HandshakeRequest, ProtocolError>;
}

/// [`RequestParser`] backed by the `httparse` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttparseParser;

impl RequestParser for HttparseParser {
    fn parse(&self, raw: &[u8]) -> Result<HandshakeRequest, ProtocolError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        let status = req
            .parse(raw)
            .map_err(|err| ProtocolError::MalformedHttp(err.to_string()))?;
        if status.is_partial() {
            return Err(ProtocolError::MalformedHttp(
                "incomplete request".to_string(),
            ));
        }

        let mut map = HashMap::with_capacity(req.headers.len());
        for header in req.headers.iter() {
            let value = std::str::from_utf8(header.value).map_err(|_| {
                ProtocolError::MalformedHttp(format!("non-utf8 value for header {}", header.name))
            })?;
            map.entry(header.name.to_string())
                .or_insert_with(|| value.to_string());
        }

        Ok(HandshakeRequest {
            method: req.method.unwrap_or_default().to_string(),
            path: req.path.unwrap_or_default().to_string(),
            version: req.version.unwrap_or_default(),
            headers: map,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const UPGRADE: &[u8] = b"GET /chat HTTP/1.1\r\n\
        Host: server.example.com\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    #[test]
    fn parses_upgrade_request() {
        let Ok(req) = HttparseParser.parse(UPGRADE) else {
            panic!("request should parse");
        };
        assert_eq!(req.request_line(), "GET /chat HTTP/1.1");
        assert_eq!(req.header("Sec-WebSocket-Key"), Some("dGhlIHNhbXBsZSBub25jZQ=="));
        assert_eq!(req.header("Upgrade"), Some("websocket"));
        assert_eq!(req.headers.len(), 5);
    }

    #[test]
    fn header_names_keep_their_case() {
        let Ok(req) = HttparseParser.parse(UPGRADE) else {
            panic!("request should parse");
        };
        assert_eq!(req.header("sec-websocket-key"), None);
    }

    #[test]
    fn first_duplicate_wins() {
        let raw = b"GET / HTTP/1.1\r\nX-Test: one\r\nX-Test: two\r\n\r\n";
        let Ok(req) = HttparseParser.parse(raw) else {
            panic!("request should parse");
        };
        assert_eq!(req.header("X-Test"), Some("one"));
    }

    #[test]
    fn partial_request_is_malformed() {
        assert!(matches!(
            HttparseParser.parse(b"GET / HTTP/1.1\r\nHost: x\r\n"),
            Err(ProtocolError::MalformedHttp(_))
        ));
        assert!(matches!(
            HttparseParser.parse(b""),
            Err(ProtocolError::MalformedHttp(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            HttparseParser.parse(b"\x81\x04test"),
            Err(ProtocolError::MalformedHttp(_))
        ));
    }
}
