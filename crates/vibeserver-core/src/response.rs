//! Outbound response model and wire encoding.

use http::StatusCode;

/// Headers whose values the gateway always computes itself.
///
/// A model-supplied header with one of these names (case-insensitive) is
/// dropped.
pub const PRIORITY_HEADERS: &[&str] = &["Connection", "Content-Length", "Server"];

/// Value of the `Server` priority header.
pub const SERVER_BANNER: &str = concat!("vibeserver/", env!("CARGO_PKG_VERSION"));

/// A fully formed HTTP response ready to be written to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutboundResponse {
    /// Build a response with the priority headers already in place.
    ///
    /// `Content-Length` is taken from `body`, never from anywhere else.
    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let headers = vec![
            ("Connection".to_string(), "close".to_string()),
            ("Content-Length".to_string(), body.len().to_string()),
            ("Server".to_string(), SERVER_BANNER.to_string()),
        ];
        Self {
            status,
            headers,
            body,
        }
    }

    /// Plain-text response, used for gateway-generated errors.
    pub fn plain_text(status: u16, message: impl Into<String>) -> Self {
        let mut response = Self::with_body(status, message.into().into_bytes());
        response.push_header("Content-Type", "text/plain; charset=utf-8");
        response
    }

    /// Empty-bodied response (`Content-Length: 0`).
    pub fn empty(status: u16) -> Self {
        Self::with_body(status, Vec::new())
    }

    /// Append a header unless it collides with an existing entry.
    ///
    /// Returns `false` when the header was rejected.
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.has_header(&name) && is_priority_header(&name) {
            return false;
        }
        self.headers.push((name, value.into()));
        true
    }

    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// `HTTP/1.1 <code> <reason>`; unknown codes get an empty reason.
    pub fn status_line(&self) -> String {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        format!("HTTP/1.1 {} {reason}", self.status)
    }

    /// Encode status line, headers and body as raw HTTP/1.1 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = self.status_line();
        head.push_str("\r\n");
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// Whether `name` is one of [`PRIORITY_HEADERS`].
pub fn is_priority_header(name: &str) -> bool {
    PRIORITY_HEADERS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(name.trim()))
}
