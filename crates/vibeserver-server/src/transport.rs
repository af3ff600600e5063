//! Byte-level HTTP/1.x request reading and response writing.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;
use vibeserver_core::{HeaderList, InboundRequest, Method, OutboundResponse};

use crate::error::RequestError;

/// Size caps applied while reading one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// Request line plus all header lines, terminators included
    pub max_head_bytes: usize,
    pub max_body_bytes: usize,
}

/// Read one request: request line, headers up to the blank line, then
/// `Content-Length` bytes of body.
///
/// A missing or unparseable `Content-Length` means an empty body.
pub async fn read_request<R>(reader: &mut R, limits: ReadLimits) -> Result<InboundRequest, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = limits.max_head_bytes;

    let Some(request_line) = read_head_line(reader, &mut budget, limits.max_head_bytes).await?
    else {
        return Err(RequestError::ConnectionClosed);
    };
    let (method, path) = parse_request_line(&request_line)?;

    let mut headers = HeaderList::new();
    loop {
        let Some(line) = read_head_line(reader, &mut budget, limits.max_head_bytes).await? else {
            return Err(RequestError::TruncatedHead);
        };
        if line.is_empty() {
            break;
        }
        let (name, value) = parse_header_line(&line)?;
        headers.append(name, value);
    }

    let length = content_length(&headers);
    if length > limits.max_body_bytes {
        return Err(RequestError::BodyTooLarge {
            length,
            limit: limits.max_body_bytes,
        });
    }

    let mut body = vec![0; length];
    reader.read_exact(&mut body).await?;

    trace!(%method, %path, headers = headers.len(), body = body.len(), "Request read");
    Ok(InboundRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Read one CRLF- or LF-terminated line, charging it against `budget`.
///
/// Returns `None` on a clean EOF before any byte of the line.
async fn read_head_line<R>(
    reader: &mut R,
    budget: &mut usize,
    limit: usize,
) -> Result<Option<String>, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    if *budget == 0 {
        return Err(RequestError::HeadTooLarge { limit });
    }

    let mut raw = Vec::new();
    let cap = u64::try_from(*budget).unwrap_or(u64::MAX);
    let read = (&mut *reader).take(cap).read_until(b'\n', &mut raw).await?;
    if read == 0 {
        return Ok(None);
    }
    *budget -= read;

    if raw.last() != Some(&b'\n') {
        return Err(if *budget == 0 {
            RequestError::HeadTooLarge { limit }
        } else {
            RequestError::TruncatedHead
        });
    }

    raw.pop();
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

fn parse_request_line(line: &str) -> Result<(Method, String), RequestError> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(RequestError::MalformedRequestLine(line.to_string()));
    };
    if !version.starts_with("HTTP/") {
        return Err(RequestError::MalformedRequestLine(line.to_string()));
    }

    let method = method.parse::<Method>()?;
    Ok((method, target.to_string()))
}

fn parse_header_line(line: &str) -> Result<(&str, &str), RequestError> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(RequestError::MalformedHeader(line.to_string())),
    }
}

fn content_length(headers: &HeaderList) -> usize {
    headers
        .get("Content-Length")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Whether the client is still connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Gone,
}

/// Non-blocking check for a vanished peer.
pub trait PeerProbe {
    fn liveness(&self) -> Liveness;
}

impl PeerProbe for TcpStream {
    /// Best effort: an orderly close (EOF) or a reset counts as gone, no
    /// pending data counts as alive.
    fn liveness(&self) -> Liveness {
        let mut probe = [0u8; 1];
        match self.try_read(&mut probe) {
            Ok(0) => Liveness::Gone,
            Ok(_) => Liveness::Alive,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Liveness::Alive,
            Err(_) => Liveness::Gone,
        }
    }
}

impl PeerProbe for Liveness {
    fn liveness(&self) -> Liveness {
        *self
    }
}

/// Write `response` in full, then shut the write side down.
pub async fn write_response<W>(writer: &mut W, response: &OutboundResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.to_bytes()).await?;
    writer.flush().await?;
    writer.shutdown().await
}
