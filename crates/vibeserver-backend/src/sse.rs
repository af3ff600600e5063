//! SSE -> text fragment adapter.
//!
//! OpenAI-compatible servers stream chat completions as Server-Sent Events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"HTTP/1.1"}}]}
//!
//! data: [DONE]
//! ```
//!
//! This module turns that byte stream into the core's [`FragmentStream`],
//! yielding each non-empty `delta.content` in order.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tracing::{trace, warn};
use vibeserver_core::{CompletionError, FragmentStream};

/// State threaded through the `unfold` stream.
struct SseState<S> {
    stream: S,
    buf: BytesMut,
    /// Upstream is exhausted (or failed); only buffered lines remain.
    eof: bool,
}

/// What a single SSE line means for the fragment stream.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    /// A piece of completion text.
    Fragment(String),
    /// `data: [DONE]`.
    Done,
    /// The backend reported an error inside the stream.
    Error(String),
    /// Comments, keep-alives, role-only deltas, unparseable data.
    Skip,
}

/// Convert an SSE byte stream into an ordered stream of completion fragments.
pub fn sse_fragments<S, E>(byte_stream: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        eof: false,
    };

    let fragments = futures_util::stream::unfold(state, |mut st| async move {
        loop {
            // Try to extract a complete SSE line from the buffer.
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                let line_str = String::from_utf8_lossy(&line);

                match classify_line(line_str.trim()) {
                    SseLine::Fragment(text) => return Some((Ok(text), st)),
                    SseLine::Done => return None,
                    SseLine::Error(message) => {
                        st.eof = true;
                        st.buf.clear();
                        return Some((Err(CompletionError::Interrupted(message)), st));
                    }
                    SseLine::Skip => continue,
                }
            }

            if st.eof {
                return None;
            }

            // Need more data from upstream.
            match st.stream.next().await {
                Some(Ok(chunk)) => {
                    st.buf.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    warn!("Upstream stream error: {e}");
                    st.eof = true;
                    st.buf.clear();
                    return Some((Err(CompletionError::Interrupted(e.to_string())), st));
                }
                None => {
                    // Stream ended without [DONE]; flush a trailing partial line.
                    st.eof = true;
                    if !st.buf.is_empty() {
                        st.buf.extend_from_slice(b"\n");
                    }
                }
            }
        }
    });

    Box::pin(fragments)
}

fn classify_line(line: &str) -> SseLine {
    // Skip empty lines and SSE comments.
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }

    let Some(data) = line.strip_prefix("data:") else {
        // event:, id:, retry: fields carry nothing we use.
        return SseLine::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(chunk) = serde_json::from_str::<serde_json::Value>(data) else {
        trace!("Skipping unparseable SSE data: {data}");
        return SseLine::Skip;
    };

    if let Some(error) = chunk.get("error") {
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return SseLine::Error(message);
    }

    match chunk["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => SseLine::Fragment(content.to_string()),
        _ => SseLine::Skip,
    }
}

/// Find the next newline in the buffer, returning the position after it.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::io;

    fn chunked(parts: Vec<String>) -> impl Stream<Item = Result<Bytes, io::Error>> + Send {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    fn collect(stream: FragmentStream) -> Vec<Result<String, String>> {
        tokio_test::block_on(
            stream
                .map(|item| item.map_err(|e| e.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices":[{"index":0,"delta":{"content":content}}]})
        )
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line(""), SseLine::Skip);
        assert_eq!(classify_line(": keep-alive"), SseLine::Skip);
        assert_eq!(classify_line("event: message"), SseLine::Skip);
        assert_eq!(classify_line("data: [DONE]"), SseLine::Done);
        assert_eq!(classify_line("data: not json"), SseLine::Skip);
        assert_eq!(
            classify_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
        assert_eq!(
            classify_line(r#"data:{"choices":[{"delta":{"content":"hi"}}]}"#),
            SseLine::Fragment("hi".to_string())
        );
        assert_eq!(
            classify_line(r#"data: {"error":{"message":"context overflow"}}"#),
            SseLine::Error("context overflow".to_string())
        );
    }

    #[test]
    fn test_fragments_in_order_until_done() {
        let body = format!(
            "{}{}{}data: [DONE]\n\n{}",
            delta("HTTP/1.1 200 OK\r\n"),
            delta("\r\n"),
            delta("<h1>hi</h1>"),
            delta("after done is ignored"),
        );
        let items = collect(sse_fragments(chunked(vec![body])));
        assert_eq!(
            items,
            vec![
                Ok("HTTP/1.1 200 OK\r\n".to_string()),
                Ok("\r\n".to_string()),
                Ok("<h1>hi</h1>".to_string()),
            ]
        );
    }

    #[test]
    fn test_lines_split_across_chunks() {
        // Split inside the JSON and inside a multi-byte character.
        let line = delta("héllo");
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1;
        let first = Bytes::copy_from_slice(&bytes[..split]);
        let second = Bytes::copy_from_slice(&bytes[split..]);

        let upstream = stream::iter(vec![Ok::<_, io::Error>(first), Ok(second)]);
        let items = collect(sse_fragments(upstream));
        assert_eq!(items, vec![Ok("héllo".to_string())]);
    }

    #[test]
    fn test_trailing_line_without_newline_is_flushed() {
        let items = collect(sse_fragments(chunked(vec![
            r#"data: {"choices":[{"delta":{"content":"tail"}}]}"#.to_string(),
        ])));
        assert_eq!(items, vec![Ok("tail".to_string())]);
    }

    #[test]
    fn test_upstream_error_ends_stream() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from(delta("partial"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")),
            Ok(Bytes::from(delta("never"))),
        ]);

        let items = collect(sse_fragments(upstream));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("partial".to_string()));
        assert!(items[1].as_ref().unwrap_err().contains("reset by peer"));
    }

    #[test]
    fn test_in_band_error_ends_stream() {
        let body = format!(
            "{}data: {{\"error\":{{\"message\":\"boom\"}}}}\n\n{}",
            delta("a"),
            delta("b")
        );
        let upstream = stream::iter(vec![Ok::<_, io::Error>(Bytes::from(body))]);

        let items = collect(sse_fragments(upstream));
        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().unwrap_err().contains("boom"));
    }
}
