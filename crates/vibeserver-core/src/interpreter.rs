//! Response interpreter: completion text -> [`OutboundResponse`].
//!
//! The model is asked to speak raw HTTP but frequently doesn't quite manage
//! it. Everything in here is best-effort and total: any input string yields
//! a well-formed response.
//!
//! Policy, in order:
//!
//! 1. Remove `<think>…</think>` blocks and trim.
//! 2. Split at the first `\r\n\r\n`, else the first `\n\n`. Without either,
//!    the whole text is the body and there are no model headers.
//! 3. The second whitespace token of the first header-block line is the
//!    status code; anything unusable becomes 200.
//! 4. `Connection`, `Content-Length` and `Server` are always ours.
//! 5. Remaining `Name: value` lines are copied through, minus framing
//!    headers we own.
//! 6. A missing `Content-Type` defaults to HTML.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::response::{OutboundResponse, is_priority_header};

/// Status used when the completion has no usable status code.
pub const DEFAULT_STATUS: u16 = 200;

/// Content type added when the model did not provide one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Message-framing headers the gateway owns besides the priority headers.
const FRAMING_HEADERS: &[&str] = &["transfer-encoding", "keep-alive"];

static THINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("reasoning block pattern is valid")
});

/// Remove every `<think>…</think>` block (non-greedy, across newlines) and
/// trim surrounding whitespace.
pub fn strip_reasoning(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Split a completion into `(header_block, body_block)`.
///
/// Falls back to `("", text)` when no blank-line separator exists.
pub fn split_completion(text: &str) -> (&str, &str) {
    text.split_once("\r\n\r\n")
        .or_else(|| text.split_once("\n\n"))
        .unwrap_or(("", text))
}

/// Status code from the first line of the header block.
pub fn parse_status(header_block: &str) -> u16 {
    header_block
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|token| token.parse::<u16>().ok())
        .filter(|code| (100..=599).contains(code))
        .unwrap_or(DEFAULT_STATUS)
}

/// Extract `(name, value)` pairs from a header block.
///
/// Lines without a colon, lines starting with `HTTP/`, and lines with an
/// empty name are skipped.
pub fn header_lines(header_block: &str) -> impl Iterator<Item = (&str, &str)> {
    header_block.lines().filter_map(|line| {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            return None;
        }
        let (name, value) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name, value.trim()))
    })
}

fn is_gateway_owned(name: &str) -> bool {
    is_priority_header(name)
        || FRAMING_HEADERS
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
}

/// Interpret a raw completion as an HTTP response. Never fails.
pub fn parse_completion(raw: &str) -> OutboundResponse {
    let cleaned = strip_reasoning(raw);
    let (header_block, body_block) = split_completion(&cleaned);

    let status = parse_status(header_block);
    let mut response = OutboundResponse::with_body(status, body_block.as_bytes().to_vec());

    let mut dropped = 0usize;
    for (name, value) in header_lines(header_block) {
        if is_gateway_owned(name) {
            dropped += 1;
            continue;
        }
        response.push_header(name, value);
    }

    if !response.has_header("Content-Type") {
        response.push_header("Content-Type", DEFAULT_CONTENT_TYPE);
    }

    debug!(
        status,
        headers = response.headers.len(),
        dropped,
        body_bytes = response.body.len(),
        "Interpreted completion"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_values<'a>(response: &'a OutboundResponse, name: &str) -> Vec<&'a str> {
        response
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_well_formed_completion() {
        let response = parse_completion(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html>hi</html>",
        );

        assert_eq!(response.status, 200);
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.header("Connection"), Some("close"));
        assert_eq!(response.header("Content-Length"), Some("15"));
        assert_eq!(response.body, b"<html>hi</html>");
    }

    #[test]
    fn test_think_block_removed_before_parsing() {
        let response = parse_completion("<think>reasoning</think>200 OK\n\nbody text");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"body text");
    }

    #[test]
    fn test_no_separator_is_all_body() {
        let response = parse_completion("just some text");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"just some text");
        assert_eq!(response.header("Content-Type"), Some(DEFAULT_CONTENT_TYPE));
        assert_eq!(response.headers.len(), 4);
    }

    #[test]
    fn test_empty_completion() {
        let response = parse_completion("");
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
        assert_eq!(response.header("Content-Length"), Some("0"));
    }

    #[test]
    fn test_only_first_separator_splits() {
        let response =
            parse_completion("HTTP/1.1 201 Created\n\nfirst paragraph\n\nsecond paragraph");
        assert_eq!(response.status, 201);
        assert_eq!(response.body, b"first paragraph\n\nsecond paragraph");
    }

    #[test]
    fn test_crlf_separator_wins_over_bare_newlines() {
        let (head, body) = split_completion("HTTP/1.1 200 OK\nX-A: 1\n\nmid\r\n\r\nend");
        assert_eq!(head, "HTTP/1.1 200 OK\nX-A: 1\n\nmid");
        assert_eq!(body, "end");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(parse_status("HTTP/1.1 404 Not Found"), 404);
        assert_eq!(parse_status("HTTP/1.1 302"), 302);
        assert_eq!(parse_status("HTTP/1.1 OK"), 200);
        assert_eq!(parse_status("HTTP/1.1"), 200);
        assert_eq!(parse_status(""), 200);
        assert_eq!(parse_status("HTTP/1.1 999 Nope"), 200);
        assert_eq!(parse_status("HTTP/1.1 42 Small"), 200);
        assert_eq!(parse_status("HTTP/1.1 -1 Negative"), 200);
    }

    #[test]
    fn test_model_framing_headers_are_overridden() {
        let response = parse_completion(
            "HTTP/1.1 200 OK\r\n\
             Content-Length: 99999\r\n\
             connection: keep-alive\r\n\
             Transfer-Encoding: chunked\r\n\
             Server: nginx\r\n\
             Content-Type: application/json\r\n\r\n\
             {\"ok\":true}",
        );

        assert_eq!(header_values(&response, "Content-Length"), vec!["11"]);
        assert_eq!(header_values(&response, "Connection"), vec!["close"]);
        assert!(header_values(&response, "Transfer-Encoding").is_empty());
        assert_eq!(header_values(&response, "Server").len(), 1);
        assert_ne!(response.header("Server"), Some("nginx"));
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_priority_headers_come_first() {
        let response =
            parse_completion("HTTP/1.1 200 OK\nX-First: a\nContent-Type: text/plain\n\nbody");
        let names: Vec<&str> = response.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["Connection", "Content-Length", "Server", "X-First", "Content-Type"]
        );
    }

    #[test]
    fn test_malformed_header_lines_are_skipped() {
        let response = parse_completion(
            "HTTP/1.1 200 OK\nthis line has no colon\n: empty name\nX-Ok:  spaced value  \nLocation: http://example.com/a:b\n\nbody",
        );
        assert_eq!(response.header("X-Ok"), Some("spaced value"));
        assert_eq!(response.header("Location"), Some("http://example.com/a:b"));
        assert!(!response.headers.iter().any(|(n, _)| n.is_empty()));
    }

    #[test]
    fn test_status_line_is_not_a_header() {
        let response = parse_completion("HTTP/1.1 200 OK: fine\n\nbody");
        assert!(!response.headers.iter().any(|(n, _)| n.starts_with("HTTP/")));
    }

    #[test]
    fn test_strip_reasoning_multiline_and_multiple_blocks() {
        let text = "  <think>line one\nline two</think>HTTP/1.1 200 OK\n<think>again</think>\n\nbody  ";
        assert_eq!(strip_reasoning(text), "HTTP/1.1 200 OK\n\n\nbody");
    }

    #[test]
    fn test_strip_reasoning_is_non_greedy() {
        assert_eq!(
            strip_reasoning("<think>a</think>keep<think>b</think>"),
            "keep"
        );
    }

    #[test]
    fn test_strip_reasoning_idempotent() {
        let inputs = [
            "",
            "plain",
            "<think>x</think>",
            "<think>unterminated",
            "a <think>b</think> c <think>d\ne</think> f",
            "<think><think>nested</think></think>",
            "  padded  ",
        ];
        for input in inputs {
            let once = strip_reasoning(input);
            assert_eq!(strip_reasoning(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_parse_is_total_on_odd_inputs() {
        let inputs = [
            "\n\n",
            "\r\n\r\n",
            ":",
            "HTTP/1.1",
            "<think>",
            "</think>",
            "\u{0}\u{1}\u{2}",
            "HTTP/1.1 200 OK\r\n\r\n\r\n\r\n",
            "ünïcödé: välüe\n\nbödy",
        ];
        for input in inputs {
            let response = parse_completion(input);
            assert!((100..=599).contains(&response.status));
            assert_eq!(
                response.header("Content-Length"),
                Some(response.body.len().to_string().as_str())
            );
        }
    }
}
