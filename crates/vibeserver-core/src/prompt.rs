//! Request translator: inbound request -> transcript -> instruction prompt.

use crate::override_source::OverrideSource;
use crate::request::InboundRequest;

/// Instructions shared by every prompt.
pub const BASE_INSTRUCTIONS: &str = "\
You are an HTTP server responding to requests. Output ONLY a valid HTTP response \
with a status line, headers and body. No explanations, no commentary, just the raw \
HTTP response. NO MARKDOWN. You are speaking the WIRE protocol. Do not send a \
Content-Length header; it will be computed for you. Never wrap your output in ``` \
fences.

For API paths (like /api/, /users, /login, etc.), respond with JSON and a matching \
Content-Type.
For regular paths, respond with complete HTML pages.
Make the content plausible and nice based on the request.";

/// Guidance that keeps generated sites navigable.
pub const HTML_GUIDANCE: &str = "\
When you produce HTML, make it a coherent page of a real-looking website: include \
a header with site navigation, use relative links to other plausible pages on the \
same site (they will be generated on demand when followed), and keep inline CSS \
small. Forms should submit to plausible paths on this server.";

/// Image policy when images are allowed.
pub const IMAGES_ENABLED_GUIDANCE: &str = "\
You may include images. Reference them with <img> tags pointing at paths on this \
server with a descriptive file name (for example /images/red-bicycle.png). When a \
request asks for an image path, answer with an SVG document and \
Content-Type: image/svg+xml.";

/// Image policy when images are disabled.
pub const IMAGES_DISABLED_GUIDANCE: &str = "\
Do not include any images: no <img> tags, no CSS background images, no inline SVG \
and no data: URIs. Use text, color and layout instead.";

/// Line that separates instructions from the request transcript.
pub const REQUEST_SEPARATOR: &str = "--- REQUEST ---";

/// Cue that invites the completion.
pub const RESPONSE_CUE: &str = "Your response is: ";

/// Prompt sections fixed at process start.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub base_instructions: String,
    pub html_guidance: String,
    pub images_enabled_guidance: String,
    pub images_disabled_guidance: String,
    /// Selects which image section is used.
    pub images_enabled: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            base_instructions: BASE_INSTRUCTIONS.to_string(),
            html_guidance: HTML_GUIDANCE.to_string(),
            images_enabled_guidance: IMAGES_ENABLED_GUIDANCE.to_string(),
            images_disabled_guidance: IMAGES_DISABLED_GUIDANCE.to_string(),
            images_enabled: true,
        }
    }
}

impl PromptConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_images(mut self, enabled: bool) -> Self {
        self.images_enabled = enabled;
        self
    }

    fn image_guidance(&self) -> &str {
        if self.images_enabled {
            &self.images_enabled_guidance
        } else {
            &self.images_disabled_guidance
        }
    }
}

/// Render a request as an HTTP/1.1 wire-format transcript.
///
/// The body is decoded as lossy UTF-8; the transcript is only ever shown to
/// the model, never parsed back.
pub fn serialize_request(request: &InboundRequest) -> String {
    let mut out = format!("{} {} HTTP/1.1\r\n", request.method, request.path);
    for (name, value) in request.headers.iter() {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    if !request.body.is_empty() {
        out.push_str(&String::from_utf8_lossy(&request.body));
    }
    out
}

/// Assemble the full prompt around `transcript`.
///
/// The override fragment is loaded from `overrides` on every call.
pub async fn build_prompt(
    transcript: &str,
    config: &PromptConfig,
    overrides: &dyn OverrideSource,
) -> String {
    let custom = overrides.load().await;
    compose_prompt(transcript, config, custom.as_deref())
}

/// Pure assembly step behind [`build_prompt`].
pub fn compose_prompt(transcript: &str, config: &PromptConfig, custom: Option<&str>) -> String {
    let mut sections = vec![
        config.base_instructions.as_str(),
        config.html_guidance.as_str(),
        config.image_guidance(),
    ];
    if let Some(custom) = custom {
        sections.push(custom);
    }

    let mut prompt = sections.join("\n\n");
    prompt.push_str("\n\nHTTP request starts after the separator:\n");
    prompt.push_str(REQUEST_SEPARATOR);
    prompt.push('\n');
    prompt.push_str(transcript);
    prompt.push_str("\n\n");
    prompt.push_str(RESPONSE_CUE);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::override_source::StaticOverride;
    use crate::request::Method;

    #[test]
    fn test_serialize_get_without_body() {
        let request = InboundRequest::new(Method::Get, "/").with_header("Host", "example.com");
        assert_eq!(
            serialize_request(&request),
            "GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"
        );
    }

    #[test]
    fn test_serialize_preserves_header_order_and_body() {
        let request = InboundRequest::new(Method::Post, "/api/users?page=2")
            .with_header("Host", "localhost:3000")
            .with_header("Content-Type", "application/json")
            .with_header("X-Trace", "abc")
            .with_body(br#"{"name":"ada"}"#.to_vec());

        let transcript = serialize_request(&request);
        assert!(transcript.starts_with("POST /api/users?page=2 HTTP/1.1\r\n"));

        let header_lines: Vec<&str> = transcript
            .split("\r\n")
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(
            header_lines,
            vec![
                "Host: localhost:3000",
                "Content-Type: application/json",
                "X-Trace: abc"
            ]
        );
        assert!(transcript.ends_with("\r\n\r\n{\"name\":\"ada\"}"));
    }

    #[test]
    fn test_serialize_non_utf8_body_is_lossy() {
        let request = InboundRequest::new(Method::Put, "/blob").with_body(vec![b'a', 0xff, b'b']);
        assert!(serialize_request(&request).ends_with("a\u{fffd}b"));
    }

    #[test]
    fn test_sections_appear_in_fixed_order() {
        let config = PromptConfig::new();
        let prompt = compose_prompt("GET / HTTP/1.1\r\n\r\n", &config, Some("CUSTOM RULES"));

        let base = prompt.find(BASE_INSTRUCTIONS).unwrap();
        let html = prompt.find(HTML_GUIDANCE).unwrap();
        let images = prompt.find(IMAGES_ENABLED_GUIDANCE).unwrap();
        let custom = prompt.find("CUSTOM RULES").unwrap();
        let separator = prompt.find(REQUEST_SEPARATOR).unwrap();
        let transcript = prompt.find("GET / HTTP/1.1").unwrap();

        assert!(base < html && html < images && images < custom);
        assert!(custom < separator && separator < transcript);
        assert!(prompt.ends_with(RESPONSE_CUE));
    }

    #[test]
    fn test_exactly_one_image_section() {
        let enabled = compose_prompt("t", &PromptConfig::new().with_images(true), None);
        assert!(enabled.contains(IMAGES_ENABLED_GUIDANCE));
        assert!(!enabled.contains(IMAGES_DISABLED_GUIDANCE));

        let disabled = compose_prompt("t", &PromptConfig::new().with_images(false), None);
        assert!(disabled.contains(IMAGES_DISABLED_GUIDANCE));
        assert!(!disabled.contains(IMAGES_ENABLED_GUIDANCE));
    }

    #[tokio::test]
    async fn test_build_prompt_is_deterministic() {
        let config = PromptConfig::new();
        let overrides = StaticOverride(Some("Be terse.".to_string()));

        let first = build_prompt("GET /x HTTP/1.1\r\n\r\n", &config, &overrides).await;
        let second = build_prompt("GET /x HTTP/1.1\r\n\r\n", &config, &overrides).await;
        assert_eq!(first, second);
        assert!(first.contains("Be terse."));
    }

    #[tokio::test]
    async fn test_build_prompt_without_override() {
        let config = PromptConfig::new();
        let prompt = build_prompt("t", &config, &StaticOverride(None)).await;
        assert_eq!(prompt, compose_prompt("t", &config, None));
    }
}
