//! Configuration for the completion backend client.

use std::time::Duration;

/// Default address of a locally running llama-server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Configuration for [`crate::ModelSession`].
///
/// Use the builder methods to customize.
///
/// # Example
///
/// ```
/// use vibeserver_backend::BackendConfig;
/// use std::time::Duration;
///
/// let config = BackendConfig::new()
///     .with_base_url("http://127.0.0.1:11434")
///     .with_connect_timeout(Duration::from_secs(2))
///     .with_temperature(Some(0.8));
/// assert_eq!(config.base_url(), "http://127.0.0.1:11434");
/// ```
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Root URL of the OpenAI-compatible server, without the `/v1` suffix
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Optional bearer token
    pub(crate) api_key: Option<String>,
    /// Timeout for establishing a TCP connection (all calls)
    pub(crate) connect_timeout: Duration,
    /// Timeout for non-streaming calls such as model listing
    pub(crate) request_timeout: Duration,
    /// Sampling temperature; backend default when `None`
    pub(crate) temperature: Option<f32>,
    /// Generation cap; backend default when `None`
    pub(crate) max_tokens: Option<u32>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("vibeserver/", env!("CARGO_PKG_VERSION")).to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl BackendConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server root URL. A trailing slash is ignored.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set an optional bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Defaults to 5 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Timeout for model listing. Completions are never timed out.
    ///
    /// Defaults to 30 seconds.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url)
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}
