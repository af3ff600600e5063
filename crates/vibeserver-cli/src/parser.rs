//! Command-line arguments.
//!
//! Every option can also come from the environment (or a `.env` file).

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use vibeserver_backend::BackendConfig;
use vibeserver_backend::config::DEFAULT_BASE_URL;
use vibeserver_core::PromptConfig;
use vibeserver_server::ServerConfig;
use vibeserver_server::config::{DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};

/// Model served when none is configured.
pub const DEFAULT_MODEL: &str = "gemma-3-12b-it";

/// An HTTP server whose every response is written by a language model.
#[derive(Debug, Parser)]
#[command(name = "vibeserver")]
#[command(version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "VIBESERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "VIBESERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Model identifier on the backend
    #[arg(long, env = "VIBESERVER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Root URL of the OpenAI-compatible backend
    #[arg(long = "backend-url", env = "VIBESERVER_BACKEND_URL", default_value = DEFAULT_BASE_URL)]
    pub backend_url: String,

    /// Bearer token for the backend
    #[arg(long = "api-key", env = "VIBESERVER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Let generated pages reference images
    #[arg(
        long,
        env = "VIBESERVER_IMAGES",
        default_value_t = true,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    pub images: bool,

    /// Same as `--images false`
    #[arg(long = "no-images")]
    pub no_images: bool,

    /// Drop inbound headers with this name prefix before prompting (repeatable)
    #[arg(
        long = "strip-header-prefix",
        env = "VIBESERVER_STRIP_HEADER_PREFIXES",
        value_delimiter = ',',
        value_name = "PREFIX"
    )]
    pub strip_header_prefixes: Vec<String>,

    /// Extra prompt instructions, re-read on every request
    #[arg(
        long = "override-file",
        env = "VIBESERVER_OVERRIDE_FILE",
        default_value = "prompt_override.txt"
    )]
    pub override_file: PathBuf,

    /// Sampling temperature (backend default when unset)
    #[arg(long, env = "VIBESERVER_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Completion length cap (backend default when unset)
    #[arg(long = "max-tokens", env = "VIBESERVER_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    /// Largest request body accepted, in bytes
    #[arg(long = "max-body-bytes", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Print completions to stdout as they stream in
    #[arg(long, env = "VIBESERVER_ECHO")]
    pub echo: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub const fn images_enabled(&self) -> bool {
        self.images && !self.no_images
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new()
            .with_base_url(self.backend_url.as_str())
            .with_api_key(self.api_key.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new()
            .with_host(self.host.as_str())
            .with_port(self.port)
            .with_max_body_bytes(self.max_body_bytes)
    }

    pub fn prompt_config(&self) -> PromptConfig {
        PromptConfig::new().with_images(self.images_enabled())
    }

    /// Configured prefixes, blanks removed.
    pub fn header_prefixes(&self) -> Vec<String> {
        self.strip_header_prefixes
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }
}
