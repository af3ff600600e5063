//! Wiring: logging, the model session and the gateway.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use vibeserver_backend::{BackendError, ModelSession};
use vibeserver_core::{CompletionPort, FileOverride};
use vibeserver_server::Gateway;

use crate::parser::Cli;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set. Logs go to stderr so `--echo` output on stdout
/// stays clean.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "vibeserver=debug"
    } else {
        "vibeserver=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Establish the model session or explain why it can't be used.
pub async fn connect_session(cli: &Cli) -> Result<ModelSession, BackendError> {
    info!("Connecting to {} for model {}", cli.backend_url, cli.model);
    ModelSession::connect(cli.backend_config(), cli.model.as_str()).await
}

/// Operator-facing explanation of a startup failure.
pub fn describe_startup_failure(error: &BackendError) -> String {
    let mut out = String::new();
    match error {
        BackendError::ModelUnavailable {
            requested,
            available,
            reason,
        } => {
            let _ = writeln!(out, "Could not load model '{requested}': {reason}");
            if available.is_empty() {
                out.push_str("No alternative models were reported by the backend.\n");
            } else {
                out.push_str("Available models:\n");
                for id in available {
                    let _ = writeln!(out, "  - {id}");
                }
            }
        }
        other => {
            let _ = writeln!(out, "Could not start the model session: {other}");
        }
    }
    out
}

pub fn build_gateway(cli: &Cli, completion: Arc<dyn CompletionPort>) -> Gateway {
    Gateway::new(
        completion,
        cli.prompt_config(),
        Arc::new(FileOverride::new(&cli.override_file)),
    )
    .with_strip_header_prefixes(cli.header_prefixes())
    .with_echo(cli.echo)
}
