//! CLI entry point - the composition root.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vibeserver_cli::{Cli, build_gateway, connect_session, describe_startup_failure, init_tracing};
use vibeserver_server::serve;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // The model must be usable before the socket is bound
    let session = match connect_session(&cli).await {
        Ok(session) => session,
        Err(e) => {
            eprint!("{}", describe_startup_failure(&e));
            return Err(e.into());
        }
    };

    let server_config = cli.server_config();
    let listener = TcpListener::bind(server_config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", server_config.bind_address()))?;

    let gateway = Arc::new(build_gateway(&cli, Arc::new(session)));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    serve(listener, gateway, server_config.limits(), cancel).await?;
    Ok(())
}
