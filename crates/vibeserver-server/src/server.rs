//! Accept loop.
//!
//! This module provides the `serve()` function that runs the gateway on a
//! pre-bound `TcpListener` until the cancellation token fires.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RequestError;
use crate::pipeline::{Gateway, error_response};
use crate::transport::{ReadLimits, read_request, write_response};

/// Run the gateway until `cancel` is triggered.
///
/// Each connection is served on its own task. In-flight tasks are not
/// awaited on shutdown.
pub async fn serve(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    limits: ReadLimits,
    cancel: CancellationToken,
) -> io::Result<()> {
    let addr = listener.local_addr()?;
    info!("vibeserver listening on http://{addr}");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let gateway = Arc::clone(&gateway);
                    tokio::spawn(async move {
                        handle_connection(stream, peer, &gateway, limits).await;
                    });
                }
                Err(e) => warn!("Failed to accept connection: {e}"),
            },
        }
    }

    info!("vibeserver shut down");
    Ok(())
}

/// Serve exactly one request on `stream`, then close it.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    gateway: &Gateway,
    limits: ReadLimits,
) {
    let read = {
        let mut reader = BufReader::new(&mut stream);
        read_request(&mut reader, limits).await
    };

    let response = match read {
        Ok(request) => {
            debug!(%peer, method = %request.method, path = %request.path, "Request received");
            match gateway.respond(request, &stream).await {
                Some(response) => response,
                None => return,
            }
        }
        Err(RequestError::ConnectionClosed) => {
            debug!(%peer, "Connection closed without a request");
            return;
        }
        Err(e) => {
            error!(%peer, "Error processing request: {e}");
            error_response(&e)
        }
    };

    if let Err(e) = write_response(&mut stream, &response).await {
        debug!(%peer, "Failed to write response: {e}");
    }
}
