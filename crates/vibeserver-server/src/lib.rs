//! HTTP front end of vibeserver.
//!
//! Connections are handled one request at a time over plain `tokio::net`
//! sockets: read the head and body, run the [`Gateway`] pipeline, write the
//! response, close. There is no keep-alive and no routing.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod transport;

pub use config::ServerConfig;
pub use error::RequestError;
pub use pipeline::{Gateway, error_response};
pub use server::{handle_connection, serve};
pub use transport::{Liveness, PeerProbe, ReadLimits, read_request, write_response};
