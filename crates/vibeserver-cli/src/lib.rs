//! vibeserver command-line front end.

pub mod bootstrap;
pub mod parser;

pub use bootstrap::{build_gateway, connect_session, describe_startup_failure, init_tracing};
pub use parser::Cli;
