//! Core of vibeserver: turning HTTP requests into prompts and completions
//! back into HTTP responses.
//!
//! This crate holds no transport and no backend client. The model is reached
//! through the [`ports::CompletionPort`] trait; everything else here is pure
//! translation logic plus the override-fragment reader.

pub mod interpreter;
pub mod override_source;
pub mod ports;
pub mod prompt;
pub mod request;
pub mod response;

pub use interpreter::{parse_completion, split_completion, strip_reasoning};
pub use override_source::{FileOverride, NoOverride, OverrideSource, StaticOverride};
pub use ports::{CompletionError, CompletionPort, FragmentStream, collect_completion};
pub use prompt::{PromptConfig, build_prompt, compose_prompt, serialize_request};
pub use request::{HeaderList, InboundRequest, Method, UnsupportedMethod};
pub use response::{OutboundResponse, PRIORITY_HEADERS, SERVER_BANNER};
