//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the core expects from infrastructure. They
//! contain no implementation details and use only domain types.

pub mod completion;

pub use completion::{CompletionError, CompletionPort, FragmentStream, collect_completion};
