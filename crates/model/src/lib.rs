//! The provider-neutral protocol between the agent and language models.
//!
//! This crate defines the message types that make up a conversation and
//! the traits a model provider implements. Any model provider, whether it
//! talks to a remote completion service or replays a script in tests,
//! speaks in these types, so the agent never depends on a concrete wire
//! protocol.
//!
//! Types in this crate don't define any behavior beyond construction-time
//! validation. They are the constraints that the implementors should
//! adhere to.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
