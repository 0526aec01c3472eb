//! Core logic: the conversation state, tool execution, the model invoker
//! and the control flow that ties them together.
//!
//! An [`Agent`] runs one of two fixed graph shapes (see [`GraphShape`]).
//! Every call to [`Agent::run`] starts from a fresh conversation, so one
//! agent can serve any number of runs, concurrently if needed.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod decision;
mod error;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, DEFAULT_MAX_MODEL_CALLS, GraphShape};
pub use decision::{Decision, decide};
pub use error::Error;
pub use model_client::ModelError;

pub use loopgraph_model::{
    AssistantMessage, Message, ToolCallRequest, ToolCallResult, ToolStatus,
};
