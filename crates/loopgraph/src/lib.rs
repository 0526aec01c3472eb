//! A ready-made agent that answers with the help of an `add` tool.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library, starting from [`agent_builder`] and adding your own
//! tools before building the agent.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
pub mod tools;

use loopgraph_core::{AgentBuilder, GraphShape};
use loopgraph_openai_model::OpenAIProvider;

pub use config::{ConfigError, Settings};
use tools::AddTool;

/// Re-exports of [`loopgraph_core`] crate.
pub mod core {
    pub use loopgraph_core::*;
}

/// Creates an agent builder backed by the OpenAI-compatible provider
/// described by `settings`.
///
/// With [`GraphShape::ToolLoop`] the built-in tools are registered, with
/// [`GraphShape::Direct`] none are and the model is called once per run.
pub fn agent_builder(settings: &Settings, shape: GraphShape) -> AgentBuilder {
    let provider = OpenAIProvider::new(settings.openai_config());
    info!(
        "using model {} at {} ({shape:?})",
        settings.model(),
        settings.base_url()
    );
    let builder = AgentBuilder::with_model_provider(provider);
    match shape {
        GraphShape::Direct => builder,
        GraphShape::ToolLoop => builder.with_tool(AddTool::new()),
    }
}
