use thiserror::Error;

use crate::model_client::ModelError;

/// The error type of [`Agent::run`](crate::Agent::run).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The model provider failed, the provider error is kept as is.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model requested a tool that is not registered.
    #[error("unknown tool `{name}` requested by tool call `{id}`")]
    UnknownTool {
        /// The id of the offending tool call request.
        id: String,
        /// The requested tool name.
        name: String,
    },

    /// The model kept requesting tools past the configured bound.
    #[error("no final answer after {0} model calls")]
    ModelCallLimit(usize),
}
