//! Tool call supports.

mod error;
mod executor;
mod object;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;
pub(crate) use object::{AnyTool, ToolObject};
pub(crate) use registry::Registry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. Whatever context a
/// tool needs should be set during initialization and copied into the
/// future returned by [`Tool::execute`].
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    ///
    /// The arguments object of a tool call request is deserialized into
    /// this type, failures are reported as [`ErrorKind::InvalidInput`].
    type Input: DeserializeOwned;

    /// Returns the name of the tool, which must be unique in an agent.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the JSON schema of the input.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
