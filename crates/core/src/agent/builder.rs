use std::sync::Arc;

use loopgraph_model::{Message, ModelProvider};

use super::Agent;
use crate::model_client::ModelClient;
use crate::tool::{Executor as ToolExecutor, Registry as ToolRegistry, Tool};

/// The default bound on model calls in one run.
///
/// A graph step budget of 25 covers 13 model calls with 12 tool rounds in
/// between, which is where this comes from.
pub const DEFAULT_MAX_MODEL_CALLS: usize = 13;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: ToolRegistry,
    max_model_calls: Option<usize>,
    concurrent_tools: bool,
    on_message: Option<Arc<dyn Fn(&Message) + Send + Sync>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: Default::default(),
            max_model_calls: Some(DEFAULT_MAX_MODEL_CALLS),
            concurrent_tools: false,
            on_message: None,
        }
    }

    /// Registers a tool. Registering any tool makes the agent run the tool
    /// loop instead of a single model call.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.add_tool(tool);
        self
    }

    /// Bounds the number of model calls in one run, `None` removes the
    /// bound. A run whose last permitted model call still requests tools
    /// fails with [`Error::ModelCallLimit`] before running them.
    ///
    /// [`Error::ModelCallLimit`]: crate::Error::ModelCallLimit
    #[inline]
    pub fn with_max_model_calls(mut self, max: Option<usize>) -> Self {
        self.max_model_calls = max;
        self
    }

    /// Runs the tool calls of one model message concurrently. Results are
    /// still appended in request order.
    #[inline]
    pub fn with_concurrent_tools(mut self, concurrent: bool) -> Self {
        self.concurrent_tools = concurrent;
        self
    }

    /// Attaches a callback invoked with every message appended during a
    /// run.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Arc::new(on_message));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let Self {
            model_client,
            tools,
            max_model_calls,
            concurrent_tools,
            on_message,
        } = self;
        Agent {
            model_client,
            tool_executor: ToolExecutor::new(tools, concurrent_tools),
            max_model_calls,
            on_message,
        }
    }
}
