use std::future::ready;

use loopgraph_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

/// Input of [`AddTool`].
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, JsonSchema)]
pub struct AddToolParameters {
    /// The first number.
    pub input1: f64,
    /// The second number.
    pub input2: f64,
}

/// A tool that adds two numbers.
pub struct AddTool {
    parameter_schema: Value,
}

impl AddTool {
    /// Creates a new add tool.
    #[inline]
    pub fn new() -> Self {
        AddTool {
            parameter_schema: schema_for!(AddToolParameters).to_value(),
        }
    }
}

impl Default for AddTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for AddTool {
    type Input = AddToolParameters;

    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Adds two numbers."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: AddToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let sum = input.input1 + input.input2;
        trace!("{} + {} = {sum}", input.input1, input.input2);
        ready(Ok(sum.to_string()))
    }
}
