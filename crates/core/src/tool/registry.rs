use std::collections::BTreeMap;
use std::sync::Arc;

use loopgraph_model::ModelTool;

use super::{AnyTool, Tool, ToolObject};

/// The tools known to an agent, keyed by name.
///
/// Tools are only added while the agent is being built. Once built, the
/// registry is shared read-only by every run.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    tools: BTreeMap<String, Arc<dyn ToolObject>>,
}

impl Registry {
    /// Adds a tool, replacing a previous tool with the same name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self
            .tools
            .insert(name.clone(), Arc::new(AnyTool(tool)))
            .is_some()
        {
            warn!("tool `{name}` registered twice, keeping the last one");
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolObject>> {
        self.tools.get(name)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the declarations sent to the model, ordered by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }
}
