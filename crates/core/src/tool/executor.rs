use std::sync::Arc;

use futures_util::future::join_all;
use loopgraph_model::{Message, ModelTool, ToolCallRequest, ToolCallResult};
use tracing::Instrument;

use super::{Registry, ToolObject, ToolResult};
use crate::Error;

/// An executor that handles tool call requests from the model.
#[derive(Clone)]
pub struct Executor {
    registry: Arc<Registry>,
    concurrent: bool,
}

impl Executor {
    #[inline]
    pub fn new(registry: Registry, concurrent: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            concurrent,
        }
    }

    #[inline]
    pub fn has_tools(&self) -> bool {
        !self.registry.is_empty()
    }

    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.registry.definitions()
    }

    /// Runs the requested tools and returns one tool message per request,
    /// in request order.
    ///
    /// Every requested name is resolved before anything runs, so an
    /// unknown tool fails the whole batch without side effects. Tool
    /// failures don't fail the batch, they become error results.
    pub async fn execute(
        &self,
        requests: &[ToolCallRequest],
    ) -> Result<Vec<Message>, Error> {
        let tools = requests
            .iter()
            .map(|req| {
                self.registry.get(req.name()).ok_or_else(|| {
                    warn!("tool not found: {}", req.name());
                    Error::UnknownTool {
                        id: req.id().to_owned(),
                        name: req.name().to_owned(),
                    }
                })
            })
            .collect::<Result<Vec<&Arc<dyn ToolObject>>, _>>()?;

        let span = debug_span!(
            "tool executor",
            count = requests.len(),
            concurrent = self.concurrent
        );
        let results = async {
            let futs = requests.iter().zip(tools).map(|(req, tool)| {
                trace!("running tool {} ({})", req.name(), req.id());
                tool.execute(req.arguments().clone())
            });
            if self.concurrent {
                join_all(futs).await
            } else {
                let mut results = Vec::with_capacity(requests.len());
                for fut in futs {
                    results.push(fut.await);
                }
                results
            }
        }
        .instrument(span)
        .await;

        Ok(requests
            .iter()
            .zip(results)
            .map(|(req, result)| Message::Tool(make_result(req, result)))
            .collect())
    }
}

fn make_result(req: &ToolCallRequest, result: ToolResult) -> ToolCallResult {
    match result {
        Ok(content) => ToolCallResult::success(req.id(), content),
        Err(err) => {
            debug!("tool call {} failed: {err}", req.id());
            ToolCallResult::error(req.id(), format!("Error: {err}"))
        }
    }
}
