mod builder;

use std::sync::Arc;

use loopgraph_model::Message;
use tracing::Instrument;

use crate::conversation::Conversation;
use crate::decision::{Decision, decide};
use crate::error::Error;
use crate::model_client::ModelClient;
use crate::tool::Executor as ToolExecutor;
pub use builder::{AgentBuilder, DEFAULT_MAX_MODEL_CALLS};

type MessageObserver = Arc<dyn Fn(&Message) + Send + Sync>;

/// The control flow an agent follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphShape {
    /// Call the model once and stop.
    Direct,
    /// Call the model, run the requested tools and call the model again,
    /// until it answers without requesting any tool.
    ToolLoop,
}

/// An agent that drives conversations between a model and a set of tools.
///
/// The agent holds no per-run state, each call to [`Agent::run`] works
/// on its own conversation. Cloning an agent is cheap.
#[derive(Clone)]
pub struct Agent {
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    max_model_calls: Option<usize>,
    on_message: Option<MessageObserver>,
}

impl Agent {
    /// Returns the graph shape this agent runs, which is
    /// [`GraphShape::Direct`] when no tools are registered.
    #[inline]
    pub fn shape(&self) -> GraphShape {
        if self.tool_executor.has_tools() {
            GraphShape::ToolLoop
        } else {
            GraphShape::Direct
        }
    }

    /// Runs the agent on the given messages until the model produces a
    /// final answer.
    ///
    /// Returns the whole conversation: `initial` unchanged, followed by
    /// the messages produced by the model and the tools. To instruct the
    /// model, start `initial` with a [`Message::System`]. Nothing is
    /// returned when the run fails, the messages produced so far are only
    /// seen by the observer set with [`AgentBuilder::on_message`].
    pub async fn run(
        &self,
        initial: Vec<Message>,
    ) -> Result<Vec<Message>, Error> {
        let mut conversation = Conversation::new(initial);
        let shape = self.shape();
        let span = info_span!("agent run", ?shape);
        async {
            match shape {
                GraphShape::Direct => self.run_direct(&mut conversation).await,
                GraphShape::ToolLoop => {
                    self.run_tool_loop(&mut conversation).await
                }
            }
        }
        .instrument(span)
        .await?;
        Ok(conversation.into_messages())
    }

    async fn run_direct(
        &self,
        conversation: &mut Conversation,
    ) -> Result<(), Error> {
        let msg = self.model_client.invoke(conversation.messages(), &[]).await?;
        self.append(conversation, msg);
        Ok(())
    }

    async fn run_tool_loop(
        &self,
        conversation: &mut Conversation,
    ) -> Result<(), Error> {
        let tools = self.tool_executor.definitions();
        let mut model_calls = 0;
        loop {
            model_calls += 1;

            let msg = self
                .model_client
                .invoke(conversation.messages(), &tools)
                .await?;
            self.append(conversation, msg);

            if decide(conversation.last()) == Decision::Stop {
                debug!("done after {model_calls} model calls");
                return Ok(());
            }
            // The last permitted call may not start another round of tools.
            if let Some(limit) = self.max_model_calls {
                if model_calls >= limit {
                    warn!("giving up after {limit} model calls");
                    return Err(Error::ModelCallLimit(limit));
                }
            }
            let requests = conversation
                .last()
                .map(|msg| msg.pending_tool_calls().to_vec())
                .unwrap_or_default();
            let results = self.tool_executor.execute(&requests).await?;
            for result in results {
                self.append(conversation, result);
            }
        }
    }

    fn append(&self, conversation: &mut Conversation, msg: Message) {
        trace!("appending a {} message", msg.role());
        if let Some(on_message) = &self.on_message {
            on_message(&msg);
        }
        conversation.push(msg);
    }
}
