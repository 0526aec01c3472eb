//! A local scripted model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use loopgraph_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    // Script errors are reported while streaming, like a connection that
    // breaks after the request was accepted.
    script_error: Option<Error>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        let delay = this.delay;
        let timer = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(timer.as_mut().poll(cx));
        this.sleep = None;

        if let Some(err) = this.script_error.take() {
            // Make sure the response completes after the error.
            this.event_idx = this.events.len() + 1;
            return Poll::Ready(Err(err));
        }

        let event = match this.events.get(this.event_idx) {
            Some(PresetEvent::MessageDelta(msg)) => {
                ModelResponseEvent::MessageDelta(msg.clone())
            }
            Some(PresetEvent::ToolCall(req)) => {
                ModelResponseEvent::ToolCall(req.clone())
            }
            None if this.event_idx == this.events.len() => {
                let has_tool_call = this
                    .events
                    .iter()
                    .any(|event| matches!(event, PresetEvent::ToolCall(_)));
                ModelResponseEvent::Completed(if has_tool_call {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                })
            }
            // In case this method is called after completion.
            None => return Poll::Ready(Ok(None)),
        };
        this.event_idx += 1;
        Poll::Ready(Ok(Some(event)))
    }
}

#[derive(Clone)]
enum ConversationStep {
    Input,
    AssistantResponse(PresetResponse),
}

/// A local scripted model for testing purpose.
///
/// Before sending requests, you need to set up the conversation script,
/// which is how the model should respond to a request. A step is selected
/// by the number of history messages in the request: a request carrying
/// `n` messages is answered by the step at index `n`. Steps taken by
/// messages the model doesn't produce (user inputs, tool results) are
/// marked with [`TestModelProvider::add_input_step`].
///
/// Since the answer only depends on the request, replaying the same
/// conversation yields the same responses. If there are not enough steps
/// in the script, or the selected step is an input step, the response
/// fails while streaming.
///
/// Every request is recorded and can be inspected with
/// [`TestModelProvider::recorded_requests`]; clones share the record.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    recorded_requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl TestModelProvider {
    /// Marks the next step as a message the model doesn't produce.
    #[inline]
    pub fn add_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::Input);
    }

    /// Marks the next `count` steps as inputs.
    #[inline]
    pub fn add_input_steps(&mut self, count: usize) {
        for _ in 0..count {
            self.add_input_step();
        }
    }

    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    /// Sets the delay before each event, defaults to 1ms.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests sent to this provider (and its clones) so far.
    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.recorded_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn make_response(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, Error> {
        let step_idx = req.messages.len();
        let mut resp = TestModelResponse {
            events: vec![],
            script_error: None,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        };
        match self.conversation_script.get(step_idx) {
            Some(ConversationStep::AssistantResponse(preset)) => {
                if let Some(kind) = preset.failure {
                    return Err(Error {
                        message: "preset failure",
                        kind,
                    });
                }
                resp.events = preset.events.clone();
            }
            Some(ConversationStep::Input) => {
                resp.script_error = Some(Error {
                    message: "not an assistant response step",
                    kind: ErrorKind::Other,
                });
            }
            None => {
                resp.script_error = Some(Error {
                    message: "no enough steps",
                    kind: ErrorKind::Other,
                });
            }
        }
        Ok(resp)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        if let Ok(mut requests) = self.recorded_requests.lock() {
            requests.push(req.clone());
        }
        ready(self.make_response(req))
    }
}
