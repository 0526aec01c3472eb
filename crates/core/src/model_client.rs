use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use loopgraph_model::{
    AssistantMessage, ErrorKind, Message, MessageError, ModelFinishReason,
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent, ModelTool, ToolCallRequest,
};
use tracing::Instrument;

type InvokeResult = Result<Message, ModelError>;
type BoxedInvokeFuture = Pin<Box<dyn Future<Output = InvokeResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedInvokeFuture + Send + Sync>;

/// An error raised by the model provider.
///
/// The provider's own error is kept untouched, use [`ModelError::kind`]
/// to classify it or [`ModelError::downcast_ref`] to get it back.
#[derive(Debug)]
pub struct ModelError(Box<dyn ModelProviderError>);

impl ModelError {
    /// Returns the kind of the underlying provider error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }

    /// Returns a reference to the underlying provider error.
    #[inline]
    pub fn get_ref(&self) -> &dyn ModelProviderError {
        &*self.0
    }

    /// Returns the underlying provider error if it is of type `E`.
    #[inline]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let err: &(dyn StdError + 'static) = &*self.0;
        err.downcast_ref()
    }
}

impl Display for ModelError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for ModelError {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// The model finished with tool calls that can't form a valid message.
#[derive(Debug)]
struct InvalidToolCalls(MessageError);

impl Display for InvalidToolCalls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid tool calls in response: {}", self.0)
    }
}

impl StdError for InvalidToolCalls {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.0)
    }
}

impl ModelProviderError for InvalidToolCalls {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedResponse
    }
}

/// A wrapper around a model provider that turns its streamed responses
/// into complete messages, and provides a type-erased interface for the
/// other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            let span = debug_span!(
                "model client req",
                messages = req.messages.len(),
                tools = req.tools.len()
            );
            Box::pin(
                async move {
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(span),
            )
        });
        Self { handler_fn }
    }

    /// Sends the conversation with the tool declarations, and returns the
    /// assistant message the model produced.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ModelTool],
    ) -> Result<Message, ModelError> {
        let req = ModelRequest {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        };
        (self.handler_fn)(req).await
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> InvokeResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(ModelError(Box::new(err)));
        }
    };

    let mut content = String::new();
    let mut tool_calls: Vec<ToolCallRequest> = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(ModelError(Box::new(err)));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                content.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    if finish_reason == Some(ModelFinishReason::ToolCalls)
        && tool_calls.is_empty()
    {
        warn!("model finished for tool calls but requested none");
    }
    debug!(
        "finished a request: {} chars, {} tool calls, {finish_reason:?}",
        content.len(),
        tool_calls.len()
    );

    let msg = AssistantMessage::new(content)
        .with_tool_calls(tool_calls)
        .map_err(|err| ModelError(Box::new(InvalidToolCalls(err))))?;
    Ok(Message::Assistant(msg))
}
