use std::collections::{BTreeMap, VecDeque};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use loopgraph_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use pin_project_lite::pin_project;
use serde_json::Value;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{ChatCompletionChunk, ToolCall};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Tool call fragments keyed by their `index`. Arguments arrive as
    // string pieces and are only parsed once the message is finished.
    tool_calls: BTreeMap<u32, ToolCall>,
    // Events decoded from the stream but not yet returned to the caller.
    pending_events: VecDeque<ModelResponseEvent>,
    // Set once `Completed` has been queued, the remaining chunks (usually
    // the usage report) are drained and ignored.
    completed: bool,
}

impl PartialState {
    /// Queues the assembled tool calls followed by the `Completed` event.
    fn finish(&mut self, reason: Option<&str>) -> Result<(), Error> {
        if self.completed {
            return Ok(());
        }
        self.completed = true;

        let reason = match reason {
            Some("content_filter") => {
                return Err(Error::new(
                    "the response was blocked by the content filter",
                    ErrorKind::Moderated,
                ));
            }
            Some("tool_calls") | Some("function_call") => {
                ModelFinishReason::ToolCalls
            }
            // Some compatible servers end the stream without a reason.
            None if !self.tool_calls.is_empty() => ModelFinishReason::ToolCalls,
            _ => ModelFinishReason::Stop,
        };

        for tool_call in std::mem::take(&mut self.tool_calls).into_values() {
            let req = assemble_tool_call(tool_call)?;
            self.pending_events.push_back(ModelResponseEvent::ToolCall(req));
        }
        self.pending_events
            .push_back(ModelResponseEvent::Completed(reason));
        Ok(())
    }

    fn merge_tool_call(&mut self, fragment: ToolCall) {
        let index = fragment.index.unwrap_or(self.tool_calls.len() as u32);
        let Some(partial) = self.tool_calls.get_mut(&index) else {
            self.tool_calls.insert(index, fragment);
            return;
        };
        if let Some(id) = fragment.id {
            partial.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = fragment.r#type {
            partial.r#type.get_or_insert_default().push_str(&ty);
        }
        if let Some(function) = fragment.function {
            let partial_func = partial.function.get_or_insert_default();
            if let Some(name) = function.name {
                partial_func.name.get_or_insert_default().push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                partial_func
                    .arguments
                    .get_or_insert_default()
                    .push_str(&arguments);
            }
        }
    }
}

fn assemble_tool_call(tool_call: ToolCall) -> Result<ToolCallRequest, Error> {
    let id = tool_call.id.unwrap_or_default();
    let function = tool_call.function.unwrap_or_default();
    let name = function.name.unwrap_or_default();
    let arguments = match function.arguments.as_deref().map(str::trim) {
        // Tools without parameters may get no arguments at all.
        None | Some("") => Value::Object(Default::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|err| {
            Error::new(
                format!("invalid arguments for tool call `{id}`: {err}"),
                ErrorKind::MalformedResponse,
            )
        })?,
    };
    ToolCallRequest::new(id, name, arguments).map_err(|err| {
        Error::new(
            format!("invalid tool call: {err}"),
            ErrorKind::MalformedResponse,
        )
    })
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streaming chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending_events: Default::default(),
            completed: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future
        // for the next event.
        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                if partial_state.completed {
                    return Ok((None, partial_state));
                }
                // The stream ended without `[DONE]`, still deliver what we
                // have got so far.
                partial_state.finish(None)?;
                continue;
            }
            Err(SseError::ChunksError(err)) => {
                return Err(Error::new(
                    format!("failed to read the event stream: {}", err.0),
                    ErrorKind::Transport,
                ));
            }
            Err(SseError::InvalidPayload) => {
                return Err(Error::new(
                    "invalid server-sent event",
                    ErrorKind::MalformedResponse,
                ));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.finish(None)?;
            continue;
        }
        if partial_state.completed {
            continue;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::MalformedResponse)
            })?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new(
                "chunk id mismatch",
                ErrorKind::MalformedResponse,
            ));
        };

        // Chunks without choices only carry usage information.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            partial_state
                .pending_events
                .push_back(ModelResponseEvent::MessageDelta(content));
        }
        for fragment in choice.delta.tool_calls.unwrap_or_default() {
            partial_state.merge_tool_call(fragment);
        }
        if let Some(finish_reason) = choice.finish_reason {
            partial_state.finish(Some(&finish_reason))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(
        chunks: Vec<Bytes>,
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let sse = Sse::new(Chunks::from_vec_deque(chunks.into()));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let events = collect_events(vec![Bytes::from_static(include_bytes!(
            "../fixtures/tool_call_response.txt"
        ))])
        .await
        .unwrap();

        let expected_call = ToolCallRequest::new(
            "call_abc",
            "add",
            json!({ "input1": 2, "input2": 3 }),
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Let me add.".to_owned()),
                ModelResponseEvent::ToolCall(expected_call),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_text_events() {
        let events = collect_events(vec![
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            ),
            Bytes::from_static(b"data: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"total_tokens\":3}}\n\n"),
            Bytes::from_static(b"data: [DONE]\n\n"),
        ])
        .await
        .unwrap();
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Hello".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_streams() {
        let err = collect_events(vec![Bytes::from_static(b"data: {oops\n\n")])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);

        let err = collect_events(vec![Bytes::from_static(
            b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"add\",\"arguments\":\"{\\\"input1\\\": 2,\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);

        let err = collect_events(vec![Bytes::from_static(
            b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Moderated);
    }
}
