use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use loopgraph_model::{
    ErrorKind, Message, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, ModelTool,
    ToolCallRequest,
};
use serde_json::json;
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Emits queued events one by one, with a short delay before each.
#[derive(Debug)]
struct FakeModelResponse {
    events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeModelResponse {
    fn echo(input: &str) -> Self {
        let mut events: VecDeque<_> = format!("You said {input}")
            .split_inclusive(' ')
            .map(|word| ModelResponseEvent::MessageDelta(word.to_owned()))
            .collect();
        events.push_back(ModelResponseEvent::Completed(ModelFinishReason::Stop));
        Self {
            events,
            sleep: None,
        }
    }

    fn call_tool(tool: &ModelTool) -> Self {
        let req = ToolCallRequest::new("call_0", &tool.name, json!({}))
            .expect("fake tool call is valid");
        Self {
            events: VecDeque::from([
                ModelResponseEvent::ToolCall(req),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]),
            sleep: None,
        }
    }
}

impl ModelResponse for FakeModelResponse {
    type Error = FakeModelProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
            return Poll::Ready(Ok(this.events.pop_front()));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

/// Echoes the latest user message, or calls the first declared tool if
/// it hasn't been called yet.
struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Response = FakeModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = match (req.messages.last(), req.tools.first()) {
            (None, _) => Err(FakeModelProviderError(ErrorKind::Other)),
            (Some(Message::User(_)), Some(tool)) => {
                Ok(FakeModelResponse::call_tool(tool))
            }
            (Some(msg), _) => Ok(FakeModelResponse::echo(msg.content())),
        };
        ready(result)
    }
}

async fn collect(
    resp: FakeModelResponse,
) -> Result<Vec<ModelResponseEvent>, FakeModelProviderError> {
    let mut resp = std::pin::pin!(resp);
    let mut events = vec![];
    while let Some(event) =
        std::future::poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
    {
        events.push(event);
    }
    Ok(events)
}

#[tokio::test]
async fn test_completion() {
    let req = ModelRequest {
        messages: vec![Message::user("Good morning")],
        tools: vec![],
    };
    let resp = FakeModelProvider.send_request(&req).await.unwrap();
    let events = collect(resp).await.unwrap();

    let mut text = String::new();
    for event in &events {
        if let ModelResponseEvent::MessageDelta(delta) = event {
            text.push_str(delta);
        }
    }
    assert_eq!(text, "You said Good morning");
    assert_eq!(
        events.last(),
        Some(&ModelResponseEvent::Completed(ModelFinishReason::Stop))
    );
}

#[tokio::test]
async fn test_tool_call_then_answer() {
    let mut req = ModelRequest {
        messages: vec![Message::user("What is 2 plus 3?")],
        tools: vec![ModelTool {
            name: "add".to_owned(),
            description: "Adds two numbers.".to_owned(),
            parameters: json!({ "type": "object" }),
        }],
    };
    let resp = FakeModelProvider.send_request(&req).await.unwrap();
    let events = collect(resp).await.unwrap();
    let ModelResponseEvent::ToolCall(call) = &events[0] else {
        panic!("expected a tool call, got {events:?}");
    };
    assert_eq!(call.name(), "add");
    assert_eq!(
        events[1],
        ModelResponseEvent::Completed(ModelFinishReason::ToolCalls)
    );

    req.messages.push(Message::Tool(
        loopgraph_model::ToolCallResult::success(call.id(), "5"),
    ));
    let resp = FakeModelProvider.send_request(&req).await.unwrap();
    let events = collect(resp).await.unwrap();
    assert!(
        events
            .iter()
            .all(|e| !matches!(e, ModelResponseEvent::ToolCall(_)))
    );
}

#[tokio::test]
async fn test_error() {
    let req = ModelRequest {
        messages: vec![],
        tools: vec![],
    };
    let err = FakeModelProvider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}
