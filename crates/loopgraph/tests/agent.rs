use loopgraph::core::{GraphShape, Message, ToolCallResult};
use loopgraph::{Settings, agent_builder};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOOL_CALL_STREAM: &str = concat!(
    "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"role\":\"assistant\",",
    "\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",",
    "\"function\":{\"name\":\"add\",\"arguments\":\"\"}}]},",
    "\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{",
    "\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":",
    "\"{\\\"input1\\\": 2, \\\"input2\\\": 3}\"}}]},",
    "\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},",
    "\"finish_reason\":\"tool_calls\"}]}\n\n",
    "data: [DONE]\n\n",
);

const ANSWER_STREAM: &str = concat!(
    "data: {\"id\":\"c2\",\"choices\":[{\"delta\":{\"role\":\"assistant\",",
    "\"content\":\"2 plus 3 is \"},\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"c2\",\"choices\":[{\"delta\":{\"content\":\"5.\"},",
    "\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

fn settings(server: &MockServer) -> Settings {
    let base_url = format!("{}/v1", server.uri());
    Settings::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_owned()),
        "OPENAI_BASE_URL" => Some(base_url.clone()),
        _ => None,
    })
    .unwrap()
}

fn event_stream(body: &'static str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

#[tokio::test]
async fn test_add_round_trip() {
    let server = MockServer::start().await;
    // The request carrying the tool result gets the final answer.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"tool_call_id\":\"call_1\""))
        .respond_with(event_stream(ANSWER_STREAM))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.0,
            "tools": [{ "type": "function", "function": { "name": "add" } }]
        })))
        .respond_with(event_stream(TOOL_CALL_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent_builder(&settings(&server), GraphShape::ToolLoop).build();
    let messages = agent
        .run(vec![Message::user("What is 2 plus 3?")])
        .await
        .unwrap();

    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1].pending_tool_calls()[0].name(), "add");
    assert_eq!(
        messages[2],
        Message::Tool(ToolCallResult::success("call_1", "5"))
    );
    assert_eq!(messages[3], Message::assistant("2 plus 3 is 5."));
}

#[tokio::test]
async fn test_direct_declares_no_tools() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(event_stream(ANSWER_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent_builder(&settings(&server), GraphShape::Direct).build();
    let messages = agent.run(vec![Message::user("Hello")]).await.unwrap();
    assert_eq!(messages.len(), 2);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert!(body.get("tools").is_none());
}
