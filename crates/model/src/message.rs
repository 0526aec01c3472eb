use std::collections::HashSet;
use std::error::Error;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete message in a conversation.
///
/// Messages are serialized with a `role` tag, e.g.
/// `{"role":"user","content":"Hello"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum Message {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// A message produced by the model, possibly requesting tool calls.
    Assistant(AssistantMessage),
    /// The result of a tool call.
    Tool(ToolCallResult),
}

impl Message {
    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::System(content.into())
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::User(content.into())
    }

    /// Creates an assistant message without tool calls.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::Assistant(AssistantMessage::new(content))
    }

    /// Returns the role name of this message.
    #[inline]
    pub fn role(&self) -> &'static str {
        match self {
            Message::System(_) => "system",
            Message::User(_) => "user",
            Message::Assistant(_) => "assistant",
            Message::Tool(_) => "tool",
        }
    }

    /// Returns the text content of this message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            Message::System(content) | Message::User(content) => content,
            Message::Assistant(msg) => msg.content(),
            Message::Tool(result) => &result.content,
        }
    }

    /// Returns the tool calls this message is waiting for.
    ///
    /// Only assistant messages may carry tool calls, this is always empty
    /// for the other variants.
    #[inline]
    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Message::Assistant(msg) => msg.tool_calls(),
            _ => &[],
        }
    }
}

/// A message produced by the model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAssistantMessage")]
pub struct AssistantMessage {
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCallRequest>,
}

impl AssistantMessage {
    /// Creates an assistant message with text content only.
    #[inline]
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
        }
    }

    /// Attaches tool call requests to the message.
    ///
    /// Fails if two requests share the same id, since results could not
    /// be correlated back to their requests.
    pub fn with_tool_calls(
        mut self,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Result<Self, MessageError> {
        let mut seen = HashSet::with_capacity(tool_calls.len());
        for call in &tool_calls {
            if !seen.insert(call.id()) {
                return Err(MessageError::DuplicateToolCallId(
                    call.id().to_owned(),
                ));
            }
        }
        self.tool_calls = tool_calls;
        Ok(self)
    }

    /// Returns the text content.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the tool call requests.
    #[inline]
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        &self.tool_calls
    }
}

#[derive(Deserialize)]
struct RawAssistantMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCallRequest>,
}

impl TryFrom<RawAssistantMessage> for AssistantMessage {
    type Error = MessageError;

    fn try_from(raw: RawAssistantMessage) -> Result<Self, Self::Error> {
        AssistantMessage::new(raw.content).with_tool_calls(raw.tool_calls)
    }
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawToolCallRequest")]
pub struct ToolCallRequest {
    id: String,
    name: String,
    arguments: Value,
}

impl ToolCallRequest {
    /// Creates a tool call request.
    ///
    /// `id` and `name` must not be empty, and `arguments` must be a JSON
    /// object mapping parameter names to values.
    pub fn new<ID: Into<String>, N: Into<String>>(
        id: ID,
        name: N,
        arguments: Value,
    ) -> Result<Self, MessageError> {
        let id = id.into();
        let name = name.into();
        if id.is_empty() {
            return Err(MessageError::EmptyToolCallId);
        }
        if name.is_empty() {
            return Err(MessageError::EmptyToolName);
        }
        if !arguments.is_object() {
            return Err(MessageError::ArgumentsNotObject);
        }
        Ok(Self {
            id,
            name,
            arguments,
        })
    }

    /// The unique identifier for the tool call request.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The name of the tool to call.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The arguments object to pass to the tool.
    #[inline]
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }
}

#[derive(Deserialize)]
struct RawToolCallRequest {
    id: String,
    name: String,
    arguments: Value,
}

impl TryFrom<RawToolCallRequest> for ToolCallRequest {
    type Error = MessageError;

    #[inline]
    fn try_from(raw: RawToolCallRequest) -> Result<Self, Self::Error> {
        ToolCallRequest::new(raw.id, raw.name, raw.arguments)
    }
}

/// Whether a tool call succeeded.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// The tool produced a result.
    #[default]
    Success,
    /// The tool failed, the content describes the failure.
    Error,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The identifier of the tool call request this result answers.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
    /// Whether the tool call succeeded.
    #[serde(default)]
    pub status: ToolStatus,
}

impl ToolCallResult {
    /// Creates a successful result.
    #[inline]
    pub fn success<ID: Into<String>, S: Into<String>>(
        id: ID,
        content: S,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            status: ToolStatus::Success,
        }
    }

    /// Creates a failed result.
    #[inline]
    pub fn error<ID: Into<String>, S: Into<String>>(
        id: ID,
        content: S,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            status: ToolStatus::Error,
        }
    }
}

/// A message failed the construction-time checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageError {
    /// A tool call request has an empty id.
    EmptyToolCallId,
    /// A tool call request has an empty tool name.
    EmptyToolName,
    /// The arguments of a tool call request are not a JSON object.
    ArgumentsNotObject,
    /// Two tool call requests in one message share the same id.
    DuplicateToolCallId(String),
}

impl Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::EmptyToolCallId => {
                f.write_str("tool call id must not be empty")
            }
            MessageError::EmptyToolName => {
                f.write_str("tool name must not be empty")
            }
            MessageError::ArgumentsNotObject => {
                f.write_str("tool call arguments must be a JSON object")
            }
            MessageError::DuplicateToolCallId(id) => {
                write!(f, "duplicate tool call id: {id}")
            }
        }
    }
}

impl Error for MessageError {}
