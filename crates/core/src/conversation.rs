//! Conversation-related types.

use loopgraph_model::Message;

/// The messages of one agent run, oldest first.
///
/// A conversation only grows: messages can be appended but never removed
/// or replaced.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates a conversation that starts with `initial`.
    #[inline]
    pub fn new(initial: Vec<Message>) -> Self {
        Self { messages: initial }
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Returns all messages.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consumes the conversation and returns its messages.
    #[inline]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl Extend<Message> for Conversation {
    #[inline]
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}
