//! Message and Conversation domain types.
//!
//! These are the value objects that flow through a chat session:
//! the user types a line → it becomes a [`Message`] → the assembler builds a
//! prompt from the [`Conversation`] → the model's reply is appended back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The chat model
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// The conversation log of one chat session.
///
/// Always starts with exactly one system message at index 0. Messages are
/// only ever appended: nothing is reordered, edited or removed, so the log
/// keeps growing for the lifetime of the session. Trimming to a recent
/// window happens when a prompt is built, never here.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation seeded with its system instruction.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Add a message to the end of the log.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The full ordered log, system message first.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// The session's system message (index 0).
    pub fn system_message(&self) -> &Message {
        &self.messages[0]
    }

    /// The last `window` messages, never including the system message.
    pub fn recent(&self, window: usize) -> &[Message] {
        let history = &self.messages[1..];
        &history[history.len().saturating_sub(window)..]
    }

    /// Number of messages, including the system message.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing but the system message has been recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.len() == 1
    }
}
