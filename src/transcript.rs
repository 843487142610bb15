//! Conversation transcript types
//!
//! Messages are immutable once appended; the transcript only grows,
//! or is replaced wholesale when a new session lifetime begins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal shown when an exchange with the backend fails
pub const APOLOGY_MESSAGE: &str =
    "Lo siento, hubo un error al procesar tu mensaje. Por favor, intenta de nuevo.";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Follow-up link offered alongside an assistant reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_actions: Vec<SuggestedAction>,
    /// Passed through untouched from the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_resources: Option<Value>,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::User,
            content: content.into(),
            created_at: at,
            suggested_actions: Vec::new(),
            related_resources: None,
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: at,
            suggested_actions: Vec::new(),
            related_resources: None,
        }
    }

    /// Synthetic reply appended when the exchange failed
    pub fn apology(id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::assistant(id, APOLOGY_MESSAGE, at)
    }

    pub fn with_actions(mut self, actions: Vec<SuggestedAction>) -> Self {
        self.suggested_actions = actions;
        self
    }

    pub fn with_resources(mut self, resources: Option<Value>) -> Self {
        self.related_resources = resources;
        self
    }
}

/// Ordered messages plus the server-assigned conversation identity.
///
/// The conversation id can be bound once per lifetime; only `reset` and
/// `replace` start a new lifetime.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    conversation_id: Option<String>,
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Bind the conversation id. Returns false when one is already bound.
    pub fn bind(&mut self, conversation_id: impl Into<String>) -> bool {
        if self.conversation_id.is_some() {
            return false;
        }
        self.conversation_id = Some(conversation_id.into());
        true
    }

    pub fn reset(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
    }

    pub fn replace(&mut self, conversation_id: impl Into<String>, messages: Vec<Message>) {
        self.conversation_id = Some(conversation_id.into());
        self.messages = messages;
    }
}
