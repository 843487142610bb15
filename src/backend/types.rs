//! Wire types for the assistant API

use crate::transcript::{Message, MessageRole, SuggestedAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST assistant/chat/`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a str>,
}

/// Response of `POST assistant/chat/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub conversation_id: Option<String>,
    /// Backend explanation on `success: false`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ReplyMessage>,
}

#[cfg(test)]
impl ChatResponse {
    pub fn ok(conversation_id: Option<&str>, message: ReplyMessage) -> Self {
        Self {
            success: true,
            conversation_id: conversation_id.map(str::to_string),
            error: None,
            message: Some(message),
        }
    }

    pub fn rejected(error: Option<&str>) -> Self {
        Self {
            success: false,
            conversation_id: None,
            error: error.map(str::to_string),
            message: None,
        }
    }
}

/// The assistant message carried by a chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_resources: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ReplyMessage {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            suggested_actions: Vec::new(),
            related_resources: None,
            created_at,
        }
    }

    pub fn into_message(self) -> Message {
        Message::assistant(self.id, self.content, self.created_at)
            .with_actions(self.suggested_actions)
            .with_resources(self.related_resources)
    }
}

/// Preview of the newest message in a stored conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePreview {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
}

/// Entry of `GET assistant/conversations/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_preview: Option<MessagePreview>,
}

impl ConversationSummary {
    /// Case-insensitive match on the title or the last message preview
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self
                .last_message_preview
                .as_ref()
                .is_some_and(|p| p.content.to_lowercase().contains(&query))
    }
}

/// Message as stored server-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_resources: Option<Value>,
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        Message {
            id: stored.id,
            role: stored.role,
            content: stored.content,
            created_at: stored.created_at,
            suggested_actions: stored.suggested_actions,
            related_resources: stored.related_resources,
        }
    }
}

/// Response of `GET assistant/conversations/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Body of `POST assistant/feedback/`
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest<'a> {
    pub message: &'a str,
    pub rating: u8,
    pub comment: &'a str,
}

/// Response of `GET assistant/quick-actions/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuickActionsResponse {
    #[serde(default)]
    pub quick_actions: Vec<SuggestedAction>,
}

/// Response of `GET assistant/suggestions/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

// Django serializers emit integer or UUID primary keys depending on the model.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
