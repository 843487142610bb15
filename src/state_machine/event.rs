//! Events that can occur in a session

use crate::backend::ChatResponse;
use crate::transcript::Message;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions.
///
/// Ids and timestamps are stamped by the runtime so the transition stays pure.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        message_id: String,
        at: DateTime<Utc>,
    },
    NewConversation,

    // Dispatch settlement
    ReplyReceived {
        request_id: String,
        response: ChatResponse,
    },
    DispatchFailed {
        request_id: String,
        message: String,
        /// Id and timestamp for the apology message
        message_id: String,
        at: DateTime<Utc>,
    },

    // History events
    ConversationLoaded {
        conversation_id: String,
        messages: Vec<Message>,
    },
    ConversationDeleted {
        conversation_id: String,
    },
}

impl Event {
    pub fn user_submit(text: impl Into<String>) -> Self {
        Event::UserSubmit {
            text: text.into(),
            message_id: uuid::Uuid::new_v4().to_string(),
            at: Utc::now(),
        }
    }

    pub fn dispatch_failed(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Event::DispatchFailed {
            request_id: request_id.into(),
            message: message.into(),
            message_id: uuid::Uuid::new_v4().to_string(),
            at: Utc::now(),
        }
    }

    /// Request id of a settlement event
    pub fn settles(&self) -> Option<&str> {
        match self {
            Event::ReplyReceived { request_id, .. } | Event::DispatchFailed { request_id, .. } => {
                Some(request_id)
            }
            _ => None,
        }
    }
}
