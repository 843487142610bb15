//! Effects produced by state transitions

use crate::transcript::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append to the transcript
    AppendMessage { message: Message },

    /// Adopt the server-assigned conversation id
    BindConversation { conversation_id: String },

    /// Clear the input buffer and the interim transcript
    ClearInput,

    /// Start the network exchange
    Dispatch {
        request_id: String,
        text: String,
        conversation_id: Option<String>,
    },

    /// Begin a new, empty session lifetime
    ResetTranscript,

    /// Begin a session lifetime seeded from a stored conversation
    ReplaceTranscript {
        conversation_id: String,
        messages: Vec<Message>,
    },

    /// Backend answered `success: false`
    ReportRejection { reason: Option<String> },

    /// Re-fetch the conversation history
    RefreshHistory,

    /// Publish the new session snapshot
    PublishState,
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage { message }
    }

    pub fn bind(conversation_id: impl Into<String>) -> Self {
        Effect::BindConversation {
            conversation_id: conversation_id.into(),
        }
    }

    pub fn dispatch(
        request_id: impl Into<String>,
        text: impl Into<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Effect::Dispatch {
            request_id: request_id.into(),
            text: text.into(),
            conversation_id,
        }
    }
}
