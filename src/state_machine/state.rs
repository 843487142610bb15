//! Conversation session state types

use serde::{Deserialize, Serialize};

/// Session state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for input, nothing in flight
    #[default]
    Idle,

    /// One exchange in flight, keyed by the optimistic user message id
    Sending { request_id: String },
}

impl ConvState {
    /// The UI-facing loading flag
    pub fn is_pending(&self) -> bool {
        matches!(self, ConvState::Sending { .. })
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ConvState::Idle => None,
            ConvState::Sending { request_id } => Some(request_id),
        }
    }
}

/// Session data the transition reads but does not own
#[derive(Debug, Clone, Default)]
pub struct ConvContext {
    /// Conversation id bound for the current session lifetime
    pub conversation_id: Option<String>,
}

impl ConvContext {
    pub fn new(conversation_id: Option<&str>) -> Self {
        Self {
            conversation_id: conversation_id.map(str::to_string),
        }
    }
}
