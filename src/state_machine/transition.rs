//! Pure state transition function
//!
//! Given the same state, context and event this always yields the same
//! result; all I/O happens in the runtime that executes the effects.

use super::{ConvContext, ConvState, Effect, Event};
use crate::transcript::Message;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition. None of them change the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A message is already being sent")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Settlement for unknown request {0}")]
    StaleSettlement(String),
}

impl TransitionError {
    /// Rejections the user should not hear about
    pub fn is_silent(&self) -> bool {
        matches!(self, TransitionError::Busy | TransitionError::EmptyMessage)
    }
}

pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Sending
        // ============================================================

        // Idle + UserSubmit -> Sending, optimistic message first
        (ConvState::Idle, Event::UserSubmit { text, message_id, at }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            Ok(TransitionResult::new(ConvState::Sending {
                request_id: message_id.clone(),
            })
            .with_effect(Effect::append(Message::user(message_id.clone(), text, at)))
            .with_effect(Effect::ClearInput)
            .with_effect(Effect::PublishState)
            .with_effect(Effect::dispatch(
                message_id,
                text,
                context.conversation_id.clone(),
            )))
        }

        // Only one exchange in flight
        (ConvState::Sending { .. }, Event::UserSubmit { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Settlement: every path lands in Idle
        // ============================================================
        (ConvState::Sending { request_id }, Event::ReplyReceived { request_id: settled, response })
            if *request_id == settled =>
        {
            let result = TransitionResult::new(ConvState::Idle);

            let (true, Some(reply)) = (response.success, response.message) else {
                return Ok(result
                    .with_effect(Effect::ReportRejection {
                        reason: response.error,
                    })
                    .with_effect(Effect::PublishState));
            };

            let binding = match (&context.conversation_id, response.conversation_id) {
                (None, Some(conversation_id)) => {
                    vec![Effect::bind(conversation_id), Effect::RefreshHistory]
                }
                _ => vec![],
            };

            Ok(result
                .with_effects(binding)
                .with_effect(Effect::append(reply.into_message()))
                .with_effect(Effect::PublishState))
        }

        (
            ConvState::Sending { request_id },
            Event::DispatchFailed {
                request_id: settled,
                message_id,
                at,
                ..
            },
        ) if *request_id == settled => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::append(Message::apology(message_id, at)))
            .with_effect(Effect::PublishState)),

        (_, Event::ReplyReceived { request_id, .. } | Event::DispatchFailed { request_id, .. }) => {
            Err(TransitionError::StaleSettlement(request_id))
        }

        // ============================================================
        // Session lifetime
        // ============================================================
        (ConvState::Idle, Event::NewConversation) => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::ResetTranscript)
            .with_effect(Effect::PublishState)),

        (
            ConvState::Idle,
            Event::ConversationLoaded {
                conversation_id,
                messages,
            },
        ) => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::ReplaceTranscript {
                conversation_id,
                messages,
            })
            .with_effect(Effect::PublishState)),

        (ConvState::Sending { .. }, Event::NewConversation | Event::ConversationLoaded { .. }) => {
            Err(TransitionError::Busy)
        }

        // Deleting the open conversation ends it, unless an exchange is in flight
        (state, Event::ConversationDeleted { conversation_id }) => {
            let is_current = context.conversation_id.as_deref() == Some(conversation_id.as_str());
            if is_current && *state == ConvState::Idle {
                Ok(TransitionResult::new(ConvState::Idle)
                    .with_effect(Effect::ResetTranscript)
                    .with_effect(Effect::PublishState)
                    .with_effect(Effect::RefreshHistory))
            } else {
                Ok(TransitionResult::new(state.clone()).with_effect(Effect::RefreshHistory))
            }
        }
    }
}
