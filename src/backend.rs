//! Assistant backend abstraction
//!
//! The backend itself is an external collaborator; only its request/response
//! contract lives here.

mod error;
mod http;
mod types;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpBackend;
pub use types::*;

use crate::transcript::SuggestedAction;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for assistant backends
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Exchange one user message for an assistant reply
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatResponse, BackendError>;

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, BackendError>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail, BackendError>;

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), BackendError>;

    async fn send_feedback(
        &self,
        message_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<(), BackendError>;

    async fn quick_actions(&self) -> Result<Vec<SuggestedAction>, BackendError>;

    async fn suggestions(&self) -> Result<Vec<String>, BackendError>;
}

#[async_trait]
impl<T: AssistantBackend + ?Sized> AssistantBackend for Arc<T> {
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatResponse, BackendError> {
        (**self).send_message(text, conversation_id).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, BackendError> {
        (**self).list_conversations().await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail, BackendError> {
        (**self).get_conversation(conversation_id).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), BackendError> {
        (**self).delete_conversation(conversation_id).await
    }

    async fn send_feedback(
        &self,
        message_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<(), BackendError> {
        (**self).send_feedback(message_id, rating, comment).await
    }

    async fn quick_actions(&self) -> Result<Vec<SuggestedAction>, BackendError> {
        (**self).quick_actions().await
    }

    async fn suggestions(&self) -> Result<Vec<String>, BackendError> {
        (**self).suggestions().await
    }
}

/// Logging wrapper for backends
pub struct LoggingBackend<B> {
    inner: B,
}

impl<B: AssistantBackend> LoggingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &'static str, start: std::time::Instant, result: &Result<T, BackendError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::debug!(
                operation,
                duration_ms = %duration.as_millis(),
                "Backend request completed"
            );
        }
        Err(e) => {
            tracing::error!(
                operation,
                duration_ms = %duration.as_millis(),
                error = %e.message,
                kind = e.kind.as_str(),
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl<B: AssistantBackend> AssistantBackend for LoggingBackend<B> {
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatResponse, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.send_message(text, conversation_id).await;
        if let Ok(response) = &result {
            tracing::info!(
                conversation_id = ?response.conversation_id,
                success = response.success,
                duration_ms = %start.elapsed().as_millis(),
                "Assistant reply received"
            );
        } else {
            log_outcome("send_message", start, &result);
        }
        result
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.list_conversations().await;
        log_outcome("list_conversations", start, &result);
        result
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.get_conversation(conversation_id).await;
        log_outcome("get_conversation", start, &result);
        result
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.delete_conversation(conversation_id).await;
        log_outcome("delete_conversation", start, &result);
        result
    }

    async fn send_feedback(
        &self,
        message_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<(), BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.send_feedback(message_id, rating, comment).await;
        log_outcome("send_feedback", start, &result);
        result
    }

    async fn quick_actions(&self) -> Result<Vec<SuggestedAction>, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.quick_actions().await;
        log_outcome("quick_actions", start, &result);
        result
    }

    async fn suggestions(&self) -> Result<Vec<String>, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.suggestions().await;
        log_outcome("suggestions", start, &result);
        result
    }
}
