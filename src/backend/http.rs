//! HTTP implementation of the assistant API

use super::types::{
    ChatRequest, ChatResponse, ConversationDetail, ConversationSummary, FeedbackRequest,
    QuickActionsResponse, SuggestionsResponse,
};
use super::{AssistantBackend, BackendError};
use crate::transcript::SuggestedAction;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Assistant API reached over HTTP/JSON
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let body = self.execute_raw(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            BackendError::invalid_response(format!("Failed to parse response: {e} - body: {body}"))
        })
    }

    async fn execute_raw(&self, builder: RequestBuilder) -> Result<String, BackendError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                BackendError::network(format!("Connection failed: {e}"))
            } else {
                BackendError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }
        Ok(body)
    }
}

fn classify_error(status: StatusCode, body: &str) -> BackendError {
    // DRF puts the reason under "detail"; the assistant views use "error".
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => BackendError::auth(format!("Authentication failed: {message}")),
        404 => BackendError::not_found(format!("Not found: {message}")),
        500..=599 => BackendError::server_error(format!("Server error: {message}")),
        _ => BackendError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatResponse, BackendError> {
        let body = ChatRequest {
            message: text,
            conversation_id,
        };
        self.execute(self.request(Method::POST, "assistant/chat/").json(&body))
            .await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, BackendError> {
        self.execute(self.request(Method::GET, "assistant/conversations/"))
            .await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail, BackendError> {
        let path = format!("assistant/conversations/{conversation_id}/");
        self.execute(self.request(Method::GET, &path)).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), BackendError> {
        let path = format!("assistant/conversations/{conversation_id}/delete/");
        self.execute_raw(self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
    }

    async fn send_feedback(
        &self,
        message_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<(), BackendError> {
        let body = FeedbackRequest {
            message: message_id,
            rating,
            comment,
        };
        self.execute_raw(self.request(Method::POST, "assistant/feedback/").json(&body))
            .await
            .map(|_| ())
    }

    async fn quick_actions(&self) -> Result<Vec<SuggestedAction>, BackendError> {
        let response: QuickActionsResponse = self
            .execute(self.request(Method::GET, "assistant/quick-actions/"))
            .await?;
        Ok(response.quick_actions)
    }

    async fn suggestions(&self) -> Result<Vec<String>, BackendError> {
        let response: SuggestionsResponse = self
            .execute(self.request(Method::GET, "assistant/suggestions/"))
            .await?;
        Ok(response.suggestions)
    }
}
