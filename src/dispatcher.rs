//! Network exchange for one submitted message
//!
//! Each exchange runs as a background task and reports exactly one
//! settlement event back to the session, whatever happens to the task.

use crate::backend::AssistantBackend;
use crate::state_machine::Event;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the session asked to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub request_id: String,
    pub text: String,
    pub conversation_id: Option<String>,
}

pub struct MessageDispatcher<B> {
    backend: Arc<B>,
    events: mpsc::Sender<Event>,
}

impl<B: AssistantBackend + 'static> MessageDispatcher<B> {
    pub fn new(backend: Arc<B>, events: mpsc::Sender<Event>) -> Self {
        Self { backend, events }
    }

    /// Spawn the exchange. Cancelling `cancel` abandons it without settling.
    pub fn dispatch(&self, request: DispatchRequest, cancel: CancellationToken) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut guard = SettleGuard::new(events.clone(), request.request_id.clone());

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    guard.disarm();
                    tracing::info!(request_id = %request.request_id, "Exchange abandoned");
                }

                event = exchange(backend.as_ref(), &request) => {
                    guard.disarm();
                    if events.send(event).await.is_err() {
                        tracing::debug!(request_id = %request.request_id, "Session gone, dropping settlement");
                    }
                }
            }
        })
    }
}

/// Perform the call and map its outcome to a settlement event
pub async fn exchange<B: AssistantBackend + ?Sized>(backend: &B, request: &DispatchRequest) -> Event {
    tracing::info!(
        request_id = %request.request_id,
        conversation_id = ?request.conversation_id,
        "Sending message to assistant"
    );

    match backend
        .send_message(&request.text, request.conversation_id.as_deref())
        .await
    {
        Ok(response) if response.success && response.message.is_none() => {
            tracing::warn!(request_id = %request.request_id, "Successful reply without a message");
            Event::dispatch_failed(&request.request_id, "Reply without message")
        }
        Ok(response) => Event::ReplyReceived {
            request_id: request.request_id.clone(),
            response,
        },
        Err(e) => Event::dispatch_failed(&request.request_id, e.message),
    }
}

/// Reports a failure if the exchange task ends without settling (panic, abort)
struct SettleGuard {
    events: Option<mpsc::Sender<Event>>,
    request_id: String,
}

impl SettleGuard {
    fn new(events: mpsc::Sender<Event>, request_id: String) -> Self {
        Self {
            events: Some(events),
            request_id,
        }
    }

    fn disarm(&mut self) {
        self.events = None;
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if let Some(events) = self.events.take() {
            tracing::warn!(request_id = %self.request_id, "Exchange ended without settling");
            let _ = events.try_send(Event::dispatch_failed(
                &self.request_id,
                "Exchange ended without settling",
            ));
        }
    }
}
