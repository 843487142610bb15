//! Runtime for a conversation session
//!
//! One task owns the session, the input buffer and the speech controller,
//! and reacts to UI commands, speech events and dispatch settlements in turn.

mod executor;


pub use executor::ConversationRuntime;

use crate::backend::{AssistantBackend, ConversationSummary};
use crate::speech::{RecognizerConfig, SpeechPlatform};
use crate::transcript::{Message, SuggestedAction};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Requests from the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send the input buffer
    Submit,
    /// A typed line: completes whatever dictation left in the buffer and
    /// sends the result. Dropped while an exchange is in flight.
    SubmitLine(String),
    /// Send a suggestion directly, bypassing the buffer
    SubmitText(String),
    NewConversation,
    ToggleVoice,
    StopVoice,
    RefreshHistory,
    LoadConversation(String),
    DeleteConversation(String),
    RefreshPrompts,
    Feedback {
        message_id: String,
        rating: u8,
        comment: String,
    },
    Shutdown,
}

/// Events pushed to the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A message was appended to the transcript
    Message { message: Message },
    /// A new session lifetime began (new, loaded or deleted conversation)
    TranscriptReplaced {
        conversation_id: Option<String>,
        messages: Vec<Message>,
    },
    /// The in-flight exchange settled, whatever the outcome
    ExchangeSettled,
    /// Transient, user-facing information that is not part of the transcript
    Notice { message: String },
}

/// Read-only projection of the session for rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionView {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
    pub pending: bool,
    pub input: String,
    pub interim_transcript: String,
    pub listening: bool,
    pub voice_available: bool,
    pub voice_error: Option<String>,
    pub history: Vec<ConversationSummary>,
    /// Completed history requests, successful or not
    pub history_revision: u64,
    pub quick_actions: Vec<SuggestedAction>,
    pub suggestions: Vec<String>,
    /// Completed prompt requests, successful or not
    pub prompts_revision: u64,
}

/// Handle to interact with a running session
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<ClientEvent>,
    view_rx: watch::Receiver<SessionView>,
    join: JoinHandle<()>,
}

impl SessionHandle {
    /// Returns false once the runtime has stopped
    pub async fn send(&self, command: Command) -> bool {
        self.command_tx.send(command).await.is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    /// Tear the session down, abandoning any in-flight exchange
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Conversation runtime panicked");
        }
    }
}

/// Mount a session: probe the speech platform and start the runtime task
pub fn spawn_session<B: AssistantBackend + 'static>(
    backend: Arc<B>,
    platform: &dyn SpeechPlatform,
    recognizer: RecognizerConfig,
) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (view_tx, view_rx) = watch::channel(SessionView::default());

    let runtime = ConversationRuntime::new(
        backend,
        platform,
        recognizer,
        command_rx,
        broadcast_tx.clone(),
        view_tx,
    );
    let join = tokio::spawn(runtime.run());

    SessionHandle {
        command_tx,
        broadcast_tx,
        view_rx,
        join,
    }
}
