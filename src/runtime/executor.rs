//! Conversation runtime executor

use super::{ClientEvent, Command, SessionView};

use crate::backend::{AssistantBackend, BackendError, ConversationDetail, ConversationSummary};
use crate::composer::InputComposer;
use crate::dispatcher::{DispatchRequest, MessageDispatcher};
use crate::speech::{
    CaptureEvent, RecognizerConfig, SpeechInputController, SpeechPlatform, StartOutcome,
    UNSUPPORTED_MESSAGE,
};
use crate::state_machine::{transition, ConvContext, ConvState, Effect, Event};
use crate::transcript::{Message, MessageRole, SuggestedAction, Transcript};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Shown when the backend answers `success: false` without a reason
pub const REJECTION_FALLBACK: &str = "No pude procesar tu mensaje. Intenta de nuevo.";

/// Results of side requests that do not go through the state machine
#[derive(Debug)]
enum Background {
    History(Result<Vec<ConversationSummary>, BackendError>),
    Prompts {
        quick_actions: Result<Vec<SuggestedAction>, BackendError>,
        suggestions: Result<Vec<String>, BackendError>,
    },
    Loaded {
        conversation_id: String,
        result: Result<ConversationDetail, BackendError>,
    },
    Deleted {
        conversation_id: String,
        result: Result<(), BackendError>,
    },
    Feedback {
        message_id: String,
        result: Result<(), BackendError>,
    },
}

/// Owns one session and everything attached to it
pub struct ConversationRuntime<B: AssistantBackend + 'static> {
    state: ConvState,
    transcript: Transcript,
    composer: InputComposer,
    speech: SpeechInputController,
    backend: Arc<B>,
    dispatcher: MessageDispatcher<B>,
    history: Vec<ConversationSummary>,
    history_revision: u64,
    quick_actions: Vec<SuggestedAction>,
    suggestions: Vec<String>,
    prompts_revision: u64,
    command_rx: mpsc::Receiver<Command>,
    event_rx: mpsc::Receiver<Event>,
    speech_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    background_tx: mpsc::Sender<Background>,
    background_rx: mpsc::Receiver<Background>,
    broadcast_tx: broadcast::Sender<ClientEvent>,
    view_tx: watch::Sender<SessionView>,
    /// Parent of every exchange token; cancelled on teardown
    cancel: CancellationToken,
}

impl<B: AssistantBackend + 'static> ConversationRuntime<B> {
    pub fn new(
        backend: Arc<B>,
        platform: &dyn SpeechPlatform,
        recognizer: RecognizerConfig,
        command_rx: mpsc::Receiver<Command>,
        broadcast_tx: broadcast::Sender<ClientEvent>,
        view_tx: watch::Sender<SessionView>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();
        let (background_tx, background_rx) = mpsc::channel(32);

        Self {
            state: ConvState::Idle,
            transcript: Transcript::new(),
            composer: InputComposer::new(),
            speech: SpeechInputController::new(platform, recognizer, speech_tx),
            dispatcher: MessageDispatcher::new(backend.clone(), event_tx),
            backend,
            history: Vec::new(),
            history_revision: 0,
            quick_actions: Vec::new(),
            suggestions: Vec::new(),
            prompts_revision: 0,
            command_rx,
            event_rx,
            speech_rx,
            background_tx,
            background_rx,
            broadcast_tx,
            view_tx,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!(voice_available = self.speech.is_available(), "Starting conversation runtime");

        self.publish();
        self.refresh_history();
        self.refresh_prompts();

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.event_rx.recv() => self.process_event(event),
                Some(event) = self.speech_rx.recv() => self.handle_speech(&event),
                Some(update) = self.background_rx.recv() => self.handle_background(update),
            }
        }

        if let Some(request_id) = self.state.request_id() {
            tracing::info!(request_id = %request_id, "Abandoning in-flight exchange");
        }
        self.cancel.cancel();
        self.speech.stop();

        tracing::info!(conversation_id = ?self.transcript.conversation_id(), "Conversation runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit => self.submit_buffer(),
            Command::SubmitLine(line) => self.submit_line(&line),
            Command::SubmitText(text) => self.process_event(Event::user_submit(text)),
            Command::NewConversation => self.process_event(Event::NewConversation),
            Command::ToggleVoice => {
                if let Some(outcome) = self.speech.toggle() {
                    self.report_start(outcome);
                }
                self.publish();
            }
            Command::StopVoice => {
                self.speech.stop();
                self.publish();
            }
            Command::RefreshHistory => self.refresh_history(),
            Command::LoadConversation(conversation_id) => self.load_conversation(conversation_id),
            Command::DeleteConversation(conversation_id) => self.delete_conversation(conversation_id),
            Command::RefreshPrompts => self.refresh_prompts(),
            Command::Feedback {
                message_id,
                rating,
                comment,
            } => self.send_feedback(message_id, rating, comment),
            Command::Shutdown => {}
        }
    }

    fn process_event(&mut self, event: Event) {
        if let Event::DispatchFailed {
            request_id, message, ..
        } = &event
        {
            tracing::warn!(request_id = %request_id, error = %message, "Exchange failed");
        } else if let Some(request_id) = event.settles() {
            tracing::debug!(request_id = %request_id, "Reply received");
        }

        let context = ConvContext::new(self.transcript.conversation_id());
        let was_pending = self.state.is_pending();

        let result = match transition(&self.state, &context, event) {
            Ok(r) => r,
            Err(e) if e.is_silent() => {
                tracing::debug!(reason = %e, "Event ignored");
                return;
            }
            Err(e) => {
                tracing::warn!(reason = %e, "Event rejected");
                return;
            }
        };

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }

        if was_pending && !self.state.is_pending() {
            let _ = self.broadcast_tx.send(ClientEvent::ExchangeSettled);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { message } => {
                self.transcript.append(message.clone());
                let _ = self.broadcast_tx.send(ClientEvent::Message { message });
            }

            Effect::BindConversation { conversation_id } => {
                if self.transcript.bind(conversation_id.clone()) {
                    tracing::info!(conversation_id = %conversation_id, "Conversation started");
                } else {
                    tracing::warn!(conversation_id = %conversation_id, "Conversation already bound");
                }
            }

            Effect::ClearInput => {
                self.composer.clear();
                self.speech.clear_interim();
            }

            Effect::Dispatch {
                request_id,
                text,
                conversation_id,
            } => {
                let request = DispatchRequest {
                    request_id,
                    text,
                    conversation_id,
                };
                // Detached; settlement comes back through the event channel
                let _ = self.dispatcher.dispatch(request, self.cancel.child_token());
            }

            Effect::ResetTranscript => {
                self.transcript.reset();
                self.announce_transcript();
            }

            Effect::ReplaceTranscript {
                conversation_id,
                messages,
            } => {
                tracing::info!(conversation_id = %conversation_id, count = messages.len(), "Conversation loaded");
                self.transcript.replace(conversation_id, messages);
                self.announce_transcript();
            }

            Effect::ReportRejection { reason } => {
                tracing::warn!(reason = ?reason, "Assistant declined the message");
                self.notice(reason.unwrap_or_else(|| REJECTION_FALLBACK.to_string()));
            }

            Effect::RefreshHistory => self.refresh_history(),

            Effect::PublishState => self.publish(),
        }
    }

    fn submit_buffer(&mut self) {
        let text = self.composer.text().to_string();
        self.process_event(Event::user_submit(text));
    }

    fn submit_line(&mut self, line: &str) {
        // A rejected send would leave the line in the buffer for the next one
        if self.state.is_pending() {
            tracing::debug!("Typed line dropped while sending");
            return;
        }
        if !line.trim().is_empty() {
            if !self.composer.text().trim().is_empty() {
                self.composer.type_text(" ");
            }
            self.composer.type_text(line.trim());
        }
        self.submit_buffer();
    }

    fn handle_speech(&mut self, event: &CaptureEvent) {
        if let Some(text) = self.speech.handle(event) {
            tracing::debug!(len = text.len(), "Committing dictated text");
            self.composer.commit_final(&text);
        }
        self.publish();
    }

    fn report_start(&mut self, outcome: StartOutcome) {
        match outcome {
            StartOutcome::Unsupported { first_report: true } => self.notice(UNSUPPORTED_MESSAGE),
            StartOutcome::Failed(kind) => {
                tracing::warn!(kind = ?kind, "Dictation did not start");
            }
            StartOutcome::Started
            | StartOutcome::AlreadyListening
            | StartOutcome::Unsupported { first_report: false } => {}
        }
    }

    // ============================================================
    // Side requests
    // ============================================================

    fn spawn_background<F>(&self, request: F)
    where
        F: std::future::Future<Output = Background> + Send + 'static,
    {
        let tx = self.background_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(request.await).await;
        });
    }

    fn refresh_history(&self) {
        let backend = self.backend.clone();
        self.spawn_background(async move { Background::History(backend.list_conversations().await) });
    }

    fn refresh_prompts(&self) {
        let backend = self.backend.clone();
        self.spawn_background(async move {
            let (quick_actions, suggestions) =
                futures::join!(backend.quick_actions(), backend.suggestions());
            Background::Prompts {
                quick_actions,
                suggestions,
            }
        });
    }

    fn load_conversation(&self, conversation_id: String) {
        if self.state.is_pending() {
            tracing::debug!(conversation_id = %conversation_id, "Load ignored while sending");
            return;
        }
        let backend = self.backend.clone();
        self.spawn_background(async move {
            let result = backend.get_conversation(&conversation_id).await;
            Background::Loaded {
                conversation_id,
                result,
            }
        });
    }

    fn delete_conversation(&self, conversation_id: String) {
        let backend = self.backend.clone();
        self.spawn_background(async move {
            let result = backend.delete_conversation(&conversation_id).await;
            Background::Deleted {
                conversation_id,
                result,
            }
        });
    }

    fn send_feedback(&mut self, message_id: String, rating: u8, comment: String) {
        if !(1..=5).contains(&rating) {
            self.notice("La calificación debe estar entre 1 y 5.");
            return;
        }
        match self.transcript.get(&message_id) {
            Some(message) if message.role == MessageRole::Assistant => {}
            _ => {
                self.notice("Solo puedes calificar respuestas del asistente.");
                return;
            }
        }

        let backend = self.backend.clone();
        self.spawn_background(async move {
            let result = backend.send_feedback(&message_id, rating, &comment).await;
            Background::Feedback { message_id, result }
        });
    }

    fn handle_background(&mut self, update: Background) {
        match update {
            // Lists keep their previous contents on failure; the backend logs it
            Background::History(result) => {
                if let Ok(history) = result {
                    self.history = history;
                }
                self.history_revision += 1;
                self.publish();
            }
            Background::Prompts {
                quick_actions,
                suggestions,
            } => {
                if let Ok(actions) = quick_actions {
                    self.quick_actions = actions;
                }
                if let Ok(suggestions) = suggestions {
                    self.suggestions = suggestions;
                }
                self.prompts_revision += 1;
                self.publish();
            }

            Background::Loaded {
                conversation_id,
                result: Ok(detail),
            } => {
                let messages: Vec<Message> = detail.messages.into_iter().map(Message::from).collect();
                self.process_event(Event::ConversationLoaded {
                    conversation_id,
                    messages,
                });
            }
            Background::Loaded {
                conversation_id,
                result: Err(e),
            } => {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "Failed to load conversation");
                self.notice("Error al cargar la conversación");
            }

            Background::Deleted {
                conversation_id,
                result: Ok(()),
            } => {
                self.notice("Conversación eliminada");
                self.process_event(Event::ConversationDeleted { conversation_id });
            }
            Background::Deleted {
                conversation_id,
                result: Err(e),
            } => {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "Failed to delete conversation");
                self.notice("Error al eliminar la conversación");
            }

            Background::Feedback {
                message_id,
                result: Ok(()),
            } => {
                tracing::info!(message_id = %message_id, "Feedback recorded");
                self.notice("¡Gracias por tu opinión!");
            }
            Background::Feedback {
                message_id,
                result: Err(e),
            } => {
                tracing::warn!(message_id = %message_id, error = %e, "Failed to send feedback");
                self.notice("No se pudo enviar tu opinión.");
            }
        }
    }

    // ============================================================
    // Publishing
    // ============================================================

    fn notice(&self, message: impl Into<String>) {
        let _ = self.broadcast_tx.send(ClientEvent::Notice {
            message: message.into(),
        });
    }

    fn announce_transcript(&self) {
        let _ = self.broadcast_tx.send(ClientEvent::TranscriptReplaced {
            conversation_id: self.transcript.conversation_id().map(str::to_string),
            messages: self.transcript.messages().to_vec(),
        });
    }

    fn publish(&self) {
        let speech = self.speech.state();
        self.view_tx.send_replace(SessionView {
            conversation_id: self.transcript.conversation_id().map(str::to_string),
            messages: self.transcript.messages().to_vec(),
            pending: self.state.is_pending(),
            input: self.composer.text().to_string(),
            interim_transcript: speech.interim_transcript.clone(),
            listening: speech.is_listening(),
            voice_available: self.speech.is_available(),
            voice_error: speech.error_message().map(str::to_string),
            history: self.history.clone(),
            history_revision: self.history_revision,
            quick_actions: self.quick_actions.clone(),
            suggestions: self.suggestions.clone(),
            prompts_revision: self.prompts_revision,
        });
    }
}
