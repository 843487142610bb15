//! Dictation controller
//!
//! Owns the platform recognizer for the lifetime of the session and folds
//! its events into a [`SpeechState`].

use super::event::{CaptureEvent, SpeechEvent, SpeechSink};
use super::state::{SpeechErrorKind, SpeechState};
use thiserror::Error;
use tokio::sync::mpsc;

/// Shown once when the platform has no dictation capability
pub const UNSUPPORTED_MESSAGE: &str = "Reconocimiento de voz no disponible en este dispositivo.";

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Recognizer failed to start: {0}")]
    StartFailed(String),
}

/// Recognizer settings handed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerConfig {
    pub language: String,
    /// Keep capturing after a final result
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            language: "es-ES".to_string(),
            continuous: false,
            interim_results: true,
        }
    }
}

/// A start/stop-controllable dictation session
pub trait Recognizer: Send {
    /// Begin capture, publishing events on `events` until stopped or ended
    fn start(&mut self, events: SpeechSink) -> Result<(), SpeechError>;

    /// End capture; the recognizer should still emit `End`
    fn stop(&mut self);
}

/// Capability probe for the host's dictation API
pub trait SpeechPlatform: Send + Sync {
    /// `None` when the platform offers no dictation
    fn recognizer(&self, config: &RecognizerConfig) -> Option<Box<dyn Recognizer>>;
}

/// Platform without dictation
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDictation;

impl SpeechPlatform for NoDictation {
    fn recognizer(&self, _config: &RecognizerConfig) -> Option<Box<dyn Recognizer>> {
        None
    }
}

/// Result of asking the controller to start capturing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyListening,
    /// No dictation capability; `first_report` is true only once per controller
    Unsupported { first_report: bool },
    Failed(SpeechErrorKind),
}

pub struct SpeechInputController {
    recognizer: Option<Box<dyn Recognizer>>,
    config: RecognizerConfig,
    state: SpeechState,
    events_tx: mpsc::UnboundedSender<CaptureEvent>,
    /// Bumped on every start; events from earlier captures are dropped
    generation: u64,
    unsupported_reported: bool,
}

impl SpeechInputController {
    /// Probe the platform once; the recognizer lives as long as the controller
    pub fn new(
        platform: &dyn SpeechPlatform,
        config: RecognizerConfig,
        events_tx: mpsc::UnboundedSender<CaptureEvent>,
    ) -> Self {
        let recognizer = platform.recognizer(&config);
        if recognizer.is_none() {
            tracing::info!(language = %config.language, "No dictation capability detected");
        }
        Self {
            recognizer,
            config,
            state: SpeechState::default(),
            events_tx,
            generation: 0,
            unsupported_reported: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn state(&self) -> &SpeechState {
        &self.state
    }

    pub fn start(&mut self) -> StartOutcome {
        let Some(recognizer) = self.recognizer.as_mut() else {
            let first_report = !self.unsupported_reported;
            self.unsupported_reported = true;
            return StartOutcome::Unsupported { first_report };
        };

        if self.state.is_listening() {
            return StartOutcome::AlreadyListening;
        }

        self.generation += 1;
        let sink = SpeechSink::new(self.generation, self.events_tx.clone());
        match recognizer.start(sink) {
            Ok(()) => {
                tracing::debug!(
                    language = %self.config.language,
                    generation = self.generation,
                    "Dictation started"
                );
                self.state.begin();
                StartOutcome::Started
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start dictation");
                self.state.fail(SpeechErrorKind::Other);
                StartOutcome::Failed(SpeechErrorKind::Other)
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.state.is_listening() {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.state.finish();
        tracing::debug!("Dictation stopped");
    }

    /// Start when idle, stop when listening
    pub fn toggle(&mut self) -> Option<StartOutcome> {
        if self.state.is_listening() {
            self.stop();
            None
        } else {
            Some(self.start())
        }
    }

    /// Typing or sending discards the provisional transcript
    pub fn clear_interim(&mut self) {
        self.state.clear_interim();
    }

    /// Fold a recognizer event; returns a final transcript to commit.
    ///
    /// The recognizer is stopped once a final result or an error ends the
    /// capture. Events from earlier captures are dropped.
    pub fn handle(&mut self, capture: &CaptureEvent) -> Option<String> {
        if capture.generation != self.generation {
            tracing::debug!(
                generation = capture.generation,
                current = self.generation,
                event = ?capture.event,
                "Dropping event from an earlier capture"
            );
            return None;
        }

        let event = &capture.event;
        if let SpeechEvent::Error { code } = event {
            tracing::warn!(code = %code, "Speech recognition error");
        }

        let was_listening = self.state.is_listening();
        let committed = self.state.apply(event, self.config.continuous);

        if was_listening && !self.state.is_listening() && *event != SpeechEvent::End {
            if let Some(recognizer) = self.recognizer.as_mut() {
                recognizer.stop();
            }
            tracing::debug!("Dictation ended by the recognizer");
        }
        committed
    }
}

impl Drop for SpeechInputController {
    fn drop(&mut self) {
        if self.state.is_listening() {
            if let Some(recognizer) = self.recognizer.as_mut() {
                recognizer.stop();
            }
        }
    }
}
