//! Speech capture state and error taxonomy

use super::event::SpeechEvent;
use serde::{Deserialize, Serialize};

/// User-facing category of a recognition failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechErrorKind {
    PermissionDenied,
    NoMicrophone,
    NoSpeech,
    Network,
    Other,
}

impl SpeechErrorKind {
    /// Map a platform error code to its category
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "permission-denied" | "service-not-allowed" => Self::PermissionDenied,
            "audio-capture" | "no-microphone" => Self::NoMicrophone,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            _ => Self::Other,
        }
    }

    /// Message the UI shows verbatim
    pub fn user_message(self) -> &'static str {
        match self {
            Self::PermissionDenied => "Permite el acceso al micrófono en tu navegador.",
            Self::NoMicrophone => "No se encontró un micrófono disponible.",
            Self::NoSpeech => "No se detectó audio. Habla más cerca del micrófono.",
            Self::Network => "Error de conexión. Verifica tu internet.",
            Self::Other => "Error en el reconocimiento de voz.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechStatus {
    #[default]
    Idle,
    Listening,
    Error,
}

/// Transient capture state, rebuilt per platform session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechState {
    pub status: SpeechStatus,
    pub interim_transcript: String,
    pub last_error: Option<SpeechErrorKind>,
}

impl SpeechState {
    pub fn is_listening(&self) -> bool {
        self.status == SpeechStatus::Listening
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.last_error.map(SpeechErrorKind::user_message)
    }

    /// Capture started: a previous error is cleared
    pub fn begin(&mut self) {
        self.status = SpeechStatus::Listening;
        self.interim_transcript.clear();
        self.last_error = None;
    }

    pub fn fail(&mut self, kind: SpeechErrorKind) {
        self.status = SpeechStatus::Error;
        self.interim_transcript.clear();
        self.last_error = Some(kind);
    }

    /// Back to idle, keeping any error visible
    pub fn finish(&mut self) {
        if self.status == SpeechStatus::Listening {
            self.status = SpeechStatus::Idle;
        }
        self.interim_transcript.clear();
    }

    pub fn clear_interim(&mut self) {
        self.interim_transcript.clear();
    }

    /// Fold one recognizer event into the state.
    ///
    /// Returns the final transcript to commit to the input buffer, if any.
    pub fn apply(&mut self, event: &SpeechEvent, continuous: bool) -> Option<String> {
        match event {
            SpeechEvent::Start => {
                self.begin();
                None
            }
            SpeechEvent::Interim { text } => {
                if self.is_listening() {
                    self.interim_transcript.clone_from(text);
                }
                None
            }
            SpeechEvent::Final { text } => {
                // Results after a stop, an error or a completed utterance are dropped
                if !self.is_listening() {
                    return None;
                }
                self.interim_transcript.clear();
                if !continuous {
                    self.status = SpeechStatus::Idle;
                }
                Some(text.clone())
            }
            SpeechEvent::Error { code } => {
                self.fail(SpeechErrorKind::from_code(code));
                None
            }
            SpeechEvent::End => {
                self.finish();
                None
            }
        }
    }
}
