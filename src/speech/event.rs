//! Events produced by a dictation session

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Typed recognizer callback payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    /// Capture actually began
    Start,
    /// Provisional transcript, replaces the previous interim value
    Interim { text: String },
    /// Completed utterance, committed to the input buffer
    Final { text: String },
    /// Platform error code such as `not-allowed` or `no-speech`
    Error { code: String },
    /// Capture ended, for whatever reason
    End,
}

impl SpeechEvent {
    pub fn error(code: impl Into<String>) -> Self {
        Self::Error { code: code.into() }
    }
}

/// An event tagged with the capture that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub generation: u64,
    pub event: SpeechEvent,
}

/// Where a recognizer publishes the events of one capture
#[derive(Debug, Clone)]
pub struct SpeechSink {
    generation: u64,
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl SpeechSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<CaptureEvent>) -> Self {
        Self { generation, tx }
    }

    /// Returns false once nobody is listening anymore
    pub fn send(&self, event: SpeechEvent) -> bool {
        self.tx
            .send(CaptureEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

#[cfg(test)]
impl SpeechEvent {
    pub fn interim(text: impl Into<String>) -> Self {
        Self::Interim { text: text.into() }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self::Final { text: text.into() }
    }
}
