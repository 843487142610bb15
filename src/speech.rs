//! Voice input
//!
//! The platform dictation API is injected through [`SpeechPlatform`]; the
//! controller turns its typed events into capture state and committed text.

mod controller;
mod event;
mod replay;
mod state;

pub use controller::{
    NoDictation, Recognizer, RecognizerConfig, SpeechError, SpeechInputController, SpeechPlatform,
    StartOutcome, UNSUPPORTED_MESSAGE,
};
pub use event::{CaptureEvent, SpeechEvent, SpeechSink};
pub use replay::{ReplayPlatform, DEFAULT_REPLAY_PACE};
pub use state::{SpeechErrorKind, SpeechState, SpeechStatus};
