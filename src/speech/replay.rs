//! Dictation backed by a JSON-lines file of recorded events
//!
//! Each line is one [`SpeechEvent`], e.g. `{"type":"final","text":"hola"}`.
//! The recognizer wraps the file with `Start`/`End` the way a live platform
//! session would, and outside continuous mode it ends after the first final
//! result.

use super::controller::{Recognizer, RecognizerConfig, SpeechError, SpeechPlatform};
use super::event::{SpeechEvent, SpeechSink};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay between replayed events unless configured otherwise
pub const DEFAULT_REPLAY_PACE: Duration = Duration::from_millis(250);

pub struct ReplayPlatform {
    path: PathBuf,
    pace: Duration,
}

impl ReplayPlatform {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pace: DEFAULT_REPLAY_PACE,
        }
    }

    /// Delay between replayed events
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }
}

impl SpeechPlatform for ReplayPlatform {
    fn recognizer(&self, config: &RecognizerConfig) -> Option<Box<dyn Recognizer>> {
        Some(Box::new(ReplayRecognizer {
            path: self.path.clone(),
            pace: self.pace,
            continuous: config.continuous,
            interim_results: config.interim_results,
            cancel: None,
        }))
    }
}

struct ReplayRecognizer {
    path: PathBuf,
    pace: Duration,
    continuous: bool,
    interim_results: bool,
    cancel: Option<CancellationToken>,
}

impl Recognizer for ReplayRecognizer {
    fn start(&mut self, events: SpeechSink) -> Result<(), SpeechError> {
        if self.cancel.as_ref().is_some_and(|c| !c.is_cancelled()) {
            return Err(SpeechError::StartFailed("recognition already started".to_string()));
        }

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let path = self.path.clone();
        let options = ReplayOptions {
            pace: self.pace,
            continuous: self.continuous,
            interim_results: self.interim_results,
        };

        tokio::spawn(async move {
            events.send(SpeechEvent::Start);
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = replay(&path, options, &events) => {}
            }
            cancel.cancel();
            events.send(SpeechEvent::End);
        });

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReplayOptions {
    pace: Duration,
    continuous: bool,
    interim_results: bool,
}

async fn replay(path: &Path, options: ReplayOptions, events: &SpeechSink) {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to open speech replay");
            events.send(SpeechEvent::error("audio-capture"));
            return;
        }
    };

    for event in parse_events(&contents) {
        match event {
            // Lifecycle events belong to the session, not the recording
            SpeechEvent::Start => continue,
            SpeechEvent::End => return,
            SpeechEvent::Interim { .. } if !options.interim_results => continue,
            _ => {}
        }
        tokio::time::sleep(options.pace).await;
        let last = match event {
            SpeechEvent::Error { .. } => true,
            SpeechEvent::Final { .. } => !options.continuous,
            _ => false,
        };
        if !events.send(event) || last {
            return;
        }
    }
}

/// Parse replay lines, skipping blanks, `#` comments and malformed lines
pub fn parse_events(contents: &str) -> Vec<SpeechEvent> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(n, line)| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(line = n + 1, error = %e, "Skipping malformed speech replay line");
                None
            }
        })
        .collect()
}
