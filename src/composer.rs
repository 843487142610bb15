//! Pending input buffer

/// Text the user is composing, fed by keystrokes and dictation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputComposer {
    buffer: String,
}

impl InputComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Keystrokes append to whatever is there
    pub fn type_text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Append a final transcript after exactly one space. No trimming: the
    /// send path is the only validation gate.
    pub fn commit_final(&mut self, transcript: &str) {
        self.buffer.push(' ');
        self.buffer.push_str(transcript);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
