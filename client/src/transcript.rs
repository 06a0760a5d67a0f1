//! Chat transcript state for the free-form follow-up mode.

use crate::format::render_markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub speaker: Speaker,
    pub text: String,
    frozen: bool,
}

impl ChatEntry {
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Display-safe markup for this entry's current text.
    pub fn render(&self) -> String {
        render_markup(&self.text)
    }
}

/// Ordered conversation history. The active assistant entry is mutated in
/// place while its stream is live, then frozen on completion.
#[derive(Debug, Default)]
pub struct ChatTranscript {
    entries: Vec<ChatEntry>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries.push(ChatEntry {
            speaker: Speaker::User,
            text: text.into(),
            frozen: true,
        });
    }

    /// Start a new, empty assistant entry for an incoming stream.
    pub fn begin_assistant(&mut self) {
        self.entries.push(ChatEntry {
            speaker: Speaker::Assistant,
            text: String::new(),
            frozen: false,
        });
    }

    /// Append a streamed token to the active assistant entry. Ignored when
    /// no entry is active.
    pub fn append_delta(&mut self, token: &str) {
        if let Some(entry) = self.entries.last_mut() {
            if entry.speaker == Speaker::Assistant && !entry.frozen {
                entry.text.push_str(token);
            }
        }
    }

    /// Freeze the active assistant entry when its stream completes.
    pub fn freeze_active(&mut self) {
        if let Some(entry) = self.entries.last_mut() {
            entry.frozen = true;
        }
    }
}
