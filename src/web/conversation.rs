use std::sync::{Arc, Mutex};

/// Number of history entries fed back as context: 10 entries, i.e. the
/// last 5 user/assistant exchanges.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// The one conversation shared by every caller.
///
/// Storage grows without bound until the process exits; only reads are
/// windowed. Entries alternate user utterance, model reply.
#[derive(Debug, Default, Clone)]
pub struct ConversationHistory {
    entries: Vec<String>,
}

pub type SharedHistory = Arc<Mutex<ConversationHistory>>;

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `window` entries, oldest first.
    pub fn recent(&self, window: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(window);
        &self.entries[start..]
    }

    /// Newline-joined `recent(window)`, the text sent ahead of a new prompt.
    pub fn context(&self, window: usize) -> String {
        self.recent(window).join("\n")
    }

    /// Append a user turn and its reply together so the pair stays adjacent.
    pub fn record_exchange(&mut self, utterance: String, reply: String) {
        self.entries.push(utterance);
        self.entries.push(reply);
    }
}
