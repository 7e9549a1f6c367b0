use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.content)
    }
}

/// Per-conversation message accumulator.
///
/// Incoming messages land in `unprocessed`. Clearing moves them into the
/// bounded `history`, so every message is handed to a planner as "new" exactly
/// once and as history afterwards.
#[derive(Debug, Clone)]
pub struct ObservationRegistry {
    conversation_id: String,
    history: VecDeque<ChatMessage>,
    unprocessed: Vec<ChatMessage>,
    max_history: usize,
}

impl ObservationRegistry {
    pub fn new(conversation_id: impl Into<String>, max_history: usize) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            history: VecDeque::new(),
            unprocessed: Vec::new(),
            max_history: max_history.max(1),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn observe(&mut self, message: ChatMessage) {
        self.unprocessed.push(message);
    }

    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    pub fn unprocessed(&self) -> &[ChatMessage] {
        &self.unprocessed
    }

    pub fn unprocessed_count(&self) -> usize {
        self.unprocessed.len()
    }

    /// Drain the unprocessed queue into history, oldest history dropped first.
    pub fn clear_unprocessed(&mut self) -> usize {
        let drained = self.unprocessed.len();
        for message in self.unprocessed.drain(..) {
            self.history.push_back(message);
        }
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        drained
    }

    /// History followed by any unprocessed messages, one per line.
    pub fn render_recent(&self) -> String {
        let mut text = String::new();
        for msg in self.history.iter().chain(self.unprocessed.iter()) {
            text.push_str(&format!("{msg}\n"));
        }
        text
    }
}
