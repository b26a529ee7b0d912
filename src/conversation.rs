//! Conversation state.
//!
//! An append-only log of turns that starts with an AI greeting. Prompts see
//! the log through a `HistoryWindow`; the log itself never shrinks.

/// Greeting used when none is configured.
pub const DEFAULT_GREETING: &str =
    "Hello! I am an SQL assistant. Ask me anything about your database.";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Ai,
    Human,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ai => "AI",
            Self::Human => "Human",
        }
    }
}

/// A single message in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.speaker.label(), self.text)
    }
}

/// How much of the log is serialised into prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryWindow {
    /// Every turn, every time.
    #[default]
    Unbounded,
    /// Only the most recent `k` turns.
    LastTurns(usize),
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Starts a conversation with one AI greeting turn.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn {
                speaker: Speaker::Ai,
                text: greeting.into(),
            }],
        }
    }

    pub fn push_human(&mut self, text: impl Into<String>) {
        self.push(Speaker::Human, text.into());
    }

    pub fn push_ai(&mut self, text: impl Into<String>) {
        self.push(Speaker::Ai, text.into());
    }

    fn push(&mut self, speaker: Speaker, text: String) {
        self.turns.push(Turn { speaker, text });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Serialises the windowed tail of the log, one `Speaker: text` line per turn.
    pub fn render_for_prompt(&self, window: HistoryWindow) -> String {
        let start = match window {
            HistoryWindow::Unbounded => 0,
            HistoryWindow::LastTurns(k) => self.turns.len().saturating_sub(k),
        };

        self.turns[start..]
            .iter()
            .map(Turn::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}
