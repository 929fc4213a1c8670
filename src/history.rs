use chrono::Local;

/// Author of a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "AI Assistant",
        }
    }
}

/// One immutable line of the conversation transcript.
#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl ChatEntry {
    /// Build an entry stamped with the current local wall-clock time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Append-only, in-memory conversation log. Not persisted; cleared only by
/// an explicit user action.
#[derive(Debug, Default)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order. Safe to call repeatedly for re-rendering.
    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }
}
