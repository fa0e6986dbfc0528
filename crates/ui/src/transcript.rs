//! The message transcript: an ordered list of user and assistant messages.
//!
//! The transcript owns message identity. Every append allocates the next id
//! from a process-wide counter, so ids stay unique and ordered across
//! `clear`. Updates address messages by id; an id that no longer exists, or
//! one whose entry has been frozen, is ignored, which makes late stream
//! events after a clear or a cancel harmless.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier for one transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Out-of-band annotation attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The user stopped generation. Not an error.
    Stopped,
    /// The request or stream failed.
    Error(String),
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// True while an assistant message is still receiving chunks.
    pub streaming: bool,
    pub notice: Option<Notice>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MessageEntry {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Ordered message store with monotonic id allocation.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<MessageEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> MessageId {
        MessageId(NEXT_MESSAGE_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Append a finished user message.
    pub fn append_user(&mut self, content: impl Into<String>) -> MessageId {
        let id = self.allocate_id();
        self.entries.push(MessageEntry {
            id,
            role: Role::User,
            content: content.into(),
            streaming: false,
            notice: None,
            created_at: chrono::Utc::now(),
        });
        id
    }

    /// Append an empty assistant message that is about to stream.
    pub fn append_assistant(&mut self) -> MessageId {
        let id = self.allocate_id();
        self.entries.push(MessageEntry {
            id,
            role: Role::Assistant,
            content: String::new(),
            streaming: true,
            notice: None,
            created_at: chrono::Utc::now(),
        });
        id
    }

    /// Replace the content of a still-open message with the full accumulated
    /// text.
    ///
    /// Unknown ids and frozen entries are ignored.
    pub fn update(&mut self, id: MessageId, text: impl Into<String>) {
        match self.get_mut(id) {
            Some(entry) if entry.streaming => entry.content = text.into(),
            Some(_) => {
                tracing::debug!(message = id.value(), "update for frozen message dropped");
            }
            None => {
                tracing::debug!(message = id.value(), "update for unknown message dropped");
            }
        }
    }

    /// Mark a streaming message as finished. Unknown ids are ignored.
    pub fn freeze(&mut self, id: MessageId) {
        if let Some(entry) = self.get_mut(id) {
            entry.streaming = false;
        }
    }

    /// Attach a notice to a message and stop its streaming state.
    pub fn set_notice(&mut self, id: MessageId, notice: Notice) {
        if let Some(entry) = self.get_mut(id) {
            entry.notice = Some(notice);
            entry.streaming = false;
        }
    }

    /// Drop all messages. Id allocation keeps counting.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn get(&self, id: MessageId) -> Option<&MessageEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut MessageEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
