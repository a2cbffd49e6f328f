//! Message repository: the authoritative current message set.
//!
//! The repository only ever replaces its contents wholesale. There is no
//! diffing and no merge; whichever fetch applies last wins, and any stats
//! derived from an earlier snapshot are invalid after a replace.

use chrono::{DateTime, Utc};

use crate::types::Message;

/// Which kind of fetch produced the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    /// Full listing across folders.
    Full,
    /// Filtered by sender search term.
    FilteredBy(String),
}

/// The current message set plus the mode that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySnapshot {
    /// Messages in service response order.
    pub messages: Vec<Message>,
    pub mode: ViewMode,
    /// When the snapshot was fetched; None until the first fetch lands.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Default for RepositorySnapshot {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            mode: ViewMode::Full,
            fetched_at: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MessageRepository {
    snapshot: RepositorySnapshot,
}

impl MessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally overwrite the snapshot with a new message set.
    pub fn replace(&mut self, messages: Vec<Message>, mode: ViewMode) {
        self.snapshot = RepositorySnapshot {
            messages,
            mode,
            fetched_at: Some(Utc::now()),
        };
    }

    /// Discard the snapshot entirely (session reset).
    pub fn clear(&mut self) {
        self.snapshot = RepositorySnapshot::default();
    }

    pub fn current(&self) -> &RepositorySnapshot {
        &self.snapshot
    }

    /// Whether the current snapshot came from a sender search.
    pub fn is_filtered(&self) -> bool {
        matches!(self.snapshot.mode, ViewMode::FilteredBy(_))
    }
}
