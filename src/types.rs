use serde::{Deserialize, Serialize};

/// A single message as reported by the mail service.
///
/// Messages are immutable once fetched; a new fetch always produces an
/// entirely new set, never a merge with prior contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque identifier, unique within a single fetch result.
    pub uid: String,
    pub sender: String,
    pub subject: String,
    /// Date string as the service formatted it; not parsed locally.
    pub date: String,
    #[serde(default)]
    pub snippet: Option<String>,
    /// Folder name as reported by the service. May be empty.
    #[serde(default)]
    pub folder: String,
}
