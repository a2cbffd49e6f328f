//! Folder count aggregation.
//!
//! Pure derivation over a repository snapshot; stats are never stored
//! independently of the snapshot they were computed from.

use crate::repository::RepositorySnapshot;

/// Summary counts over the current snapshot.
///
/// `total` always equals the snapshot's message count. The three named
/// buckets are disjoint, and a message whose folder matches none of them
/// contributes to `total` only, so `inbox + spam + promotions <= total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub inbox: usize,
    pub spam: usize,
    pub promotions: usize,
}

/// Folder classification buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FolderClass {
    Inbox,
    Spam,
    Promotions,
    Other,
}

/// Classify a folder name, case-insensitively.
///
/// "junk" counts as spam (several providers use it for the same folder).
fn classify(folder: &str) -> FolderClass {
    if folder.eq_ignore_ascii_case("inbox") {
        FolderClass::Inbox
    } else if folder.eq_ignore_ascii_case("spam") || folder.eq_ignore_ascii_case("junk") {
        FolderClass::Spam
    } else if folder.eq_ignore_ascii_case("promotions") {
        FolderClass::Promotions
    } else {
        FolderClass::Other
    }
}

/// Compute folder counts for a snapshot.
pub fn compute(snapshot: &RepositorySnapshot) -> Stats {
    let mut stats = Stats {
        total: snapshot.messages.len(),
        ..Stats::default()
    };
    for message in &snapshot.messages {
        match classify(&message.folder) {
            FolderClass::Inbox => stats.inbox += 1,
            FolderClass::Spam => stats.spam += 1,
            FolderClass::Promotions => stats.promotions += 1,
            FolderClass::Other => {}
        }
    }
    stats
}
