use std::path::PathBuf;

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// Notification emitted by [`DirectoryWatcher`](super::DirectoryWatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Initial registration finished
    Ready,
    /// A file appeared
    Added(PathBuf),
    /// A file's content changed
    Changed(PathBuf),
}

impl WatchEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Added(_) => "added",
            Self::Changed(_) => "changed",
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Ready => None,
            Self::Added(path) | Self::Changed(path) => Some(path),
        }
    }
}

/// What happened to a file, as far as rebuilds care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Added,
    Changed,
}

impl ChangeKind {
    /// Map a raw notify kind. A file renamed into place counts as added;
    /// removals and metadata-only changes are ignored.
    pub(super) fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Added),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => None,
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Added),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Changed),
            _ => None,
        }
    }

    pub(super) fn into_event(self, path: PathBuf) -> WatchEvent {
        match self {
            Self::Added => WatchEvent::Added(path),
            Self::Changed => WatchEvent::Changed(path),
        }
    }
}
