use std::fmt;

use crate::post::Location;

/// What happened to a post on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Invalidation signal for one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub location: Location,
    pub kind: ChangeKind,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.location)
    }
}
