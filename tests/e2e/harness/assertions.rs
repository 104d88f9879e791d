use anyhow::Result;
use scribe_core::Status;
use std::collections::HashMap;

use super::workspace::Store;

/// Declarative assertions on store state
pub enum Assertion {
    // Single annotation
    Position {
        label: String,
        lines: (u32, u32),
    },
    Columns {
        label: String,
        columns: Option<(u32, u32)>,
    },
    Status {
        label: String,
        status: Status,
    },
    NeedsReview {
        label: String,
        expected: bool,
    },
    Anchor {
        label: String,
        revision: String,
    },
    ResolvedBy {
        label: String,
        actor: String,
    },
    Deleted(String),
    ThreadSize {
        label: String,
        size: usize,
    },

    // Whole store
    Count(usize),
    OpenCount(usize),

    // Last revision change
    Report {
        moved: usize,
        orphaned: usize,
        untouched: usize,
    },

    // Persistence
    AuditEntries(usize),
    FileContains {
        path: String,
        text: String,
    },

    // Events since the scenario started
    EventSeen(EventMatch),

    // Custom (takes mutable reference to allow mutations)
    Custom(Box<dyn Fn(&mut Store, &HashMap<String, String>) -> Result<()> + Send + Sync>),
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position { label, lines } => {
                write!(f, "Position {{ label: {:?}, lines: {:?} }}", label, lines)
            }
            Self::Columns { label, columns } => {
                write!(f, "Columns {{ label: {:?}, columns: {:?} }}", label, columns)
            }
            Self::Status { label, status } => {
                write!(f, "Status {{ label: {:?}, status: {} }}", label, status)
            }
            Self::NeedsReview { label, expected } => {
                write!(f, "NeedsReview {{ label: {:?}, expected: {} }}", label, expected)
            }
            Self::Anchor { label, revision } => {
                write!(f, "Anchor {{ label: {:?}, revision: {:?} }}", label, revision)
            }
            Self::ResolvedBy { label, actor } => {
                write!(f, "ResolvedBy {{ label: {:?}, actor: {:?} }}", label, actor)
            }
            Self::Deleted(label) => write!(f, "Deleted({:?})", label),
            Self::ThreadSize { label, size } => {
                write!(f, "ThreadSize {{ label: {:?}, size: {} }}", label, size)
            }
            Self::Count(n) => write!(f, "Count({})", n),
            Self::OpenCount(n) => write!(f, "OpenCount({})", n),
            Self::Report {
                moved,
                orphaned,
                untouched,
            } => write!(
                f,
                "Report {{ moved: {}, orphaned: {}, untouched: {} }}",
                moved, orphaned, untouched
            ),
            Self::AuditEntries(n) => write!(f, "AuditEntries({})", n),
            Self::FileContains { path, text } => {
                write!(f, "FileContains {{ path: {:?}, text: {:?} }}", path, text)
            }
            Self::EventSeen(m) => write!(f, "EventSeen({:?})", m),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// Match against store events by label
#[derive(Clone, Debug)]
pub enum EventMatch {
    Created(String),
    Resolved(String),
    Deleted(String),
    Orphaned { label: String, nearest_line: u32 },
}
