//! Error types for scribe_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for scribe_core operations.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// The file does not exist at the revision an annotation is being anchored to.
    #[error("cannot anchor to {path} at revision {revision}")]
    AnchorNotFound {
        /// Repository-relative file path
        path: String,
        /// Revision the caller tried to anchor to
        revision: String,
    },

    /// The revision engine has no blob for the file at the revision.
    #[error("blob not found: {path} at revision {revision}")]
    BlobNotFound {
        /// Repository-relative file path
        path: String,
        /// Requested revision
        revision: String,
    },

    /// Status change not permitted by the annotation lifecycle.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status tag
        from: String,
        /// Requested status tag
        to: String,
    },

    /// A position refers to lines or columns the text does not have.
    #[error("position out of range: {reason}")]
    PositionOutOfRange {
        /// What exceeded the text
        reason: String,
    },

    /// Token count exceeds the configured diff guard.
    #[error("diff too large: {tokens} tokens exceeds limit of {limit}")]
    DiffTooLarge {
        /// Token count of the larger side after trimming shared context
        tokens: usize,
        /// Configured maximum
        limit: usize,
    },

    /// No annotation with the given id.
    #[error("annotation not found: {0}")]
    AnnotationNotFound(String),

    /// Annotation cannot be applied as a suggestion.
    #[error("invalid suggestion {id}: {reason}")]
    InvalidSuggestion {
        /// Annotation id
        id: String,
        /// Why it cannot be applied
        reason: String,
    },

    /// Position fields are inconsistent (e.g. `line_end < line_start`).
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// A string did not name a known status, type or priority.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Annotation store is locked by another process.
    #[error("annotation store locked by another process (PID: {pid})")]
    StoreLocked {
        /// Process ID holding the lock, 0 if unknown
        pid: u32,
    },

    /// The revision collaborator failed for a reason other than a missing blob.
    #[error("revision engine error: {0}")]
    Revision(String),

    /// git2 failure inside the git adapter.
    #[cfg(feature = "git")]
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// A persisted annotation record could not be decoded.
    #[error("corrupted record at {}: {}", path.display(), reason)]
    CorruptedRecord {
        /// Path to the record
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Serialization error while writing records.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::AnchorNotFound { .. } => {
                Some("Check the file path and save the file before leaving feedback on it.")
            }
            Self::InvalidTransition { .. } => Some(
                "Resolved, accepted and rejected notes are final. Reply to the note instead.",
            ),
            Self::PositionOutOfRange { .. } => {
                Some("The note may be stale. Run 'scribe sync' to move it to the current text.")
            }
            Self::DiffTooLarge { .. } => {
                Some("Compare smaller sections, or raise diff.max_tokens in .scribe/config.toml.")
            }
            Self::StoreLocked { .. } => Some(
                "Another scribe process is using this store. Remove .scribe/LOCK if it is dead.",
            ),
            Self::CorruptedRecord { .. } => {
                Some("Restore the record from backup or delete it to drop the note.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for scribe_core operations.
pub type Result<T> = std::result::Result<T, ScribeError>;
