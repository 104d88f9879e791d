//! Scribe Core Library
//!
//! Anchored feedback and word-level diffs for prose kept under version
//! control, providing:
//! - Word tokenization and word-level diffs
//! - Old-line to new-line mappings from structural diff hunks
//! - Annotation positions that follow the text from revision to revision
//! - An annotation store with a status lifecycle, threads and an audit log
//! - Application of suggested edits
//!
//! # Quick Start
//!
//! ```
//! use scribe_core::{diff, DiffOptions};
//!
//! let result = diff("The cat sat.", "The big cat sat down.", &DiffOptions::default()).unwrap();
//! assert_eq!(result.to_marked_text(), "The {+big +}cat sat{+ down+}.");
//! assert_eq!(result.modified_text(), "The big cat sat down.");
//! ```
//!
//! # Features
//!
//! ## Annotations that follow the text
//!
//! ```
//! use scribe_core::{
//!     AnnotationPosition, AnnotationStore, MemoryRevisions, NewAnnotation, Status,
//! };
//!
//! let mut revisions = MemoryRevisions::new();
//! revisions.commit("r1", [("ch1.md", "One.\nTwo.\nThree.\n")]);
//! let mut store = AnnotationStore::in_memory(revisions);
//!
//! let id = store
//!     .create(NewAnnotation::comment(
//!         AnnotationPosition::line("ch1.md", 2),
//!         "r1",
//!         "ana",
//!         "Expand this.",
//!     ))
//!     .unwrap()
//!     .id
//!     .clone();
//!
//! // A line is inserted above the annotation.
//! store
//!     .revisions_mut()
//!     .commit("r2", [("ch1.md", "Zero.\nOne.\nTwo.\nThree.\n")]);
//! store.on_revision_change("ch1.md", "r1", "r2").unwrap();
//! assert_eq!(store.get(&id).unwrap().position.line_start, 3);
//!
//! store.transition(&id, Status::Resolved, "ben", Some("expanded")).unwrap();
//! ```
//!
//! ## Suggestions
//!
//! ```
//! use scribe_core::{suggestion, AnnotationPosition, AnnotationStore, MemoryRevisions, NewAnnotation};
//!
//! let mut revisions = MemoryRevisions::new();
//! revisions.commit("r1", [("ch1.md", "The cat sat.\n")]);
//! let mut store = AnnotationStore::in_memory(revisions);
//!
//! let note = store
//!     .create(NewAnnotation::suggestion(
//!         AnnotationPosition::line("ch1.md", 1).with_columns(4, 7),
//!         "r1",
//!         "ana",
//!         "More specific",
//!         "tabby",
//!     ))
//!     .unwrap();
//! let applied = suggestion::apply(note, "The cat sat.\n").unwrap();
//! assert_eq!(applied.text, "The tabby sat.\n");
//! ```

mod config;
mod error;
#[cfg(feature = "git")]
mod git;
mod line_mapping;
mod records;
mod remap;
mod revisions;
mod store;
pub mod suggestion;
mod tokenizer;
mod types;
mod word_diff;

pub use config::{Config, ReviewConfig};
pub use error::{Result, ScribeError};
#[cfg(feature = "git")]
pub use git::GitRevisions;
pub use line_mapping::{build_line_mapping, Hunk, HunkLine, LineMapping, LineOrigin, MappedLine};
pub use records::{AuditEntry, RecordStore};
pub use remap::{relocate_by_context, remap, Orphan, RemapResult};
pub use revisions::{diff_lines, MemoryRevisions, RevisionCollaborator};
pub use store::{scribe_dir, AnnotationStore, SCRIBE_DIR};
pub use suggestion::Applied;
pub use tokenizer::{concat, tokenize, Token, TokenKind, TokenizeOptions};
pub use types::*;
pub use word_diff::{
    diff, edit_distance, levenshtein, similarity, DiffKind, DiffOptions, DiffResult, DiffStats,
    DiffUnit, DisplayItem,
};

/// Time provider trait for testing.
///
/// Allows injecting controlled time into the store for deterministic
/// timestamps. Only used when explicitly set via `with_time_provider()`.
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> i64;
}

impl<F> TimeProvider for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now(&self) -> i64 {
        self()
    }
}
