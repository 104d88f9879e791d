//! Revision engine interface and an in-memory implementation.
//!
//! The annotation store never reads repositories itself. It asks a
//! [`RevisionCollaborator`] for file text at a revision and for the
//! structural diff between two revisions.

use crate::error::{Result, ScribeError};
use crate::line_mapping::{Hunk, HunkLine, LineOrigin};
use similar::{Algorithm, DiffTag, TextDiff};
use std::collections::BTreeMap;
use tracing::debug;

/// Source of file text and structural diffs.
pub trait RevisionCollaborator {
    /// Returns the full text of `path` at `revision`.
    ///
    /// # Errors
    ///
    /// `BlobNotFound` when the file does not exist at that revision.
    fn get_text_at(&self, path: &str, revision: &str) -> Result<String>;

    /// Returns the hunks that turn `path` at `old_revision` into `path` at
    /// `new_revision`, in git conventions.
    fn get_structural_diff(
        &self,
        path: &str,
        old_revision: &str,
        new_revision: &str,
    ) -> Result<Vec<Hunk>>;

    /// Returns the id of the revision the working copy is on.
    fn get_current_revision_id(&self) -> Result<String>;
}

impl<T: RevisionCollaborator + ?Sized> RevisionCollaborator for &T {
    fn get_text_at(&self, path: &str, revision: &str) -> Result<String> {
        (**self).get_text_at(path, revision)
    }

    fn get_structural_diff(
        &self,
        path: &str,
        old_revision: &str,
        new_revision: &str,
    ) -> Result<Vec<Hunk>> {
        (**self).get_structural_diff(path, old_revision, new_revision)
    }

    fn get_current_revision_id(&self) -> Result<String> {
        (**self).get_current_revision_id()
    }
}

impl<T: RevisionCollaborator + ?Sized> RevisionCollaborator for Box<T> {
    fn get_text_at(&self, path: &str, revision: &str) -> Result<String> {
        (**self).get_text_at(path, revision)
    }

    fn get_structural_diff(
        &self,
        path: &str,
        old_revision: &str,
        new_revision: &str,
    ) -> Result<Vec<Hunk>> {
        (**self).get_structural_diff(path, old_revision, new_revision)
    }

    fn get_current_revision_id(&self) -> Result<String> {
        (**self).get_current_revision_id()
    }
}

/// Revisions held in memory as full file snapshots.
///
/// Each [`commit`](Self::commit) starts from the previous revision's files,
/// so a commit only names the files it changes.
#[derive(Debug, Clone, Default)]
pub struct MemoryRevisions {
    order: Vec<String>,
    snapshots: BTreeMap<String, BTreeMap<String, String>>,
}

impl MemoryRevisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records revision `id` with `files` written on top of the previous
    /// revision. Becomes the current revision.
    pub fn commit<P, T>(&mut self, id: impl Into<String>, files: impl IntoIterator<Item = (P, T)>)
    where
        P: Into<String>,
        T: Into<String>,
    {
        let id = id.into();
        let mut snapshot = self
            .order
            .last()
            .and_then(|prev| self.snapshots.get(prev))
            .cloned()
            .unwrap_or_default();
        for (path, text) in files {
            snapshot.insert(path.into(), text.into());
        }
        debug!(revision = %id, files = snapshot.len(), "recorded revision");
        self.snapshots.insert(id.clone(), snapshot);
        self.order.retain(|existing| *existing != id);
        self.order.push(id);
    }

    /// Records revision `id` identical to the previous one except that
    /// `path` no longer exists.
    pub fn remove(&mut self, id: impl Into<String>, path: &str) {
        self.commit(id, Vec::<(String, String)>::new());
        if let Some(snapshot) = self.order.last().and_then(|id| self.snapshots.get_mut(id)) {
            snapshot.remove(path);
        }
    }

    /// Records revision `id` by applying a unified diff to `path` as it
    /// stands in the current revision. A missing file patches as empty text.
    ///
    /// # Errors
    ///
    /// Returns `Revision` if there is no current revision, the patch does not
    /// parse, or its context and removed lines disagree with the file.
    pub fn commit_patch(&mut self, id: impl Into<String>, path: &str, patch: &str) -> Result<()> {
        let current = self.get_current_revision_id()?;
        let old = self.lookup(path, &current).cloned().unwrap_or_default();
        let old_lines: Vec<&str> = old.lines().collect();
        let mismatch = |line: usize| {
            ScribeError::Revision(format!("patch does not apply to {} at line {}", path, line))
        };

        let hunks = Hunk::from_unified(patch)?;
        let mut out: Vec<&str> = Vec::with_capacity(old_lines.len());
        let mut cursor = 0usize;
        for hunk in &hunks {
            let first = if hunk.old_len() == 0 {
                hunk.old_start as usize
            } else {
                (hunk.old_start as usize).saturating_sub(1)
            };
            if first < cursor || first > old_lines.len() {
                return Err(mismatch(first + 1));
            }
            out.extend_from_slice(&old_lines[cursor..first]);
            cursor = first;

            for line in &hunk.lines {
                match line.origin {
                    LineOrigin::Added => out.push(&line.text),
                    LineOrigin::Context | LineOrigin::Removed => {
                        if old_lines.get(cursor) != Some(&line.text.as_str()) {
                            return Err(mismatch(cursor + 1));
                        }
                        if line.origin == LineOrigin::Context {
                            out.push(&line.text);
                        }
                        cursor += 1;
                    }
                }
            }
        }
        out.extend_from_slice(&old_lines[cursor..]);

        let mut text = out.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        debug!(revision = %current, path, hunks = hunks.len(), "applied patch");
        self.commit(id, [(path, text)]);
        Ok(())
    }

    /// Revision ids, oldest first.
    pub fn revisions(&self) -> &[String] {
        &self.order
    }

    fn lookup(&self, path: &str, revision: &str) -> Option<&String> {
        self.snapshots.get(revision)?.get(path)
    }

    fn require_revision(&self, revision: &str) -> Result<()> {
        if self.snapshots.contains_key(revision) {
            Ok(())
        } else {
            Err(ScribeError::Revision(format!("unknown revision {}", revision)))
        }
    }
}

impl RevisionCollaborator for MemoryRevisions {
    fn get_text_at(&self, path: &str, revision: &str) -> Result<String> {
        self.lookup(path, revision)
            .cloned()
            .ok_or_else(|| ScribeError::BlobNotFound {
                path: path.to_string(),
                revision: revision.to_string(),
            })
    }

    fn get_structural_diff(
        &self,
        path: &str,
        old_revision: &str,
        new_revision: &str,
    ) -> Result<Vec<Hunk>> {
        self.require_revision(old_revision)?;
        self.require_revision(new_revision)?;

        let old = self.lookup(path, old_revision);
        let new = self.lookup(path, new_revision);
        if old.is_none() && new.is_none() {
            return Err(ScribeError::BlobNotFound {
                path: path.to_string(),
                revision: new_revision.to_string(),
            });
        }

        // A file missing on one side diffs against empty text.
        let empty = String::new();
        Ok(diff_lines(
            old.unwrap_or(&empty),
            new.unwrap_or(&empty),
        ))
    }

    fn get_current_revision_id(&self) -> Result<String> {
        self.order
            .last()
            .cloned()
            .ok_or_else(|| ScribeError::Revision("no revisions recorded".to_string()))
    }
}

/// Line-level diff of two texts as zero-context hunks.
///
/// Adjacent changes share one hunk with removals before additions. Hunk
/// starts follow git conventions: a side without lines names the line
/// before the change.
pub fn diff_lines(old: &str, new: &str) -> Vec<Hunk> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&a[..], &b[..]);

    let mut hunks = Vec::new();
    let mut current: Option<PendingHunk> = None;

    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            hunks.extend(current.take().map(PendingHunk::finish));
            continue;
        }
        let pending = current.get_or_insert_with(|| PendingHunk {
            old_before: old_range.start,
            new_before: new_range.start,
            removed: Vec::new(),
            added: Vec::new(),
        });
        pending.removed.extend(a[old_range].iter().map(|text| HunkLine::removed(*text)));
        pending.added.extend(b[new_range].iter().map(|text| HunkLine::added(*text)));
    }
    hunks.extend(current.map(PendingHunk::finish));

    hunks
}

/// Changed lines between two runs of equal lines.
struct PendingHunk {
    /// Lines preceding the change on each side.
    old_before: usize,
    new_before: usize,
    removed: Vec<HunkLine>,
    added: Vec<HunkLine>,
}

impl PendingHunk {
    fn finish(self) -> Hunk {
        let mut lines = self.removed;
        lines.extend(self.added);
        let mut hunk = Hunk::new(self.old_before as u32, self.new_before as u32, lines);
        if hunk.old_len() > 0 {
            hunk.old_start += 1;
        }
        if hunk.new_len() > 0 {
            hunk.new_start += 1;
        }
        hunk
    }
}
