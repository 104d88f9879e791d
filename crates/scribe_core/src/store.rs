//! Annotation store: creation, lifecycle, threads and revision tracking.

use crate::config::{Config, ReviewConfig};
use crate::error::{Result, ScribeError};
use crate::line_mapping::build_line_mapping;
use crate::records::{AuditEntry, RecordStore};
use crate::remap::{remap, RemapResult};
use crate::revisions::RevisionCollaborator;
use crate::TimeProvider;
use crate::types::{
    Annotation, AnnotationEvent, AnnotationFilter, AnnotationPosition, AnnotationType,
    NewAnnotation, RemapReport, Status, StatusChange,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name of the store directory inside a project.
pub const SCRIBE_DIR: &str = ".scribe";

/// Annotations for one project, kept in memory and optionally on disk.
///
/// Every mutating operation writes the affected record before the
/// in-memory copy changes, so a failed write leaves the store as it was.
pub struct AnnotationStore<R> {
    revisions: R,
    annotations: BTreeMap<String, Annotation>,
    records: Option<RecordStore>,
    review: ReviewConfig,
    events: Vec<AnnotationEvent>,
    time_provider: Option<Arc<dyn TimeProvider>>,
}

impl<R: RevisionCollaborator> AnnotationStore<R> {
    /// Creates a store that keeps nothing on disk.
    pub fn in_memory(revisions: R) -> Self {
        Self {
            revisions,
            annotations: BTreeMap::new(),
            records: None,
            review: ReviewConfig::default(),
            events: Vec::new(),
            time_provider: None,
        }
    }

    /// Creates `.scribe/` under `path` with a default configuration and
    /// opens it.
    ///
    /// # Errors
    ///
    /// Returns an I/O `AlreadyExists` error if the directory exists.
    pub fn init(path: impl AsRef<Path>, revisions: R) -> Result<Self> {
        let scribe_dir = path.as_ref().join(SCRIBE_DIR);
        if scribe_dir.exists() {
            return Err(ScribeError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "scribe store already exists in this directory",
            )));
        }

        fs::create_dir_all(scribe_dir.join("annotations"))?;
        Config::default().save(&scribe_dir)?;
        fs::write(scribe_dir.join(".gitignore"), "LOCK\n*.tmp\n")?;
        info!(path = %scribe_dir.display(), "initialized annotation store");

        Self::open(path, revisions)
    }

    /// Opens the store in `<path>/.scribe`, taking its lock and loading every
    /// record.
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if another live process has it open, and
    /// `CorruptedRecord` if a record does not decode.
    pub fn open(path: impl AsRef<Path>, revisions: R) -> Result<Self> {
        let scribe_dir = path.as_ref().join(SCRIBE_DIR);
        if !scribe_dir.exists() {
            return Err(ScribeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a scribe project: {}", path.as_ref().display()),
            )));
        }

        let config = Config::load(&scribe_dir)?;
        let records = RecordStore::open(&scribe_dir)?;
        let annotations: BTreeMap<String, Annotation> = records
            .load_all()?
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        info!(count = annotations.len(), "opened annotation store");

        Ok(Self {
            revisions,
            annotations,
            records: Some(records),
            review: config.review,
            events: Vec::new(),
            time_provider: None,
        })
    }

    /// Sets a custom time provider for testing.
    pub fn with_time_provider(
        mut self,
        provider: impl TimeProvider + 'static,
    ) -> Self {
        self.time_provider = Some(Arc::new(provider));
        self
    }

    /// Overrides the review defaults (priority, context snapshot size).
    pub fn with_review_config(mut self, review: ReviewConfig) -> Self {
        self.review = review;
        self
    }

    pub fn revisions(&self) -> &R {
        &self.revisions
    }

    pub fn revisions_mut(&mut self) -> &mut R {
        &mut self.revisions
    }

    /// Directory holding the records, `None` for in-memory stores.
    pub fn root(&self) -> Option<&Path> {
        self.records.as_ref().map(|r| r.root())
    }

    /// Anchors a new annotation.
    ///
    /// The position must lie inside the file at `new.revision_id`. Context
    /// snapshots are captured from that text unless the caller supplied them.
    ///
    /// # Errors
    ///
    /// - `InvalidPosition` for inconsistent position fields
    /// - `AnchorNotFound` if the file does not exist at the revision
    /// - `PositionOutOfRange` if the lines or columns exceed the file
    /// - `InvalidSuggestion` for a suggestion without replacement text
    pub fn create(&mut self, new: NewAnnotation) -> Result<&Annotation> {
        new.position.validate()?;

        if new.annotation_type == AnnotationType::Suggestion
            && new.suggested_text.as_deref().map_or(true, str::is_empty)
        {
            return Err(ScribeError::InvalidSuggestion {
                id: "<new>".to_string(),
                reason: "suggestion has no replacement text".to_string(),
            });
        }

        let text = self
            .revisions
            .get_text_at(&new.position.file_path, &new.revision_id)
            .map_err(|e| match e {
                ScribeError::BlobNotFound { path, revision } => {
                    ScribeError::AnchorNotFound { path, revision }
                }
                other => other,
            })?;

        let lines: Vec<&str> = text.lines().collect();
        check_position(&new.position, &lines)?;

        let mut position = new.position;
        let context = self.review.context_lines;
        if position.context_before.is_none() {
            position.context_before = context_before(&lines, position.line_start, context);
        }
        if position.context_after.is_none() {
            position.context_after = context_after(&lines, position.line_end, context);
        }

        let id = Uuid::new_v4().to_string();
        let now = self.now();
        let annotation = Annotation {
            id: id.clone(),
            annotation_type: new.annotation_type,
            status: Status::Open,
            priority: new.priority.unwrap_or(self.review.default_priority),
            content: new.content,
            suggested_text: new.suggested_text,
            position,
            anchor_revision_id: new.revision_id,
            author: new.author,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            resolved_by: None,
            resolution_message: None,
            assigned_to: new.assigned_to,
            thread_id: Some(id.clone()),
            parent_id: None,
            tags: new.tags,
            needs_review: false,
            history: Vec::new(),
        };

        self.insert(annotation)
    }

    /// Annotations matching `filter`, oldest first.
    pub fn list(&self, filter: &AnnotationFilter) -> Vec<&Annotation> {
        let mut found: Vec<&Annotation> = self
            .annotations
            .values()
            .filter(|a| filter.matches(a))
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// # Errors
    ///
    /// Returns `AnnotationNotFound` if no annotation has this id.
    pub fn get(&self, id: &str) -> Result<&Annotation> {
        self.annotations
            .get(id)
            .ok_or_else(|| ScribeError::AnnotationNotFound(id.to_string()))
    }

    /// Every annotation in the thread rooted at `thread_id`, oldest first.
    pub fn thread(&self, thread_id: &str) -> Vec<&Annotation> {
        let mut found: Vec<&Annotation> = self
            .annotations
            .values()
            .filter(|a| a.thread_id.as_deref() == Some(thread_id))
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Moves an annotation to `status`.
    ///
    /// Entering a terminal status records who resolved it and when. Each
    /// change is appended to the annotation's history and the audit log.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the lifecycle does not allow the move.
    pub fn transition(
        &mut self,
        id: &str,
        status: Status,
        actor: &str,
        message: Option<&str>,
    ) -> Result<&Annotation> {
        let current = self.get(id)?;
        if !current.status.can_transition_to(status) {
            return Err(ScribeError::InvalidTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        let from = current.status;
        let now = self.now();
        let change = StatusChange {
            from,
            to: status,
            actor: actor.to_string(),
            message: message.map(str::to_string),
            at: now,
        };

        let mut updated = current.clone();
        updated.status = status;
        updated.updated_at = now;
        if status.is_terminal() {
            updated.resolved_at = Some(now);
            updated.resolved_by = Some(actor.to_string());
            updated.resolution_message = message.map(str::to_string);
        }
        updated.history.push(change.clone());

        self.persist(&updated)?;
        if let Some(records) = &self.records {
            let entry = AuditEntry {
                annotation_id: id.to_string(),
                change,
            };
            if let Err(e) = records.append_audit(&entry) {
                warn!(id, error = %e, "failed to append audit entry");
            }
        }

        debug!(id, from = %from, to = %status, "status changed");
        if status.is_terminal() {
            self.events.push(AnnotationEvent::Resolved {
                id: id.to_string(),
                status,
                by: actor.to_string(),
            });
        }
        self.replace(updated)
    }

    /// Sets or clears the assignee.
    pub fn reassign(&mut self, id: &str, assignee: Option<&str>) -> Result<&Annotation> {
        let mut updated = self.get(id)?.clone();
        updated.assigned_to = assignee.map(str::to_string);
        updated.updated_at = self.now();

        self.persist(&updated)?;
        debug!(id, assignee = ?assignee, "reassigned");
        self.replace(updated)
    }

    /// Adds a reply to `parent_id`.
    ///
    /// The reply is an open comment sharing its parent's position, anchor
    /// revision and thread.
    pub fn add_reply(&mut self, parent_id: &str, content: &str, author: &str) -> Result<&Annotation> {
        let parent = self.get(parent_id)?;
        let id = Uuid::new_v4().to_string();
        let now = self.now();

        let reply = Annotation {
            id,
            annotation_type: AnnotationType::Comment,
            status: Status::Open,
            priority: self.review.default_priority,
            content: content.to_string(),
            suggested_text: None,
            position: parent.position.clone(),
            anchor_revision_id: parent.anchor_revision_id.clone(),
            author: author.to_string(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
            resolved_by: None,
            resolution_message: None,
            assigned_to: None,
            thread_id: Some(
                parent
                    .thread_id
                    .clone()
                    .unwrap_or_else(|| parent.id.clone()),
            ),
            parent_id: Some(parent.id.clone()),
            tags: Default::default(),
            needs_review: parent.needs_review,
            history: Vec::new(),
        };

        self.insert(reply)
    }

    /// Deletes an annotation and every reply beneath it.
    ///
    /// Returns the removed ids, replies first.
    pub fn delete(&mut self, id: &str) -> Result<Vec<String>> {
        self.get(id)?;

        let mut doomed = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor].clone();
            doomed.extend(
                self.annotations
                    .values()
                    .filter(|a| a.parent_id.as_deref() == Some(parent.as_str()))
                    .map(|a| a.id.clone()),
            );
            cursor += 1;
        }
        doomed.reverse();

        for doomed_id in &doomed {
            if let Some(records) = &self.records {
                records.remove(doomed_id)?;
            }
            self.annotations.remove(doomed_id);
            self.events.push(AnnotationEvent::Deleted {
                id: doomed_id.clone(),
            });
        }

        info!(id, removed = doomed.len(), "deleted annotation");
        Ok(doomed)
    }

    /// Clears the needs-review flag after a human has checked the anchor.
    pub fn mark_reviewed(&mut self, id: &str) -> Result<&Annotation> {
        let mut updated = self.get(id)?.clone();
        updated.needs_review = false;
        updated.updated_at = self.now();

        self.persist(&updated)?;
        self.replace(updated)
    }

    /// Moves annotations on `file_path` from `old_revision` to `new_revision`.
    ///
    /// Only open and in-progress annotations anchored at `old_revision` are
    /// touched. Each is remapped through one line mapping and re-anchored at
    /// `new_revision`; orphans keep a degraded position and are flagged for
    /// review. Annotations are written one at a time, so an error leaves the
    /// ones before it updated and the rest untouched.
    ///
    /// # Errors
    ///
    /// Collaborator failures are returned unchanged.
    pub fn on_revision_change(
        &mut self,
        file_path: &str,
        old_revision: &str,
        new_revision: &str,
    ) -> Result<RemapReport> {
        let mut report = RemapReport::default();
        if old_revision == new_revision {
            return Ok(report);
        }

        let affected: Vec<String> = self
            .annotations
            .values()
            .filter(|a| {
                a.is_active()
                    && a.position.file_path == file_path
                    && a.anchor_revision_id == old_revision
            })
            .map(|a| a.id.clone())
            .collect();
        if affected.is_empty() {
            return Ok(report);
        }

        let hunks = self
            .revisions
            .get_structural_diff(file_path, old_revision, new_revision)?;
        let mapping = build_line_mapping(&hunks);
        let now = self.now();

        for id in affected {
            let mut updated = self.get(&id)?.clone();
            let result = remap(&updated.position, &mapping);
            let unchanged = *result.position() == updated.position;

            updated.position = result.position().clone();
            updated.anchor_revision_id = new_revision.to_string();
            updated.updated_at = now;
            if result.is_orphaned() {
                updated.needs_review = true;
            }
            self.persist(&updated)?;

            match &result {
                RemapResult::Orphaned(orphan) => {
                    warn!(
                        id = %id,
                        file = file_path,
                        nearest_line = orphan.nearest_line,
                        "annotation orphaned by revision change"
                    );
                    self.events.push(AnnotationEvent::Orphaned {
                        id: id.clone(),
                        file_path: file_path.to_string(),
                        nearest_line: orphan.nearest_line,
                    });
                    report.orphaned.push(id.clone());
                }
                RemapResult::Remapped(_) if unchanged => report.untouched.push(id.clone()),
                RemapResult::Remapped(_) => report.moved.push(id.clone()),
            }
            self.annotations.insert(id, updated);
        }

        info!(
            file = file_path,
            old = old_revision,
            new = new_revision,
            moved = report.moved.len(),
            orphaned = report.orphaned.len(),
            untouched = report.untouched.len(),
            "remapped annotations"
        );
        Ok(report)
    }

    /// Takes the events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<AnnotationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Status changes from the on-disk audit log, oldest first. Empty for
    /// in-memory stores.
    pub fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        match &self.records {
            Some(records) => records.read_audit(),
            None => Ok(Vec::new()),
        }
    }

    fn insert(&mut self, annotation: Annotation) -> Result<&Annotation> {
        self.persist(&annotation)?;
        info!(
            id = %annotation.id,
            file = %annotation.position.file_path,
            kind = %annotation.annotation_type,
            "created annotation"
        );
        self.events.push(AnnotationEvent::Created {
            id: annotation.id.clone(),
            author: annotation.author.clone(),
        });
        self.replace(annotation)
    }

    fn replace(&mut self, annotation: Annotation) -> Result<&Annotation> {
        let id = annotation.id.clone();
        self.annotations.insert(id.clone(), annotation);
        self.get(&id)
    }

    fn persist(&self, annotation: &Annotation) -> Result<()> {
        if let Some(records) = &self.records {
            records.write(annotation)?;
        }
        Ok(())
    }

    fn now(&self) -> i64 {
        if let Some(ref provider) = self.time_provider {
            provider.now()
        } else {
            current_timestamp()
        }
    }
}

/// Checks that a validated position fits inside `lines`.
fn check_position(position: &AnnotationPosition, lines: &[&str]) -> Result<()> {
    let line_count = lines.len() as u32;
    if position.line_end > line_count {
        return Err(ScribeError::PositionOutOfRange {
            reason: format!(
                "line {} beyond end of {} ({} lines)",
                position.line_end, position.file_path, line_count
            ),
        });
    }

    if let Some((start, end)) = position.columns() {
        let first = lines[position.line_start as usize - 1];
        let last = lines[position.line_end as usize - 1];
        if !first.is_char_boundary(start as usize) || !last.is_char_boundary(end as usize) {
            return Err(ScribeError::PositionOutOfRange {
                reason: format!(
                    "columns {}..{} outside lines {}-{}",
                    start, end, position.line_start, position.line_end
                ),
            });
        }
    }
    Ok(())
}

fn context_before(lines: &[&str], line_start: u32, count: usize) -> Option<String> {
    let end = line_start as usize - 1;
    let start = end.saturating_sub(count);
    join_context(&lines[start..end])
}

fn context_after(lines: &[&str], line_end: u32, count: usize) -> Option<String> {
    let start = (line_end as usize).min(lines.len());
    let end = (start + count).min(lines.len());
    join_context(&lines[start..end])
}

fn join_context(lines: &[&str]) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Returns the current Unix timestamp in seconds.
fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// Manual Debug implementation to skip time_provider field
impl<R> std::fmt::Debug for AnnotationStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("annotations", &self.annotations.len())
            .field("root", &self.records.as_ref().map(|r| r.root().to_path_buf()))
            .field("review", &self.review)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

/// Path of the store directory for a project root.
pub fn scribe_dir(project_root: impl AsRef<Path>) -> PathBuf {
    project_root.as_ref().join(SCRIBE_DIR)
}
