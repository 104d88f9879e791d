//! Core data types for scribe annotations.

use crate::error::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of feedback an annotation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationType {
    Comment,
    /// Carries replacement text in `suggested_text`.
    Suggestion,
    Question,
    Praise,
    Issue,
    Task,
}

impl AnnotationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Suggestion => "suggestion",
            Self::Question => "question",
            Self::Praise => "praise",
            Self::Issue => "issue",
            Self::Task => "task",
        }
    }
}

/// Annotation lifecycle status.
///
/// ```text
/// open ──> in_progress
///   │           │
///   └─────┬─────┘
///         v
///  resolved | accepted | rejected   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Newly created, nobody has picked it up.
    Open,
    /// Someone is working on it.
    InProgress,
    /// Addressed; the conversation is closed.
    Resolved,
    /// Suggestion or request taken.
    Accepted,
    /// Suggestion or request declined.
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// True for statuses that can never be left.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Accepted | Self::Rejected)
    }

    /// True for `open` and `in_progress`.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Checks the lifecycle transition table.
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;

        match (self, next) {
            (Open, InProgress) => true,

            (Open, Resolved) | (Open, Accepted) | (Open, Rejected) => true,

            (InProgress, Resolved) | (InProgress, Accepted) | (InProgress, Rejected) => true,

            // Terminal states are final; self-transitions are not changes.
            _ => false,
        }
    }
}

/// Urgency of an annotation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

macro_rules! string_tag {
    ($ty:ident, $what:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ScribeError;

            fn from_str(s: &str) -> Result<Self> {
                $(
                    if s.eq_ignore_ascii_case($ty::$variant.as_str()) {
                        return Ok($ty::$variant);
                    }
                )+
                Err(ScribeError::InvalidValue(format!("unknown {}: {}", $what, s)))
            }
        }
    };
}

string_tag!(AnnotationType, "annotation type", [Comment, Suggestion, Question, Praise, Issue, Task]);
string_tag!(Status, "status", [Open, InProgress, Resolved, Accepted, Rejected]);
string_tag!(Priority, "priority", [Low, Medium, High, Critical]);

/// Where an annotation points in a file.
///
/// Lines are 1-based and inclusive. Columns are 0-based byte offsets within
/// the line, half-open `[column_start, column_end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationPosition {
    /// Repository-relative path.
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_end: Option<u32>,
    /// Line before the range when the annotation was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,
    /// Line after the range when the annotation was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
}

impl AnnotationPosition {
    /// A whole-line position.
    pub fn lines(file_path: impl Into<String>, line_start: u32, line_end: u32) -> Self {
        Self {
            file_path: file_path.into(),
            line_start,
            line_end,
            column_start: None,
            column_end: None,
            context_before: None,
            context_after: None,
        }
    }

    /// A single line.
    pub fn line(file_path: impl Into<String>, line: u32) -> Self {
        Self::lines(file_path, line, line)
    }

    pub fn with_columns(mut self, start: u32, end: u32) -> Self {
        self.column_start = Some(start);
        self.column_end = Some(end);
        self
    }

    pub fn with_context(mut self, before: Option<String>, after: Option<String>) -> Self {
        self.context_before = before;
        self.context_after = after;
        self
    }

    pub fn is_single_line(&self) -> bool {
        self.line_start == self.line_end
    }

    /// Both column bounds, if the position has them.
    pub fn columns(&self) -> Option<(u32, u32)> {
        Some((self.column_start?, self.column_end?))
    }

    /// Checks field consistency without looking at any text.
    pub fn validate(&self) -> Result<()> {
        if self.file_path.is_empty() {
            return Err(ScribeError::InvalidPosition("empty file path".to_string()));
        }
        if self.line_start == 0 {
            return Err(ScribeError::InvalidPosition(
                "lines are 1-based, got line 0".to_string(),
            ));
        }
        if self.line_end < self.line_start {
            return Err(ScribeError::InvalidPosition(format!(
                "line_end {} before line_start {}",
                self.line_end, self.line_start
            )));
        }
        match (self.column_start, self.column_end) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) if end < start => Err(ScribeError::InvalidPosition(format!(
                "column_end {} before column_start {}",
                end, start
            ))),
            (Some(_), Some(_)) => Ok(()),
            _ => Err(ScribeError::InvalidPosition(
                "column_start and column_end must be given together".to_string(),
            )),
        }
    }
}

impl fmt::Display for AnnotationPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_path, self.line_start)?;
        if !self.is_single_line() {
            write!(f, "-{}", self.line_end)?;
        }
        if let Some((start, end)) = self.columns() {
            write!(f, " [{}..{})", start, end)?;
        }
        Ok(())
    }
}

/// One entry of an annotation's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Status,
    pub to: Status,
    /// Who made the change.
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix timestamp (seconds).
    pub at: i64,
}

/// A piece of feedback anchored to a text position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// UUID v4, never changes.
    pub id: String,
    #[serde(rename = "type")]
    pub annotation_type: AnnotationType,
    pub status: Status,
    pub priority: Priority,
    pub content: String,
    /// Replacement text for `suggestion` annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_text: Option<String>,
    pub position: AnnotationPosition,
    /// Revision whose line numbers `position` is expressed in.
    pub anchor_revision_id: String,
    pub author: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Id of the root annotation of the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Id of the annotation this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Set when a revision change could not keep the anchor intact.
    #[serde(default)]
    pub needs_review: bool,
    /// Status transitions, oldest first.
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl Annotation {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    /// True while the annotation is `open` or `in_progress`.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Input for [`AnnotationStore::create`](crate::AnnotationStore::create).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnotation {
    pub annotation_type: AnnotationType,
    pub content: String,
    pub suggested_text: Option<String>,
    pub position: AnnotationPosition,
    /// Revision the position is expressed in.
    pub revision_id: String,
    pub author: String,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub tags: BTreeSet<String>,
}

impl NewAnnotation {
    pub fn new(
        annotation_type: AnnotationType,
        position: AnnotationPosition,
        revision_id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            annotation_type,
            content: content.into(),
            suggested_text: None,
            position,
            revision_id: revision_id.into(),
            author: author.into(),
            priority: None,
            assigned_to: None,
            tags: BTreeSet::new(),
        }
    }

    /// A `comment` annotation.
    pub fn comment(
        position: AnnotationPosition,
        revision_id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(AnnotationType::Comment, position, revision_id, author, content)
    }

    /// A `suggestion` annotation proposing `suggested_text`.
    pub fn suggestion(
        position: AnnotationPosition,
        revision_id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
        suggested_text: impl Into<String>,
    ) -> Self {
        let mut new = Self::new(
            AnnotationType::Suggestion,
            position,
            revision_id,
            author,
            content,
        );
        new.suggested_text = Some(suggested_text.into());
        new
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Criteria for [`AnnotationStore::list`](crate::AnnotationStore::list).
///
/// Unset fields match everything. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationFilter {
    pub file_path: Option<String>,
    /// Accepted statuses; empty accepts all.
    pub statuses: Vec<Status>,
    pub annotation_type: Option<AnnotationType>,
    pub author: Option<String>,
    pub assigned_to: Option<String>,
    pub tag: Option<String>,
    pub parent_id: Option<String>,
    pub needs_review: Option<bool>,
    /// Only `open` and `in_progress`.
    pub open_only: bool,
}

impl AnnotationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn annotation_type(mut self, annotation_type: AnnotationType) -> Self {
        self.annotation_type = Some(annotation_type);
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn replies_to(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn needs_review(mut self, needs_review: bool) -> Self {
        self.needs_review = Some(needs_review);
        self
    }

    pub fn open_only(mut self) -> Self {
        self.open_only = true;
        self
    }

    pub fn matches(&self, annotation: &Annotation) -> bool {
        fn eq_opt<T: PartialEq + ?Sized>(want: Option<&T>, have: Option<&T>) -> bool {
            want.map_or(true, |w| have == Some(w))
        }

        if self.open_only && !annotation.is_active() {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&annotation.status) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !annotation.tags.contains(tag) {
                return false;
            }
        }
        if let Some(flag) = self.needs_review {
            if annotation.needs_review != flag {
                return false;
            }
        }

        eq_opt(
            self.file_path.as_deref(),
            Some(annotation.position.file_path.as_str()),
        ) && eq_opt(self.annotation_type.as_ref(), Some(&annotation.annotation_type))
            && eq_opt(self.author.as_deref(), Some(annotation.author.as_str()))
            && eq_opt(self.assigned_to.as_deref(), annotation.assigned_to.as_deref())
            && eq_opt(self.parent_id.as_deref(), annotation.parent_id.as_deref())
    }
}

/// Store event for a notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnnotationEvent {
    Created {
        id: String,
        author: String,
    },
    /// Entered a terminal status.
    Resolved {
        id: String,
        status: Status,
        by: String,
    },
    Deleted {
        id: String,
    },
    /// A revision change removed the anchored text.
    Orphaned {
        id: String,
        file_path: String,
        nearest_line: u32,
    },
}

/// Outcome of [`AnnotationStore::on_revision_change`](crate::AnnotationStore::on_revision_change).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapReport {
    /// Re-anchored to a different position.
    pub moved: Vec<String>,
    /// Anchor text deleted; flagged for review.
    pub orphaned: Vec<String>,
    /// Re-anchored at the same position.
    pub untouched: Vec<String>,
}

impl RemapReport {
    pub fn total(&self) -> usize {
        self.moved.len() + self.orphaned.len() + self.untouched.len()
    }
}
