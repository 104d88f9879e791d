//! CLI commands.

pub mod diff;
pub mod init;
pub mod note;
pub mod suggest;
pub mod sync;

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use console::style;
use scribe_core::{Annotation, AnnotationStore, GitRevisions, ScribeError, Status};
use std::path::PathBuf;

pub type Store = AnnotationStore<GitRevisions>;

/// Opens the store at the root of the current git repository.
pub fn open_store() -> Result<Store> {
    let revisions = GitRevisions::discover(".").context("Not inside a git repository")?;
    let root = project_root(&revisions)?;
    AnnotationStore::open(&root, revisions).map_err(with_hint)
}

/// Working directory of the repository the store belongs to.
pub fn project_root(revisions: &GitRevisions) -> Result<PathBuf> {
    revisions
        .workdir()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| anyhow!("Bare repositories have no working copy to annotate"))
}

/// Attaches the recovery hint, if any, to a core error.
pub fn with_hint(err: ScribeError) -> anyhow::Error {
    match err.recovery_suggestion() {
        Some(hint) => anyhow!("{}\n  hint: {}", err, hint),
        None => anyhow::Error::new(err),
    }
}

/// Name recorded as author or actor.
pub fn current_author() -> String {
    std::env::var("SCRIBE_AUTHOR")
        .or_else(|_| std::env::var("USER"))
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string())
}

/// Parses `START..END` byte columns.
pub fn parse_columns(s: &str) -> std::result::Result<(u32, u32), String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got {:?}", s))?;
    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| format!("bad start column {:?}", start))?;
    let end: u32 = end
        .trim()
        .parse()
        .map_err(|_| format!("bad end column {:?}", end))?;
    if end < start {
        return Err(format!("end column {} before start column {}", end, start));
    }
    Ok((start, end))
}

pub fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M UTC")
        .to_string()
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn styled_status(status: Status) -> String {
    let label = status.to_string();
    match status {
        Status::Open => style(label).yellow().to_string(),
        Status::InProgress => style(label).cyan().to_string(),
        Status::Resolved | Status::Accepted => style(label).green().to_string(),
        Status::Rejected => style(label).red().to_string(),
    }
}

/// One-line summary used by `note list`.
pub fn summary_line(annotation: &Annotation) -> String {
    let flag = if annotation.needs_review {
        format!(" {}", style("[needs review]").red().bold())
    } else {
        String::new()
    };
    format!(
        "{} {:<11} {:<10} {:<8} {} {}{}",
        style(short_id(&annotation.id)).dim(),
        styled_status(annotation.status),
        annotation.annotation_type,
        annotation.priority,
        style(&annotation.position).bold(),
        first_line(&annotation.content),
        flag
    )
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Resolves an id prefix (as printed by `note list`) to a full id.
pub fn resolve_id(store: &Store, prefix: &str) -> Result<String> {
    let matches: Vec<&str> = store
        .list(&Default::default())
        .into_iter()
        .map(|a| a.id.as_str())
        .filter(|id| id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(with_hint(ScribeError::AnnotationNotFound(prefix.to_string()))),
        _ => Err(anyhow!(
            "Note id {:?} is ambiguous ({} matches); use more characters",
            prefix,
            matches.len()
        )),
    }
}
