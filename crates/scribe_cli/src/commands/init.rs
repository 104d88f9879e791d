//! Initialize a scribe store.

use super::{project_root, with_hint};
use anyhow::{Context, Result};
use scribe_core::{AnnotationStore, GitRevisions, RevisionCollaborator};

/// Initialize a scribe store at the root of the current git repository.
pub fn run() -> Result<()> {
    let revisions = GitRevisions::discover(".").context("Not inside a git repository")?;
    let root = project_root(&revisions)?;
    let head = revisions.get_current_revision_id().ok();

    AnnotationStore::init(&root, revisions)
        .map_err(with_hint)
        .context("Failed to initialize scribe store")?;

    println!("Initialized scribe store in {}", root.join(".scribe").display());
    println!();
    println!("Directory structure:");
    println!("  .scribe/annotations/   - One JSON record per note");
    println!("  .scribe/audit.jsonl    - Status change log");
    println!("  .scribe/config.toml    - Diff and review settings");
    println!();
    match head {
        Some(id) => println!("Notes will anchor to HEAD ({}) by default.", &id[..id.len().min(12)]),
        None => println!("No commits yet. Save a revision before leaving notes."),
    }

    Ok(())
}
