//! Preview and apply suggested edits.

use super::{current_author, open_store, project_root, resolve_id, short_id, with_hint};
use anyhow::{Context, Result};
use console::style;
use scribe_core::{suggestion, DiffOptions, Status};
use std::fs;

pub fn preview(id: &str) -> Result<()> {
    let store = open_store()?;
    let id = resolve_id(&store, id)?;
    let annotation = store.get(&id).map_err(with_hint)?;

    let path = project_root(store.revisions())?.join(&annotation.position.file_path);
    let current = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let proposed = suggestion::preview(annotation, &current).map_err(with_hint)?;

    let result = scribe_core::diff(&current, &proposed, &DiffOptions::default())
        .map_err(with_hint)?;
    if result.is_identical() {
        println!("{}", style("The suggestion is already in the text.").dim());
    } else {
        println!("{}", result.to_marked_text());
    }
    Ok(())
}

pub fn apply(id: &str, accept: bool) -> Result<()> {
    let mut store = open_store()?;
    let id = resolve_id(&store, id)?;
    let annotation = store.get(&id).map_err(with_hint)?;

    let path = project_root(store.revisions())?.join(&annotation.position.file_path);
    let current = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let applied = suggestion::apply(annotation, &current).map_err(with_hint)?;

    if applied.applied {
        fs::write(&path, &applied.text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Applied {} to {}", short_id(&id), path.display());
    } else {
        println!("{}", style("The suggestion is already in the text.").dim());
    }

    if accept {
        store
            .transition(&id, Status::Accepted, &current_author(), None)
            .map_err(with_hint)?;
        println!("{} is now {}", short_id(&id), style("accepted").green());
    }
    Ok(())
}
