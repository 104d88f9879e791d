//! Word-level diff command.

use super::with_hint;
use anyhow::{Context, Result};
use console::style;
use scribe_core::{
    scribe_dir, Config, DiffKind, DiffResult, DisplayItem, GitRevisions, RevisionCollaborator,
};
use std::fs;
use std::path::Path;

/// Flags that override `[diff]` settings from the config file.
pub struct DiffArgs {
    pub context: Option<usize>,
    pub full: bool,
    pub ignore_case: bool,
    pub ignore_punctuation: bool,
}

pub fn run(old: &str, new: &str, args: DiffArgs) -> Result<()> {
    let revisions = GitRevisions::discover(".").ok();
    let config = match revisions.as_ref().and_then(|r| r.workdir()) {
        Some(root) => Config::load(&scribe_dir(root)).map_err(with_hint)?,
        None => Config::default(),
    };

    let mut options = config.diff;
    if args.ignore_case {
        options.ignore_case = true;
    }
    if args.ignore_punctuation {
        options.ignore_punctuation = true;
    }
    let context = args.context.unwrap_or(options.context_words);

    let original = read_side(old, revisions.as_ref())?;
    let modified = read_side(new, revisions.as_ref())?;

    let result = scribe_core::diff(&original, &modified, &options).map_err(with_hint)?;
    if result.is_identical() {
        println!("{}", style("No differences.").dim());
        return Ok(());
    }

    let rendered = if args.full {
        render(&result, usize::MAX)
    } else {
        render(&result, context)
    };
    println!("{}", rendered);
    println!();
    println!(
        "{} added, {} removed, {} changed, {} unchanged ({:.0}% touched)",
        style(result.stats.added_tokens).green(),
        style(result.stats.removed_tokens).red(),
        style(result.stats.modified_tokens).yellow(),
        result.stats.unchanged_tokens,
        result.stats.change_ratio() * 100.0
    );

    Ok(())
}

/// Reads a file path, or `REV:PATH` from git when no such file exists.
fn read_side(side: &str, revisions: Option<&GitRevisions>) -> Result<String> {
    if !Path::new(side).exists() {
        if let (Some((rev, path)), Some(revisions)) = (side.split_once(':'), revisions) {
            return revisions.get_text_at(path, rev).map_err(with_hint);
        }
    }
    fs::read_to_string(side).with_context(|| format!("Failed to read {}", side))
}

fn render(result: &DiffResult, context_words: usize) -> String {
    let mut out = String::new();
    for item in result.display(context_words) {
        match item {
            DisplayItem::Unit(unit) => match unit.kind {
                DiffKind::Unchanged => out.push_str(&unit.content),
                DiffKind::Added => {
                    out.push_str(&style(&unit.content).green().underlined().to_string())
                }
                DiffKind::Removed => {
                    out.push_str(&style(&unit.content).red().dim().to_string())
                }
                DiffKind::Modified => {
                    let old = unit.original_content.as_deref().unwrap_or("");
                    out.push_str(&style(old).red().dim().to_string());
                    out.push_str(&style(&unit.content).green().underlined().to_string());
                }
            },
            DisplayItem::Elided { words, .. } => {
                out.push_str(&style(format!(" … {} words … ", words)).dim().to_string());
            }
        }
    }
    out
}
