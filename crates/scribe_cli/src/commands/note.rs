//! Note (annotation) commands.

use super::{
    current_author, format_time, open_store, resolve_id, short_id, styled_status, summary_line,
    with_hint, Store,
};
use anyhow::Result;
use console::style;
use scribe_core::{
    Annotation, AnnotationFilter, AnnotationPosition, AnnotationType, NewAnnotation, Priority,
    RevisionCollaborator, Status,
};

pub struct AddArgs {
    pub file: String,
    pub line: u32,
    pub end: Option<u32>,
    pub columns: Option<(u32, u32)>,
    pub message: String,
    pub kind: AnnotationType,
    pub suggest: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub assign: Option<String>,
    pub rev: Option<String>,
}

pub fn add(args: AddArgs) -> Result<()> {
    let mut store = open_store()?;

    let revision = match args.rev {
        Some(rev) => rev,
        None => store
            .revisions()
            .get_current_revision_id()
            .map_err(with_hint)?,
    };

    let mut position =
        AnnotationPosition::lines(args.file, args.line, args.end.unwrap_or(args.line));
    if let Some((start, end)) = args.columns {
        position = position.with_columns(start, end);
    }

    let kind = if args.suggest.is_some() {
        AnnotationType::Suggestion
    } else {
        args.kind
    };
    let mut new = NewAnnotation::new(kind, position, revision, current_author(), args.message);
    new.suggested_text = args.suggest;
    new.priority = args.priority;
    new.assigned_to = args.assign;
    new.tags = args.tags.into_iter().collect();

    let annotation = store.create(new).map_err(with_hint)?;
    println!(
        "Added {} {} on {}",
        annotation.annotation_type,
        style(short_id(&annotation.id)).bold(),
        annotation.position
    );
    Ok(())
}

pub fn list(
    file: Option<String>,
    statuses: Vec<Status>,
    author: Option<String>,
    tag: Option<String>,
    needs_review: bool,
    all: bool,
) -> Result<()> {
    let store = open_store()?;

    let filter = AnnotationFilter {
        file_path: file,
        open_only: !all && statuses.is_empty(),
        statuses,
        author,
        tag,
        needs_review: needs_review.then_some(true),
        ..Default::default()
    };

    let found = store.list(&filter);
    if found.is_empty() {
        println!("{}", style("No notes.").dim());
        return Ok(());
    }
    for annotation in found.iter().filter(|a| !a.is_reply()) {
        println!("{}", summary_line(annotation));
        let replies = found
            .iter()
            .filter(|r| r.is_reply() && r.thread_id == annotation.thread_id)
            .count();
        if replies > 0 {
            println!("         {} {}", style("↳").dim(), style(format!("{} replies", replies)).dim());
        }
    }
    Ok(())
}

pub fn show(id: &str) -> Result<()> {
    let store = open_store()?;
    let id = resolve_id(&store, id)?;
    let annotation = store.get(&id).map_err(with_hint)?;
    let thread = annotation.thread_id.clone().unwrap_or_else(|| id.clone());

    print_annotation(annotation);
    for reply in store.thread(&thread).into_iter().filter(|a| a.id != id) {
        println!();
        println!(
            "  {} {} ({}) {}",
            style("↳").dim(),
            style(&reply.author).bold(),
            format_time(reply.created_at),
            styled_status(reply.status)
        );
        for line in reply.content.lines() {
            println!("    {}", line);
        }
    }
    Ok(())
}

fn print_annotation(a: &Annotation) {
    println!(
        "{} {} {}",
        style(&a.annotation_type).bold(),
        style(&a.id).dim(),
        styled_status(a.status)
    );
    println!("  Where:    {} @ {}", a.position, short_id(&a.anchor_revision_id));
    println!("  Author:   {} ({})", a.author, format_time(a.created_at));
    println!("  Priority: {}", a.priority);
    if let Some(assignee) = &a.assigned_to {
        println!("  Assigned: {}", assignee);
    }
    if !a.tags.is_empty() {
        let tags: Vec<&str> = a.tags.iter().map(String::as_str).collect();
        println!("  Tags:     {}", tags.join(", "));
    }
    if a.needs_review {
        println!(
            "  {}",
            style("The anchored text was deleted; check the position and run 'scribe note reviewed'.")
                .red()
        );
    }
    if let Some(before) = &a.position.context_before {
        println!("  Before:   {}", style(before).dim());
    }
    if let Some(after) = &a.position.context_after {
        println!("  After:    {}", style(after).dim());
    }
    println!();
    for line in a.content.lines() {
        println!("  {}", line);
    }
    if let Some(suggested) = &a.suggested_text {
        println!();
        println!("  {}", style("Suggested:").bold());
        for line in suggested.lines() {
            println!("  {}", style(line).green());
        }
    }
    if let (Some(by), Some(at)) = (&a.resolved_by, a.resolved_at) {
        println!();
        println!("  {} by {} ({})", a.status, by, format_time(at));
        if let Some(message) = &a.resolution_message {
            println!("  {}", message);
        }
    }
}

pub fn transition(id: &str, status: Status, message: Option<&str>) -> Result<()> {
    let mut store = open_store()?;
    let id = resolve_id(&store, id)?;
    let annotation = store
        .transition(&id, status, &current_author(), message)
        .map_err(with_hint)?;
    println!(
        "{} is now {}",
        style(short_id(&annotation.id)).bold(),
        styled_status(annotation.status)
    );
    Ok(())
}

pub fn reply(id: &str, text: &str) -> Result<()> {
    let mut store = open_store()?;
    let id = resolve_id(&store, id)?;
    let reply = store
        .add_reply(&id, text, &current_author())
        .map_err(with_hint)?;
    println!(
        "Replied to {} as {}",
        style(short_id(&id)).bold(),
        short_id(&reply.id)
    );
    Ok(())
}

pub fn assign(id: &str, assignee: Option<&str>) -> Result<()> {
    let mut store = open_store()?;
    let id = resolve_id(&store, id)?;
    store.reassign(&id, assignee).map_err(with_hint)?;
    match assignee {
        Some(who) => println!("Assigned {} to {}", short_id(&id), who),
        None => println!("Cleared assignee of {}", short_id(&id)),
    }
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let mut store: Store = open_store()?;
    let id = resolve_id(&store, id)?;
    let removed = store.delete(&id).map_err(with_hint)?;
    println!(
        "Deleted {} ({} with replies)",
        short_id(&id),
        removed.len()
    );
    Ok(())
}

pub fn reviewed(id: &str) -> Result<()> {
    let mut store = open_store()?;
    let id = resolve_id(&store, id)?;
    let annotation = store.mark_reviewed(&id).map_err(with_hint)?;
    println!(
        "{} reviewed at {}",
        short_id(&annotation.id),
        annotation.position
    );
    Ok(())
}
