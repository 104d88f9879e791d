//! Move notes from one revision to the next.

use super::{open_store, short_id, with_hint};
use anyhow::Result;
use console::style;

pub fn run(file: &str, from: &str, to: &str) -> Result<()> {
    let mut store = open_store()?;
    let report = store
        .on_revision_change(file, from, to)
        .map_err(with_hint)?;

    if report.total() == 0 {
        println!("No open notes on {} anchored at {}.", file, from);
        return Ok(());
    }

    println!(
        "{}: {} moved, {} unchanged, {} orphaned",
        style(file).bold(),
        style(report.moved.len()).green(),
        report.untouched.len(),
        style(report.orphaned.len()).red()
    );
    for id in &report.orphaned {
        let annotation = store.get(id).map_err(with_hint)?;
        println!(
            "  {} {} now near {} (needs review)",
            style("!").red().bold(),
            short_id(id),
            annotation.position
        );
    }
    Ok(())
}
