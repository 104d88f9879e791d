//! Moves annotation positions from one revision's line numbers to the next.
//!
//! Remapping relies only on the [`LineMapping`]. When anchored text has been
//! deleted the result is [`RemapResult::Orphaned`]; the stored context
//! snapshots are handed back for a human to look at, never matched against
//! the new text. [`relocate_by_context`] is a separate, opt-in heuristic.

use crate::line_mapping::{LineMapping, MappedLine};
use crate::types::AnnotationPosition;
use serde::{Deserialize, Serialize};

/// An annotation whose anchored lines no longer exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    /// Closest surviving line in the new revision. A file with no surviving
    /// lines reports line 1.
    pub nearest_line: u32,
    /// Best-effort position in the new revision, columns dropped.
    pub position: AnnotationPosition,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
}

/// Outcome of remapping one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemapResult {
    /// Every anchored endpoint survived.
    Remapped(AnnotationPosition),
    /// At least one endpoint was deleted.
    Orphaned(Orphan),
}

impl RemapResult {
    /// The position to store, degraded for orphans.
    pub fn position(&self) -> &AnnotationPosition {
        match self {
            Self::Remapped(position) => position,
            Self::Orphaned(orphan) => &orphan.position,
        }
    }

    pub fn is_orphaned(&self) -> bool {
        matches!(self, Self::Orphaned(_))
    }
}

/// Maps `position` through `mapping`.
///
/// Start and end lines are looked up independently. Columns survive only if
/// neither endpoint moved. A deleted endpoint falls back to the closest
/// surviving line inside the range; only when the whole range is gone does
/// the search leave it.
pub fn remap(position: &AnnotationPosition, mapping: &LineMapping) -> RemapResult {
    let start = mapping.lookup(position.line_start);
    let end = mapping.lookup(position.line_end);

    if let (MappedLine::Line(new_start), MappedLine::Line(new_end)) = (start, end) {
        let unmoved = new_start == position.line_start && new_end == position.line_end;
        let mut moved = position.clone();
        moved.line_start = new_start;
        moved.line_end = new_end.max(new_start);
        if !unmoved {
            moved.column_start = None;
            moved.column_end = None;
        }
        return RemapResult::Remapped(moved);
    }

    let inside = position.line_start..=position.line_end.max(position.line_start);
    let first_inside = inside.clone().find_map(|old| mapping.lookup(old).line());
    let last_inside = inside.rev().find_map(|old| mapping.lookup(old).line());

    let (new_start, new_end) = match (first_inside, last_inside) {
        (Some(first), Some(last)) => (first, last),
        _ => (
            nearest_surviving(position.line_start, mapping),
            nearest_surviving(position.line_end, mapping),
        ),
    };

    let nearest_line = if start == MappedLine::Deleted {
        new_start
    } else {
        new_end
    };

    let mut degraded = position.clone();
    degraded.line_start = new_start.min(new_end);
    degraded.line_end = new_start.max(new_end);
    degraded.column_start = None;
    degraded.column_end = None;

    RemapResult::Orphaned(Orphan {
        nearest_line,
        position: degraded,
        context_before: position.context_before.clone(),
        context_after: position.context_after.clone(),
    })
}

/// New line number of the closest old line that was not deleted.
///
/// Searches outward by increasing distance, trying the preceding line before
/// the following one. Lines at or past `stable_from` always survive, so the
/// search is bounded. When nothing survives this is line 1, where text added
/// to the emptied file would start.
fn nearest_surviving(old_line: u32, mapping: &LineMapping) -> u32 {
/// Proposes a line in `text` whose neighbours match the orphan's context
/// snapshots. Returns the candidate closest to `nearest_line`.
///
/// This is a hint for a reviewer; the store never applies it on its own.
pub fn relocate_by_context(orphan: &Orphan, text: &str) -> Option<u32> {
    if orphan.context_before.is_none() && orphan.context_after.is_none() {
        return None;
    }

    // Snapshots may span several lines; only the adjacent one is compared.
    let before = orphan.context_before.as_deref().and_then(|c| c.lines().last());
    let after = orphan.context_after.as_deref().and_then(|c| c.lines().next());

    let lines: Vec<&str> = text.lines().collect();
    let same = |index: Option<usize>, snapshot: Option<&str>| match snapshot {
        None => true,
        Some(expected) => index
            .and_then(|i| lines.get(i))
            .map_or(false, |line| line.trim() == expected.trim()),
    };

    (0..lines.len())
        .filter(|&i| same(i.checked_sub(1), before))
        .filter(|&i| same(Some(i + 1), after))
        .map(|i| i as u32 + 1)
        .min_by_key(|line| line.abs_diff(orphan.nearest_line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_mapping::{build_line_mapping, Hunk, HunkLine};

    fn pos(start: u32, end: u32) -> AnnotationPosition {
        AnnotationPosition::lines("chapter.md", start, end)
    }

    #[test]
    fn test_empty_diff_is_idempotent() {
        let mapping = build_line_mapping(&[]);
        for position in [
            pos(1, 1),
            pos(4, 9),
            pos(7, 7).with_columns(3, 12),
            pos(2, 3).with_context(Some("before".into()), Some("after".into())),
        ] {
            assert_eq!(remap(&position, &mapping), RemapResult::Remapped(position));
        }
    }

    #[test]
    fn test_deleted_line_orphans() {
        // Line 5 of 8 deleted; lines 4 and 6 both survive, 4 wins.
        let hunk = Hunk::new(
            4,
            4,
            vec![
                HunkLine::context("four"),
                HunkLine::removed("five"),
                HunkLine::context("six"),
            ],
        );
        let mapping = build_line_mapping(&[hunk]);

        let position = pos(5, 5).with_context(Some("four".into()), Some("six".into()));
        let RemapResult::Orphaned(orphan) = remap(&position, &mapping) else {
            panic!("expected an orphan");
        };
        assert_eq!(orphan.nearest_line, 4);
        assert_eq!(orphan.position.line_start, 4);
        assert_eq!(orphan.position.line_end, 4);
        assert_eq!(orphan.context_before.as_deref(), Some("four"));
        assert_eq!(orphan.context_after.as_deref(), Some("six"));
    }

    #[test]
    fn test_insertion_shifts_lines_and_drops_columns() {
        let hunk = Hunk::new(
            9,
            10,
            vec![
                HunkLine::added("a"),
                HunkLine::added("b"),
                HunkLine::added("c"),
            ],
        );
        let mapping = build_line_mapping(&[hunk]);

        let result = remap(&pos(10, 20).with_columns(0, 4), &mapping);
        let RemapResult::Remapped(moved) = result else {
            panic!("expected a remap");
        };
        assert_eq!((moved.line_start, moved.line_end), (13, 23));
        assert_eq!(moved.columns(), None);

        let above = remap(&pos(2, 2).with_columns(0, 4), &mapping);
        assert_eq!(above.position().columns(), Some((0, 4)));
    }

    #[test]
    fn test_range_with_deleted_end_keeps_surviving_start() {
        // Lines 6..=7 deleted.
        let hunk = Hunk::new(
            6,
            5,
            vec![HunkLine::removed("six"), HunkLine::removed("seven")],
        );
        let mapping = build_line_mapping(&[hunk]);

        let result = remap(&pos(3, 7), &mapping);
        let RemapResult::Orphaned(orphan) = result else {
            panic!("expected an orphan");
        };
        // Old line 5 is the last one left inside the range.
        assert_eq!(orphan.position.line_start, 3);
        assert_eq!(orphan.position.line_end, 5);
        assert_eq!(orphan.nearest_line, 5);
    }

    #[test]
    fn test_range_with_deleted_start_shrinks_forward() {
        // Lines 3..=4 deleted.
        let hunk = Hunk::new(
            3,
            2,
            vec![HunkLine::removed("three"), HunkLine::removed("four")],
        );
        let mapping = build_line_mapping(&[hunk]);

        let RemapResult::Orphaned(orphan) = remap(&pos(3, 7), &mapping) else {
            panic!("expected an orphan");
        };
        // Old 5..=7 survive as new 3..=5; old line 2 stays outside.
        assert_eq!(orphan.nearest_line, 3);
        assert_eq!(orphan.position.line_start, 3);
        assert_eq!(orphan.position.line_end, 5);
    }

    #[test]
    fn test_emptied_file_orphans_to_line_one() {
        let hunk = Hunk::new(
            1,
            0,
            vec![
                HunkLine::removed("one"),
                HunkLine::removed("two"),
                HunkLine::removed("three"),
            ],
        );
        let mapping = build_line_mapping(&[hunk]);

        let RemapResult::Orphaned(orphan) = remap(&pos(1, 3).with_columns(0, 2), &mapping) else {
            panic!("expected an orphan");
        };
        assert_eq!(orphan.nearest_line, 1);
        assert_eq!((orphan.position.line_start, orphan.position.line_end), (1, 1));
        assert_eq!(orphan.position.columns(), None);
    }

    #[test]
    fn test_nearest_skips_forward_when_nothing_precedes() {
        // Lines 1..=3 deleted, then the file continues.
        let hunk = Hunk::new(
            1,
            0,
            vec![
                HunkLine::removed("one"),
                HunkLine::removed("two"),
                HunkLine::removed("three"),
            ],
        );
        let mapping = build_line_mapping(&[hunk]);

        // Nothing precedes line 1, so the first line after the deletion wins.
        let RemapResult::Orphaned(orphan) = remap(&pos(1, 1), &mapping) else {
            panic!("expected an orphan");
        };
        assert_eq!(orphan.nearest_line, 1);

        // Line 2 is equidistant from 1 (deleted) and 3 (deleted); distance 2
        // reaches old line 4, which is new line 1.
        let RemapResult::Orphaned(orphan) = remap(&pos(2, 2), &mapping) else {
            panic!("expected an orphan");
        };
        assert_eq!(orphan.nearest_line, 1);
    }

    #[test]
    fn test_relocate_by_context_is_opt_in_hint() {
        let orphan = Orphan {
            nearest_line: 2,
            position: pos(2, 2),
            context_before: Some("It was night.".into()),
            context_after: Some("The end.".into()),
        };
        let text = "Intro.\nIt was night.\nRewritten line.\nThe end.\n";
        assert_eq!(relocate_by_context(&orphan, text), Some(3));

        let unrelated = "Nothing\nmatches\nhere\n";
        assert_eq!(relocate_by_context(&orphan, unrelated), None);

        let blind = Orphan {
            context_before: None,
            context_after: None,
            ..orphan
        };
        assert_eq!(relocate_by_context(&blind, text), None);
    }
}
