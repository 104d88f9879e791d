//! Old-line to new-line mapping built from structural diff hunks.
//!
//! Hunks follow git conventions: line numbers are 1-based, and when one side
//! of a hunk is empty its start names the line *before* the change.

use crate::error::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Origin of a line within a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrigin {
    /// `' '` unchanged line present on both sides.
    Context,
    /// `'+'` line only in the new revision.
    Added,
    /// `'-'` line only in the old revision.
    Removed,
}

impl LineOrigin {
    /// Parses a unified-diff origin character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Context),
            '+' => Some(Self::Added),
            '-' => Some(Self::Removed),
            _ => None,
        }
    }

    /// Returns the unified-diff origin character.
    pub fn as_char(self) -> char {
        match self {
            Self::Context => ' ',
            Self::Added => '+',
            Self::Removed => '-',
        }
    }
}

/// A single line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkLine {
    pub origin: LineOrigin,
    /// Line content without the origin character or trailing newline.
    pub text: String,
}

impl HunkLine {
    pub fn new(origin: LineOrigin, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Self::new(LineOrigin::Context, text)
    }

    pub fn added(text: impl Into<String>) -> Self {
        Self::new(LineOrigin::Added, text)
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self::new(LineOrigin::Removed, text)
    }
}

/// One `@@` block of a structural diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Starting line in the old revision.
    pub old_start: u32,
    /// Starting line in the new revision.
    pub new_start: u32,
    /// Lines in order.
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    pub fn new(old_start: u32, new_start: u32, lines: Vec<HunkLine>) -> Self {
        Self {
            old_start,
            new_start,
            lines,
        }
    }

    /// Number of old-side lines (context + removed).
    pub fn old_len(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.origin != LineOrigin::Added)
            .count() as u32
    }

    /// Number of new-side lines (context + added).
    pub fn new_len(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.origin != LineOrigin::Removed)
            .count() as u32
    }

    /// The `@@ -a,b +c,d @@` header for this hunk.
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start,
            self.old_len(),
            self.new_start,
            self.new_len()
        )
    }

    /// Parses the hunks of a unified diff.
    ///
    /// File headers (`---`/`+++`) before the first hunk and
    /// `\ No newline at end of file` markers are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Revision` if a hunk header is malformed or a line inside a
    /// hunk has an unknown origin.
    pub fn from_unified(text: &str) -> Result<Vec<Hunk>> {
        let mut hunks: Vec<Hunk> = Vec::new();

        for raw in text.lines() {
            if raw.starts_with("@@") {
                let (old_start, new_start) = parse_header(raw)?;
                hunks.push(Hunk::new(old_start, new_start, Vec::new()));
                continue;
            }

            let Some(hunk) = hunks.last_mut() else {
                continue;
            };
            if raw.starts_with('\\') {
                continue;
            }

            let mut chars = raw.chars();
            let line = match chars.next() {
                // some tools strip the single space of an empty context line
                None => HunkLine::context(""),
                Some(c) => {
                    let origin = LineOrigin::from_char(c).ok_or_else(|| {
                        ScribeError::Revision(format!("unexpected diff line: {:?}", raw))
                    })?;
                    HunkLine::new(origin, chars.as_str())
                }
            };
            hunk.lines.push(line);
        }

        Ok(hunks)
    }
}

fn parse_header(header: &str) -> Result<(u32, u32)> {
    let malformed = || ScribeError::Revision(format!("malformed hunk header: {:?}", header));

    let mut parts = header.split_whitespace();
    if parts.next() != Some("@@") {
        return Err(malformed());
    }
    let old = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .ok_or_else(malformed)?;
    let new = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(malformed)?;

    let start = |range: &str| -> Result<u32> {
        range
            .split(',')
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(malformed)
    };
    Ok((start(old)?, start(new)?))
}

/// Where an old line ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappedLine {
    /// The line survives at this new line number.
    Line(u32),
    /// The line was removed and has no successor.
    Deleted,
}

impl MappedLine {
    /// Returns the new line number, or `None` if deleted.
    pub fn line(self) -> Option<u32> {
        match self {
            Self::Line(n) => Some(n),
            Self::Deleted => None,
        }
    }
}

/// Lookup table from old line numbers to new line numbers.
///
/// Lines inside a hunk have explicit entries. Any other line maps through
/// the cumulative shift of the hunks before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMapping {
    entries: BTreeMap<u32, MappedLine>,
    /// `(first old line after a hunk, cumulative new - old shift)`, ascending.
    shifts: Vec<(u32, i64)>,
}

impl LineMapping {
    /// A mapping that sends every line to itself.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Maps an old line number.
    pub fn lookup(&self, old_line: u32) -> MappedLine {
        if let Some(mapped) = self.entries.get(&old_line) {
            return *mapped;
        }
        MappedLine::Line(apply_shift(old_line, self.shift_before(old_line)))
    }

    /// True if the line falls inside a hunk, rather than mapping by shift.
    pub fn is_covered(&self, old_line: u32) -> bool {
        self.entries.contains_key(&old_line)
    }

    /// True if every line maps to itself.
    pub fn is_identity(&self) -> bool {
        self.shifts.iter().all(|(_, delta)| *delta == 0)
            && self
                .entries
                .iter()
                .all(|(old, mapped)| *mapped == MappedLine::Line(*old))
    }

    /// Old line numbers removed by the diff, ascending.
    pub fn deleted_lines(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, mapped)| **mapped == MappedLine::Deleted)
            .map(|(old, _)| *old)
            .collect()
    }

    /// First old line after the last hunk. Every line from here on is valid.
    pub fn stable_from(&self) -> u32 {
        self.shifts.last().map(|(after, _)| *after).unwrap_or(1)
    }

    fn shift_before(&self, old_line: u32) -> i64 {
        self.shifts
            .iter()
            .rev()
            .find(|(after, _)| *after <= old_line)
            .map(|(_, delta)| *delta)
            .unwrap_or(0)
    }
}

fn apply_shift(line: u32, delta: i64) -> u32 {
    (line as i64 + delta).max(1) as u32
}

/// Builds the old→new line table for one file from its hunks.
pub fn build_line_mapping(hunks: &[Hunk]) -> LineMapping {
    let mut ordered: Vec<&Hunk> = hunks.iter().collect();
    ordered.sort_by_key(|h| h.old_start);

    let mut mapping = LineMapping::default();

    for hunk in ordered {
        let mut old = if hunk.old_len() == 0 {
            hunk.old_start + 1
        } else {
            hunk.old_start
        };
        let mut new = if hunk.new_len() == 0 {
            hunk.new_start + 1
        } else {
            hunk.new_start
        };

        for line in &hunk.lines {
            match line.origin {
                LineOrigin::Context => {
                    mapping.entries.insert(old, MappedLine::Line(new));
                    old += 1;
                    new += 1;
                }
                LineOrigin::Removed => {
                    mapping.entries.insert(old, MappedLine::Deleted);
                    old += 1;
                }
                LineOrigin::Added => {
                    new += 1;
                }
            }
        }

        mapping.shifts.push((old, new as i64 - old as i64));
    }

    debug!(
        hunks = hunks.len(),
        entries = mapping.entries.len(),
        "built line mapping"
    );
    mapping
}
