//! Applies `suggestion` annotations to text.
//!
//! Applying never touches the annotation itself; accepting it is a separate
//! status transition.

use crate::error::{Result, ScribeError};
use crate::types::{Annotation, AnnotationType};

/// Result of [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The text with the suggestion spliced in.
    pub text: String,
    /// False when the suggestion already matched the text.
    pub applied: bool,
}

/// Splices the annotation's `suggested_text` into `text`.
///
/// A single-line position with columns replaces `[column_start, column_end)`
/// on that line. Any other position replaces the whole lines
/// `line_start..=line_end` with the suggested lines. Every line keeps its
/// own ending; inserted lines take the endings of the lines they replace,
/// so a missing final newline stays missing.
///
/// # Errors
///
/// - `InvalidSuggestion` if the annotation is not a suggestion or has no
///   replacement text
/// - `PositionOutOfRange` if the lines or columns exceed `text`
pub fn apply(annotation: &Annotation, text: &str) -> Result<Applied> {
    let suggested = suggested_text(annotation)?;
    let position = &annotation.position;

    let lines: Vec<(&str, &str)> = text.split_inclusive('\n').map(split_ending).collect();

    let line_count = lines.len();
    if position.line_start == 0
        || position.line_start > position.line_end
        || position.line_end as usize > line_count
    {
        return Err(ScribeError::PositionOutOfRange {
            reason: format!(
                "lines {}-{} but text has {} lines",
                position.line_start, position.line_end, line_count
            ),
        });
    }
    let first = position.line_start as usize - 1;
    let last = position.line_end as usize - 1;
    let line_break = break_near(&lines, first);

    let mut result = String::with_capacity(text.len() + suggested.len());
    for (body, ending) in &lines[..first] {
        result.push_str(body);
        result.push_str(ending);
    }

    match position.columns() {
        Some((start, end)) if position.is_single_line() => {
            let (line, ending) = lines[first];
            let (start, end) = (start as usize, end as usize);
            if start > end || !line.is_char_boundary(start) || !line.is_char_boundary(end) {
                return Err(ScribeError::PositionOutOfRange {
                    reason: format!(
                        "columns {}..{} outside line {} ({} bytes)",
                        start,
                        end,
                        position.line_start,
                        line.len()
                    ),
                });
            }
            result.push_str(&line[..start]);
            result.push_str(&suggested.lines().collect::<Vec<_>>().join(line_break));
            result.push_str(&line[end..]);
            result.push_str(ending);
        }
        _ => {
            let replaced = &lines[first..=last];
            let count = suggested.lines().count();
            for (i, body) in suggested.lines().enumerate() {
                let ending = if i + 1 == count {
                    replaced[replaced.len() - 1].1
                } else {
                    replaced
                        .get(i)
                        .map(|(_, ending)| *ending)
                        .filter(|ending| !ending.is_empty())
                        .unwrap_or(line_break)
                };
                result.push_str(body);
                result.push_str(ending);
            }
        }
    }

    for (body, ending) in &lines[last + 1..] {
        result.push_str(body);
        result.push_str(ending);
    }

    let applied = result != text;
    Ok(Applied {
        text: result,
        applied,
    })
}

/// Splits one `split_inclusive` line into its body and its ending.
fn split_ending(raw: &str) -> (&str, &str) {
    let body = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw);
    (body, &raw[body.len()..])
}

/// Line break to use for new lines inserted at `index`.
fn break_near<'a>(lines: &[(&str, &'a str)], index: usize) -> &'a str {
    let own = lines.get(index).map(|(_, ending)| *ending);
    let previous = index.checked_sub(1).and_then(|p| lines.get(p)).map(|(_, ending)| *ending);
    own.into_iter()
        .chain(previous)
        .find(|ending| !ending.is_empty())
        .unwrap_or("\n")
}

/// The text [`apply`] would produce.
pub fn preview(annotation: &Annotation, text: &str) -> Result<String> {
    apply(annotation, text).map(|applied| applied.text)
}

fn suggested_text(annotation: &Annotation) -> Result<&str> {
    let invalid = |reason: &str| ScribeError::InvalidSuggestion {
        id: annotation.id.clone(),
        reason: reason.to_string(),
    };

    if annotation.annotation_type != AnnotationType::Suggestion {
        return Err(invalid(&format!(
            "{} annotations carry no replacement text",
            annotation.annotation_type
        )));
    }
    match annotation.suggested_text.as_deref() {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(invalid("suggestion has no replacement text")),
    }
}
