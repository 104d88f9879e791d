//! Word-level diff engine.
//!
//! Computes a minimal edit script between two token sequences using the
//! classic edit-distance matrix. A diagonal step between unequal tokens is
//! reported as a single `Modified` unit rather than a removal followed by an
//! insertion, which keeps word diffs readable for prose.

use crate::error::{Result, ScribeError};
use crate::tokenizer::{tokenize, Token, TokenizeOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::debug;

/// Confidence attached to unchanged units.
pub const UNCHANGED_CONFIDENCE: f64 = 1.0;
/// Confidence attached to added units.
pub const ADDED_CONFIDENCE: f64 = 0.9;
/// Confidence attached to removed units.
pub const REMOVED_CONFIDENCE: f64 = 0.9;

/// Options controlling tokenization, comparison and the size guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Compare words case-insensitively.
    pub ignore_case: bool,
    /// Treat punctuation as insignificant when comparing.
    pub ignore_punctuation: bool,
    /// Merge words shorter than this into their neighbours.
    pub minimum_token_length: usize,
    /// Unchanged words kept on each side of a change when displaying.
    pub context_words: usize,
    /// Largest token count either side may have once shared context is trimmed.
    pub max_tokens: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            ignore_punctuation: false,
            minimum_token_length: 1,
            context_words: 5,
            max_tokens: 3_000,
        }
    }
}

impl DiffOptions {
    pub fn with_ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        self
    }

    pub fn with_ignore_punctuation(mut self, ignore: bool) -> Self {
        self.ignore_punctuation = ignore;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_context_words(mut self, context_words: usize) -> Self {
        self.context_words = context_words;
        self
    }

    /// Returns the tokenizer options implied by these diff options.
    pub fn tokenize_options(&self) -> TokenizeOptions {
        TokenizeOptions {
            ignore_case: self.ignore_case,
            ignore_punctuation: self.ignore_punctuation,
            minimum_token_length: self.minimum_token_length,
        }
    }
}

/// Classification of a diff unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// Present in both texts.
    Unchanged,
    /// Only in the modified text.
    Added,
    /// Only in the original text.
    Removed,
    /// Replaced in place.
    Modified,
}

/// One element of a word diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffUnit {
    /// Unit classification.
    pub kind: DiffKind,
    /// Text as it appears in the modified text (original text for removals).
    pub content: String,
    /// Original text for modified units.
    pub original_content: Option<String>,
    /// Byte range in the modified text. Zero-width for removals.
    pub position_range: Range<usize>,
    /// Byte range in the original text, if the unit has original-side content.
    pub original_range: Option<Range<usize>>,
    /// Similarity confidence in `[0, 1]`.
    pub confidence: f64,
}

impl DiffUnit {
    /// Returns true unless the unit is unchanged.
    pub fn is_change(&self) -> bool {
        self.kind != DiffKind::Unchanged
    }

    /// Text this unit contributes to the original document.
    pub fn original_side(&self) -> &str {
        match self.kind {
            DiffKind::Unchanged | DiffKind::Removed => &self.content,
            DiffKind::Modified => self.original_content.as_deref().unwrap_or(""),
            DiffKind::Added => "",
        }
    }

    /// Text this unit contributes to the modified document.
    pub fn modified_side(&self) -> &str {
        match self.kind {
            DiffKind::Unchanged | DiffKind::Added | DiffKind::Modified => &self.content,
            DiffKind::Removed => "",
        }
    }
}

/// Token counts for a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub unchanged_tokens: usize,
    pub added_tokens: usize,
    pub removed_tokens: usize,
    pub modified_tokens: usize,
}

impl DiffStats {
    /// Number of token edits in the script.
    pub fn edit_distance(&self) -> usize {
        self.added_tokens + self.removed_tokens + self.modified_tokens
    }

    /// Fraction of tokens touched by an edit (0.0 for two empty texts).
    pub fn change_ratio(&self) -> f64 {
        let total = self.unchanged_tokens + self.edit_distance();
        if total == 0 {
            0.0
        } else {
            self.edit_distance() as f64 / total as f64
        }
    }
}

/// Complete word diff between two texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Canonical unit sequence, unchanged context included.
    pub units: Vec<DiffUnit>,
    /// Token counts.
    pub stats: DiffStats,
}

/// A displayable slice of a diff after context pruning.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayItem<'a> {
    /// A unit shown as-is.
    Unit(&'a DiffUnit),
    /// A collapsed stretch of unchanged units.
    Elided {
        /// Units hidden.
        units: usize,
        /// Words among the hidden units.
        words: usize,
    },
}

impl DiffResult {
    /// Returns true if no unit is a change.
    pub fn is_identical(&self) -> bool {
        self.units.iter().all(|u| !u.is_change())
    }

    /// Iterates over change units only.
    pub fn changes(&self) -> impl Iterator<Item = &DiffUnit> {
        self.units.iter().filter(|u| u.is_change())
    }

    /// Rebuilds the original text from the units.
    pub fn original_text(&self) -> String {
        self.units.iter().map(DiffUnit::original_side).collect()
    }

    /// Rebuilds the modified text from the units.
    pub fn modified_text(&self) -> String {
        self.units.iter().map(DiffUnit::modified_side).collect()
    }

    /// Collapses unchanged runs to `context_words` words around each change.
    ///
    /// Presentation only; `units` is left untouched.
    pub fn display(&self, context_words: usize) -> Vec<DisplayItem<'_>> {
        let mut keep = vec![false; self.units.len()];

        for (idx, unit) in self.units.iter().enumerate() {
            if !unit.is_change() {
                continue;
            }
            keep[idx] = true;

            let mut words = 0;
            for back in (0..idx).rev() {
                let candidate = &self.units[back];
                if candidate.is_change() {
                    break;
                }
                if is_word_unit(candidate) {
                    if words == context_words {
                        break;
                    }
                    words += 1;
                }
                keep[back] = true;
            }

            let mut words = 0;
            for fwd in idx + 1..self.units.len() {
                let candidate = &self.units[fwd];
                if candidate.is_change() {
                    break;
                }
                if is_word_unit(candidate) {
                    if words == context_words {
                        break;
                    }
                    words += 1;
                }
                keep[fwd] = true;
            }
        }

        let mut items = Vec::new();
        let mut hidden_units = 0;
        let mut hidden_words = 0;
        for (unit, kept) in self.units.iter().zip(keep) {
            if kept {
                if hidden_units > 0 {
                    items.push(DisplayItem::Elided {
                        units: hidden_units,
                        words: hidden_words,
                    });
                    hidden_units = 0;
                    hidden_words = 0;
                }
                items.push(DisplayItem::Unit(unit));
            } else {
                hidden_units += 1;
                if is_word_unit(unit) {
                    hidden_words += 1;
                }
            }
        }
        if hidden_units > 0 {
            items.push(DisplayItem::Elided {
                units: hidden_units,
                words: hidden_words,
            });
        }
        items
    }

    /// Renders the diff inline with `[-removed-]` and `{+added+}` markers.
    pub fn to_marked_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DiffResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            match unit.kind {
                DiffKind::Unchanged => write!(f, "{}", unit.content)?,
                DiffKind::Added => write!(f, "{{+{}+}}", unit.content)?,
                DiffKind::Removed => write!(f, "[-{}-]", unit.content)?,
                DiffKind::Modified => write!(
                    f,
                    "[-{}-]{{+{}+}}",
                    unit.original_content.as_deref().unwrap_or(""),
                    unit.content
                )?,
            }
        }
        Ok(())
    }
}

fn is_word_unit(unit: &DiffUnit) -> bool {
    !unit.content.trim().is_empty()
}

/// Computes the word diff between `original` and `modified`.
///
/// # Errors
///
/// Returns `DiffTooLarge` if, after trimming the shared prefix and suffix,
/// either side has more than `options.max_tokens` tokens.
pub fn diff(original: &str, modified: &str, options: &DiffOptions) -> Result<DiffResult> {
    let tokenize_options = options.tokenize_options();
    let a = tokenize(original, &tokenize_options);
    let b = tokenize(modified, &tokenize_options);

    let prefix = a
        .iter()
        .zip(b.iter())
        .take_while(|(x, y)| same(x, y))
        .count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| same(x, y))
        .count();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    let largest = a_mid.len().max(b_mid.len());
    if largest > options.max_tokens {
        return Err(ScribeError::DiffTooLarge {
            tokens: largest,
            limit: options.max_tokens,
        });
    }

    debug!(
        original_tokens = a.len(),
        modified_tokens = b.len(),
        prefix,
        suffix,
        "computing word diff"
    );

    let mut steps: Vec<Step> = (0..prefix).map(|i| Step::Equal(i, i)).collect();
    let matrix = distance_matrix(a_mid, b_mid);
    steps.extend(backtrack(&matrix, a_mid, b_mid).into_iter().map(|s| s.offset(prefix)));
    steps.extend((0..suffix).map(|k| Step::Equal(a.len() - suffix + k, b.len() - suffix + k)));

    Ok(build_result(&steps, &a, &b))
}

/// Token-level edit distance between two texts. Symmetric in its arguments.
pub fn edit_distance(original: &str, modified: &str, options: &TokenizeOptions) -> usize {
    let a = tokenize(original, options);
    let b = tokenize(modified, options);
    let keys_a: Vec<&str> = a.iter().map(|t| t.normalized.as_str()).collect();
    let keys_b: Vec<&str> = b.iter().map(|t| t.normalized.as_str()).collect();
    rolling_distance(&keys_a, &keys_b)
}

/// Character-level Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let chars_a: Vec<char> = a.chars().collect();
    let chars_b: Vec<char> = b.chars().collect();
    rolling_distance(&chars_a, &chars_b)
}

/// Similarity of two strings as `1 - levenshtein / max_len`, clamped to `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let score = 1.0 - levenshtein(a, b) as f64 / longest as f64;
    score.clamp(0.0, 1.0)
}

fn rolling_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j - 1] + cost).min(prev[j] + 1).min(curr[j - 1] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn same(a: &Token, b: &Token) -> bool {
    a.normalized == b.normalized
}

/// One backtracked edit step, holding token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Equal(usize, usize),
    Insert(usize),
    Delete(usize),
    Substitute(usize, usize),
}

impl Step {
    fn offset(self, by: usize) -> Self {
        match self {
            Step::Equal(i, j) => Step::Equal(i + by, j + by),
            Step::Insert(j) => Step::Insert(j + by),
            Step::Delete(i) => Step::Delete(i + by),
            Step::Substitute(i, j) => Step::Substitute(i + by, j + by),
        }
    }
}

fn distance_matrix(a: &[Token], b: &[Token]) -> Vec<Vec<u32>> {
    let n = a.len();
    let m = b.len();
    let mut dp = vec![vec![0u32; m + 1]; n + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i as u32;
    }
    for j in 0..=m {
        dp[0][j] = j as u32;
    }

    for i in 1..=n {
        for j in 1..=m {
            let cost = if same(&a[i - 1], &b[j - 1]) { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j - 1] + cost)
                .min(dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1);
        }
    }

    dp
}

/// Walks the matrix from `(n, m)` back to the origin.
///
/// Matches are taken whenever they are optimal; among edits the order of
/// preference is insertion, deletion, substitution.
fn backtrack(dp: &[Vec<u32>], a: &[Token], b: &[Token]) -> Vec<Step> {
    let mut steps = Vec::with_capacity(a.len() + b.len());
    let mut i = a.len();
    let mut j = b.len();

    while i > 0 || j > 0 {
        if i == 0 {
            steps.push(Step::Insert(j - 1));
            j -= 1;
        } else if j == 0 {
            steps.push(Step::Delete(i - 1));
            i -= 1;
        } else if same(&a[i - 1], &b[j - 1]) && dp[i][j] == dp[i - 1][j - 1] {
            steps.push(Step::Equal(i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if dp[i][j] == dp[i][j - 1] + 1 {
            steps.push(Step::Insert(j - 1));
            j -= 1;
        } else if dp[i][j] == dp[i - 1][j] + 1 {
            steps.push(Step::Delete(i - 1));
            i -= 1;
        } else {
            steps.push(Step::Substitute(i - 1, j - 1));
            i -= 1;
            j -= 1;
        }
    }

    steps.reverse();
    steps
}

fn build_result(steps: &[Step], a: &[Token], b: &[Token]) -> DiffResult {
    let mut stats = DiffStats::default();
    let mut units: Vec<DiffUnit> = Vec::with_capacity(steps.len());
    // Raw units folded into the last unit; modified runs average their confidence.
    let mut folded = 1usize;
    // End of the last modified-side token consumed.
    let mut cursor = 0usize;

    for step in steps {
        let unit = match *step {
            Step::Equal(i, j) => {
                stats.unchanged_tokens += 1;
                cursor = b[j].range.end;
                DiffUnit {
                    kind: DiffKind::Unchanged,
                    content: b[j].content.clone(),
                    original_content: None,
                    position_range: b[j].range.clone(),
                    original_range: Some(a[i].range.clone()),
                    confidence: UNCHANGED_CONFIDENCE,
                }
            }
            Step::Insert(j) => {
                stats.added_tokens += 1;
                cursor = b[j].range.end;
                DiffUnit {
                    kind: DiffKind::Added,
                    content: b[j].content.clone(),
                    original_content: None,
                    position_range: b[j].range.clone(),
                    original_range: None,
                    confidence: ADDED_CONFIDENCE,
                }
            }
            Step::Delete(i) => {
                stats.removed_tokens += 1;
                DiffUnit {
                    kind: DiffKind::Removed,
                    content: a[i].content.clone(),
                    original_content: None,
                    position_range: cursor..cursor,
                    original_range: Some(a[i].range.clone()),
                    confidence: REMOVED_CONFIDENCE,
                }
            }
            Step::Substitute(i, j) => {
                stats.modified_tokens += 1;
                cursor = b[j].range.end;
                DiffUnit {
                    kind: DiffKind::Modified,
                    content: b[j].content.clone(),
                    original_content: Some(a[i].content.clone()),
                    position_range: b[j].range.clone(),
                    original_range: Some(a[i].range.clone()),
                    confidence: similarity(&a[i].content, &b[j].content),
                }
            }
        };

        match units.last_mut() {
            Some(last) if last.kind == unit.kind && unit.is_change() => {
                last.content.push_str(&unit.content);
                if let (Some(into), Some(from)) =
                    (last.original_content.as_mut(), unit.original_content.as_ref())
                {
                    into.push_str(from);
                }
                last.position_range.end = unit.position_range.end;
                if let (Some(into), Some(from)) =
                    (last.original_range.as_mut(), unit.original_range.as_ref())
                {
                    into.end = from.end;
                }
                if unit.kind == DiffKind::Modified {
                    last.confidence =
                        (last.confidence * folded as f64 + unit.confidence) / (folded + 1) as f64;
                }
                folded += 1;
            }
            _ => {
                units.push(unit);
                folded = 1;
            }
        }
    }

    DiffResult { units, stats }
}
