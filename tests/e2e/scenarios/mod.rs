mod persistence;
mod revision_tracking;

/// Five-line manuscript used by most scenarios.
pub const CHAPTER: &str = "The cat sat on the mat.
It was a sunny day.
The dog barked loudly.
Birds sang in the trees.
The end.
";
