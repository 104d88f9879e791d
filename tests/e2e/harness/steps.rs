use std::time::Duration;

use scribe_core::{AnnotationType, Status};

use super::assertions::Assertion;

/// All possible actions in a test scenario.
///
/// Annotations are referred to by a scenario label rather than their id.
#[derive(Debug)]
pub enum ScenarioStep {
    // Revisions
    Commit {
        revision: String,
        files: Vec<(String, String)>,
    },
    RemoveFile {
        revision: String,
        path: String,
    },

    // Reviewer actions
    Annotate {
        label: String,
        kind: AnnotationType,
        file: String,
        lines: (u32, u32),
        columns: Option<(u32, u32)>,
        content: String,
        suggestion: Option<String>,
        revision: Option<String>,
    },
    AnnotateFails {
        file: String,
        lines: (u32, u32),
        revision: Option<String>,
    },
    Reply {
        label: String,
        parent: String,
        text: String,
    },
    Transition {
        label: String,
        status: Status,
        actor: String,
    },
    TransitionFails {
        label: String,
        status: Status,
    },
    Delete {
        label: String,
    },
    MarkReviewed {
        label: String,
    },

    // Author actions
    Sync {
        file: String,
        from: String,
        to: String,
    },
    ApplySuggestion {
        label: String,
    },

    // Time control
    Wait {
        duration: Duration,
    },

    // Failure simulation
    Crash,
    Restart,

    // Assertions (can be interspersed)
    Assert {
        assertion: Assertion,
    },
}
