use super::assertions::{Assertion, EventMatch};
use super::runner::ScenarioRunner;
use super::steps::ScenarioStep;
use super::workspace::Store;
use scribe_core::{AnnotationType, Status};
use std::collections::HashMap;
use std::time::Duration;

const REVIEWER: &str = "reviewer";

/// Fluent DSL for building test scenarios
pub struct Scenario {
    name: String,
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Create a new scenario with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    // ===== Revisions =====

    /// Record a revision that writes `files` and make it current. The
    /// working copy is updated to match.
    pub fn revision(mut self, id: &str, files: &[(&str, &str)]) -> Self {
        self.steps.push(ScenarioStep::Commit {
            revision: id.to_string(),
            files: files
                .iter()
                .map(|(path, text)| (path.to_string(), text.to_string()))
                .collect(),
        });
        self
    }

    /// Record a revision without `path`
    pub fn remove_file(mut self, id: &str, path: &str) -> Self {
        self.steps.push(ScenarioStep::RemoveFile {
            revision: id.to_string(),
            path: path.to_string(),
        });
        self
    }

    // ===== Reviewer actions =====

    /// Comment on lines `start..=end` at the current revision
    pub fn comment(self, label: &str, file: &str, start: u32, end: u32, content: &str) -> Self {
        self.annotate(label, AnnotationType::Comment, file, (start, end), None, content, None)
    }

    /// Comment on a column range of one line
    pub fn comment_columns(
        self,
        label: &str,
        file: &str,
        line: u32,
        columns: (u32, u32),
        content: &str,
    ) -> Self {
        self.annotate(
            label,
            AnnotationType::Comment,
            file,
            (line, line),
            Some(columns),
            content,
            None,
        )
    }

    /// Comment anchored at an explicit revision
    pub fn comment_at(
        mut self,
        label: &str,
        revision: &str,
        file: &str,
        start: u32,
        end: u32,
        content: &str,
    ) -> Self {
        self = self.annotate(label, AnnotationType::Comment, file, (start, end), None, content, None);
        if let Some(ScenarioStep::Annotate { revision: r, .. }) = self.steps.last_mut() {
            *r = Some(revision.to_string());
        }
        self
    }

    /// Propose `replacement` for lines `start..=end`
    pub fn suggest(
        self,
        label: &str,
        file: &str,
        start: u32,
        end: u32,
        content: &str,
        replacement: &str,
    ) -> Self {
        self.annotate(
            label,
            AnnotationType::Suggestion,
            file,
            (start, end),
            None,
            content,
            Some(replacement),
        )
    }

    /// Propose `replacement` for a column range of one line
    pub fn suggest_columns(
        self,
        label: &str,
        file: &str,
        line: u32,
        columns: (u32, u32),
        replacement: &str,
    ) -> Self {
        self.annotate(
            label,
            AnnotationType::Suggestion,
            file,
            (line, line),
            Some(columns),
            "wording",
            Some(replacement),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn annotate(
        mut self,
        label: &str,
        kind: AnnotationType,
        file: &str,
        lines: (u32, u32),
        columns: Option<(u32, u32)>,
        content: &str,
        suggestion: Option<&str>,
    ) -> Self {
        self.steps.push(ScenarioStep::Annotate {
            label: label.to_string(),
            kind,
            file: file.to_string(),
            lines,
            columns,
            content: content.to_string(),
            suggestion: suggestion.map(str::to_string),
            revision: None,
        });
        self
    }

    /// Expect annotating these lines at the current revision to fail
    pub fn comment_fails(mut self, file: &str, start: u32, end: u32) -> Self {
        self.steps.push(ScenarioStep::AnnotateFails {
            file: file.to_string(),
            lines: (start, end),
            revision: None,
        });
        self
    }

    /// Reply to an annotation
    pub fn reply(mut self, label: &str, parent: &str, text: &str) -> Self {
        self.steps.push(ScenarioStep::Reply {
            label: label.to_string(),
            parent: parent.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Move an annotation to `status` as the reviewer
    pub fn set_status(mut self, label: &str, status: Status) -> Self {
        self.steps.push(ScenarioStep::Transition {
            label: label.to_string(),
            status,
            actor: REVIEWER.to_string(),
        });
        self
    }

    /// Expect the lifecycle to refuse `status`
    pub fn set_status_fails(mut self, label: &str, status: Status) -> Self {
        self.steps.push(ScenarioStep::TransitionFails {
            label: label.to_string(),
            status,
        });
        self
    }

    pub fn resolve(self, label: &str) -> Self {
        self.set_status(label, Status::Resolved)
    }

    pub fn delete(mut self, label: &str) -> Self {
        self.steps.push(ScenarioStep::Delete {
            label: label.to_string(),
        });
        self
    }

    pub fn mark_reviewed(mut self, label: &str) -> Self {
        self.steps.push(ScenarioStep::MarkReviewed {
            label: label.to_string(),
        });
        self
    }

    // ===== Author actions =====

    /// Move annotations on `file` from one revision to another
    pub fn sync(mut self, file: &str, from: &str, to: &str) -> Self {
        self.steps.push(ScenarioStep::Sync {
            file: file.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    /// Apply a suggestion to the working copy
    pub fn apply_suggestion(mut self, label: &str) -> Self {
        self.steps.push(ScenarioStep::ApplySuggestion {
            label: label.to_string(),
        });
        self
    }

    // ===== Time control =====

    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(ScenarioStep::Wait { duration });
        self
    }

    pub fn wait_hours(self, hours: u64) -> Self {
        self.wait(Duration::from_secs(hours * 3600))
    }

    // ===== Failure simulation =====

    /// Drop the store without any cleanup
    pub fn crash(mut self) -> Self {
        self.steps.push(ScenarioStep::Crash);
        self
    }

    /// Reopen the store from disk after a crash
    pub fn restart(mut self) -> Self {
        self.steps.push(ScenarioStep::Restart);
        self
    }

    // ===== Assertions =====

    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.steps.push(ScenarioStep::Assert { assertion });
        self
    }

    pub fn assert_lines(self, label: &str, start: u32, end: u32) -> Self {
        self.assert(Assertion::Position {
            label: label.to_string(),
            lines: (start, end),
        })
    }

    pub fn assert_columns(self, label: &str, columns: Option<(u32, u32)>) -> Self {
        self.assert(Assertion::Columns {
            label: label.to_string(),
            columns,
        })
    }

    pub fn assert_status(self, label: &str, status: Status) -> Self {
        self.assert(Assertion::Status {
            label: label.to_string(),
            status,
        })
    }

    pub fn assert_needs_review(self, label: &str, expected: bool) -> Self {
        self.assert(Assertion::NeedsReview {
            label: label.to_string(),
            expected,
        })
    }

    pub fn assert_anchor(self, label: &str, revision: &str) -> Self {
        self.assert(Assertion::Anchor {
            label: label.to_string(),
            revision: revision.to_string(),
        })
    }

    pub fn assert_deleted(self, label: &str) -> Self {
        self.assert(Assertion::Deleted(label.to_string()))
    }

    pub fn assert_count(self, count: usize) -> Self {
        self.assert(Assertion::Count(count))
    }

    pub fn assert_open_count(self, count: usize) -> Self {
        self.assert(Assertion::OpenCount(count))
    }

    /// Assert on the report of the last `sync`
    pub fn assert_report(self, moved: usize, orphaned: usize, untouched: usize) -> Self {
        self.assert(Assertion::Report {
            moved,
            orphaned,
            untouched,
        })
    }

    pub fn assert_file_contains(self, path: &str, text: &str) -> Self {
        self.assert(Assertion::FileContains {
            path: path.to_string(),
            text: text.to_string(),
        })
    }

    pub fn assert_event(self, event: EventMatch) -> Self {
        self.assert(Assertion::EventSeen(event))
    }

    /// Run `check` against the store; labels map to annotation ids
    pub fn assert_custom(
        self,
        check: impl Fn(&mut Store, &HashMap<String, String>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.assert(Assertion::Custom(Box::new(check)))
    }

    // ===== Execution =====

    /// Execute the scenario and return results
    pub fn run(self) -> ScenarioResult {
        let mut runner = match ScenarioRunner::new() {
            Ok(r) => r,
            Err(e) => {
                return ScenarioResult {
                    name: self.name.clone(),
                    success: false,
                    steps_executed: 0,
                    failure_step: Some(0),
                    error: Some(format!("Failed to create runner: {}", e)),
                }
            }
        };

        match runner.execute(&self.steps) {
            Ok(()) => ScenarioResult {
                name: self.name,
                success: true,
                steps_executed: self.steps.len(),
                failure_step: None,
                error: None,
            },
            Err(e) => {
                let failure_step = runner.current_step();
                ScenarioResult {
                    name: self.name,
                    success: false,
                    steps_executed: failure_step,
                    failure_step: Some(failure_step),
                    error: Some(format!("{:?}", e)),
                }
            }
        }
    }
}

/// Result of running a scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub steps_executed: usize,
    pub failure_step: Option<usize>,
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Unwrap the result, panicking if it failed
    pub fn unwrap(self) {
        if !self.success {
            panic!(
                "Scenario '{}' failed at step {}: {}",
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }

    /// Expect the result to be successful
    pub fn expect(self, msg: &str) {
        if !self.success {
            panic!(
                "{}: Scenario '{}' failed at step {}: {}",
                msg,
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}
