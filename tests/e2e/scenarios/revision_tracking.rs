use super::CHAPTER;
use crate::harness::{EventMatch, Scenario};
use scribe_core::Status;

const WITH_PROLOGUE: &str = "Prologue.
A storm was coming.
The cat sat on the mat.
It was a sunny day.
The dog barked loudly.
Birds sang in the trees.
The end.
";

const WITHOUT_DOG: &str = "The cat sat on the mat.
It was a sunny day.
Birds sang in the trees.
The end.
";

const NEW_ENDING: &str = "The cat sat on the mat.
It was a sunny day.
The dog barked loudly.
Birds sang in the trees.
The very end.
";

#[test]
fn test_insert_above_shifts_annotations() {
    Scenario::new("insert_above_shifts")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .comment("span", "chapter.md", 1, 4, "Whole scene")
        .revision("r2", &[("chapter.md", WITH_PROLOGUE)])
        .sync("chapter.md", "r1", "r2")
        .assert_report(2, 0, 0)
        .assert_lines("dog", 5, 5)
        .assert_lines("span", 3, 6)
        .assert_anchor("dog", "r2")
        .assert_needs_review("dog", false)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_deleted_line_orphans_annotation() {
    Scenario::new("deleted_line_orphans")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .comment("birds", "chapter.md", 4, 4, "Which birds?")
        .revision("r2", &[("chapter.md", WITHOUT_DOG)])
        .sync("chapter.md", "r1", "r2")
        .assert_report(1, 1, 0)
        // Orphans fall back to the closest surviving line, preceding first
        .assert_lines("dog", 2, 2)
        .assert_needs_review("dog", true)
        .assert_anchor("dog", "r2")
        .assert_status("dog", Status::Open)
        .assert_event(EventMatch::Orphaned {
            label: "dog".into(),
            nearest_line: 2,
        })
        .assert_lines("birds", 3, 3)
        .assert_needs_review("birds", false)
        .mark_reviewed("dog")
        .assert_needs_review("dog", false)
        .run()
        .unwrap();
}

#[test]
fn test_range_shrinks_to_surviving_lines() {
    Scenario::new("range_shrinks")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("noise", "chapter.md", 3, 4, "Too much noise")
        .revision("r2", &[("chapter.md", WITHOUT_DOG)])
        .sync("chapter.md", "r1", "r2")
        .assert_report(0, 1, 0)
        // The dog line is gone; the birds line is all that is left
        .assert_lines("noise", 3, 3)
        .assert_event(EventMatch::Orphaned {
            label: "noise".into(),
            nearest_line: 3,
        })
        .run()
        .unwrap();
}

#[test]
fn test_unrelated_edit_leaves_position() {
    Scenario::new("unrelated_edit")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment_columns("cat", "chapter.md", 1, (4, 7), "Make it a dog")
        .revision("r2", &[("chapter.md", NEW_ENDING)])
        .sync("chapter.md", "r1", "r2")
        .assert_report(0, 0, 1)
        .assert_lines("cat", 1, 1)
        .assert_columns("cat", Some((4, 7)))
        .assert_anchor("cat", "r2")
        .run()
        .unwrap();
}

#[test]
fn test_moving_line_drops_columns() {
    Scenario::new("moving_line_drops_columns")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment_columns("cat", "chapter.md", 1, (4, 7), "Make it a dog")
        .revision("r2", &[("chapter.md", WITH_PROLOGUE)])
        .sync("chapter.md", "r1", "r2")
        .assert_lines("cat", 3, 3)
        .assert_columns("cat", None)
        .run()
        .unwrap();
}

#[test]
fn test_resolved_annotations_stay_put() {
    Scenario::new("resolved_stay_put")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("open", "chapter.md", 3, 3, "Too loud?")
        .comment("done", "chapter.md", 4, 4, "Which birds?")
        .resolve("done")
        .revision("r2", &[("chapter.md", WITH_PROLOGUE)])
        .sync("chapter.md", "r1", "r2")
        .assert_report(1, 0, 0)
        .assert_lines("done", 4, 4)
        .assert_anchor("done", "r1")
        .assert_anchor("open", "r2")
        .run()
        .unwrap();
}

#[test]
fn test_chained_revisions() {
    Scenario::new("chained_revisions")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("birds", "chapter.md", 4, 4, "Which birds?")
        .revision("r2", &[("chapter.md", WITH_PROLOGUE)])
        .sync("chapter.md", "r1", "r2")
        .assert_lines("birds", 6, 6)
        .revision("r3", &[("chapter.md", WITHOUT_DOG)])
        .sync("chapter.md", "r2", "r3")
        .assert_lines("birds", 3, 3)
        .assert_anchor("birds", "r3")
        .assert_needs_review("birds", false)
        // A second sync from the old revision finds nothing to move
        .sync("chapter.md", "r2", "r3")
        .assert_report(0, 0, 0)
        .run()
        .unwrap();
}

#[test]
fn test_other_files_are_not_touched() {
    Scenario::new("other_files_untouched")
        .revision(
            "r1",
            &[("chapter.md", CHAPTER), ("notes.md", "Remember the dog.\n")],
        )
        .comment("chapter", "chapter.md", 3, 3, "Too loud?")
        .comment("notes", "notes.md", 1, 1, "Which dog?")
        .revision("r2", &[("chapter.md", WITH_PROLOGUE)])
        .sync("chapter.md", "r1", "r2")
        .assert_report(1, 0, 0)
        .assert_anchor("notes", "r1")
        .assert_lines("notes", 1, 1)
        .run()
        .unwrap();
}

#[test]
fn test_removed_file_orphans_everything() {
    Scenario::new("removed_file")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .remove_file("r2", "chapter.md")
        .sync("chapter.md", "r1", "r2")
        .assert_report(0, 1, 0)
        .assert_needs_review("dog", true)
        .run()
        .unwrap();
}
