use super::CHAPTER;
use crate::harness::{Assertion, Scenario};
use scribe_core::Status;

const WITH_PROLOGUE: &str = "Prologue.
The cat sat on the mat.
It was a sunny day.
The dog barked loudly.
Birds sang in the trees.
The end.
";

#[test]
fn test_annotations_survive_restart() {
    Scenario::new("survive_restart")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .reply("answer", "dog", "Keep it")
        .crash()
        .restart()
        .assert_count(2)
        .assert_lines("dog", 3, 3)
        .assert(Assertion::ThreadSize {
            label: "answer".into(),
            size: 2,
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_remapped_positions_are_persisted() {
    Scenario::new("remap_persisted")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .revision("r2", &[("chapter.md", WITH_PROLOGUE)])
        .sync("chapter.md", "r1", "r2")
        .crash()
        .restart()
        .assert_lines("dog", 4, 4)
        .assert_anchor("dog", "r2")
        .run()
        .unwrap();
}

#[test]
fn test_status_changes_reach_audit_log() {
    Scenario::new("audit_log")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .comment("birds", "chapter.md", 4, 4, "Which birds?")
        .set_status("dog", Status::InProgress)
        .resolve("dog")
        .set_status("birds", Status::Rejected)
        .assert(Assertion::AuditEntries(3))
        .crash()
        .restart()
        .assert(Assertion::AuditEntries(3))
        .assert_status("dog", Status::Resolved)
        .assert_custom(|store, labels| {
            let dog = store.get(&labels["dog"])?;
            anyhow::ensure!(dog.history.len() == 2, "history: {:?}", dog.history);
            anyhow::ensure!(dog.history[0].to == Status::InProgress);
            anyhow::ensure!(dog.history[1].from == Status::InProgress);
            Ok(())
        })
        .run()
        .unwrap();
}

#[test]
fn test_deletes_are_persisted() {
    Scenario::new("deletes_persisted")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .comment("birds", "chapter.md", 4, 4, "Which birds?")
        .delete("dog")
        .crash()
        .restart()
        .assert_deleted("dog")
        .assert_count(1)
        .assert_custom(|store, labels| {
            let root = store
                .root()
                .ok_or_else(|| anyhow::anyhow!("store is in memory"))?;
            let record = root
                .join("annotations")
                .join(format!("{}.json", labels["dog"]));
            anyhow::ensure!(!record.exists(), "{} still on disk", record.display());
            Ok(())
        })
        .run()
        .unwrap();
}

#[test]
fn test_review_flag_survives_restart() {
    Scenario::new("review_flag_persisted")
        .revision("r1", &[("chapter.md", CHAPTER)])
        .comment("dog", "chapter.md", 3, 3, "Too loud?")
        .revision(
            "r2",
            &[("chapter.md", "The cat sat on the mat.\nIt was a sunny day.\nThe end.\n")],
        )
        .sync("chapter.md", "r1", "r2")
        .crash()
        .restart()
        .assert_needs_review("dog", true)
        .run()
        .unwrap();
}
