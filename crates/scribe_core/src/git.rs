//! [`RevisionCollaborator`] backed by a git repository.

use crate::error::{Result, ScribeError};
use crate::line_mapping::{Hunk, HunkLine, LineOrigin};
use crate::revisions::RevisionCollaborator;
use git2::{Diff, DiffOptions, ErrorCode, Repository, Tree};
use std::path::Path;
use tracing::debug;

/// Reads file text and diffs from a git repository through `git2`.
///
/// Revisions are anything `git rev-parse` accepts: commit ids, branch names,
/// `HEAD~2`.
pub struct GitRevisions {
    repo: Repository,
}

impl GitRevisions {
    /// Opens the repository containing `path`.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(path.as_ref())?;
        Ok(Self { repo })
    }

    pub fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    /// Working directory of the repository, if it is not bare.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    fn tree_at(&self, revision: &str) -> Result<Tree<'_>> {
        self.resolve(revision).map_err(|e| {
            ScribeError::Revision(format!("cannot resolve {}: {}", revision, e.message()))
        })
    }

    fn resolve(&self, revision: &str) -> std::result::Result<Tree<'_>, git2::Error> {
        self.repo.revparse_single(revision)?.peel_to_commit()?.tree()
    }
}

impl RevisionCollaborator for GitRevisions {
    fn get_text_at(&self, path: &str, revision: &str) -> Result<String> {
        let not_found = || ScribeError::BlobNotFound {
            path: path.to_string(),
            revision: revision.to_string(),
        };

        let tree = match self.resolve(revision) {
            Ok(tree) => tree,
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                return Err(not_found())
            }
            Err(e) => {
                return Err(ScribeError::Revision(format!(
                    "cannot resolve {}: {}",
                    revision,
                    e.message()
                )))
            }
        };
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        let blob = self.repo.find_blob(entry.id()).map_err(|_| not_found())?;

        String::from_utf8(blob.content().to_vec()).map_err(|_| {
            ScribeError::Revision(format!("{} at {} is not UTF-8 text", path, revision))
        })
    }

    fn get_structural_diff(
        &self,
        path: &str,
        old_revision: &str,
        new_revision: &str,
    ) -> Result<Vec<Hunk>> {
        let old_tree = self.tree_at(old_revision)?;
        let new_tree = self.tree_at(new_revision)?;

        let mut opts = DiffOptions::new();
        opts.pathspec(path)
            .disable_pathspec_match(true)
            .context_lines(0);
        let diff =
            self.repo
                .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?;

        let hunks = extract_hunks(&diff)?;
        debug!(
            path,
            old = old_revision,
            new = new_revision,
            hunks = hunks.len(),
            "git structural diff"
        );
        Ok(hunks)
    }

    fn get_current_revision_id(&self) -> Result<String> {
        let head = self.repo.head()?.peel_to_commit()?;
        Ok(head.id().to_string())
    }
}

/// Converts git2's borrowed hunks and lines into owned [`Hunk`]s.
///
/// Both callbacks run on this thread in order, so a `RefCell` is enough to
/// share the hunk list between them.
fn extract_hunks(diff: &Diff<'_>) -> Result<Vec<Hunk>> {
    use std::cell::RefCell;

    let hunks: RefCell<Vec<Hunk>> = RefCell::new(Vec::new());

    diff.foreach(
        &mut |_delta, _progress| true,
        None,
        Some(&mut |_delta, hunk| {
            hunks
                .borrow_mut()
                .push(Hunk::new(hunk.old_start(), hunk.new_start(), Vec::new()));
            true
        }),
        Some(&mut |_delta, _hunk, line| {
            // File headers and "no newline" markers carry other origins.
            let Some(origin) = LineOrigin::from_char(line.origin()) else {
                return true;
            };
            let text = String::from_utf8_lossy(line.content());
            let text = text.trim_end_matches(['\n', '\r']).to_string();
            if let Some(h) = hunks.borrow_mut().last_mut() {
                h.lines.push(HunkLine::new(origin, text));
            }
            true
        }),
    )?;

    Ok(hunks.into_inner())
}
