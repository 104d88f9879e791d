use anyhow::{Context, Result};
use scribe_core::{AnnotationStore, MemoryRevisions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub type Store = AnnotationStore<MemoryRevisions>;

/// Manages isolated test environments with tempfile
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        Ok(Self { dir })
    }

    /// Get workspace path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Initialize a scribe store in the workspace
    pub fn init_store(&self, revisions: MemoryRevisions) -> Result<Store> {
        Ok(AnnotationStore::init(self.path(), revisions)?)
    }

    /// Open the existing scribe store
    pub fn open_store(&self, revisions: MemoryRevisions) -> Result<Store> {
        Ok(AnnotationStore::open(self.path(), revisions)?)
    }

    /// Write a working-copy file
    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let full_path = self.path().join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {}", path))?;
        }

        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write file: {}", path))?;

        Ok(())
    }

    /// Read a working-copy file
    pub fn read_file(&self, path: &str) -> Result<String> {
        let full_path = self.path().join(path);
        fs::read_to_string(&full_path).with_context(|| format!("Failed to read file: {}", path))
    }

    /// Check if file exists
    pub fn file_exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }
}
