//! On-disk annotation records under `.scribe/`.
//!
//! ```text
//! .scribe/
//!   LOCK                  PID of the owning process, fs2 exclusive lock
//!   config.toml
//!   audit.jsonl           one StatusChange per line, append-only
//!   annotations/<id>.json
//! ```

use crate::error::{Result, ScribeError};
use crate::types::{Annotation, StatusChange};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Line of `audit.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub annotation_id: String,
    #[serde(flatten)]
    pub change: StatusChange,
}

/// Annotation records in a `.scribe` directory.
///
/// Holds the directory's lock for its whole lifetime.
#[derive(Debug)]
pub struct RecordStore {
    root: PathBuf,
    _lock: LockGuard,
}

impl RecordStore {
    /// Opens (creating if needed) the record directory at `root` and takes
    /// its lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if a live process holds the lock.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("annotations"))?;
        let lock = acquire_lock(&root.join("LOCK"))?;
        debug!(root = %root.display(), "opened record store");
        Ok(Self { root, _lock: lock })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join("annotations").join(format!("{}.json", id))
    }

    /// Reads every record, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns `CorruptedRecord` for a record that does not decode.
    pub fn load_all(&self) -> Result<Vec<Annotation>> {
        let mut annotations = Vec::new();
        for entry in fs::read_dir(self.root.join("annotations"))? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let annotation: Annotation =
                serde_json::from_str(&content).map_err(|e| ScribeError::CorruptedRecord {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            annotations.push(annotation);
        }
        annotations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(annotations)
    }

    /// Writes a record atomically (temp file, fsync, rename).
    pub fn write(&self, annotation: &Annotation) -> Result<()> {
        let path = self.record_path(&annotation.id);
        let tmp_path = path.with_extension("tmp");
        let content = serde_json::to_vec_pretty(annotation)
            .map_err(|e| ScribeError::Serialization(e.to_string()))?;

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &path)?;

        #[cfg(unix)]
        {
            if let Ok(dir_file) = File::open(self.root.join("annotations")) {
                let _ = dir_file.sync_all();
            }
        }

        Ok(())
    }

    /// Removes a record. Missing records are not an error.
    pub fn remove(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends a status change to the audit log.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        let line =
            serde_json::to_string(entry).map_err(|e| ScribeError::Serialization(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join("audit.jsonl"))?;
        writeln!(file, "{}", line)?;
        file.sync_data()?;
        Ok(())
    }

    /// Reads the audit log, oldest first.
    pub fn read_audit(&self) -> Result<Vec<AuditEntry>> {
        let path = self.root.join("audit.jsonl");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| ScribeError::CorruptedRecord {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Exclusive lock on a `.scribe` directory.
///
/// Released, and the lock file removed, on drop.
#[derive(Debug)]
struct LockGuard {
    /// Wrapped in Option to allow taking ownership in Drop.
    file: Option<File>,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
        }
        let _ = fs::remove_file(&self.path);
    }
}

const LOCK_ATTEMPTS: u32 = 3;

fn acquire_lock(lock_path: &Path) -> Result<LockGuard> {
    for _ in 0..LOCK_ATTEMPTS {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                file.flush()?;

                file.try_lock_exclusive()
                    .map_err(|_| ScribeError::StoreLocked { pid: 0 })?;

                return Ok(LockGuard {
                    file: Some(file),
                    path: lock_path.to_path_buf(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                clear_stale_lock(lock_path)?;
            }
            Err(e) => return Err(ScribeError::Io(e)),
        }
    }
    Err(ScribeError::StoreLocked { pid: 0 })
}

/// Removes a lock left by a dead process. Fails if the holder is alive.
fn clear_stale_lock(lock_path: &Path) -> Result<()> {
    let content = match fs::read_to_string(lock_path) {
        Ok(content) => content,
        // released between our open and read
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(_) => return Err(ScribeError::StoreLocked { pid: 0 }),
    };

    match content.trim().parse::<u32>() {
        Ok(pid) if is_process_alive(pid) => return Err(ScribeError::StoreLocked { pid }),
        Ok(pid) => warn!(pid = pid, "Detected stale lock from dead process, cleaning up"),
        Err(_) => warn!("Lock file has invalid content, attempting cleanup"),
    }
    match fs::remove_file(lock_path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(ScribeError::Io(e)),
        _ => Ok(()),
    }
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    // Zombies keep /proc/{pid} but lose a readable stat file.
    Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    // Stale locks are never cleaned here; delete LOCK by hand.
    true
}
