//! Named, cross-process coordination flags (spec §4.G "shared-memory discipline").
//!
//! Each flag is a one-byte `memmap2` mapping of a file under a coordination directory:
//! `0` means uninitialised, nonzero means initialised. Attaching a flag is idempotent - the
//! first process to create the backing file wins the race via `create_new`, every later
//! attacher just opens and maps the same file. A process-local reference count (kept in a
//! `once_cell` static, since the count itself is per-process, not shared) tracks how many
//! local `SharedFlag` handles are attached to each name; the file is unlinked only when the
//! last local handle drops, mirroring the reference-counted attach/detach discipline the
//! original implementation used for its shared-memory regions.

use geodash_core::error::{GeodashError, Result};
use memmap2::{MmapMut, MmapOptions};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

const FLAG_FILE_PREFIX: &str = "geodash_flag_";

static REFCOUNTS: Lazy<Mutex<HashMap<String, usize>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn flag_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{FLAG_FILE_PREFIX}{name}"))
}

/// A handle to one named coordination flag. Dropping the last local handle for a given name
/// unlinks the backing file.
pub struct SharedFlag {
    name: String,
    path: PathBuf,
    mmap: MmapMut,
}

impl SharedFlag {
    /// Attaches to (creating if absent) the named flag under `dir`.
    pub fn attach(dir: &Path, name: &str) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            GeodashError::ConfigurationError(format!("failed to create coordination dir {dir:?}: {e}"))
        })?;
        let path = flag_path(dir, name);

        match OpenOptions::new().read(true).write(true).create_new(true).open(&path) {
            Ok(file) => {
                file.set_len(1).map_err(|e| {
                    GeodashError::ConfigurationError(format!("failed to size flag file {path:?}: {e}"))
                })?;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(GeodashError::ConfigurationError(format!(
                    "failed to create flag file {path:?}: {e}"
                )))
            }
        }

        let file = OpenOptions::new().read(true).write(true).open(&path).map_err(|e| {
            GeodashError::ConfigurationError(format!("failed to open flag file {path:?}: {e}"))
        })?;
        if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
            file.set_len(1).map_err(|e| {
                GeodashError::ConfigurationError(format!("failed to size flag file {path:?}: {e}"))
            })?;
        }
        let mmap = unsafe {
            MmapOptions::new()
                .len(1)
                .map_mut(&file)
                .map_err(|e| GeodashError::ConfigurationError(format!("failed to map flag file {path:?}: {e}")))?
        };

        *REFCOUNTS.lock().unwrap().entry(name.to_string()).or_insert(0) += 1;

        Ok(Self { name: name.to_string(), path, mmap })
    }

    pub fn is_initialized(&self) -> bool {
        self.mmap[0] != 0
    }

    pub fn mark_initialized(&mut self) -> Result<()> {
        self.mmap[0] = 1;
        self.mmap
            .flush()
            .map_err(|e| GeodashError::ConfigurationError(format!("failed to flush flag {:?}: {e}", self.path)))
    }

    /// Current process-local reference count for this flag's name; exposed for tests.
    pub fn local_refcount(name: &str) -> usize {
        REFCOUNTS.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

impl Drop for SharedFlag {
    fn drop(&mut self) {
        let mut counts = REFCOUNTS.lock().unwrap();
        if let Some(count) = counts.get_mut(&self.name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.name);
                let _ = fs::remove_file(&self.path);
            }
        }
    }
}

/// Unlinks any flag file under `dir` whose name starts with the coordination prefix and
/// whose mtime is older than `max_age` (spec §4.G "stale-region sweep"). Returns the number
/// of files removed. Intended to be run by one nominated worker at startup.
pub fn sweep_stale(dir: &Path, max_age: Duration) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(GeodashError::ConfigurationError(format!(
                "failed to list coordination dir {dir:?}: {e}"
            )))
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_flag_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(FLAG_FILE_PREFIX))
            .unwrap_or(false);
        if !is_flag_file {
            continue;
        }
        if file_is_stale(&path, now, max_age) {
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
    }
    Ok(removed)
}

fn file_is_stale(path: &Path, now: SystemTime, max_age: Duration) -> bool {
    let Ok(metadata) = fs::metadata(path) else { return false };
    let Ok(modified) = metadata.modified() else { return false };
    now.duration_since(modified).map(|age| age > max_age).unwrap_or(false)
}

/// Reopens the file at `path` directly, bypassing `attach`'s refcounting - used only by the
/// stale sweep's own tests to check survival without holding a `SharedFlag`.
#[cfg(test)]
fn file_exists(path: &Path) -> bool {
    File::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn attach_creates_uninitialized_flag() {
        let dir = tempdir().unwrap();
        let flag = SharedFlag::attach(dir.path(), "name_index").unwrap();
        assert!(!flag.is_initialized());
    }

    #[test]
    fn mark_initialized_is_visible_to_a_second_attach() {
        let dir = tempdir().unwrap();
        let mut first = SharedFlag::attach(dir.path(), "ascii_index").unwrap();
        first.mark_initialized().unwrap();
        let second = SharedFlag::attach(dir.path(), "ascii_index").unwrap();
        assert!(second.is_initialized());
    }

    #[test]
    fn file_is_unlinked_only_after_last_handle_drops() {
        let dir = tempdir().unwrap();
        let first = SharedFlag::attach(dir.path(), "spatial_index").unwrap();
        let path = first.path.clone();
        let second = SharedFlag::attach(dir.path(), "spatial_index").unwrap();
        assert_eq!(SharedFlag::local_refcount("spatial_index"), 2);

        drop(first);
        assert!(file_exists(&path), "file should survive while one handle remains");

        drop(second);
        assert!(!file_exists(&path), "file should be unlinked once the last handle drops");
    }

    #[test]
    fn sweep_removes_only_stale_flag_files() {
        let dir = tempdir().unwrap();
        let flag = SharedFlag::attach(dir.path(), "recent").unwrap();
        let path = flag.path.clone();
        std::mem::forget(flag); // keep the file on disk without a live refcount handle

        let removed = sweep_stale(dir.path(), Duration::from_secs(86_400)).unwrap();
        assert_eq!(removed, 0);
        assert!(file_exists(&path));
    }
}
