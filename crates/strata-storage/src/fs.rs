//! File system helpers shared by the file adapters.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use strata_common::error::StrataResult;
use strata_common::types::Timestamp;
use strata_common::{META_FILE_PREFIX, TEMP_FILE_SUFFIX};

/// Distinguishes temp files written within the same microsecond.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Reads a file to a string. A missing file is `None`.
pub fn read_if_exists(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Replaces `path` with `contents` atomically.
///
/// The contents go to a uniquely named temp file next to the target, which
/// is flushed when `sync` is set and then renamed over the target. Readers
/// see either the old file or the new one, never a partial write. Parent
/// directories are created as needed.
pub fn write_atomic(path: &Path, contents: &str, sync: bool) -> StrataResult<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)?;
    }

    let tmp_path = temp_path(path);
    let result = write_and_rename(&tmp_path, path, contents, sync);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result?;

    // Sync the directory so the rename itself is durable
    if sync {
        if let Some(dir) = dir {
            if let Ok(handle) = File::open(dir) {
                let _ = handle.sync_all();
            }
        }
    }

    trace!("Wrote {} byte(s) to {}", contents.len(), path.display());
    Ok(())
}

fn write_and_rename(tmp_path: &Path, path: &Path, contents: &str, sync: bool) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp_path)?;
    file.write_all(contents.as_bytes())?;
    if sync {
        file.sync_all()?;
    }
    drop(file);

    fs::rename(tmp_path, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(
        ".{}.{}{}",
        Timestamp::now().as_micros(),
        seq,
        TEMP_FILE_SUFFIX
    ));
    path.with_file_name(name)
}

/// Returns true for temp files left by [`write_atomic`].
pub fn is_temp_file(name: &str) -> bool {
    name.ends_with(TEMP_FILE_SUFFIX)
}

/// Returns true for per-table metadata files.
pub fn is_meta_file(name: &str) -> bool {
    name.starts_with(META_FILE_PREFIX)
}

/// Lists the names of the regular files in `dir`, sorted.
pub fn list_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
