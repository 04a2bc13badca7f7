//! Atomic replacement of the master file.
//!
//! Bytes go to a temp file in the destination's directory (same filesystem,
//! so the rename cannot degrade to a copy), are flushed and synced, and the
//! temp file is renamed over the destination. Readers see either the old
//! file or the new one, never a partial write.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

fn parent_dir_or_dot(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

pub fn atomic_write_bytes(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".into());
    let mut tmp = Builder::new()
        .prefix(&format!(".{stem}."))
        .suffix(".tmp")
        .tempfile_in(dir)?;

    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;

    // The file is already in place; a failed directory sync is not a failed write.
    let _ = sync_dir(dir);
    Ok(())
}

/// Copy `src` over `dest` with the same all-or-nothing guarantee.
pub fn atomic_copy(src: &Path, dest: &Path) -> io::Result<()> {
    let bytes = fs::read(src)?;
    atomic_write_bytes(dest, &bytes)
}

fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
