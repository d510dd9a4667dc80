//! Whole-file publication through a sibling temp file.
//!
//! Every rewrite lands in a temp file next to the destination and is renamed
//! over it, so a crash mid-write leaves either the old or the new content.
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("stage {}", dest.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("stage {}", dest.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync {}", dest.display()))?;
    if let Ok(meta) = fs::metadata(dest) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .with_context(|| format!("copy permissions onto {}", dest.display()))?;
    }
    tmp.persist(dest)
        .map_err(|err| anyhow!("publish {}: {}", dest.display(), err.error))?;
    Ok(())
}

pub fn write_atomic_text(dest: &Path, text: &str) -> Result<()> {
    write_atomic(dest, text.as_bytes())
}
