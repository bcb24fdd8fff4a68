use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Serialize `value` as pretty JSON with a four-space indent.
///
/// Non-ASCII text is written as-is.
pub fn pretty_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value
        .serialize(&mut serializer)
        .context("serialize JSON")?;
    Ok(bytes)
}

/// Replace `dest` with `bytes` so readers see either the old or the new file.
///
/// The bytes are staged in a temp file next to `dest`, synced, then renamed
/// over it.
pub fn publish_bytes(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("stage {}", dest.display()))?;
    staged
        .write_all(bytes)
        .with_context(|| format!("stage {}", dest.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("sync {}", dest.display()))?;
    staged
        .persist(dest)
        .map_err(|err| err.error)
        .with_context(|| format!("publish {}", dest.display()))?;
    Ok(())
}

pub fn publish_json<T: Serialize>(dest: &Path, value: &T) -> Result<()> {
    let bytes = pretty_json_bytes(value)?;
    publish_bytes(dest, &bytes)
}
