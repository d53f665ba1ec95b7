//! On-disk helpers shared by the chunk store, the registry and the codec.

use std::io::Write;
use std::path::{Component, Path};

use tempfile::NamedTempFile;

use crate::error::{Result, StorageError};

/// Accepts `value` only if it can be used as a single path component below a
/// storage root: non-empty, no separators, no `.`/`..`, no leading dot.
pub fn safe_component<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let mut components = Path::new(value).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if value.is_empty()
        || !single_normal
        || value.starts_with('.')
        || value.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidDescriptor(format!(
            "{} is not a valid identifier: {:?}",
            field, value
        )));
    }

    Ok(value)
}

/// Writes `bytes` to a temporary file next to `path`, then renames it into place.
/// Readers observe either the previous content or the complete new content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;

    Ok(())
}

/// Runs disk-bound `work` on tokio's blocking pool and waits for it.
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
