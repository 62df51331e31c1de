use std::fs;
use std::io::Write;

use camino::Utf8Path;
use tempfile::Builder;

use crate::error::CatalogError;

pub fn ensure_dir(path: &Utf8Path) -> Result<(), CatalogError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(format!("create {path}: {err}")))
}

/// Writes `content` next to `path` first and renames it into place, so a
/// failed write never leaves a truncated file behind.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CatalogError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    ensure_dir(parent)?;

    let mut temp = Builder::new()
        .prefix("arcgis-catalog")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| CatalogError::Filesystem(format!("write {path}: {err}")))?;
    temp.flush()
        .map_err(|err| CatalogError::Filesystem(format!("write {path}: {err}")))?;

    temp.persist(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(format!("persist {path}: {err}")))?;
    Ok(())
}
