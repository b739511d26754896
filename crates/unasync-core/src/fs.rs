//! Filesystem helpers for the tree driver.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Create `path` and all missing parents.
///
/// An already existing directory is success; every other OS error is
/// returned unchanged.
pub fn makedirs_existok(path: impl AsRef<Path>) -> io::Result<()> {
    makedirs_existok_with(path.as_ref(), |p| fs::create_dir_all(p))
}

/// [`makedirs_existok`] with an injectable creation primitive.
pub fn makedirs_existok_with<F>(path: &Path, create: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    match create(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

/// Write `contents` to `path` unless the file already holds exactly those
/// bytes. Returns whether a write happened.
///
/// The new contents go to a temporary file next to `path` that is renamed
/// into place, so readers never observe a half-written destination. A new
/// file gets `permissions`; an existing destination keeps its own mode.
pub fn write_if_changed(path: &Path, contents: &[u8], permissions: fs::Permissions) -> io::Result<bool> {
    let permissions = match fs::read(path) {
        Ok(existing) if existing == contents => return Ok(false),
        Ok(_) => fs::metadata(path)?.permissions(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => permissions,
        Err(err) => return Err(err),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Temp files are created owner-only.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(true)
}
