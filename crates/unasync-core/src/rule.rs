/*!
# Rules

A rule binds a source directory to a destination directory and the
substitution table applied to files moved between them. Both roots are
normalized once at construction; matching afterwards compares path
components, never raw string prefixes.
*/

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, UnasyncError};
use crate::fs::{makedirs_existok, write_if_changed};
use crate::rewriter::rewrite_bytes;
use crate::table::SubstitutionTable;

/// Lexically normalize a path.
///
/// Drops `.` components and trailing separators and folds `name/..` pairs,
/// without consulting the filesystem. A `..` that cannot be folded is kept.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// What happened to a destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Written,
    Unchanged,
}

/// Source root to destination root binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    source_root: PathBuf,
    dest_root: PathBuf,
    table: SubstitutionTable,
}

impl Rule {
    /// Rule using the default table extended with `additional` replacements.
    pub fn new<I, K, V>(fromdir: impl AsRef<Path>, todir: impl AsRef<Path>, additional: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let table = SubstitutionTable::with_defaults(additional)?;
        Ok(Self::with_table(fromdir, todir, table))
    }

    /// Rule with an explicit, already built table.
    pub fn with_table(fromdir: impl AsRef<Path>, todir: impl AsRef<Path>, table: SubstitutionTable) -> Self {
        Self {
            source_root: normalize_path(fromdir),
            dest_root: normalize_path(todir),
            table,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    pub fn table(&self) -> &SubstitutionTable {
        &self.table
    }

    /// True if `path` is the source root or lies beneath it.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        normalize_path(path).starts_with(&self.source_root)
    }

    /// Map a matched source path into the destination root.
    pub fn destination_for(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let normalized = normalize_path(path.as_ref());
        let relative = normalized
            .strip_prefix(&self.source_root)
            .map_err(|_| UnasyncError::PathMismatch {
                path: path.as_ref().to_path_buf(),
                root: self.source_root.clone(),
            })?;
        Ok(self.dest_root.join(relative))
    }

    /// Rewrite one source file into its destination.
    ///
    /// The destination is left untouched when it already holds the rewritten
    /// bytes, so repeated runs are no-ops. A newly created destination takes
    /// the source file's permissions.
    pub fn transform_file(&self, path: impl AsRef<Path>) -> Result<(PathBuf, FileOutcome)> {
        let path = path.as_ref();
        let destination = self.destination_for(path)?;
        let outcome = self.transform_into(path, &destination)?;
        Ok((destination, outcome))
    }

    /// [`Rule::transform_file`] with the destination already worked out.
    pub(crate) fn transform_into(&self, path: &Path, destination: &Path) -> Result<FileOutcome> {
        let bytes = fs::read(path).map_err(|e| UnasyncError::io(path, e))?;
        let permissions = fs::metadata(path)
            .map_err(|e| UnasyncError::io(path, e))?
            .permissions();
        let output = rewrite_bytes(path, &bytes, &self.table)?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            makedirs_existok(parent).map_err(|e| UnasyncError::io(parent, e))?;
        }

        let outcome = if write_if_changed(destination, &output, permissions)
            .map_err(|e| UnasyncError::io(destination, e))?
        {
            FileOutcome::Written
        } else {
            FileOutcome::Unchanged
        };

        debug!(
            source = %path.display(),
            destination = %destination.display(),
            ?outcome,
            "unasynced file"
        );
        Ok(outcome)
    }
}
