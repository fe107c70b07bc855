//! Opening log files by name from a trusted base directory.

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Owner read bit
const OWNER_READ: u32 = 0o400;

#[derive(Debug, Error)]
pub enum FileAccessError {
    #[error("file {0:?} does not exist")]
    NotFound(String),

    #[error("file {0:?} is not readable")]
    NotReadable(String),

    #[error("{0:?} is not a regular file")]
    NotRegularFile(String),

    #[error("file name {0:?} is outside the log directory")]
    PathTraversal(String),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A directory whose regular, owner-readable files may be handed out by name.
#[derive(Debug, Clone)]
pub struct LogDirectory {
    root: PathBuf,
}

impl LogDirectory {
    /// The directory must exist and be listable.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, FileAccessError> {
        let given = root.as_ref();
        let root = fs::canonicalize(given).map_err(|source| FileAccessError::Io {
            path: given.to_path_buf(),
            source,
        })?;

        if !root.is_dir() {
            return Err(FileAccessError::NotADirectory(root));
        }

        if let Err(e) = fs::read_dir(&root) {
            return Err(match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    FileAccessError::NotReadable(root.display().to_string())
                }
                _ => FileAccessError::Io {
                    path: root,
                    source: e,
                },
            });
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `name` onto the root, refusing anything but plain path components.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, FileAccessError> {
        let relative = Path::new(name);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if name.is_empty() || !plain {
            return Err(FileAccessError::PathTraversal(name.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Open `name` for reading. The caller owns and closes the handle.
    pub fn open(&self, name: &str) -> Result<File, FileAccessError> {
        let path = self.resolve(name)?;

        // lstat: a symlink is not a regular file, even if its target is.
        let meta = fs::symlink_metadata(&path).map_err(|e| access_error(name, path.clone(), e))?;
        if !meta.file_type().is_file() {
            return Err(FileAccessError::NotRegularFile(name.to_string()));
        }
        if meta.permissions().mode() & OWNER_READ == 0 {
            return Err(FileAccessError::NotReadable(name.to_string()));
        }

        // Intermediate directories may still be symlinks out of the root.
        let canonical = fs::canonicalize(&path).map_err(|e| access_error(name, path.clone(), e))?;
        if !canonical.starts_with(&self.root) {
            return Err(FileAccessError::PathTraversal(name.to_string()));
        }

        File::open(&canonical).map_err(|e| access_error(name, canonical, e))
    }
}

fn access_error(name: &str, path: PathBuf, e: io::Error) -> FileAccessError {
    match e.kind() {
        io::ErrorKind::NotFound => FileAccessError::NotFound(name.to_string()),
        io::ErrorKind::PermissionDenied => FileAccessError::NotReadable(name.to_string()),
        _ => FileAccessError::Io { path, source: e },
    }
}
