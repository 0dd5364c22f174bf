//! Reversible removal of on-disk state.
//!
//! Instead of deleting a layer or image directory in place, it is renamed into
//! a freshly created directory under a trash root. The trash directory name is
//! chosen by the filesystem (exclusive creation), so concurrent callers sharing
//! one trash root never end up in the same directory. Emptying the trash is
//! left to the caller.
//!
//! Since the move is a plain `rename(2)`, the source and the trash root must be
//! on the same filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Result, StorageError};

/// Creates a new, uniquely named directory under `trash_root` and leaves it on disk.
fn create_trash_dir(trash_root: &Path) -> Result<PathBuf> {
    tempfile::Builder::new()
        .prefix("")
        .tempdir_in(trash_root)
        .map(|dir| dir.keep())
        .map_err(|source| StorageError::CreateTrashDir {
            path: trash_root.to_path_buf(),
            source,
        })
}

/// Moves `source` into a new directory below `trash_root`, keeping its base name.
///
/// Returns the path the entry now lives at.
///
/// # Errors
///
/// Returns [`StorageError::CreateTrashDir`] if the trash directory cannot be
/// created, in which case `source` is untouched, or [`StorageError::MoveToTrash`]
/// if the rename fails. In the latter case the empty trash directory is left
/// behind.
pub fn move_to_trash(source: impl AsRef<Path>, trash_root: impl AsRef<Path>) -> Result<PathBuf> {
    let source = source.as_ref();
    let trash_dir = create_trash_dir(trash_root.as_ref())?;

    let move_err = |err: std::io::Error| StorageError::MoveToTrash {
        source_path: source.to_path_buf(),
        destination: trash_dir.clone(),
        source: err,
    };

    let name = source
        .file_name()
        .ok_or_else(|| move_err(std::io::Error::from(ErrorKind::InvalidInput)))?;
    let destination = trash_dir.join(name);

    std::fs::rename(source, &destination).map_err(move_err)?;

    debug!("moved {source:?} to {destination:?}");
    Ok(destination)
}
