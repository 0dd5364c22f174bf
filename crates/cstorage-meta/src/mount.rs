//! Validation of mount options requested for image mounts.
//!
//! Image mounts are always read-only, so flags that would make the mount
//! writable are rejected before any mount is attempted. Anything not on the
//! deny-list is passed through untouched.

use crate::error::{Result, StorageError};

/// Mount options that are never accepted for an image mount.
const UNSUPPORTED_MOUNT_OPTIONS: &[&str] = &["rw"];

/// Checks `options` against the deny-list.
///
/// # Errors
///
/// Returns [`StorageError::UnsupportedMountOption`] naming the first rejected option.
pub fn validate_mount_options<S: AsRef<str>>(options: &[S]) -> Result<()> {
    match options
        .iter()
        .map(AsRef::<str>::as_ref)
        .find(|opt| UNSUPPORTED_MOUNT_OPTIONS.contains(opt))
    {
        Some(opt) => Err(StorageError::UnsupportedMountOption(opt.to_string())),
        None => Ok(()),
    }
}
