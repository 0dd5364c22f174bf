//! Name list updates for images, layers and containers.
//!
//! Every stored object carries an ordered list of names (tags or references).
//! Callers rewrite that list by asking for one of three operations, see
//! [`UpdateNameOperation`]. Whatever the operation, the result never contains
//! the same name twice: the first occurrence is kept and later ones dropped.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StorageError};

/// How a name list should be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateNameOperation {
    /// Replace all existing names with the given ones.
    Set,
    /// Put the given names in front of the existing ones.
    Add,
    /// Drop the given names from the existing ones.
    Remove,
}

impl UpdateNameOperation {
    /// The lowercase name used for this operation on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for UpdateNameOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateNameOperation {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "set" => Ok(Self::Set),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => Err(StorageError::InvalidUpdateNameOperation(other.to_string())),
        }
    }
}

/// Removes repeated names, keeping the first occurrence of each.
pub fn dedupe_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(Into::into)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Computes the name list that results from applying `op` with `params` to `old_names`.
///
/// - [`Set`](UpdateNameOperation::Set) ignores `old_names` entirely.
/// - [`Add`](UpdateNameOperation::Add) places `params` before `old_names`, so a name that is
///   added again moves to the front.
/// - [`Remove`](UpdateNameOperation::Remove) keeps the names of `old_names` that do not appear
///   in `params`. Unknown names are ignored.
///
/// The result is always deduplicated, which also cleans up duplicates already present in
/// `old_names`.
pub fn apply_name_operation<O: AsRef<str>, P: AsRef<str>>(
    old_names: &[O],
    params: &[P],
    op: UpdateNameOperation,
) -> Vec<String> {
    let old = old_names.iter().map(AsRef::<str>::as_ref);
    let new = params.iter().map(AsRef::<str>::as_ref);
    match op {
        UpdateNameOperation::Set => dedupe_names(new),
        UpdateNameOperation::Remove => {
            let removed: HashSet<&str> = new.collect();
            dedupe_names(old.filter(|name| !removed.contains(name)))
        }
        UpdateNameOperation::Add => dedupe_names(new.chain(old)),
    }
}

/// Like [`apply_name_operation`], for an operation that arrives as a string.
///
/// # Errors
///
/// Returns [`StorageError::InvalidUpdateNameOperation`] if `op` is not one of
/// `set`, `add` or `remove`.
pub fn apply_name_operation_str<O: AsRef<str>, P: AsRef<str>>(
    old_names: &[O],
    params: &[P],
    op: &str,
) -> Result<Vec<String>> {
    let op = op.parse()?;
    Ok(apply_name_operation(old_names, params, op))
}
