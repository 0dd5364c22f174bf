//! UID/GID mapping options for user-namespaced storage.
//!
//! Mappings come from two places: explicit `container:host:size` triples given
//! on the command line or in configuration, and subordinate ID ranges assigned
//! to a user or group in `/etc/subuid` and `/etc/subgid`.

use std::path::Path;

use crate::error::{Result, StorageError};

/// Default location of the subordinate UID ranges.
pub const SUBUID_FILE: &str = "/etc/subuid";

/// Default location of the subordinate GID ranges.
pub const SUBGID_FILE: &str = "/etc/subgid";

/// A contiguous range of IDs mapped from the container to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMap {
    /// First ID inside the container.
    pub container_id: u32,
    /// First ID on the host.
    pub host_id: u32,
    /// Number of IDs in the range.
    pub size: u32,
}

/// Mapping options for a layer or container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMappingOptions {
    /// Use the host's UIDs unchanged.
    pub host_uid_mapping: bool,
    /// Use the host's GIDs unchanged.
    pub host_gid_mapping: bool,
    /// UID ranges, in order.
    pub uid_map: Vec<IdMap>,
    /// GID ranges, in order.
    pub gid_map: Vec<IdMap>,
}

impl Default for IdMappingOptions {
    fn default() -> Self {
        Self {
            host_uid_mapping: true,
            host_gid_mapping: true,
            uid_map: Vec::new(),
            gid_map: Vec::new(),
        }
    }
}

/// Parse mapping specifications of the form `container:host:size`.
///
/// A single specification may chain several triples (`0:1000:1:1:100000:65536`).
/// `kind` ("UID" or "GID") is only used in error messages.
///
/// # Errors
///
/// Returns [`StorageError::MalformedIdMap`] if a specification does not consist
/// of whole triples of unsigned 32-bit integers.
pub fn parse_id_map<S: AsRef<str>>(specs: &[S], kind: &str) -> Result<Vec<IdMap>> {
    let mut maps = Vec::new();
    for spec in specs {
        let spec = spec.as_ref();
        let malformed = || StorageError::MalformedIdMap {
            kind: kind.to_string(),
            spec: spec.to_string(),
        };

        let fields = spec
            .trim()
            .split(':')
            .map(|field| field.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| malformed())?;
        if fields.is_empty() || fields.len() % 3 != 0 {
            return Err(malformed());
        }

        maps.extend(fields.chunks_exact(3).map(|triple| IdMap {
            container_id: triple[0],
            host_id: triple[1],
            size: triple[2],
        }));
    }
    Ok(maps)
}

/// Parse the ranges assigned to `name` from the contents of a subuid/subgid file.
///
/// Lines have the form `name:start:count`; blank lines and `#` comments are
/// skipped, as are lines that do not parse. Container IDs are assigned from 0
/// upwards across the ranges in file order.
fn parse_subid_ranges(content: &str, name: &str) -> Vec<IdMap> {
    let mut next_container_id = 0u32;
    let mut maps = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.splitn(3, ':');
        let (Some(owner), Some(start), Some(count)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if owner != name {
            continue;
        }
        let (Ok(host_id), Ok(size)) = (start.parse::<u32>(), count.parse::<u32>()) else {
            continue;
        };
        maps.push(IdMap {
            container_id: next_container_id,
            host_id,
            size,
        });
        next_container_id = next_container_id.saturating_add(size);
    }
    maps
}

fn read_subid_ranges(path: &Path, name: &str) -> Result<Vec<IdMap>> {
    let content = std::fs::read_to_string(path).map_err(|e| StorageError::SubordinateIds {
        name: name.to_string(),
        reason: format!("reading {path:?}: {e}"),
    })?;
    let maps = parse_subid_ranges(&content, name);
    if maps.is_empty() {
        return Err(StorageError::SubordinateIds {
            name: name.to_string(),
            reason: format!("no ranges found in {path:?}"),
        });
    }
    Ok(maps)
}

/// Subordinate UID and GID ranges of a user and group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMappings {
    uids: Vec<IdMap>,
    gids: Vec<IdMap>,
}

impl IdMappings {
    /// Look up `user` in [`SUBUID_FILE`] and `group` in [`SUBGID_FILE`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SubordinateIds`] if either file cannot be read or
    /// has no ranges for the requested name.
    pub fn new(user: &str, group: &str) -> Result<Self> {
        Self::from_subid_files(user, group, SUBUID_FILE, SUBGID_FILE)
    }

    /// Like [`new()`](Self::new), reading the ranges from the given files.
    pub fn from_subid_files(
        user: &str,
        group: &str,
        subuid_path: impl AsRef<Path>,
        subgid_path: impl AsRef<Path>,
    ) -> Result<Self> {
        Ok(Self {
            uids: read_subid_ranges(subuid_path.as_ref(), user)?,
            gids: read_subid_ranges(subgid_path.as_ref(), group)?,
        })
    }

    /// The UID ranges.
    pub fn uids(&self) -> &[IdMap] {
        &self.uids
    }

    /// The GID ranges.
    pub fn gids(&self) -> &[IdMap] {
        &self.gids
    }
}

/// Build mapping options from explicit specifications and subordinate ID names.
///
/// - If only one of `subuid_name`/`subgid_name` is given, it is used for both.
/// - If only one of `uid_specs`/`gid_specs` is given, it is used for both.
/// - A non-root caller with neither specs nor subordinate names gets its own
///   UID/GID mapped to 0.
/// - Subordinate ranges come first, followed by the explicit specs.
///
/// Host mapping stays enabled only for an ID kind that ends up with no ranges.
///
/// # Errors
///
/// Returns an error if a specification is malformed or the subordinate ranges
/// cannot be read.
pub fn parse_id_mapping<S: AsRef<str>>(
    uid_specs: &[S],
    gid_specs: &[S],
    subuid_name: Option<&str>,
    subgid_name: Option<&str>,
) -> Result<IdMappingOptions> {
    let uid = rustix::process::getuid();
    let rootless_ids = if uid.is_root() {
        None
    } else {
        Some((uid.as_raw(), rustix::process::getgid().as_raw()))
    };
    build_id_mapping(
        uid_specs,
        gid_specs,
        subuid_name,
        subgid_name,
        rootless_ids,
        IdMappings::new,
    )
}

fn build_id_mapping<S: AsRef<str>>(
    uid_specs: &[S],
    gid_specs: &[S],
    subuid_name: Option<&str>,
    subgid_name: Option<&str>,
    rootless_ids: Option<(u32, u32)>,
    lookup: impl FnOnce(&str, &str) -> Result<IdMappings>,
) -> Result<IdMappingOptions> {
    let subuid_name = subuid_name.filter(|n| !n.is_empty());
    let subgid_name = subgid_name.filter(|n| !n.is_empty());
    let subuid_name = subuid_name.or(subgid_name);
    let subgid_name = subgid_name.or(subuid_name);

    let mut uid_specs: Vec<String> = uid_specs.iter().map(|s| s.as_ref().to_string()).collect();
    let mut gid_specs: Vec<String> = gid_specs.iter().map(|s| s.as_ref().to_string()).collect();
    if gid_specs.is_empty() {
        gid_specs.clone_from(&uid_specs);
    }
    if uid_specs.is_empty() {
        uid_specs.clone_from(&gid_specs);
    }
    if let Some((uid, gid)) = rootless_ids {
        if uid_specs.is_empty() && subuid_name.is_none() {
            uid_specs.push(format!("0:{uid}:1"));
        }
        if gid_specs.is_empty() && subgid_name.is_none() {
            gid_specs.push(format!("0:{gid}:1"));
        }
    }

    let mut options = IdMappingOptions::default();
    if let (Some(user), Some(group)) = (subuid_name, subgid_name) {
        let mappings = lookup(user, group)?;
        options.uid_map = mappings.uids;
        options.gid_map = mappings.gids;
    }
    options.uid_map.extend(parse_id_map(&uid_specs, "UID")?);
    options.gid_map.extend(parse_id_map(&gid_specs, "GID")?);
    options.host_uid_mapping = options.uid_map.is_empty();
    options.host_gid_mapping = options.gid_map.is_empty();
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const fn map(container_id: u32, host_id: u32, size: u32) -> IdMap {
        IdMap {
            container_id,
            host_id,
            size,
        }
    }

    fn no_lookup(_: &str, _: &str) -> Result<IdMappings> {
        panic!("subordinate ids should not be looked up");
    }

    #[test]
    fn test_parse_id_map() {
        assert_eq!(
            parse_id_map(&["0:100000:65536"], "UID").unwrap(),
            vec![map(0, 100000, 65536)]
        );
        assert_eq!(
            parse_id_map(&[" 0:1000:1:1:100000:65536 "], "UID").unwrap(),
            vec![map(0, 1000, 1), map(1, 100000, 65536)]
        );
        assert!(parse_id_map::<&str>(&[], "UID").unwrap().is_empty());
    }

    #[test]
    fn test_parse_id_map_malformed() {
        for spec in ["0:1", "a:b:c", "", "0:1:2:3", "0:1:-1", "0:1:4294967296"] {
            let err = parse_id_map(&[spec], "GID").unwrap_err();
            assert!(
                matches!(err, StorageError::MalformedIdMap { ref kind, .. } if kind == "GID"),
                "{spec:?}"
            );
        }
    }

    #[test]
    fn test_parse_subid_ranges() {
        let content = "\
# comment
alice:100000:65536
bob:165536:65536

alice:300000:10
alice:broken
";
        assert_eq!(
            parse_subid_ranges(content, "alice"),
            vec![map(0, 100000, 65536), map(65536, 300000, 10)]
        );
        assert!(parse_subid_ranges(content, "carol").is_empty());
    }

    #[test]
    fn test_from_subid_files() {
        let dir = tempfile::tempdir().unwrap();
        let subuid = dir.path().join("subuid");
        let subgid = dir.path().join("subgid");
        std::fs::write(&subuid, "builder:100000:65536\n").unwrap();
        std::fs::write(&subgid, "builders:200000:1000\n").unwrap();

        let mappings = IdMappings::from_subid_files("builder", "builders", &subuid, &subgid).unwrap();
        assert_eq!(mappings.uids(), &[map(0, 100000, 65536)]);
        assert_eq!(mappings.gids(), &[map(0, 200000, 1000)]);

        let err = IdMappings::from_subid_files("nobody", "builders", &subuid, &subgid).unwrap_err();
        assert!(matches!(err, StorageError::SubordinateIds { ref name, .. } if name == "nobody"));
    }

    #[test]
    fn test_uid_specs_reused_for_gids() {
        let options =
            build_id_mapping(&["0:1000:1"], &[], None, None, None, no_lookup).unwrap();
        assert_eq!(options.uid_map, vec![map(0, 1000, 1)]);
        assert_eq!(options.gid_map, vec![map(0, 1000, 1)]);
        assert!(!options.host_uid_mapping);
        assert!(!options.host_gid_mapping);
    }

    #[test]
    fn test_root_without_specs_uses_host() {
        let options = build_id_mapping::<&str>(&[], &[], None, None, None, no_lookup).unwrap();
        assert_eq!(options, IdMappingOptions::default());
    }

    #[test]
    fn test_rootless_without_specs_maps_self() {
        let options =
            build_id_mapping::<&str>(&[], &[], None, None, Some((1000, 1001)), no_lookup).unwrap();
        assert_eq!(options.uid_map, vec![map(0, 1000, 1)]);
        assert_eq!(options.gid_map, vec![map(0, 1001, 1)]);
    }

    #[test]
    fn test_subordinate_ranges_first() {
        let options = build_id_mapping(
            &["70000:5000:1"],
            &[],
            Some("builder"),
            None,
            Some((1000, 1000)),
            |user, group| {
                assert_eq!((user, group), ("builder", "builder"));
                Ok(IdMappings {
                    uids: vec![map(0, 100000, 65536)],
                    gids: vec![map(0, 200000, 65536)],
                })
            },
        )
        .unwrap();
        assert_eq!(
            options.uid_map,
            vec![map(0, 100000, 65536), map(70000, 5000, 1)]
        );
        assert_eq!(
            options.gid_map,
            vec![map(0, 200000, 65536), map(70000, 5000, 1)]
        );
    }

    #[test]
    fn test_malformed_spec_fails() {
        let err = build_id_mapping(&["0:0"], &[], None, None, None, no_lookup).unwrap_err();
        assert!(matches!(err, StorageError::MalformedIdMap { ref kind, .. } if kind == "UID"));
    }
}
