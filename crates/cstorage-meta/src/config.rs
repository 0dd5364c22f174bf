//! Configuration parsing and default store options.
//!
//! This module reads the `storage.conf` files used by containers-storage and
//! turns them into [`StoreOptions`], falling back to the built-in defaults for
//! anything the file leaves out.
//!
//! # Overview
//!
//! Configuration files are searched in this order, the first existing one wins:
//! - `$CONTAINERS_STORAGE_CONF`
//! - Rootless only: `$XDG_CONFIG_HOME/containers/storage.conf` or
//!   `~/.config/containers/storage.conf`
//! - `/etc/containers/storage.conf`
//! - `/usr/share/containers/storage.conf`
//!
//! # Configuration Structure
//!
//! A typical storage.conf file looks like:
//! ```toml
//! [storage]
//! driver = "overlay"
//! graphroot = "/var/lib/containers/storage"
//! runroot = "/run/containers/storage"
//!
//! [storage.options]
//! # Additional read-only image stores
//! additionalimagestores = [
//!     "/usr/share/containers/storage"
//! ]
//! # Additional layer stores, optionally suffixed with ":ref"
//! additionallayerstores = ["/mnt/layers:ref"]
//! remap-uids = "0:1668442479:65536"
//! remap-gids = "0:1668442479:65536"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use serde::Deserialize;

use crate::error::{Result, StorageError};
use crate::idmap::{parse_id_map, IdMap, IdMappings};

/// Storage driver used when the configuration does not name one.
pub const DEFAULT_DRIVER: &str = "overlay";

const SYSTEM_CONFIG_PATHS: &[&str] = &[
    "/etc/containers/storage.conf",
    "/usr/share/containers/storage.conf",
];

const ROOT_GRAPH_ROOT: &str = "/var/lib/containers/storage";
const ROOT_RUN_ROOT: &str = "/run/containers/storage";

/// Top level of a storage.conf file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    storage: StorageConfig,
}

/// The `[storage]` table of a storage.conf file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Storage driver name.
    #[serde(default)]
    pub driver: String,

    /// Primary storage root path.
    #[serde(default)]
    pub graphroot: PathBuf,

    /// Runtime root for transient data.
    #[serde(default)]
    pub runroot: PathBuf,

    /// Storage root for rootless users, overriding the XDG default.
    #[serde(default)]
    pub rootless_storage_path: Option<PathBuf>,

    /// The `[storage.options]` table.
    #[serde(default)]
    pub options: StorageOptionsConfig,
}

/// The `[storage.options]` table of a storage.conf file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageOptionsConfig {
    /// Additional read-only image stores.
    #[serde(default, rename = "additionalimagestores")]
    pub image_stores: Vec<PathBuf>,

    /// Additional layer stores, as `path` or `path:ref`.
    #[serde(default, rename = "additionallayerstores")]
    pub layer_stores: Vec<String>,

    /// UID mapping applied to new layers, as `container:host:size` triples.
    #[serde(default)]
    pub remap_uids: Option<String>,

    /// GID mapping applied to new layers, as `container:host:size` triples.
    #[serde(default)]
    pub remap_gids: Option<String>,

    /// User whose subordinate UIDs are used for remapping.
    #[serde(default)]
    pub remap_user: Option<String>,

    /// Group whose subordinate GIDs are used for remapping.
    #[serde(default)]
    pub remap_group: Option<String>,
}

/// Configuration for an additional layer store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalLayerStore {
    /// Path to the additional layer store.
    pub path: PathBuf,

    /// Whether to use base64-encoded references in paths.
    pub with_reference: bool,
}

impl AdditionalLayerStore {
    fn parse(spec: &str) -> Self {
        match spec.strip_suffix(":ref") {
            Some(path) => Self {
                path: path.into(),
                with_reference: true,
            },
            None => Self {
                path: spec.into(),
                with_reference: false,
            },
        }
    }
}

impl StorageConfig {
    /// Parse storage configuration from the TOML content of a storage.conf file.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is invalid.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str::<ConfigFile>(content).map(|file| file.storage)
    }

    /// Read and parse a storage.conf file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| StorageError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| StorageError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Effective options for opening a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Storage driver name.
    pub driver: String,
    /// Primary storage root.
    pub graph_root: PathBuf,
    /// Runtime root.
    pub run_root: PathBuf,
    /// Storage root configured for rootless users, if any.
    pub rootless_storage_path: Option<PathBuf>,
    /// Additional read-only image stores.
    pub image_stores: Vec<PathBuf>,
    /// Additional layer stores.
    pub layer_stores: Vec<AdditionalLayerStore>,
    /// UID mapping for new layers.
    pub uid_map: Vec<IdMap>,
    /// GID mapping for new layers.
    pub gid_map: Vec<IdMap>,
}

/// The parts of the process environment that determine the default options.
#[derive(Debug, Clone, Default)]
struct Environment {
    rootless: bool,
    uid: u32,
    config_override: Option<PathBuf>,
    home: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    xdg_data_home: Option<PathBuf>,
    xdg_runtime_dir: Option<PathBuf>,
}

impl Environment {
    fn current() -> Self {
        let var = |name: &str| env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);
        let uid = rustix::process::getuid();
        Self {
            rootless: !uid.is_root(),
            uid: uid.as_raw(),
            config_override: var("CONTAINERS_STORAGE_CONF"),
            home: var("HOME"),
            xdg_config_home: var("XDG_CONFIG_HOME"),
            xdg_data_home: var("XDG_DATA_HOME"),
            xdg_runtime_dir: var("XDG_RUNTIME_DIR"),
        }
    }

    fn is_rootless(&self) -> bool {
        self.rootless
    }

    /// Candidate configuration files, most specific first.
    fn config_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = &self.config_override {
            paths.push(path.clone());
        }
        if self.is_rootless() {
            if let Some(config_home) = &self.xdg_config_home {
                paths.push(config_home.join("containers/storage.conf"));
            } else if let Some(home) = &self.home {
                paths.push(home.join(".config/containers/storage.conf"));
            }
        }
        paths.extend(SYSTEM_CONFIG_PATHS.iter().map(PathBuf::from));
        paths
    }

    fn default_options(&self) -> Result<StoreOptions> {
        let (graph_root, run_root) = if self.is_rootless() {
            let data_home = self
                .xdg_data_home
                .clone()
                .or_else(|| self.home.as_ref().map(|home| home.join(".local/share")))
                .ok_or(StorageError::NoDataHome)?;
            let runtime_dir = self
                .xdg_runtime_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("/run/user/{}", self.uid)));
            (
                data_home.join("containers/storage"),
                runtime_dir.join("containers"),
            )
        } else {
            (ROOT_GRAPH_ROOT.into(), ROOT_RUN_ROOT.into())
        };

        Ok(StoreOptions {
            driver: DEFAULT_DRIVER.to_string(),
            graph_root,
            run_root,
            rootless_storage_path: None,
            image_stores: Vec::new(),
            layer_stores: Vec::new(),
            uid_map: Vec::new(),
            gid_map: Vec::new(),
        })
    }

    fn store_options(&self) -> Result<StoreOptions> {
        let mut options = self.default_options()?;
        let Some(path) = self.config_paths().into_iter().find(|path| {
            let exists = path.exists();
            if !exists {
                trace!("no storage configuration at {path:?}");
            }
            exists
        }) else {
            debug!("no storage configuration found, using defaults");
            return Ok(options);
        };

        debug!("loading storage configuration from {path:?}");
        let config = StorageConfig::from_path(&path)?;
        options.apply(config, self.is_rootless())?;
        Ok(options)
    }
}

impl StoreOptions {
    /// Overlay the values set in `config` on top of `self`.
    fn apply(&mut self, config: StorageConfig, rootless: bool) -> Result<()> {
        if !config.driver.is_empty() {
            self.driver = config.driver;
        }
        if rootless {
            if let Some(path) = &config.rootless_storage_path {
                self.graph_root.clone_from(path);
            }
        } else {
            if !config.graphroot.as_os_str().is_empty() {
                self.graph_root = config.graphroot;
            }
            if !config.runroot.as_os_str().is_empty() {
                self.run_root = config.runroot;
            }
        }
        self.rootless_storage_path = config.rootless_storage_path;

        let opts = config.options;
        self.image_stores = opts.image_stores;
        self.layer_stores = opts
            .layer_stores
            .iter()
            .map(|spec| AdditionalLayerStore::parse(spec))
            .collect();

        if let (Some(user), Some(group)) = (
            opts.remap_user.as_deref().or(opts.remap_group.as_deref()),
            opts.remap_group.as_deref().or(opts.remap_user.as_deref()),
        ) {
            let mappings = IdMappings::new(user, group)?;
            self.uid_map = mappings.uids().to_vec();
            self.gid_map = mappings.gids().to_vec();
        }
        if let Some(spec) = &opts.remap_uids {
            self.uid_map.extend(parse_id_map(&[spec], "UID")?);
        }
        if let Some(spec) = &opts.remap_gids {
            self.gid_map.extend(parse_id_map(&[spec], "GID")?);
        }
        Ok(())
    }
}

/// Compute the store options for the current process.
///
/// Rootless callers get per-user storage below `$XDG_DATA_HOME` and
/// `$XDG_RUNTIME_DIR`; everything else uses the system locations. Values from
/// the first storage.conf found override these defaults.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be read or parsed, or if
/// it names an ID mapping that cannot be resolved.
pub fn default_store_options() -> Result<StoreOptions> {
    Environment::current().store_options()
}
