//! Error types for the cstorage-meta library.
//!
//! All operations that can fail return a [`Result<T>`] which is an alias for
//! `Result<T, StorageError>`.
//!
//! # Error Categories
//!
//! - **Name updates**: [`InvalidUpdateNameOperation`]
//! - **Trash handling**: [`CreateTrashDir`], [`MoveToTrash`]
//! - **Mounting**: [`UnsupportedMountOption`]
//! - **ID mappings**: [`MalformedIdMap`], [`SubordinateIds`]
//! - **Configuration**: [`ReadConfig`], [`ConfigParse`], [`NoDataHome`]
//! - **System errors**: [`Io`]
//!
//! [`InvalidUpdateNameOperation`]: StorageError::InvalidUpdateNameOperation
//! [`CreateTrashDir`]: StorageError::CreateTrashDir
//! [`MoveToTrash`]: StorageError::MoveToTrash
//! [`UnsupportedMountOption`]: StorageError::UnsupportedMountOption
//! [`MalformedIdMap`]: StorageError::MalformedIdMap
//! [`SubordinateIds`]: StorageError::SubordinateIds
//! [`ReadConfig`]: StorageError::ReadConfig
//! [`ConfigParse`]: StorageError::ConfigParse
//! [`NoDataHome`]: StorageError::NoDataHome
//! [`Io`]: StorageError::Io

use std::path::PathBuf;

/// Result type alias for operations that may return a StorageError.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error types for metadata operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A name update was requested with an operation that is not set, add or remove.
    #[error("invalid update name operation: {0:?}")]
    InvalidUpdateNameOperation(String),

    /// The uniquely named directory inside the trash root could not be created.
    #[error("creating temp dir in {path:?}: {source}")]
    CreateTrashDir {
        /// Trash root the directory was requested in.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The entry could not be renamed into its trash directory.
    #[error("moving {source_path:?} to {destination:?}: {source}")]
    MoveToTrash {
        /// Path that was being moved.
        source_path: PathBuf,
        /// Trash directory it was being moved into.
        destination: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A mount option on the deny-list was requested.
    #[error("{0:?} option not supported")]
    UnsupportedMountOption(String),

    /// An ID map specification is not a sequence of `uint32:uint32:uint32` triples.
    #[error("error initializing ID mappings: {kind} setting is malformed expected [\"uint32:uint32:uint32\"]: {spec:?}")]
    MalformedIdMap {
        /// "UID" or "GID".
        kind: String,
        /// The offending specification.
        spec: String,
    },

    /// No usable subordinate ID ranges were found.
    #[error("no subordinate ids for {name:?}: {reason}")]
    SubordinateIds {
        /// User or group name that was looked up.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// A storage.conf file exists but could not be read.
    #[error("reading {path:?}: {source}")]
    ReadConfig {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A rootless caller has neither `$XDG_DATA_HOME` nor `$HOME` set.
    #[error("cannot determine rootless storage location: neither $XDG_DATA_HOME nor $HOME is set")]
    NoDataHome,

    /// A storage.conf file could not be parsed.
    #[error("parsing {path:?}: {source}")]
    ConfigParse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
