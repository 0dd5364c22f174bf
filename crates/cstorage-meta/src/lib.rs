//! Metadata mutation helpers for containers-storage.
//!
//! The layer, image and container stores of containers-storage all keep a
//! small amount of mutable metadata next to each object. This library holds
//! the pieces of logic used when that metadata is rewritten:
//!
//! - [`names`]: rewriting the list of names attached to an object
//! - [`trash`]: moving on-disk state aside instead of deleting it
//! - [`mount`]: rejecting mount options that image mounts do not support
//! - [`flags`]: reading well-known entries of the free-form flags map
//! - [`idmap`] and [`config`]: ID mappings and default store options
//!
//! None of these persist anything; reading and writing the store's metadata
//! files is left to the caller.
//!
//! # Example
//!
//! ```
//! use cstorage_meta::{apply_name_operation, UpdateNameOperation};
//!
//! let old = ["a", "b", "a", "c"];
//! let names = apply_name_operation(&old, &["b", "d"], UpdateNameOperation::Add);
//! assert_eq!(names, ["b", "d", "a", "c"]);
//! ```

pub mod config;
pub mod error;
pub mod flags;
pub mod idmap;
pub mod mount;
pub mod names;
pub mod trash;

// Re-export commonly used types
pub use config::{default_store_options, AdditionalLayerStore, StorageConfig, StoreOptions};
pub use error::{Result, StorageError};
pub use flags::{contains_incomplete_flag, Flags, INCOMPLETE_FLAG};
pub use idmap::{parse_id_map, parse_id_mapping, IdMap, IdMappingOptions, IdMappings};
pub use mount::validate_mount_options;
pub use names::{apply_name_operation, apply_name_operation_str, dedupe_names, UpdateNameOperation};
pub use trash::move_to_trash;
