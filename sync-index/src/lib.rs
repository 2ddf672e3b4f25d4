//! # sync-index
//!
//! Per-folder synchronized file index for 0k-Sync.
//!
//! This crate reconciles every device's view of a shared folder into one
//! queryable model:
//! - [`FileSet`] - Cursor assignment, size accounting and the query surface
//! - [`BackingStore`] / [`MemoryBackend`] - Record storage and the global view
//! - [`BlockIndex`] / [`MemoryBlockMap`] - Which local files hold which blocks
//! - [`MtimeCache`] - Modification-time overrides
//! - [`IndexConfig`] - TOML configuration
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zerok_sync_index::{FileSet, IndexConfig, MemoryBackend, MemoryBlockMap};
//!
//! let config = IndexConfig::from_file("index.toml".as_ref())?;
//! let store = Arc::new(MemoryBackend::open(&config.storage)?);
//! let set = FileSet::new("default", store, Arc::new(MemoryBlockMap::new()))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blocks;
pub mod config;
pub mod error;
pub mod fileset;
pub mod mtime;
pub mod store;

pub use blocks::{BlockIndex, MemoryBlockMap};
pub use config::{ConfigError, IndexConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use fileset::{drop_folder, FileSet};
pub use mtime::MtimeCache;
pub use store::{BackingStore, Consumer, DeviceConsumer, MemoryBackend};
