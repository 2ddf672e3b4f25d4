//! # sync-types
//!
//! Record and identity types for the 0k-Sync folder index.
//!
//! This crate provides the foundational types used across all 0k-Sync crates:
//! - [`DeviceId`], [`IndexId`], [`Cursor`] - Identity and ordering types
//! - [`Version`] - Conflict version vectors
//! - [`FileInfo`], [`FileInfoTruncated`], [`FileRecord`] - File records and the
//!   [`FileMeta`] capability trait they share
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod file;
mod ids;
mod version;

pub use error::SyncError;
pub use file::{
    BlockInfo, FileInfo, FileInfoTruncated, FileKind, FileMeta, FileRecord, DEFAULT_PERMISSIONS,
};
pub use ids::{Cursor, DeviceId, IndexId};
pub use version::{Counter, Version, VersionOrdering};
