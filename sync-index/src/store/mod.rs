//! Storage layer for sync-index.
//!
//! A [`BackingStore`] holds every device's records for every folder and
//! knows how to merge them into the global view. The folder index never
//! computes merges itself: it assigns cursors, keeps locks, and hands the
//! store its two [`SizeTracker`]s to keep current while it writes.

mod memory;

pub use memory::MemoryBackend;

use crate::error::StorageResult;
use std::ops::ControlFlow;
use zerok_sync_core::SizeTracker;
use zerok_sync_types::{DeviceId, FileInfo, FileInfoTruncated, FileRecord, IndexId};

/// Consumer driven by a record enumeration.
///
/// Return `ControlFlow::Break(())` to stop early.
pub type Consumer<'a> = dyn FnMut(FileRecord) -> ControlFlow<()> + 'a;

/// Consumer driven by a full-folder scan across all devices.
pub type DeviceConsumer<'a> = dyn FnMut(&DeviceId, FileInfoTruncated) -> ControlFlow<()> + 'a;

/// Trait for durable record storage backends.
///
/// All names crossing this boundary are in wire form. Enumerations run
/// the consumer inline on the calling thread, one record at a time;
/// consumers must not call mutating methods on the same store.
pub trait BackingStore: Send + Sync {
    /// Look up one device's record.
    fn get_file(
        &self,
        folder: &str,
        device: &DeviceId,
        name: &str,
    ) -> StorageResult<Option<FileInfo>>;

    /// Look up the global record for a name.
    fn get_global(&self, folder: &str, name: &str, truncate: bool)
        -> StorageResult<Option<FileRecord>>;

    /// Enumerate a device's records, optionally limited to a name prefix.
    fn with_have(
        &self,
        folder: &str,
        device: &DeviceId,
        prefix: Option<&str>,
        truncate: bool,
        f: &mut Consumer<'_>,
    ) -> StorageResult<()>;

    /// Enumerate the global records a device lacks or holds an older
    /// version of.
    fn with_need(
        &self,
        folder: &str,
        device: &DeviceId,
        truncate: bool,
        f: &mut Consumer<'_>,
    ) -> StorageResult<()>;

    /// Enumerate the global view, optionally limited to a name prefix.
    fn with_global(
        &self,
        folder: &str,
        prefix: Option<&str>,
        truncate: bool,
        f: &mut Consumer<'_>,
    ) -> StorageResult<()>;

    /// Enumerate every device's records for a folder.
    fn with_all_folder_truncated(
        &self,
        folder: &str,
        f: &mut DeviceConsumer<'_>,
    ) -> StorageResult<()>;

    /// Devices whose record matches the current global version.
    fn availability(&self, folder: &str, name: &str) -> StorageResult<Vec<DeviceId>>;

    /// Make `files` the complete record set for `device`.
    fn replace(
        &self,
        folder: &str,
        device: &DeviceId,
        files: &[FileInfo],
        local_size: &SizeTracker,
        global_size: &SizeTracker,
    ) -> StorageResult<()>;

    /// Merge `files` into `device`'s record set, leaving other names alone.
    fn update(
        &self,
        folder: &str,
        device: &DeviceId,
        files: &[FileInfo],
        local_size: &SizeTracker,
        global_size: &SizeTracker,
    ) -> StorageResult<()>;

    /// Verify the global view and recompute `global_size` from it.
    fn check_globals(&self, folder: &str, global_size: &SizeTracker) -> StorageResult<()>;

    /// Remove every record and index ID for a folder.
    fn drop_folder(&self, folder: &str) -> StorageResult<()>;

    /// The stored index ID for a device, if any.
    fn index_id(&self, folder: &str, device: &DeviceId) -> StorageResult<Option<IndexId>>;

    /// Store the index ID for a device.
    fn set_index_id(&self, folder: &str, device: &DeviceId, id: IndexId) -> StorageResult<()>;

    /// Read a value from the auxiliary key/value area.
    fn kv_get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Write a value to the auxiliary key/value area.
    fn kv_put(&self, namespace: &str, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Delete a value from the auxiliary key/value area.
    fn kv_delete(&self, namespace: &str, key: &str) -> StorageResult<()>;

    /// Delete every value in a namespace.
    fn kv_drop_namespace(&self, namespace: &str) -> StorageResult<()>;
}
