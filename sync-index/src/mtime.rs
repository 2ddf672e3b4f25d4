//! Modification-time overrides.
//!
//! Some filesystems cannot hold the modification time a peer asks for.
//! When that happens the scanner records the pair (what the disk reports,
//! what the time should be) and later reads translate the former back into
//! the latter. An override only applies while the disk still reports the
//! exact time it was recorded against.

use crate::error::{StorageError, StorageResult};
use crate::store::BackingStore;
use std::time::SystemTime;
use zerok_sync_core::normalized_filename;
use zerok_sync_types::SyncError;

/// Per-folder view over the store's auxiliary key/value area.
pub struct MtimeCache<'a, S: BackingStore + ?Sized> {
    store: &'a S,
    namespace: String,
}

impl<'a, S: BackingStore + ?Sized> MtimeCache<'a, S> {
    /// Open the cache for `folder`.
    pub fn new(store: &'a S, folder: &str) -> Self {
        Self {
            store,
            namespace: format!("mtime/{}", folder),
        }
    }

    /// Record that `name` reads as `disk` but should be treated as `actual`.
    pub fn update_mtime(
        &self,
        name: &str,
        disk: SystemTime,
        actual: SystemTime,
    ) -> StorageResult<()> {
        let bytes = rmp_serde::to_vec(&(disk, actual)).map_err(SyncError::Serialization)?;
        self.store
            .kv_put(&self.namespace, &normalized_filename(name), &bytes)
    }

    /// Translate the on-disk time for `name`.
    ///
    /// Returns `disk` unchanged when there is no override, or when the
    /// override was recorded against a different on-disk time.
    pub fn get_mtime(&self, name: &str, disk: SystemTime) -> StorageResult<SystemTime> {
        let Some(bytes) = self.store.kv_get(&self.namespace, &normalized_filename(name))? else {
            return Ok(disk);
        };

        let (stored_disk, actual): (SystemTime, SystemTime) = rmp_serde::from_slice(&bytes)
            .map_err(|e| StorageError::Corrupt {
                reason: format!("mtime entry for {}: {}", name, e),
            })?;
        if stored_disk == disk {
            Ok(actual)
        } else {
            Ok(disk)
        }
    }

    /// Forget the override for `name`.
    pub fn delete_mtime(&self, name: &str) -> StorageResult<()> {
        self.store
            .kv_delete(&self.namespace, &normalized_filename(name))
    }

    /// Forget every override in this folder.
    pub fn clear(&self) -> StorageResult<()> {
        self.store.kv_drop_namespace(&self.namespace)
    }
}
