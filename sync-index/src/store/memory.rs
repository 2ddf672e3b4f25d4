//! In-memory backing store with optional snapshot persistence.
//!
//! Records are kept per folder, per device, in name order. For every name
//! the store also keeps a version list: one entry per device holding the
//! name, newest first, valid entries ahead of invalid ones. The head of
//! the list is the global version.

use super::{BackingStore, Consumer, DeviceConsumer};
use crate::config::StorageConfig;
use crate::error::StorageResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use zerok_sync_core::SizeTracker;
use zerok_sync_types::{
    DeviceId, FileInfo, FileInfoTruncated, FileRecord, IndexId, SyncError, Version,
};

/// One device's claim on a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionEntry {
    device: DeviceId,
    version: Version,
    invalid: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FolderData {
    files: HashMap<DeviceId, BTreeMap<String, FileInfo>>,
    globals: BTreeMap<String, Vec<VersionEntry>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Inner {
    folders: HashMap<String, FolderData>,
    index_ids: HashMap<String, HashMap<DeviceId, IndexId>>,
    kv: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

/// In-memory [`BackingStore`].
///
/// Readers share the lock; enumerations hold it for their whole run, so a
/// consumer may perform nested lookups but must not write.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: RwLock<Inner>,
    snapshot: Option<PathBuf>,
    persist_on_write: bool,
}

impl MemoryBackend {
    /// Create an empty store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store per configuration, loading the snapshot if one exists.
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        let inner = match &config.snapshot {
            Some(path) if path.exists() => {
                let bytes = std::fs::read(path)?;
                let inner: Inner =
                    rmp_serde::from_slice(&bytes).map_err(SyncError::Deserialization)?;
                tracing::debug!(
                    "Loaded snapshot {:?} ({} folders)",
                    path,
                    inner.folders.len()
                );
                inner
            }
            _ => Inner::default(),
        };

        Ok(Self {
            inner: RwLock::new(inner),
            snapshot: config.snapshot.clone(),
            persist_on_write: config.persist_on_write,
        })
    }

    /// Write the snapshot now, regardless of `persist_on_write`.
    pub fn flush(&self) -> StorageResult<()> {
        let inner = self.inner.read_recursive();
        self.write_snapshot(&inner)
    }

    /// Names of all folders holding any records.
    pub fn folders(&self) -> Vec<String> {
        let inner = self.inner.read_recursive();
        let mut names: Vec<String> = inner.folders.keys().cloned().collect();
        names.sort();
        names
    }

    fn after_write(&self, inner: &Inner) -> StorageResult<()> {
        if self.persist_on_write {
            self.write_snapshot(inner)?;
        }
        Ok(())
    }

    fn write_snapshot(&self, inner: &Inner) -> StorageResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let bytes = rmp_serde::to_vec(inner).map_err(SyncError::Serialization)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        temp_file.write_all(&bytes)?;
        temp_file.flush()?;
        temp_file.persist(path)?;

        Ok(())
    }
}

impl FolderData {
    fn global_entry(&self, name: &str) -> Option<&VersionEntry> {
        self.globals.get(name)?.first()
    }

    fn global_file(&self, name: &str) -> Option<&FileInfo> {
        let entry = self.global_entry(name)?;
        self.files.get(&entry.device)?.get(name)
    }

    /// Write one record for a device, keeping both trackers current.
    fn put(
        &mut self,
        device: &DeviceId,
        file: FileInfo,
        local_size: &SizeTracker,
        global_size: &SizeTracker,
    ) {
        let name = file.name.clone();
        let before = self.global_file(&name).map(FileInfo::truncate);

        let have = self.files.entry(*device).or_default();
        if device.is_local() {
            if let Some(old) = have.get(&name) {
                local_size.remove_file(old);
            }
            local_size.add_file(&file);
        }
        let entry = VersionEntry {
            device: *device,
            version: file.version.clone(),
            invalid: file.invalid,
        };
        have.insert(name.clone(), file);

        let list = self.globals.entry(name.clone()).or_default();
        list.retain(|e| e.device != entry.device);
        let pos = list
            .iter()
            .position(|e| entry.version.greater_equal(&e.version))
            .unwrap_or(list.len());
        list.insert(pos, entry);
        list.sort_by_key(|e| e.invalid);

        self.account_global(before, &name, global_size);
    }

    /// Remove one record for a device, keeping both trackers current.
    fn remove(
        &mut self,
        device: &DeviceId,
        name: &str,
        local_size: &SizeTracker,
        global_size: &SizeTracker,
    ) {
        let before = self.global_file(name).map(FileInfo::truncate);

        let removed = self.files.get_mut(device).and_then(|have| have.remove(name));
        if let Some(old) = &removed {
            if device.is_local() {
                local_size.remove_file(old);
            }
        }

        if let Some(list) = self.globals.get_mut(name) {
            list.retain(|e| e.device != *device);
            if list.is_empty() {
                self.globals.remove(name);
            }
        }

        self.account_global(before, name, global_size);
    }

    fn account_global(
        &self,
        before: Option<FileInfoTruncated>,
        name: &str,
        global_size: &SizeTracker,
    ) {
        if let Some(before) = &before {
            global_size.remove_file(before);
        }
        if let Some(after) = self.global_file(name) {
            global_size.add_file(after);
        }
    }
}

/// Entries of `map` inside directory `prefix` (or equal to it).
fn prefixed<'a, V>(
    map: &'a BTreeMap<String, V>,
    prefix: Option<&'a str>,
) -> impl Iterator<Item = (&'a String, &'a V)> + 'a {
    let prefix = prefix.map(|p| p.trim_end_matches('/')).unwrap_or("");
    map.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(name, _)| name.starts_with(prefix))
        .filter(move |(name, _)| {
            prefix.is_empty() || name.len() == prefix.len() || name.as_bytes()[prefix.len()] == b'/'
        })
}

impl BackingStore for MemoryBackend {
    fn get_file(
        &self,
        folder: &str,
        device: &DeviceId,
        name: &str,
    ) -> StorageResult<Option<FileInfo>> {
        let inner = self.inner.read_recursive();
        Ok(inner
            .folders
            .get(folder)
            .and_then(|data| data.files.get(device))
            .and_then(|have| have.get(name))
            .cloned())
    }

    fn get_global(
        &self,
        folder: &str,
        name: &str,
        truncate: bool,
    ) -> StorageResult<Option<FileRecord>> {
        let inner = self.inner.read_recursive();
        Ok(inner
            .folders
            .get(folder)
            .and_then(|data| data.global_file(name))
            .map(|f| FileRecord::from_info(f, truncate)))
    }

    fn with_have(
        &self,
        folder: &str,
        device: &DeviceId,
        prefix: Option<&str>,
        truncate: bool,
        f: &mut Consumer<'_>,
    ) -> StorageResult<()> {
        let inner = self.inner.read_recursive();
        let Some(have) = inner.folders.get(folder).and_then(|d| d.files.get(device)) else {
            return Ok(());
        };

        for (_, file) in prefixed(have, prefix) {
            if f(FileRecord::from_info(file, truncate)).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn with_need(
        &self,
        folder: &str,
        device: &DeviceId,
        truncate: bool,
        f: &mut Consumer<'_>,
    ) -> StorageResult<()> {
        let inner = self.inner.read_recursive();
        let Some(data) = inner.folders.get(folder) else {
            return Ok(());
        };

        for (name, list) in &data.globals {
            let Some(global) = list.first() else {
                continue;
            };
            if global.invalid {
                continue;
            }
            let Some(file) = data.files.get(&global.device).and_then(|h| h.get(name)) else {
                continue;
            };

            let need = match list.iter().find(|e| e.device == *device) {
                None => !file.deleted,
                Some(have) => !have.version.greater_equal(&global.version),
            };
            if !need {
                continue;
            }

            if f(FileRecord::from_info(file, truncate)).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn with_global(
        &self,
        folder: &str,
        prefix: Option<&str>,
        truncate: bool,
        f: &mut Consumer<'_>,
    ) -> StorageResult<()> {
        let inner = self.inner.read_recursive();
        let Some(data) = inner.folders.get(folder) else {
            return Ok(());
        };

        for (name, _) in prefixed(&data.globals, prefix) {
            let Some(file) = data.global_file(name) else {
                continue;
            };
            if f(FileRecord::from_info(file, truncate)).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn with_all_folder_truncated(
        &self,
        folder: &str,
        f: &mut DeviceConsumer<'_>,
    ) -> StorageResult<()> {
        let inner = self.inner.read_recursive();
        let Some(data) = inner.folders.get(folder) else {
            return Ok(());
        };

        for (device, have) in &data.files {
            for file in have.values() {
                if f(device, file.truncate()).is_break() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn availability(&self, folder: &str, name: &str) -> StorageResult<Vec<DeviceId>> {
        let inner = self.inner.read_recursive();
        let Some(list) = inner.folders.get(folder).and_then(|d| d.globals.get(name)) else {
            return Ok(Vec::new());
        };
        let Some(global) = list.first() else {
            return Ok(Vec::new());
        };

        Ok(list
            .iter()
            .filter(|e| !e.invalid && e.version == global.version)
            .map(|e| e.device)
            .collect())
    }

    fn replace(
        &self,
        folder: &str,
        device: &DeviceId,
        files: &[FileInfo],
        local_size: &SizeTracker,
        global_size: &SizeTracker,
    ) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let data = inner.folders.entry(folder.to_string()).or_default();

        let incoming: HashSet<&str> = files.iter().map(|f| f.name.as_str()).collect();
        let stale: Vec<String> = data
            .files
            .get(device)
            .map(|have| {
                have.keys()
                    .filter(|name| !incoming.contains(name.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for name in &stale {
            data.remove(device, name, local_size, global_size);
        }
        for file in files {
            data.put(device, file.clone(), local_size, global_size);
        }
        if data.files.get(device).is_some_and(BTreeMap::is_empty) {
            data.files.remove(device);
        }

        self.after_write(&inner)
    }

    fn update(
        &self,
        folder: &str,
        device: &DeviceId,
        files: &[FileInfo],
        local_size: &SizeTracker,
        global_size: &SizeTracker,
    ) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let data = inner.folders.entry(folder.to_string()).or_default();

        for file in files {
            data.put(device, file.clone(), local_size, global_size);
        }

        self.after_write(&inner)
    }

    fn check_globals(&self, folder: &str, global_size: &SizeTracker) -> StorageResult<()> {
        let mut inner = self.inner.write();
        global_size.reset();
        let Some(data) = inner.folders.get_mut(folder) else {
            return Ok(());
        };

        let FolderData { files, globals } = &mut *data;
        let mut dangling = 0;
        for (name, list) in globals.iter_mut() {
            let before = list.len();
            list.retain(|e| {
                files
                    .get(&e.device)
                    .and_then(|have| have.get(name))
                    .is_some_and(|f| f.version == e.version)
            });
            dangling += before - list.len();
        }
        globals.retain(|_, list| !list.is_empty());

        for name in data.globals.keys() {
            if let Some(file) = data.global_file(name) {
                global_size.add_file(file);
            }
        }

        if dangling > 0 {
            tracing::warn!(
                "Removed {} dangling global version entries from {}",
                dangling,
                folder
            );
            self.after_write(&inner)?;
        }
        Ok(())
    }

    fn drop_folder(&self, folder: &str) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let had_records = inner.folders.remove(folder).is_some();
        let had_ids = inner.index_ids.remove(folder).is_some();
        if had_records || had_ids {
            self.after_write(&inner)?;
        }
        Ok(())
    }

    fn index_id(&self, folder: &str, device: &DeviceId) -> StorageResult<Option<IndexId>> {
        let inner = self.inner.read_recursive();
        Ok(inner
            .index_ids
            .get(folder)
            .and_then(|ids| ids.get(device))
            .copied())
    }

    fn set_index_id(&self, folder: &str, device: &DeviceId, id: IndexId) -> StorageResult<()> {
        let mut inner = self.inner.write();
        inner
            .index_ids
            .entry(folder.to_string())
            .or_default()
            .insert(*device, id);
        self.after_write(&inner)
    }

    fn kv_get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let inner = self.inner.read_recursive();
        Ok(inner.kv.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    fn kv_put(&self, namespace: &str, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut inner = self.inner.write();
        inner
            .kv
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        self.after_write(&inner)
    }

    fn kv_delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let removed = inner
            .kv
            .get_mut(namespace)
            .and_then(|ns| ns.remove(key))
            .is_some();
        if removed {
            self.after_write(&inner)?;
        }
        Ok(())
    }

    fn kv_drop_namespace(&self, namespace: &str) -> StorageResult<()> {
        let mut inner = self.inner.write();
        if inner.kv.remove(namespace).is_some() {
            self.after_write(&inner)?;
        }
        Ok(())
    }
}
