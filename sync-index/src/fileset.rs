//! FileSet - the per-folder file index.
//!
//! A [`FileSet`] sits between the scanner/protocol layers and a
//! [`BackingStore`]. It stamps local writes with the folder's local
//! version cursor, tracks the highest cursor seen from each remote device,
//! keeps the local and global size aggregates, and keeps the
//! [`BlockIndex`] in step with the local device's records.
//!
//! ```text
//! scanner / protocol → FileSet → BackingStore (records, global view)
//!                         ↓
//!                     BlockIndex (local blocks only)
//! ```
//!
//! Names are wire form inside the store and native form everywhere else:
//! mutations normalize incoming names, queries convert each record's name
//! as it is handed to the consumer.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zerok_sync_index::{FileSet, MemoryBackend, MemoryBlockMap};
//! use zerok_sync_types::{DeviceId, FileInfo};
//!
//! let set = FileSet::new("default", Arc::new(MemoryBackend::in_memory()), Arc::new(MemoryBlockMap::new()))?;
//! set.replace(&DeviceId::LOCAL, vec![FileInfo::new("a.txt", 42)])?;
//! assert_eq!(set.local_size().files, 1);
//! ```

use crate::blocks::BlockIndex;
use crate::error::StorageResult;
use crate::mtime::MtimeCache;
use crate::store::BackingStore;
use parking_lot::Mutex;
use std::ops::ControlFlow;
use std::sync::Arc;
use zerok_sync_core::{
    max_cursor, native_filename, normalized_filename, Counts, HighWaterMarks, LocalCursor,
    SizeTracker,
};
use zerok_sync_types::{
    Cursor, DeviceId, FileInfo, FileInfoTruncated, FileMeta, FileRecord, IndexId,
};

/// Index of one folder's records across all devices.
pub struct FileSet<S: BackingStore, B: BlockIndex> {
    folder: String,
    store: Arc<S>,
    blocks: Arc<B>,
    local_version: LocalCursor,
    local_size: SizeTracker,
    global_size: SizeTracker,
    /// Serializes `replace`/`update`. Never taken by queries.
    update_lock: Mutex<()>,
    /// Written only under `update_lock`, held just long enough to read or
    /// advance one mark.
    remote_marks: Mutex<HighWaterMarks>,
    /// Serializes first-time generation of the local index ID.
    index_id_lock: Mutex<()>,
}

impl<S: BackingStore, B: BlockIndex> FileSet<S, B> {
    /// Open the index for `folder`.
    ///
    /// Verifies the store's global view, then scans every stored record
    /// once to rebuild the local cursor, the local size and the remote
    /// high-water marks.
    pub fn new(folder: impl Into<String>, store: Arc<S>, blocks: Arc<B>) -> StorageResult<Self> {
        let set = Self {
            folder: folder.into(),
            store,
            blocks,
            local_version: LocalCursor::new(),
            local_size: SizeTracker::new(),
            global_size: SizeTracker::new(),
            update_lock: Mutex::new(()),
            remote_marks: Mutex::new(HighWaterMarks::new()),
            index_id_lock: Mutex::new(()),
        };

        set.store.check_globals(&set.folder, &set.global_size)?;

        let mut marks = HighWaterMarks::new();
        set.store.with_all_folder_truncated(
            &set.folder,
            &mut |device: &DeviceId, f: FileInfoTruncated| {
                if device.is_local() {
                    set.local_version.observe(f.local_version);
                    set.local_size.add_file(&f);
                } else {
                    marks.advance(*device, f.local_version);
                }
                ControlFlow::Continue(())
            },
        )?;
        tracing::debug!(
            "Opened folder {} at local version {} ({} remote devices)",
            set.folder,
            set.local_version.current().value(),
            marks.len()
        );
        *set.remote_marks.lock() = marks;

        Ok(set)
    }

    /// Folder this index covers.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Make `files` the complete record set for `device`.
    ///
    /// Local records are stamped with fresh cursor values in input order;
    /// an empty local set resets the cursor to zero. The block index is
    /// rebuilt from scratch for local replaces, even when the store
    /// reports an error after applying the write.
    pub fn replace(&self, device: &DeviceId, mut files: Vec<FileInfo>) -> StorageResult<()> {
        normalize_filenames(&mut files);

        let _serial = self.update_lock.lock();

        if device.is_local() {
            if files.is_empty() {
                self.local_version.reset();
            } else {
                for f in &mut files {
                    f.local_version = self.local_version.next();
                }
            }
        }

        let stored = self.store.replace(
            &self.folder,
            device,
            &files,
            &self.local_size,
            &self.global_size,
        );

        if device.is_local() {
            self.blocks.drop_folder(&self.folder)?;
            self.blocks.add(&self.folder, &files)?;
            stored?;
        } else {
            stored?;
            let mark = self
                .remote_marks
                .lock()
                .advance(*device, max_cursor(&files));
            tracing::debug!(
                "Replaced {} records from {} in {} (high water {})",
                files.len(),
                device,
                self.folder,
                mark.value()
            );
        }

        Ok(())
    }

    /// Merge `files` into `device`'s record set.
    ///
    /// Names not mentioned are left alone. Every local record gets a fresh
    /// cursor, but only records whose version changed (or that are new)
    /// touch the block index.
    ///
    /// A record rewritten at an unchanged version with a different block
    /// list leaves the block index describing the old blocks. Content
    /// changes must come with a new version.
    pub fn update(&self, device: &DeviceId, mut files: Vec<FileInfo>) -> StorageResult<()> {
        normalize_filenames(&mut files);

        let _serial = self.update_lock.lock();

        if !device.is_local() {
            self.store.update(
                &self.folder,
                device,
                &files,
                &self.local_size,
                &self.global_size,
            )?;
            self.remote_marks
                .lock()
                .advance(*device, max_cursor(&files));
            return Ok(());
        }

        let mut discards = Vec::new();
        let mut updates = Vec::new();
        for f in &mut files {
            f.local_version = self.local_version.next();
            match self.store.get_file(&self.folder, device, &f.name)? {
                Some(existing) if existing.version == f.version => {}
                Some(existing) => {
                    discards.push(existing);
                    updates.push(f.clone());
                }
                None => updates.push(f.clone()),
            }
        }

        let stored = self.store.update(
            &self.folder,
            device,
            &files,
            &self.local_size,
            &self.global_size,
        );

        self.blocks.discard(&self.folder, &discards)?;
        self.blocks.update(&self.folder, &updates)?;
        stored
    }

    /// Global records `device` lacks or holds an older version of.
    pub fn with_need<F>(&self, device: &DeviceId, f: F) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        self.store
            .with_need(&self.folder, device, false, &mut native_file_iterator(f))
    }

    /// Summary form of [`with_need`](Self::with_need).
    pub fn with_need_truncated<F>(&self, device: &DeviceId, f: F) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        self.store
            .with_need(&self.folder, device, true, &mut native_file_iterator(f))
    }

    /// Every record `device` holds.
    pub fn with_have<F>(&self, device: &DeviceId, f: F) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        self.store
            .with_have(&self.folder, device, None, false, &mut native_file_iterator(f))
    }

    /// Summary form of [`with_have`](Self::with_have).
    pub fn with_have_truncated<F>(&self, device: &DeviceId, f: F) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        self.store
            .with_have(&self.folder, device, None, true, &mut native_file_iterator(f))
    }

    /// Records `device` holds at or below the directory `prefix`.
    pub fn with_prefixed_have_truncated<F>(
        &self,
        device: &DeviceId,
        prefix: &str,
        f: F,
    ) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        let prefix = normalized_filename(prefix);
        self.store.with_have(
            &self.folder,
            device,
            Some(&prefix),
            true,
            &mut native_file_iterator(f),
        )
    }

    /// Every record in the global view.
    pub fn with_global<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        self.store
            .with_global(&self.folder, None, false, &mut native_file_iterator(f))
    }

    /// Summary form of [`with_global`](Self::with_global).
    pub fn with_global_truncated<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        self.store
            .with_global(&self.folder, None, true, &mut native_file_iterator(f))
    }

    /// Global records at or below the directory `prefix`.
    pub fn with_prefixed_global_truncated<F>(&self, prefix: &str, f: F) -> StorageResult<()>
    where
        F: FnMut(FileRecord) -> ControlFlow<()>,
    {
        let prefix = normalized_filename(prefix);
        self.store.with_global(
            &self.folder,
            Some(&prefix),
            true,
            &mut native_file_iterator(f),
        )
    }

    /// `device`'s record for `name`.
    pub fn get(&self, device: &DeviceId, name: &str) -> StorageResult<Option<FileInfo>> {
        let found = self
            .store
            .get_file(&self.folder, device, &normalized_filename(name))?;
        Ok(found.map(|mut f| {
            f.name = native_filename(&f.name);
            f
        }))
    }

    /// The global record for `name`.
    pub fn get_global(&self, name: &str) -> StorageResult<Option<FileInfo>> {
        let found = self.lookup_global(name, false)?;
        Ok(found.and_then(FileRecord::into_full))
    }

    /// Summary form of [`get_global`](Self::get_global).
    pub fn get_global_truncated(&self, name: &str) -> StorageResult<Option<FileInfoTruncated>> {
        let found = self.lookup_global(name, true)?;
        Ok(found.map(FileRecord::into_summary))
    }

    fn lookup_global(&self, name: &str, truncate: bool) -> StorageResult<Option<FileRecord>> {
        let found = self
            .store
            .get_global(&self.folder, &normalized_filename(name), truncate)?;
        Ok(found.map(|mut r| {
            let native = native_filename(r.file_name());
            r.set_name(native);
            r
        }))
    }

    /// Devices holding the current global version of `name`.
    pub fn availability(&self, name: &str) -> StorageResult<Vec<DeviceId>> {
        self.store
            .availability(&self.folder, &normalized_filename(name))
    }

    /// Local cursor for the local device, high-water mark for any other.
    pub fn local_version(&self, device: &DeviceId) -> Cursor {
        if device.is_local() {
            return self.local_version.current();
        }

        self.remote_marks.lock().get(device)
    }

    /// Counts for the local device's records.
    pub fn local_size(&self) -> Counts {
        self.local_size.size()
    }

    /// Counts for the global view.
    pub fn global_size(&self) -> Counts {
        self.global_size.size()
    }

    /// Index ID for `device`.
    ///
    /// The local device's ID is generated on first access and stored;
    /// that first call writes to the store, so it must not be made from
    /// inside a scan consumer. Unknown remote devices read as
    /// [`IndexId::ZERO`].
    pub fn index_id(&self, device: &DeviceId) -> StorageResult<IndexId> {
        if let Some(id) = self.store.index_id(&self.folder, device)? {
            return Ok(id);
        }
        if !device.is_local() {
            return Ok(IndexId::ZERO);
        }

        // Two first callers must not both generate.
        let _init = self.index_id_lock.lock();
        if let Some(id) = self.store.index_id(&self.folder, device)? {
            return Ok(id);
        }

        let id = IndexId::random();
        self.store.set_index_id(&self.folder, device, id)?;
        tracing::info!("Generated local index ID {} for {}", id, self.folder);
        Ok(id)
    }

    /// Record the index ID a remote device announced.
    ///
    /// # Panics
    ///
    /// Panics when called for the local device, whose ID is only ever
    /// generated by [`index_id`](Self::index_id).
    pub fn set_index_id(&self, device: &DeviceId, id: IndexId) -> StorageResult<()> {
        if device.is_local() {
            panic!("bug: do not explicitly set index ID for local device");
        }
        self.store.set_index_id(&self.folder, device, id)
    }

    /// Modification-time overrides for this folder.
    pub fn mtimes(&self) -> MtimeCache<'_, S> {
        MtimeCache::new(self.store.as_ref(), &self.folder)
    }
}

/// Remove everything stored for `folder`.
///
/// Needs no live [`FileSet`]. Safe to run again after a partial failure.
pub fn drop_folder<S, B>(store: &S, blocks: &B, folder: &str) -> StorageResult<()>
where
    S: BackingStore + ?Sized,
    B: BlockIndex + ?Sized,
{
    tracing::info!("Dropping folder {}", folder);
    store.drop_folder(folder)?;
    blocks.drop_folder(folder)?;
    MtimeCache::new(store, folder).clear()
}

fn normalize_filenames(files: &mut [FileInfo]) {
    for f in files {
        f.name = normalized_filename(&f.name);
    }
}

/// Wrap a consumer so each record reaches it with a native name.
fn native_file_iterator<F>(mut f: F) -> impl FnMut(FileRecord) -> ControlFlow<()>
where
    F: FnMut(FileRecord) -> ControlFlow<()>,
{
    move |mut record| {
        let native = native_filename(record.file_name());
        record.set_name(native);
        f(record)
    }
}
