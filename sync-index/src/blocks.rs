//! Block index: which local files contain which content blocks.
//!
//! The folder index keeps this in step with the local device's records
//! only. Remote records never touch it.

use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use zerok_sync_core::native_filename;
use zerok_sync_types::{FileInfo, FileMeta};

/// Trait for block-index backends.
pub trait BlockIndex: Send + Sync {
    /// Add the blocks of every regular file among `files`.
    fn add(&self, folder: &str, files: &[FileInfo]) -> StorageResult<()>;

    /// Re-index `files`: deleted or invalid records lose their entries,
    /// regular files gain them.
    fn update(&self, folder: &str, files: &[FileInfo]) -> StorageResult<()>;

    /// Remove the entries belonging to `files`.
    fn discard(&self, folder: &str, files: &[FileInfo]) -> StorageResult<()>;

    /// Remove every entry for a folder.
    fn drop_folder(&self, folder: &str) -> StorageResult<()>;
}

type BlockKey = (String, [u8; 32], String);

/// In-memory [`BlockIndex`], keyed by (folder, hash, name) and storing the
/// block's position within the file.
#[derive(Debug, Default)]
pub struct MemoryBlockMap {
    entries: RwLock<BTreeMap<BlockKey, u32>>,
}

impl MemoryBlockMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find local copies of a block.
    ///
    /// Calls `f(folder, native_name, block_index)` for each file in `folders`
    /// holding a block with `hash`, until it breaks. Returns whether `f`
    /// broke, meaning the caller found what it was after.
    pub fn iterate<F>(&self, folders: &[&str], hash: &[u8; 32], mut f: F) -> bool
    where
        F: FnMut(&str, &str, u32) -> ControlFlow<()>,
    {
        let entries = self.entries.read();
        for folder in folders {
            let start = (folder.to_string(), *hash, String::new());
            for ((fld, h, name), index) in entries.range(start..) {
                if fld != folder || h != hash {
                    break;
                }
                if f(fld, &native_filename(name), *index).is_break() {
                    return true;
                }
            }
        }
        false
    }

    /// Whether `name` in `folder` is indexed as holding `hash`.
    pub fn contains(&self, folder: &str, hash: &[u8; 32], name: &str) -> bool {
        self.entries
            .read()
            .contains_key(&(folder.to_string(), *hash, name.to_string()))
    }

    /// Total number of entries across all folders.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn put(entries: &mut BTreeMap<BlockKey, u32>, folder: &str, file: &FileInfo) {
        for (i, block) in file.blocks.iter().enumerate() {
            entries.insert((folder.to_string(), block.hash, file.name.clone()), i as u32);
        }
    }

    fn delete(entries: &mut BTreeMap<BlockKey, u32>, folder: &str, file: &FileInfo) {
        for block in &file.blocks {
            entries.remove(&(folder.to_string(), block.hash, file.name.clone()));
        }
    }
}

impl BlockIndex for MemoryBlockMap {
    fn add(&self, folder: &str, files: &[FileInfo]) -> StorageResult<()> {
        let mut entries = self.entries.write();
        for file in files {
            if file.is_directory() || file.is_deleted() || file.is_invalid() {
                continue;
            }
            Self::put(&mut entries, folder, file);
        }
        Ok(())
    }

    fn update(&self, folder: &str, files: &[FileInfo]) -> StorageResult<()> {
        let mut entries = self.entries.write();
        for file in files {
            if file.is_directory() {
                continue;
            }
            if file.is_deleted() || file.is_invalid() {
                Self::delete(&mut entries, folder, file);
            } else {
                Self::put(&mut entries, folder, file);
            }
        }
        Ok(())
    }

    fn discard(&self, folder: &str, files: &[FileInfo]) -> StorageResult<()> {
        let mut entries = self.entries.write();
        for file in files {
            Self::delete(&mut entries, folder, file);
        }
        Ok(())
    }

    fn drop_folder(&self, folder: &str) -> StorageResult<()> {
        self.entries.write().retain(|(fld, _, _), _| fld != folder);
        Ok(())
    }
}
