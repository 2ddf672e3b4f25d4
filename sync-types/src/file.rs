//! File records.
//!
//! Every device's view of a folder is a set of file records. They come in
//! two shapes: [`FileInfo`] carries everything needed to sync a file,
//! including its block list, while [`FileInfoTruncated`] drops the blocks
//! for cheap enumeration. Code that only needs the metadata works through
//! the [`FileMeta`] trait, and enumerations hand out a [`FileRecord`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Cursor, Version};

/// Permission bits assumed when a record carries none.
pub const DEFAULT_PERMISSIONS: u32 = 0o644;

/// What kind of filesystem object a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FileKind {
    /// Regular file.
    #[default]
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

/// One content block of a file.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Byte offset of the block within the file.
    pub offset: u64,
    /// Block length in bytes.
    pub size: u32,
    /// Content hash of the block.
    pub hash: [u8; 32],
}

impl fmt::Debug for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block{{{}/{}/{}}}",
            self.offset,
            self.size,
            hex::encode(&self.hash[..8])
        )
    }
}

/// Capability surface shared by both record shapes.
pub trait FileMeta {
    /// Size in bytes.
    fn file_size(&self) -> u64;
    /// Name relative to the folder root.
    fn file_name(&self) -> &str;
    /// Whether this record is a deletion tombstone.
    fn is_deleted(&self) -> bool;
    /// Whether the record is withdrawn from sync.
    fn is_invalid(&self) -> bool;
    /// Whether the record describes a directory.
    fn is_directory(&self) -> bool;
    /// Whether the record describes a symlink.
    fn is_symlink(&self) -> bool;
    /// Whether the record carries meaningful permission bits.
    fn has_permission_bits(&self) -> bool;
}

/// Full file record, including the block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileInfo {
    /// Name in wire form (NFC, `/` separators) while stored.
    pub name: String,
    /// Kind of object.
    pub kind: FileKind,
    /// Size in bytes.
    pub size: u64,
    /// Unix permission bits.
    pub permissions: u32,
    /// Set when the originating device does not track permissions.
    pub no_permissions: bool,
    /// Modification time, seconds since the epoch.
    pub modified_s: i64,
    /// Deletion tombstone.
    pub deleted: bool,
    /// Withdrawn from sync (e.g. ignored or unreadable).
    pub invalid: bool,
    /// Conflict version.
    pub version: Version,
    /// Local version cursor at the time the record was written.
    pub local_version: Cursor,
    /// Content blocks.
    pub blocks: Vec<BlockInfo>,
}

impl FileInfo {
    /// A regular file record with the given name and size.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            permissions: DEFAULT_PERMISSIONS,
            ..Self::default()
        }
    }

    /// Drop the block list.
    pub fn truncate(&self) -> FileInfoTruncated {
        FileInfoTruncated::from(self)
    }
}

/// File record without the block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileInfoTruncated {
    /// Name in wire form (NFC, `/` separators) while stored.
    pub name: String,
    /// Kind of object.
    pub kind: FileKind,
    /// Size in bytes.
    pub size: u64,
    /// Unix permission bits.
    pub permissions: u32,
    /// Set when the originating device does not track permissions.
    pub no_permissions: bool,
    /// Modification time, seconds since the epoch.
    pub modified_s: i64,
    /// Deletion tombstone.
    pub deleted: bool,
    /// Withdrawn from sync.
    pub invalid: bool,
    /// Conflict version.
    pub version: Version,
    /// Local version cursor at the time the record was written.
    pub local_version: Cursor,
}

impl From<&FileInfo> for FileInfoTruncated {
    fn from(f: &FileInfo) -> Self {
        Self {
            name: f.name.clone(),
            kind: f.kind,
            size: f.size,
            permissions: f.permissions,
            no_permissions: f.no_permissions,
            modified_s: f.modified_s,
            deleted: f.deleted,
            invalid: f.invalid,
            version: f.version.clone(),
            local_version: f.local_version,
        }
    }
}

macro_rules! impl_file_meta {
    ($ty:ty) => {
        impl FileMeta for $ty {
            fn file_size(&self) -> u64 {
                if self.deleted || self.kind == FileKind::Directory {
                    return 128;
                }
                self.size
            }

            fn file_name(&self) -> &str {
                &self.name
            }

            fn is_deleted(&self) -> bool {
                self.deleted
            }

            fn is_invalid(&self) -> bool {
                self.invalid
            }

            fn is_directory(&self) -> bool {
                self.kind == FileKind::Directory
            }

            fn is_symlink(&self) -> bool {
                self.kind == FileKind::Symlink
            }

            fn has_permission_bits(&self) -> bool {
                !self.no_permissions
            }
        }
    };
}

impl_file_meta!(FileInfo);
impl_file_meta!(FileInfoTruncated);

/// A record handed out by an enumeration or lookup.
///
/// One enumeration only ever yields one variant, chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRecord {
    /// Full record with blocks.
    Full(FileInfo),
    /// Metadata-only record.
    Summary(FileInfoTruncated),
}

impl FileRecord {
    /// Build a record of the requested shape from a full record.
    pub fn from_info(info: &FileInfo, truncate: bool) -> Self {
        if truncate {
            FileRecord::Summary(info.truncate())
        } else {
            FileRecord::Full(info.clone())
        }
    }

    /// Rename the record in place.
    pub fn set_name(&mut self, name: String) {
        match self {
            FileRecord::Full(f) => f.name = name,
            FileRecord::Summary(f) => f.name = name,
        }
    }

    /// Local version cursor of the record.
    pub fn local_version(&self) -> Cursor {
        match self {
            FileRecord::Full(f) => f.local_version,
            FileRecord::Summary(f) => f.local_version,
        }
    }

    /// The full record, if this is one.
    pub fn into_full(self) -> Option<FileInfo> {
        match self {
            FileRecord::Full(f) => Some(f),
            FileRecord::Summary(_) => None,
        }
    }

    /// The metadata of this record, truncating a full one.
    pub fn into_summary(self) -> FileInfoTruncated {
        match self {
            FileRecord::Full(f) => f.truncate(),
            FileRecord::Summary(f) => f,
        }
    }

    fn meta(&self) -> &dyn FileMeta {
        match self {
            FileRecord::Full(f) => f,
            FileRecord::Summary(f) => f,
        }
    }
}

impl FileMeta for FileRecord {
    fn file_size(&self) -> u64 {
        self.meta().file_size()
    }

    fn file_name(&self) -> &str {
        self.meta().file_name()
    }

    fn is_deleted(&self) -> bool {
        self.meta().is_deleted()
    }

    fn is_invalid(&self) -> bool {
        self.meta().is_invalid()
    }

    fn is_directory(&self) -> bool {
        self.meta().is_directory()
    }

    fn is_symlink(&self) -> bool {
        self.meta().is_symlink()
    }

    fn has_permission_bits(&self) -> bool {
        self.meta().has_permission_bits()
    }
}
