//! Version cursor tracking for 0k-Sync folders.
//!
//! Two kinds of cursor are tracked per folder:
//! - [`LocalCursor`]: the local device's own counter, bumped on every local
//!   write. It is a lock-free atomic so readers never wait behind a bulk
//!   update.
//! - [`HighWaterMarks`]: for every remote device, the highest cursor ever
//!   seen in its records. It changes once per bulk call and lives under the
//!   caller's update lock.
//!
//! Neither is persisted. Both are rebuilt from the stored records when a
//! folder index is opened.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use zerok_sync_types::{Cursor, DeviceId, FileInfo};

/// Lock-free, strictly increasing local version counter.
#[derive(Debug, Default)]
pub struct LocalCursor {
    value: AtomicU64,
}

impl LocalCursor {
    /// Create a new cursor starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next cursor value.
    pub fn next(&self) -> Cursor {
        Cursor::new(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently claimed value.
    pub fn current(&self) -> Cursor {
        Cursor::new(self.value.load(Ordering::SeqCst))
    }

    /// Reset to zero. Only valid when the local record set becomes empty.
    pub fn reset(&self) {
        self.value.store(0, Ordering::SeqCst);
    }

    /// Raise the cursor to at least `cursor`.
    pub fn observe(&self, cursor: Cursor) {
        self.value.fetch_max(cursor.value(), Ordering::SeqCst);
    }
}

/// Highest cursor seen per remote device.
///
/// Values only ever move up: a batch whose records carry smaller cursors
/// (out-of-order delivery, or a sender that leaves cursors at zero) leaves
/// the mark where it was.
#[derive(Debug, Clone, Default)]
pub struct HighWaterMarks {
    marks: HashMap<DeviceId, Cursor>,
}

impl HighWaterMarks {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `device`'s mark to `cursor` if it is higher.
    ///
    /// Returns the mark after the call.
    pub fn advance(&mut self, device: DeviceId, cursor: Cursor) -> Cursor {
        let mark = self.marks.entry(device).or_default();
        if cursor > *mark {
            *mark = cursor;
        }
        *mark
    }

    /// The mark for `device`, zero if it has never been seen.
    pub fn get(&self, device: &DeviceId) -> Cursor {
        self.marks.get(device).copied().unwrap_or_default()
    }

    /// Number of devices tracked.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Whether no device has been seen.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

/// Highest `local_version` among the given records.
///
/// Senders are expected to order batches by cursor, but not all do, so the
/// whole batch is scanned.
pub fn max_cursor(files: &[FileInfo]) -> Cursor {
    files
        .iter()
        .map(|f| f.local_version)
        .max()
        .unwrap_or_default()
}
