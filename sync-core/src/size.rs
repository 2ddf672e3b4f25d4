//! Aggregate size accounting.
//!
//! A [`SizeTracker`] keeps a running total of live files, deletion
//! tombstones and bytes for one logical set of records (the local device's
//! records, or the folder's global records). Invalid records are withdrawn
//! from accounting entirely.
//!
//! Removing a record that was never added is an accounting bug upstream and
//! panics rather than clamping at zero.

use parking_lot::Mutex;
use zerok_sync_types::FileMeta;

/// Point-in-time aggregate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    /// Live (non-deleted) records.
    pub files: u64,
    /// Deletion tombstones.
    pub deleted: u64,
    /// Total bytes across both.
    pub bytes: u64,
}

/// Thread-safe running aggregate of file counts and bytes.
#[derive(Debug, Default)]
pub struct SizeTracker {
    counts: Mutex<Counts>,
}

impl SizeTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a record entering the set.
    pub fn add_file(&self, f: &dyn FileMeta) {
        if f.is_invalid() {
            return;
        }

        let mut counts = self.counts.lock();
        if f.is_deleted() {
            counts.deleted += 1;
        } else {
            counts.files += 1;
        }
        counts.bytes += f.file_size();
    }

    /// Account for a record leaving the set.
    ///
    /// # Panics
    ///
    /// Panics if this would take any count below zero.
    pub fn remove_file(&self, f: &dyn FileMeta) {
        if f.is_invalid() {
            return;
        }

        let mut counts = self.counts.lock();
        let next = Counts {
            files: if f.is_deleted() {
                Some(counts.files)
            } else {
                counts.files.checked_sub(1)
            }
            .expect("bug: removed more than added"),
            deleted: if f.is_deleted() {
                counts.deleted.checked_sub(1)
            } else {
                Some(counts.deleted)
            }
            .expect("bug: removed more than added"),
            bytes: counts
                .bytes
                .checked_sub(f.file_size())
                .expect("bug: removed more than added"),
        };
        *counts = next;
    }

    /// Consistent snapshot of the current counts.
    pub fn size(&self) -> Counts {
        *self.counts.lock()
    }

    /// Zero all counts, ahead of a full recomputation.
    pub fn reset(&self) {
        *self.counts.lock() = Counts::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use zerok_sync_types::FileInfo;

    fn file(size: u64) -> FileInfo {
        FileInfo::new("f", size)
    }

    fn deleted() -> FileInfo {
        let mut f = FileInfo::new("gone", 0);
        f.deleted = true;
        f
    }

    fn invalid(size: u64) -> FileInfo {
        let mut f = FileInfo::new("ignored", size);
        f.invalid = true;
        f
    }

    #[test]
    fn starts_empty() {
        assert_eq!(SizeTracker::new().size(), Counts::default());
    }

    #[test]
    fn add_and_remove_balance() {
        let tracker = SizeTracker::new();
        tracker.add_file(&file(10));
        tracker.add_file(&file(20));
        tracker.add_file(&deleted());

        assert_eq!(
            tracker.size(),
            Counts {
                files: 2,
                deleted: 1,
                bytes: 30 + 128
            }
        );

        tracker.remove_file(&file(10));
        tracker.remove_file(&deleted());
        assert_eq!(
            tracker.size(),
            Counts {
                files: 1,
                deleted: 0,
                bytes: 20
            }
        );
    }

    #[test]
    fn invalid_records_are_withdrawn_entirely() {
        let tracker = SizeTracker::new();
        tracker.add_file(&invalid(1000));
        assert_eq!(tracker.size(), Counts::default());

        // Removing an invalid record never trips the underflow check.
        tracker.remove_file(&invalid(1000));
        assert_eq!(tracker.size(), Counts::default());
    }

    #[test]
    #[should_panic(expected = "bug: removed more than added")]
    fn removing_unadded_file_panics() {
        let tracker = SizeTracker::new();
        tracker.remove_file(&file(1));
    }

    #[test]
    #[should_panic(expected = "bug: removed more than added")]
    fn removing_unadded_tombstone_panics() {
        let tracker = SizeTracker::new();
        tracker.add_file(&file(1));
        tracker.remove_file(&deleted());
    }

    #[test]
    fn reset_zeroes_counts() {
        let tracker = SizeTracker::new();
        tracker.add_file(&file(5));
        tracker.reset();
        assert_eq!(tracker.size(), Counts::default());
    }

    #[test]
    fn concurrent_adds_are_all_counted() {
        let tracker = std::sync::Arc::new(SizeTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.add_file(&file(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(tracker.size().files, 800);
        assert_eq!(tracker.size().bytes, 800);
    }

    // ===========================================
    // Property Tests
    // ===========================================

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize),
        Remove(usize),
    }

    fn records() -> Vec<FileInfo> {
        vec![file(0), file(7), file(4096), deleted(), invalid(99)]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Removals matched by prior additions never underflow, and the
        /// totals always equal the multiset of records currently held.
        #[test]
        fn prop_membership_consistent_ops_stay_non_negative(
            ops in prop::collection::vec(
                prop_oneof![
                    (0usize..5).prop_map(Op::Add),
                    (0usize..5).prop_map(Op::Remove),
                ],
                0..64,
            )
        ) {
            let recs = records();
            let tracker = SizeTracker::new();
            let mut held: Vec<usize> = Vec::new();

            for op in ops {
                match op {
                    Op::Add(i) => {
                        tracker.add_file(&recs[i]);
                        held.push(i);
                    }
                    Op::Remove(i) => {
                        // Only remove what the set actually holds.
                        if let Some(pos) = held.iter().position(|&h| h == i) {
                            held.swap_remove(pos);
                            tracker.remove_file(&recs[i]);
                        }
                    }
                }

                let mut expected = Counts::default();
                for &i in &held {
                    let r = &recs[i];
                    if r.invalid {
                        continue;
                    }
                    if r.deleted {
                        expected.deleted += 1;
                    } else {
                        expected.files += 1;
                    }
                    expected.bytes += r.file_size();
                }
                prop_assert_eq!(tracker.size(), expected);
            }
        }
    }
}
