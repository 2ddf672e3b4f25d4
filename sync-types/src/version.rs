//! Conflict versions.
//!
//! A [`Version`] is a version vector: one counter per device that has ever
//! modified the file. The index layer only ever asks whether two versions
//! are equal. The ordering in [`Version::compare`] exists for stores that
//! need to pick a winning version among devices.

use serde::{Deserialize, Serialize};

/// One device's entry in a version vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counter {
    /// Short device identifier.
    pub id: u64,
    /// Number of modifications made by that device.
    pub value: u64,
}

/// Result of comparing two version vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    /// Both vectors are identical.
    Equal,
    /// `self` strictly dominates `other`.
    Greater,
    /// `other` strictly dominates `self`.
    Lesser,
    /// Neither dominates: the versions conflict.
    Concurrent,
}

/// Version vector attached to every file record.
///
/// Counters are kept sorted by id, and zero-valued counters are never
/// stored, so structural equality is version equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    counters: Vec<Counter>,
}

impl Version {
    /// The empty version ("never modified").
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `id`'s counter incremented.
    pub fn update(&self, id: u64) -> Self {
        let mut next = self.clone();
        let current = next.counter(id);
        next.set(id, current + 1);
        next
    }

    /// Value of the counter for `id` (zero if absent).
    pub fn counter(&self, id: u64) -> u64 {
        self.counters
            .binary_search_by_key(&id, |c| c.id)
            .map(|i| self.counters[i].value)
            .unwrap_or(0)
    }

    /// Counters in id order.
    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    /// Whether no device has modified this version.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Compare two version vectors.
    pub fn compare(&self, other: &Version) -> VersionOrdering {
        let mut greater = false;
        let mut lesser = false;

        let (mut a, mut b) = (self.counters.iter().peekable(), other.counters.iter().peekable());
        loop {
            let (ours, theirs) = match (a.peek().copied(), b.peek().copied()) {
                (None, None) => break,
                (Some(x), None) => {
                    a.next();
                    (x.value, 0)
                }
                (None, Some(y)) => {
                    b.next();
                    (0, y.value)
                }
                (Some(x), Some(y)) if x.id == y.id => {
                    let pair = (x.value, y.value);
                    a.next();
                    b.next();
                    pair
                }
                (Some(x), Some(y)) if x.id < y.id => {
                    a.next();
                    (x.value, 0)
                }
                (Some(_), Some(y)) => {
                    b.next();
                    (0, y.value)
                }
            };
            greater |= ours > theirs;
            lesser |= ours < theirs;
        }

        match (greater, lesser) {
            (false, false) => VersionOrdering::Equal,
            (true, false) => VersionOrdering::Greater,
            (false, true) => VersionOrdering::Lesser,
            (true, true) => VersionOrdering::Concurrent,
        }
    }

    /// Whether `self` is equal to or strictly newer than `other`.
    pub fn greater_equal(&self, other: &Version) -> bool {
        matches!(
            self.compare(other),
            VersionOrdering::Equal | VersionOrdering::Greater
        )
    }

    fn set(&mut self, id: u64, value: u64) {
        match self.counters.binary_search_by_key(&id, |c| c.id) {
            Ok(i) if value == 0 => {
                self.counters.remove(i);
            }
            Ok(i) => self.counters[i].value = value,
            Err(_) if value == 0 => {}
            Err(i) => self.counters.insert(i, Counter { id, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_versions_are_equal() {
        assert_eq!(Version::new().compare(&Version::new()), VersionOrdering::Equal);
    }

    #[test]
    fn update_dominates_previous() {
        let v1 = Version::new().update(1);
        let v2 = v1.update(1);
        assert_eq!(v2.compare(&v1), VersionOrdering::Greater);
        assert_eq!(v1.compare(&v2), VersionOrdering::Lesser);
        assert!(v2.greater_equal(&v1));
        assert!(!v1.greater_equal(&v2));
    }

    #[test]
    fn divergent_updates_are_concurrent() {
        let base = Version::new().update(1);
        let left = base.update(1);
        let right = base.update(2);
        assert_eq!(left.compare(&right), VersionOrdering::Concurrent);
        assert_eq!(right.compare(&left), VersionOrdering::Concurrent);
    }

    #[test]
    fn disjoint_devices_compare_concurrent_and_hash_apart() {
        let left = Version::new().update(1);
        let right = Version::new().update(2);
        let both = left.update(2);
        assert_eq!(left.compare(&right), VersionOrdering::Concurrent);
        assert_eq!(both.compare(&left), VersionOrdering::Greater);
        assert_eq!(right.compare(&both), VersionOrdering::Lesser);

        let seen: std::collections::HashSet<Version> =
            [left.clone(), right, both, left].into_iter().collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn counters_stay_sorted() {
        let v = Version::new().update(9).update(3).update(5);
        let ids: Vec<u64> = v.counters().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }

    #[test]
    fn zero_counters_are_not_stored() {
        let mut v = Version::new().update(4);
        v.set(4, 0);
        assert!(v.is_empty());
        assert_eq!(v, Version::new());
    }

    #[test]
    fn missing_counter_reads_as_zero() {
        let v = Version::new().update(7);
        assert_eq!(v.counter(7), 1);
        assert_eq!(v.counter(8), 0);
    }
}
