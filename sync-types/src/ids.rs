//! Identity and ordering types for 0k-Sync folders.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a device participating in a folder.
///
/// 32 bytes of random data, displayed as URL-safe base64. The all-`0xff`
/// value is reserved for [`DeviceId::LOCAL`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId([u8; 32]);

impl DeviceId {
    /// The identity under which this process records its own files.
    pub const LOCAL: DeviceId = DeviceId([0xff; 32]);

    /// Create a new random DeviceId.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Create a DeviceId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == 32 {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw bytes of this DeviceId.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the reserved local identity.
    pub fn is_local(&self) -> bool {
        *self == Self::LOCAL
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            return write!(f, "DeviceId(local)");
        }
        write!(f, "DeviceId({})", &self.to_string()[..8])
    }
}

/// Random session token identifying one incarnation of a device's index
/// for a folder.
///
/// Zero means "not assigned".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct IndexId(u64);

impl IndexId {
    /// The unassigned index ID.
    pub const ZERO: IndexId = IndexId(0);

    /// Generate a new random, nonzero IndexId.
    pub fn random() -> Self {
        loop {
            let mut bytes = [0u8; 8];
            getrandom::getrandom(&mut bytes).expect("getrandom failed");
            let value = u64::from_le_bytes(bytes);
            if value != 0 {
                return Self(value);
            }
        }
    }

    /// Wrap a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this IndexId.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Whether this is the unassigned value.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexId({:016x})", self.0)
    }
}

/// A monotonically increasing local version cursor.
///
/// Stamped onto every record the local device writes. It is the resumable
/// sync position for a folder, not a conflict version.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Cursor(u64);

impl Cursor {
    /// Create a new Cursor with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Cursor.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Create a Cursor representing "no data yet".
    pub fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_roundtrip() {
        let original = DeviceId::random();
        let bytes = original.as_bytes();
        let restored = DeviceId::from_bytes(bytes).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn device_id_base64_display() {
        let id = DeviceId::random();
        let display = id.to_string();
        assert_eq!(display.len(), 43); // 32 bytes = 43 base64 chars (no padding)
    }

    #[test]
    fn device_id_from_invalid_length_fails() {
        assert!(DeviceId::from_bytes(&[0u8; 16]).is_none());
        assert!(DeviceId::from_bytes(&[0u8; 64]).is_none());
    }

    #[test]
    fn local_device_is_reserved() {
        assert!(DeviceId::LOCAL.is_local());
        assert!(!DeviceId::random().is_local());
        assert_eq!(format!("{:?}", DeviceId::LOCAL), "DeviceId(local)");
    }

    #[test]
    fn index_id_random_is_nonzero() {
        for _ in 0..64 {
            assert!(!IndexId::random().is_zero());
        }
    }

    #[test]
    fn index_id_zero_default() {
        assert_eq!(IndexId::default(), IndexId::ZERO);
        assert!(IndexId::ZERO.is_zero());
        assert_eq!(IndexId::new(42).value(), 42);
    }

    #[test]
    fn cursor_ordering() {
        let c1 = Cursor::new(100);
        let c2 = Cursor::new(200);
        assert!(c1 < c2);
        assert!(c2 > c1);
    }
}
