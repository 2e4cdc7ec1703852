//! Remote identifier for resources that cross the network boundary.
//!
//! A `RemoteId` is two 64-bit words: `high` is a random salt chosen when the
//! issuing server starts, `low` is a per-process sequence number. The
//! all-zero value is reserved as the invalid sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque cross-process resource identifier issued by the broker.
///
/// Ordering is total so ids can key ordered containers, but it carries no
/// meaning beyond storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RemoteId {
    /// Creation salt (random per server process).
    pub high: u64,
    /// Sequence part.
    pub low: u64,
}

impl RemoteId {
    /// The invalid sentinel. Never issued, never resolves.
    pub const INVALID: RemoteId = RemoteId { high: 0, low: 0 };

    /// Build an id from its two halves.
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Whether this id can possibly name a resource.
    pub const fn is_valid(&self) -> bool {
        self.high != 0 || self.low != 0
    }

    /// Get as big-endian bytes (high word first).
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.high.to_be_bytes());
        bytes[8..].copy_from_slice(&self.low.to_be_bytes());
        bytes
    }

    /// Rebuild from big-endian bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut high = [0u8; 8];
        let mut low = [0u8; 8];
        high.copy_from_slice(&bytes[..8]);
        low.copy_from_slice(&bytes[8..]);
        Self {
            high: u64::from_be_bytes(high),
            low: u64::from_be_bytes(low),
        }
    }
}

impl Default for RemoteId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}-{:016x}", self.high, self.low)
    }
}

impl From<(u64, u64)> for RemoteId {
    fn from((high, low): (u64, u64)) -> Self {
        Self { high, low }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinel() {
        assert!(!RemoteId::INVALID.is_valid());
        assert!(!RemoteId::default().is_valid());
        assert!(RemoteId::new(0, 1).is_valid());
        assert!(RemoteId::new(1, 0).is_valid());
    }

    #[test]
    fn test_equality_is_bitwise() {
        let a = RemoteId::new(7, 9);
        assert_eq!(a, RemoteId::new(7, 9));
        assert_ne!(a, RemoteId::new(9, 7));
        assert_ne!(a, RemoteId::new(7, 10));
    }

    #[test]
    fn test_byte_layout() {
        let id = RemoteId::new(0x0102_0304_0506_0708, 0x1112_1314_1516_1718);
        let bytes = id.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[15], 0x18);
        assert_eq!(RemoteId::from_bytes(bytes), id);
    }

    #[test]
    fn test_display() {
        let id = RemoteId::new(0xabc, 1);
        let display = id.to_string();
        assert_eq!(display.len(), 33); // 16 hex + '-' + 16 hex
        assert!(display.ends_with("0000000000000001"));
    }

    #[test]
    fn test_serialization() {
        let id = RemoteId::new(42, 43);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: RemoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
