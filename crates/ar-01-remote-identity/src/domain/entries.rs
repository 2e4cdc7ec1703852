//! # Resource Entries
//!
//! One typed entry per resource class. Entries are what an identity map
//! hands back from a lookup: everything the broker needs to call the
//! driver on behalf of a remote id.

use crate::domain::native::{NativeHandle, NativeObject, NativeToken};
use shared_types::RemoteId;

/// Something an identity map can track.
pub trait LocalResource: Clone + Send {
    /// Key of the underlying native resource, for classes where the driver
    /// can hand out the same resource twice. `None` disables the reverse
    /// index for this entry.
    fn native_key(&self) -> Option<u64>;
}

/// An entry whose validity depends on a parent resource.
pub trait OwnedResource {
    /// Id of the handle the entry was created through.
    fn owner(&self) -> RemoteId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEntry {
    pub token: NativeToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleEntry {
    pub handle: NativeHandle,
    /// Token the handle was opened from.
    pub token_id: RemoteId,
}

/// A mapped MMIO region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmioEntry {
    pub owner: RemoteId,
    pub mmio_num: u32,
    pub base: u64,
}

/// A prepared (pinned) DMA buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferEntry {
    pub owner: RemoteId,
    /// Declared length in bytes.
    pub length: u64,
    pub flags: u32,
    /// Workspace id assigned by the driver.
    pub wsid: u64,
    pub address: u64,
}

impl BufferEntry {
    /// Whether `[offset, offset + len)` lies inside the declared length.
    pub fn contains(&self, offset: u64, len: u64) -> bool {
        offset
            .checked_add(len)
            .map_or(false, |end| end <= self.length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEntry {
    pub object: NativeObject,
}

impl LocalResource for TokenEntry {
    fn native_key(&self) -> Option<u64> {
        Some(self.token.raw())
    }
}

impl LocalResource for HandleEntry {
    fn native_key(&self) -> Option<u64> {
        // drivers recycle handle values; every open gets a fresh id
        None
    }
}

impl LocalResource for MmioEntry {
    fn native_key(&self) -> Option<u64> {
        None
    }
}

impl LocalResource for BufferEntry {
    fn native_key(&self) -> Option<u64> {
        None
    }
}

impl LocalResource for ObjectEntry {
    fn native_key(&self) -> Option<u64> {
        // every get-object call yields a distinct object
        None
    }
}

impl OwnedResource for MmioEntry {
    fn owner(&self) -> RemoteId {
        self.owner
    }
}

impl OwnedResource for BufferEntry {
    fn owner(&self) -> RemoteId {
        self.owner
    }
}
