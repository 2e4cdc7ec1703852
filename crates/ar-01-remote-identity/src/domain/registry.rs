//! # Resource Registry
//!
//! The five identity maps of a broker plus the id source they share.
//! Because one source serves every class, an id never lives in two maps.

use crate::domain::entries::{
    BufferEntry, HandleEntry, LocalResource, MmioEntry, ObjectEntry, TokenEntry,
};
use crate::domain::map::{IdentityMap, MapStats, Registration};
use crate::ports::IdSource;
use shared_types::RemoteId;
use std::sync::Arc;

/// Per-class counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub tokens: MapStats,
    pub handles: MapStats,
    pub mmio: MapStats,
    pub buffers: MapStats,
    pub objects: MapStats,
}

pub struct ResourceRegistry {
    pub tokens: IdentityMap<TokenEntry>,
    pub handles: IdentityMap<HandleEntry>,
    pub mmio: IdentityMap<MmioEntry>,
    pub buffers: IdentityMap<BufferEntry>,
    pub objects: IdentityMap<ObjectEntry>,
    ids: Arc<dyn IdSource>,
}

impl ResourceRegistry {
    pub fn new(ids: Arc<dyn IdSource>) -> Self {
        Self {
            tokens: IdentityMap::new("token"),
            handles: IdentityMap::new("handle"),
            mmio: IdentityMap::new("mmio"),
            buffers: IdentityMap::new("buffer"),
            objects: IdentityMap::new("object"),
            ids,
        }
    }

    /// Draw a fresh id from the shared source.
    pub fn next_id(&self) -> RemoteId {
        self.ids.next_id()
    }

    /// Issue a new id for `entry` and insert it into `map`.
    ///
    /// `None` if the source produced an unusable id (sentinel or collision).
    pub fn register<V: LocalResource>(&self, map: &IdentityMap<V>, entry: V) -> Option<RemoteId> {
        let id = self.next_id();
        map.add(id, entry).then_some(id)
    }

    /// Reuse the id tracking `entry`'s native resource, or issue one.
    pub fn intern<V: LocalResource>(
        &self,
        map: &IdentityMap<V>,
        entry: V,
    ) -> Option<Registration> {
        map.find_or_add(entry, || self.next_id())
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            tokens: self.tokens.stats(),
            handles: self.handles.stats(),
            mmio: self.mmio.stats(),
            buffers: self.buffers.stats(),
            objects: self.objects.stats(),
        }
    }
}
