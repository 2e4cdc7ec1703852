//! # Identity Map
//!
//! Thread-safe mapping from [`RemoteId`] to a typed entry, one instance per
//! resource class.
//!
//! The forward map, the reverse index (native key to id) and the claim flags
//! live behind a single mutex and are only ever changed together. Lookups
//! return clones, so nothing escapes the lock.

use crate::domain::entries::{LocalResource, OwnedResource};
use parking_lot::Mutex;
use shared_types::RemoteId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{trace, warn};

/// Why a teardown claim could not be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("id is not present")]
    Absent,
    #[error("id is already being torn down")]
    Busy,
}

/// Outcome of [`IdentityMap::find_or_add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The native resource was already tracked under this id.
    Existing(RemoteId),
    /// A new id was issued.
    Inserted(RemoteId),
}

impl Registration {
    pub fn id(self) -> RemoteId {
        match self {
            Registration::Existing(id) | Registration::Inserted(id) => id,
        }
    }
}

/// Counters for one map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    pub live: usize,
    pub adds: u64,
    pub removes: u64,
    pub rejected_adds: u64,
}

#[derive(Debug)]
struct Slot<V> {
    entry: V,
    claimed: bool,
}

#[derive(Debug)]
struct MapState<V> {
    entries: HashMap<RemoteId, Slot<V>>,
    by_native: HashMap<u64, RemoteId>,
}

impl<V: LocalResource> MapState<V> {
    fn insert(&mut self, id: RemoteId, entry: V) -> bool {
        if !id.is_valid() || self.entries.contains_key(&id) {
            return false;
        }
        if let Some(key) = entry.native_key() {
            if self.by_native.contains_key(&key) {
                return false;
            }
            self.by_native.insert(key, id);
        }
        self.entries.insert(
            id,
            Slot {
                entry,
                claimed: false,
            },
        );
        true
    }

    fn take(&mut self, id: &RemoteId) -> Option<V> {
        let slot = self.entries.remove(id)?;
        if let Some(key) = slot.entry.native_key() {
            self.by_native.remove(&key);
        }
        Some(slot.entry)
    }
}

/// Mapping from remote ids to entries of one resource class.
pub struct IdentityMap<V> {
    class: &'static str,
    state: Mutex<MapState<V>>,
    adds: AtomicU64,
    removes: AtomicU64,
    rejected_adds: AtomicU64,
}

impl<V: LocalResource> IdentityMap<V> {
    /// Empty map. `class` names the resource class in logs.
    pub fn new(class: &'static str) -> Self {
        Self {
            class,
            state: Mutex::new(MapState {
                entries: HashMap::new(),
                by_native: HashMap::new(),
            }),
            adds: AtomicU64::new(0),
            removes: AtomicU64::new(0),
            rejected_adds: AtomicU64::new(0),
        }
    }

    pub fn class(&self) -> &'static str {
        self.class
    }

    /// Entry for `id`, if present. The sentinel never resolves.
    pub fn find(&self, id: &RemoteId) -> Option<V> {
        if !id.is_valid() {
            return None;
        }
        self.state.lock().entries.get(id).map(|slot| slot.entry.clone())
    }

    pub fn contains(&self, id: &RemoteId) -> bool {
        id.is_valid() && self.state.lock().entries.contains_key(id)
    }

    /// Id under which a native resource is tracked.
    pub fn find_native(&self, key: u64) -> Option<RemoteId> {
        self.state.lock().by_native.get(&key).copied()
    }

    /// Insert `entry` under `id`.
    ///
    /// Returns false, leaving the map unchanged, when `id` is the sentinel,
    /// `id` is already present, or the entry's native resource is already
    /// tracked under another id.
    pub fn add(&self, id: RemoteId, entry: V) -> bool {
        let inserted = self.state.lock().insert(id, entry);
        if inserted {
            self.adds.fetch_add(1, Ordering::Relaxed);
            trace!(class = self.class, id = %id, "Registered remote id");
        } else {
            self.rejected_adds.fetch_add(1, Ordering::Relaxed);
            warn!(class = self.class, id = %id, "Rejected remote id registration");
        }
        inserted
    }

    /// Return the id already tracking `entry`'s native resource, or insert
    /// it under an id from `make_id`.
    ///
    /// The lookup and the insert happen under one lock, so two concurrent
    /// callers registering the same native resource get the same id.
    /// Returns `None` when the issued id cannot be inserted.
    pub fn find_or_add<F>(&self, entry: V, make_id: F) -> Option<Registration>
    where
        F: FnOnce() -> RemoteId,
    {
        let mut state = self.state.lock();
        if let Some(key) = entry.native_key() {
            if let Some(id) = state.by_native.get(&key) {
                return Some(Registration::Existing(*id));
            }
        }

        let id = make_id();
        if state.insert(id, entry) {
            drop(state);
            self.adds.fetch_add(1, Ordering::Relaxed);
            trace!(class = self.class, id = %id, "Registered remote id");
            Some(Registration::Inserted(id))
        } else {
            drop(state);
            self.rejected_adds.fetch_add(1, Ordering::Relaxed);
            warn!(class = self.class, id = %id, "Rejected remote id registration");
            None
        }
    }

    /// Remove `id` unconditionally. Returns false if it was absent.
    ///
    /// An outstanding claim on `id` is voided; its commit reports false.
    pub fn remove(&self, id: &RemoteId) -> bool {
        let removed = self.state.lock().take(id).is_some();
        if removed {
            self.removes.fetch_add(1, Ordering::Relaxed);
            trace!(class = self.class, id = %id, "Removed remote id");
        }
        removed
    }

    /// Take exclusive teardown rights over `id`.
    ///
    /// While the claim is held the entry still resolves. Committing removes
    /// it; dropping the claim without committing leaves it live.
    pub fn claim(&self, id: &RemoteId) -> Result<Claim<'_, V>, ClaimError> {
        if !id.is_valid() {
            return Err(ClaimError::Absent);
        }
        let mut state = self.state.lock();
        let slot = state.entries.get_mut(id).ok_or(ClaimError::Absent)?;
        if slot.claimed {
            return Err(ClaimError::Busy);
        }
        slot.claimed = true;
        let entry = slot.entry.clone();
        Ok(Claim {
            map: self,
            id: *id,
            entry,
            settled: false,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live ids, in no particular order.
    pub fn ids(&self) -> Vec<RemoteId> {
        self.state.lock().entries.keys().copied().collect()
    }

    pub fn stats(&self) -> MapStats {
        MapStats {
            live: self.len(),
            adds: self.adds.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            rejected_adds: self.rejected_adds.load(Ordering::Relaxed),
        }
    }

    fn settle(&self, id: &RemoteId, commit: bool) -> bool {
        let mut state = self.state.lock();
        let claimed = state.entries.get(id).map_or(false, |slot| slot.claimed);
        if !claimed {
            return false;
        }

        if commit {
            state.take(id);
            drop(state);
            self.removes.fetch_add(1, Ordering::Relaxed);
            trace!(class = self.class, id = %id, "Removed remote id");
        } else if let Some(slot) = state.entries.get_mut(id) {
            slot.claimed = false;
        }
        true
    }
}

impl<V: LocalResource + OwnedResource> IdentityMap<V> {
    /// Remove every entry owned by `owner`, returning what was removed.
    pub fn remove_owned_by(&self, owner: &RemoteId) -> Vec<(RemoteId, V)> {
        let mut state = self.state.lock();
        let ids: Vec<RemoteId> = state
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.owner() == *owner)
            .map(|(id, _)| *id)
            .collect();

        let removed: Vec<(RemoteId, V)> = ids
            .into_iter()
            .filter_map(|id| state.take(&id).map(|entry| (id, entry)))
            .collect();
        drop(state);

        if !removed.is_empty() {
            self.removes
                .fetch_add(removed.len() as u64, Ordering::Relaxed);
            trace!(
                class = self.class,
                owner = %owner,
                count = removed.len(),
                "Removed owned remote ids"
            );
        }
        removed
    }
}

/// Exclusive right to tear down one entry.
///
/// Dropping the claim without calling [`Claim::commit`] releases it and the
/// id stays valid.
pub struct Claim<'a, V: LocalResource> {
    map: &'a IdentityMap<V>,
    id: RemoteId,
    entry: V,
    settled: bool,
}

impl<'a, V: LocalResource> Claim<'a, V> {
    pub fn id(&self) -> RemoteId {
        self.id
    }

    pub fn entry(&self) -> &V {
        &self.entry
    }

    /// Remove the entry. Call only after the local destroy succeeded.
    ///
    /// Returns false if the entry was removed by other means while claimed.
    pub fn commit(mut self) -> bool {
        self.settled = true;
        self.map.settle(&self.id, true)
    }

    /// Give the claim back explicitly. Same as dropping it.
    pub fn release(mut self) {
        self.settled = true;
        self.map.settle(&self.id, false);
    }
}

impl<'a, V: LocalResource> Drop for Claim<'a, V> {
    fn drop(&mut self) {
        if !self.settled {
            self.map.settle(&self.id, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entries::{BufferEntry, ObjectEntry, TokenEntry};
    use crate::domain::native::{NativeObject, NativeToken};
    use proptest::prelude::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    fn id(n: u64) -> RemoteId {
        RemoteId::new(0xa, n)
    }

    fn token(n: u64) -> TokenEntry {
        TokenEntry {
            token: NativeToken(n),
        }
    }

    fn object(n: u64) -> ObjectEntry {
        ObjectEntry {
            object: NativeObject(n),
        }
    }

    fn buffer(owner: RemoteId, wsid: u64) -> BufferEntry {
        BufferEntry {
            owner,
            length: 4096,
            flags: 0,
            wsid,
            address: wsid << 12,
        }
    }

    #[test]
    fn test_find_after_add_and_remove() {
        let map = IdentityMap::new("object");
        assert!(map.find(&id(1)).is_none());
        assert!(map.add(id(1), object(10)));
        assert_eq!(map.find(&id(1)), Some(object(10)));
        assert!(map.remove(&id(1)));
        assert!(map.find(&id(1)).is_none());
        assert!(!map.remove(&id(1)));
    }

    #[test]
    fn test_sentinel_never_inserted() {
        let map = IdentityMap::new("object");
        assert!(!map.add(RemoteId::INVALID, object(1)));
        assert!(map.find(&RemoteId::INVALID).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_duplicate_add_keeps_first_entry() {
        let map = IdentityMap::new("object");
        assert!(map.add(id(1), object(10)));
        assert!(!map.add(id(1), object(20)));
        assert_eq!(map.find(&id(1)), Some(object(10)));
        assert_eq!(map.stats().rejected_adds, 1);
    }

    #[test]
    fn test_concurrent_duplicate_add_single_winner() {
        let map = Arc::new(IdentityMap::new("object"));
        let barrier = Arc::new(std::sync::Barrier::new(16));

        let threads: Vec<_> = (0..16u64)
            .map(|n| {
                let map = Arc::clone(&map);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (n, map.add(id(1), object(100 + n)))
                })
            })
            .collect();

        let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter(|(_, added)| *added).collect();
        assert_eq!(winners.len(), 1);

        let (winner, _) = winners[0];
        assert_eq!(map.find(&id(1)), Some(object(100 + winner)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.stats().rejected_adds, 15);
    }

    #[test]
    fn test_native_resource_tracked_once() {
        let map = IdentityMap::new("token");
        assert!(map.add(id(1), token(7)));
        assert!(!map.add(id(2), token(7)));
        assert_eq!(map.find_native(7), Some(id(1)));
        assert!(map.find(&id(2)).is_none());
    }

    #[test]
    fn test_find_or_add_reuses_id() {
        let map = IdentityMap::new("token");
        let first = map.find_or_add(token(7), || id(1)).unwrap();
        assert_eq!(first, Registration::Inserted(id(1)));

        let second = map
            .find_or_add(token(7), || panic!("no id needed"))
            .unwrap();
        assert_eq!(second, Registration::Existing(id(1)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_find_or_add_after_remove_issues_new_id() {
        let map = IdentityMap::new("token");
        map.find_or_add(token(7), || id(1)).unwrap();
        assert!(map.remove(&id(1)));
        assert_eq!(map.find_native(7), None);

        let again = map.find_or_add(token(7), || id(2)).unwrap();
        assert_eq!(again, Registration::Inserted(id(2)));
        assert!(map.find(&id(1)).is_none());
    }

    #[test]
    fn test_find_or_add_rejects_bad_id() {
        let map = IdentityMap::new("token");
        assert!(map.find_or_add(token(1), || RemoteId::INVALID).is_none());
        map.add(id(5), token(2));
        assert!(map.find_or_add(token(3), || id(5)).is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_claim_commit_removes() {
        let map = IdentityMap::new("object");
        map.add(id(1), object(1));

        let claim = map.claim(&id(1)).unwrap();
        assert_eq!(claim.entry(), &object(1));
        // still resolvable while claimed
        assert!(map.find(&id(1)).is_some());
        assert!(claim.commit());
        assert!(map.find(&id(1)).is_none());
        assert_eq!(map.stats().removes, 1);
    }

    #[test]
    fn test_claim_drop_keeps_entry() {
        let map = IdentityMap::new("object");
        map.add(id(1), object(1));
        {
            let _claim = map.claim(&id(1)).unwrap();
            assert_eq!(map.claim(&id(1)).err(), Some(ClaimError::Busy));
        }
        assert!(map.find(&id(1)).is_some());
        let claim = map.claim(&id(1)).unwrap();
        claim.release();
        assert!(map.claim(&id(1)).is_ok());
    }

    #[test]
    fn test_claim_absent() {
        let map: IdentityMap<ObjectEntry> = IdentityMap::new("object");
        assert_eq!(map.claim(&id(1)).err(), Some(ClaimError::Absent));
        assert_eq!(map.claim(&RemoteId::INVALID).err(), Some(ClaimError::Absent));
    }

    #[test]
    fn test_commit_after_forced_remove() {
        let map = IdentityMap::new("object");
        map.add(id(1), object(1));
        let claim = map.claim(&id(1)).unwrap();
        assert!(map.remove(&id(1)));
        assert!(!claim.commit());
    }

    #[test]
    fn test_remove_owned_by() {
        let map = IdentityMap::new("buffer");
        let h1 = RemoteId::new(1, 1);
        let h2 = RemoteId::new(1, 2);
        map.add(id(1), buffer(h1, 1));
        map.add(id(2), buffer(h2, 2));
        map.add(id(3), buffer(h1, 3));

        let mut removed = map.remove_owned_by(&h1);
        removed.sort_by_key(|(id, _)| *id);
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].0, id(1));
        assert_eq!(removed[1].0, id(3));
        assert_eq!(map.len(), 1);
        assert!(map.find(&id(2)).is_some());
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let map = Arc::new(IdentityMap::new("object"));
        map.add(id(1), object(1));
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let map = Arc::clone(&map);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if let Ok(claim) = map.claim(&id(1)) {
                        if claim.commit() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn test_concurrent_find_or_add_agrees() {
        let map = Arc::new(IdentityMap::new("token"));
        let next = Arc::new(AtomicU64::new(1));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let map = Arc::clone(&map);
                let next = Arc::clone(&next);
                thread::spawn(move || {
                    map.find_or_add(token(42), || id(next.fetch_add(1, Ordering::SeqCst)))
                        .unwrap()
                        .id()
                })
            })
            .collect();

        let ids: Vec<RemoteId> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(map.len(), 1);
    }

    // =========================================================================
    // MODEL CHECK
    // =========================================================================

    #[derive(Debug, Clone)]
    enum Op {
        Add(u64, u64),
        Remove(u64),
        Find(u64),
        ClaimCommit(u64),
        ClaimDrop(u64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..8u64, 0..8u64).prop_map(|(i, n)| Op::Add(i, n)),
            (0..8u64).prop_map(Op::Remove),
            (0..8u64).prop_map(Op::Find),
            (0..8u64).prop_map(Op::ClaimCommit),
            (0..8u64).prop_map(Op::ClaimDrop),
        ]
    }

    proptest! {
        #[test]
        fn prop_map_matches_model(ops in proptest::collection::vec(arb_op(), 1..64)) {
            let map = IdentityMap::new("token");
            let mut model: HashMap<RemoteId, TokenEntry> = HashMap::new();
            let mut retired: Vec<RemoteId> = Vec::new();

            for op in ops {
                match op {
                    Op::Add(i, n) => {
                        let key = id(i + 1);
                        // retired ids are never reissued by a real source
                        if retired.contains(&key) {
                            continue;
                        }
                        let entry = token(n);
                        let expected = !model.contains_key(&key)
                            && !model.values().any(|e| *e == entry);
                        prop_assert_eq!(map.add(key, entry), expected);
                        if expected {
                            model.insert(key, entry);
                        }
                    }
                    Op::Remove(i) => {
                        let key = id(i + 1);
                        let present = model.remove(&key).is_some();
                        prop_assert_eq!(map.remove(&key), present);
                        if present {
                            retired.push(key);
                        }
                    }
                    Op::Find(i) => {
                        let key = id(i + 1);
                        prop_assert_eq!(map.find(&key), model.get(&key).copied());
                    }
                    Op::ClaimCommit(i) => {
                        let key = id(i + 1);
                        match map.claim(&key) {
                            Ok(claim) => {
                                prop_assert!(model.contains_key(&key));
                                prop_assert!(claim.commit());
                                model.remove(&key);
                                retired.push(key);
                            }
                            Err(err) => {
                                prop_assert_eq!(err, ClaimError::Absent);
                                prop_assert!(!model.contains_key(&key));
                            }
                        }
                    }
                    Op::ClaimDrop(i) => {
                        let key = id(i + 1);
                        let claimed = map.claim(&key).is_ok();
                        prop_assert_eq!(claimed, model.contains_key(&key));
                    }
                }

                prop_assert_eq!(map.len(), model.len());
                for gone in &retired {
                    prop_assert!(map.find(gone).is_none());
                }
            }
        }
    }
}
