//! # Remote-Id Generator
//!
//! `high` is a random salt drawn once per generator and never zero, `low` is
//! an atomic counter starting at 1. Ids from two server processes differ in
//! their salt with overwhelming probability, so a client talking to a
//! restarted broker cannot resolve a stale id by accident.

use crate::ports::IdSource;
use parking_lot::Mutex;
use rand::Rng;
use shared_types::RemoteId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide id generator shared by every resource class.
#[derive(Debug)]
pub struct RemoteIdGenerator {
    salt: u64,
    counter: AtomicU64,
}

impl RemoteIdGenerator {
    /// New generator with a random non-zero salt.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let mut salt = rng.gen::<u64>();
        while salt == 0 {
            salt = rng.gen::<u64>();
        }
        Self::with_salt(salt)
    }

    /// Generator with a fixed salt. A zero salt is bumped to 1.
    pub fn with_salt(salt: u64) -> Self {
        Self {
            salt: salt.max(1),
            counter: AtomicU64::new(1),
        }
    }

    pub fn salt(&self) -> u64 {
        self.salt
    }
}

impl Default for RemoteIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for RemoteIdGenerator {
    fn next_id(&self) -> RemoteId {
        let low = self.counter.fetch_add(1, Ordering::Relaxed);
        RemoteId::new(self.salt, low)
    }
}

/// Id source that replays a fixed script, then yields the sentinel.
///
/// Used to provoke collisions and registration failures in tests.
#[derive(Debug, Default)]
pub struct ScriptedIdSource {
    script: Mutex<VecDeque<RemoteId>>,
}

impl ScriptedIdSource {
    pub fn new(ids: impl IntoIterator<Item = RemoteId>) -> Self {
        Self {
            script: Mutex::new(ids.into_iter().collect()),
        }
    }

    /// Append ids to the end of the script.
    pub fn push(&self, ids: impl IntoIterator<Item = RemoteId>) {
        self.script.lock().extend(ids);
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl IdSource for ScriptedIdSource {
    fn next_id(&self) -> RemoteId {
        self.script.lock().pop_front().unwrap_or(RemoteId::INVALID)
    }
}
