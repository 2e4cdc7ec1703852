//! # Remote Identity
//!
//! Issues [`RemoteId`]s and keeps, per resource class, the mapping from a
//! remote id to the local resource it names.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Ids are unique for the process lifetime and never the sentinel | `RemoteIdGenerator` |
//! | A present id resolves to exactly one live local resource | `IdentityMap::add` |
//! | One native token is never tracked under two ids | reverse index in `IdentityMap` |
//! | Removed ids never resolve again | ids are never reissued |
//! | Only one caller tears a resource down | `IdentityMap::claim` |
//!
//! ## Teardown Protocol
//!
//! ```text
//! [LIVE] ──claim──→ [CLAIMED] ──commit──→ [REMOVED]
//!                       │
//!                       └── drop (local destroy failed) ──→ [LIVE]
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! ports/outbound.rs    - IdSource trait
//! adapters/generator.rs - RemoteIdGenerator, ScriptedIdSource
//! domain/native.rs     - NativeToken, NativeHandle, NativeObject
//! domain/entries.rs    - typed entries per resource class
//! domain/map.rs        - IdentityMap<V>, Claim
//! domain/registry.rs   - ResourceRegistry (all five maps + id source)
//! ```
//!
//! [`RemoteId`]: shared_types::RemoteId

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{RemoteIdGenerator, ScriptedIdSource};
pub use domain::*;
pub use ports::IdSource;
